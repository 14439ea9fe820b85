const BOUNDARY: &str = "----BoundaryTest";

enum Part {
    Text(String),
    File { filename: String, bytes: Vec<u8> },
}

/// Builds `multipart/form-data` request bodies.
#[derive(Default)]
pub struct Form {
    parts: Vec<(String, Part)>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: impl ToString) -> Self {
        self.parts.push((name.to_owned(), Part::Text(value.to_string())));
        self
    }

    pub fn file(mut self, name: &str, filename: &str, bytes: Vec<u8>) -> Self {
        self.parts.push((
            name.to_owned(),
            Part::File {
                filename: filename.to_owned(),
                bytes,
            },
        ));
        self
    }

    pub fn content_type() -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, part) in &self.parts {
            body.extend(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(value) => {
                    body.extend(format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes());
                    body.extend(value.as_bytes());
                }
                Part::File { filename, bytes } => {
                    body.extend(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: image/jpeg\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend(bytes);
                }
            }
            body.extend(b"\r\n");
        }
        body.extend(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }
}
