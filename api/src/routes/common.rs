//! Request-shaping helpers shared by the route modules.

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{ApiError, ApiResult};

/// A fully buffered multipart form.
///
/// Repeated fields keep their order. A trailing `[]` on a field name is dropped, so
/// `recipient` and `recipient[]` collect into the same list.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<Vec<u8>>>,
}

fn multipart_error(e: MultipartError) -> ApiError {
    let status = e.status();
    let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "PAYLOAD_TOO_LARGE"
    } else {
        "INVALID_INPUT"
    };
    ApiError::new(status, code, format!("Invalid multipart body: {}", e.body_text()))
}

impl FormData {
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = FormData::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or("").trim_end_matches("[]").to_owned();
            if name.is_empty() {
                continue;
            }
            let is_file = field.file_name().is_some();
            let bytes = field.bytes().await.map_err(multipart_error)?.to_vec();

            if is_file {
                form.files.entry(name).or_default().push(bytes);
                continue;
            }
            match String::from_utf8(bytes) {
                Ok(text) => form.fields.entry(name).or_default().push(text),
                // Binary parts sent without a filename are still files.
                Err(raw) => form.files.entry(name).or_default().push(raw.into_bytes()),
            }
        }
        Ok(form)
    }

    /// First non-blank value of a text field, trimmed.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)?
            .iter()
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
    }

    /// Every value of a repeated text field, untouched.
    pub fn all(&self, name: &str) -> Vec<String> {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.files.get(name)?.first().cloned()
    }

    pub fn files(&self, name: &str) -> Vec<Vec<u8>> {
        self.files.get(name).cloned().unwrap_or_default()
    }

    pub fn parsed<T: FromStr>(&self, name: &str) -> ApiResult<Option<T>> {
        parse_opt(self.text(name), name)
    }

    pub fn required<T: FromStr>(&self, name: &str) -> ApiResult<T> {
        self.parsed(name)?
            .ok_or_else(|| ApiError::bad_request(format!("{name} is required")))
    }
}

/// Parses an optional raw value, treating blanks as absent.
pub fn parse_opt<T: FromStr>(raw: Option<&str>, name: &str) -> ApiResult<Option<T>> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("{name} is not valid: {v}"))),
    }
}

pub fn parse_required<T: FromStr>(raw: Option<&str>, name: &str) -> ApiResult<T> {
    parse_opt(raw, name)?.ok_or_else(|| ApiError::bad_request(format!("{name} is required")))
}

/// Turns axum's JSON extraction failure into the standard envelope.
pub fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::new(rejection.status(), "INVALID_INPUT", rejection.body_text())
}
