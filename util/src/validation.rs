use validator::ValidationErrors;

/// Flattens field errors into one `; `-separated message for the response envelope.
pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(m) => m.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 1, message = "user_id is required"))]
        user_id: String,
        #[validate(range(min = -90.0, max = 90.0))]
        lat: f64,
    }

    #[test]
    fn joins_messages_and_falls_back_to_field_name() {
        let errs = Probe {
            user_id: String::new(),
            lat: 120.0,
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            format_validation_errors(&errs),
            "lat is invalid; user_id is required"
        );
    }
}
