use crate::error::ApiError;
use validator::{Validate, ValidationErrors};

/// Runs derived validators, reporting offending fields as `field: code`.
pub fn validate<T: Validate>(value: &T) -> Result<(), ApiError> {
    value
        .validate()
        .map_err(|err| ApiError::Validation(describe(&err)))
}

fn describe(errors: &ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .into_iter()
        .map(|(field, failures)| {
            let reason = failures
                .first()
                .map(|failure| {
                    failure
                        .message
                        .as_ref()
                        .map(|message| message.to_string())
                        .unwrap_or_else(|| failure.code.to_string())
                })
                .unwrap_or_else(|| "invalid".to_string());
            format!("{field}: {reason}")
        })
        .collect();
    fields.sort();
    fields.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Ban {
        #[validate(length(min = 1))]
        hashed_ip: String,
        #[validate(range(min = 1, max = 100))]
        limit: usize,
    }

    #[test]
    fn reports_every_failing_field_in_order() {
        let err = validate(&Ban {
            hashed_ip: String::new(),
            limit: 0,
        })
        .expect_err("invalid");
        assert_eq!(
            err.to_string(),
            "validation failed: hashed_ip: length, limit: range"
        );
    }

    #[test]
    fn valid_values_pass() {
        assert!(
            validate(&Ban {
                hashed_ip: "abc".into(),
                limit: 5,
            })
            .is_ok()
        );
    }
}
