use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::domain::quote::ClientContact;
use crate::domain::room_type::RoomEntry;
use crate::errors::DomainError;

/// A client's request for a quote, as captured at the presentation boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct QuoteSubmission {
    #[validate(nested)]
    pub client: ClientContact,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(min = 1))]
    pub entries: Vec<RoomEntry>,
}

impl QuoteSubmission {
    /// Checks contact details and that at least one room was entered.
    /// Areas and room types are checked later by the pricing engine.
    pub fn check(&self) -> Result<(), DomainError> {
        self.validate().map_err(|errors| {
            let fields = invalid_fields(&errors);
            DomainError::Validation {
                message: format!("invalid or missing fields: {}", fields.join(", ")),
                fields,
            }
        })
    }
}

/// Flattens nested validation errors into sorted dotted paths such as
/// `client.email`.
pub fn invalid_fields(errors: &ValidationErrors) -> Vec<String> {
    let mut fields = Vec::new();
    collect_fields("", errors, &mut fields);
    fields.sort();
    fields.dedup();
    fields
}

fn collect_fields(prefix: &str, errors: &ValidationErrors, fields: &mut Vec<String>) {
    for (name, kind) in errors.errors() {
        let path =
            if prefix.is_empty() { name.to_string() } else { format!("{prefix}.{name}") };
        match kind {
            ValidationErrorsKind::Field(_) => fields.push(path),
            ValidationErrorsKind::Struct(inner) => collect_fields(&path, inner, fields),
            ValidationErrorsKind::List(items) => {
                for inner in items.values() {
                    collect_fields(&path, inner, fields);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::QuoteSubmission;
    use crate::domain::quote::ClientContact;
    use crate::domain::room_type::RoomEntry;
    use crate::errors::DomainError;

    fn submission() -> QuoteSubmission {
        QuoteSubmission {
            client: ClientContact {
                name: "Ada Client".to_string(),
                email: "ada@example.com".to_string(),
                phone: Some("+44 (0)20 7946-0000".to_string()),
            },
            notes: Some("Second floor".to_string()),
            entries: vec![RoomEntry::new("standard", Decimal::new(20, 0))],
        }
    }

    fn fields(error: DomainError) -> Vec<String> {
        match error {
            DomainError::Validation { fields, .. } => fields,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn complete_submission_passes() {
        submission().check().expect("valid submission");
    }

    #[test]
    fn missing_email_is_reported() {
        let mut submission = submission();
        submission.client.email = String::new();
        assert_eq!(fields(submission.check().expect_err("missing email")), vec!["client.email"]);
    }

    #[test]
    fn malformed_email_and_blank_name_are_both_reported() {
        let mut submission = submission();
        submission.client.email = "not-an-email".to_string();
        submission.client.name = "   ".to_string();
        assert_eq!(
            fields(submission.check().expect_err("invalid")),
            vec!["client.email", "client.name"]
        );
    }

    #[test]
    fn phone_is_optional_but_checked_when_present() {
        let mut submission = submission();
        submission.client.phone = None;
        submission.check().expect("phone optional");

        submission.client.phone = Some("call me".to_string());
        assert_eq!(fields(submission.check().expect_err("bad phone")), vec!["client.phone"]);
    }

    #[test]
    fn at_least_one_entry_is_required() {
        let mut submission = submission();
        submission.entries.clear();
        assert_eq!(fields(submission.check().expect_err("no entries")), vec!["entries"]);
    }

    #[test]
    fn overlong_notes_are_rejected() {
        let mut submission = submission();
        submission.notes = Some("x".repeat(2001));
        assert_eq!(fields(submission.check().expect_err("notes too long")), vec!["notes"]);
    }
}
