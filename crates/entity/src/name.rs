//! Identifier-safe name validation, applied identically to entity names and
//! field names.

use crate::error::EntityError;

/// Fixed message carried by every naming-validation failure.
pub const NAME_VALIDATION_ERROR_MESSAGE: &str =
    "Name must only contain letters, numbers, or the underscore character, and must not start with a number";

/// An identifier-safe name: first character is a letter or underscore, the
/// rest are letters, digits, or underscores.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub(crate) fn validate_name(name: &str) -> Result<(), EntityError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(EntityError::InvalidName {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        for name in ["exampleEntityFieldName", "order", "order_line", "_hidden", "a1"] {
            assert!(is_valid_identifier(name), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_spaces_and_punctuation() {
        for name in ["Foo Bar", "order-line", "a.b", "café", ""] {
            assert!(!is_valid_identifier(name), "{name:?} should be invalid");
        }
    }

    #[test]
    fn rejects_leading_digit() {
        assert!(!is_valid_identifier("1order"));
        assert!(is_valid_identifier("order1"));
    }

    #[test]
    fn validation_error_carries_fixed_message() {
        let err = validate_name("Foo Bar").unwrap_err();
        assert_eq!(err.to_string(), NAME_VALIDATION_ERROR_MESSAGE);
    }
}
