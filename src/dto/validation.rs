//! Validation helpers for DTOs.

use validator::ValidationError;

const MAX_ID_LENGTH: usize = 128;

/// Validates that an identifier is non-empty, at most 128 characters and free of whitespace.
///
/// # Examples
///
/// ```ignore
/// validate_identifier("m-42")    // Ok
/// validate_identifier("")        // Err - empty
/// validate_identifier("m 42")    // Err - whitespace
/// ```
pub fn validate_identifier(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > MAX_ID_LENGTH {
        let mut err = ValidationError::new("identifier_length");
        err.message = Some(
            format!(
                "identifier must be between 1 and {MAX_ID_LENGTH} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if id.chars().any(char::is_whitespace) {
        let mut err = ValidationError::new("identifier_format");
        err.message = Some("identifier must not contain whitespace".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        assert!(validate_identifier("m1").is_ok());
        assert!(validate_identifier("65f0c0ffee").is_ok());
        assert!(validate_identifier("a0b1c2d3-e4f5-4789-abcd-0123456789ab").is_ok());
    }

    #[test]
    fn rejects_bad_lengths() {
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier(&"x".repeat(129)).is_err());
    }

    #[test]
    fn rejects_whitespace() {
        assert!(validate_identifier("m 1").is_err());
        assert!(validate_identifier(" m1").is_err());
    }
}
