//! Field guards for directory records.
//!
//! Every create or update passes through these checks before anything is
//! committed, so the report generator and dispatcher only ever see valid
//! records.

use lettre::Address;
use thiserror::Error;

pub const EMPLOYEE_NAME_MAX_CHARS: usize = 100;
pub const EXTENSION_CODE_MAX_CHARS: usize = 5;

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("field '{field}' cannot be empty or whitespace-only")]
    EmptyString { field: &'static str },

    #[error("field '{field}' is {actual} characters long, maximum is {max}")]
    TooLong {
        field: &'static str,
        actual: usize,
        max: usize,
    },

    #[error("'{value}' is not a valid email address: {reason}")]
    InvalidEmail { value: String, reason: String },
}

pub fn validate_non_empty_string<'a>(
    field: &'static str,
    value: &'a str,
) -> ValidationResult<&'a str> {
    if value.trim().is_empty() {
        Err(ValidationError::EmptyString { field })
    } else {
        Ok(value)
    }
}

/// Length is counted in characters, not bytes.
pub fn validate_max_chars<'a>(
    field: &'static str,
    value: &'a str,
    max: usize,
) -> ValidationResult<&'a str> {
    let actual = value.chars().count();
    if actual > max {
        Err(ValidationError::TooLong { field, actual, max })
    } else {
        Ok(value)
    }
}

/// An empty address is allowed and means "no contact address".
pub fn validate_optional_email(value: &str) -> ValidationResult<&str> {
    if value.is_empty() {
        return Ok(value);
    }
    value
        .parse::<Address>()
        .map(|_| value)
        .map_err(|err| ValidationError::InvalidEmail {
            value: value.to_string(),
            reason: err.to_string(),
        })
}

pub fn validate_employee_name(name: &str) -> ValidationResult<&str> {
    validate_non_empty_string("name", name)?;
    validate_max_chars("name", name, EMPLOYEE_NAME_MAX_CHARS)
}

pub fn validate_extension_code(code: &str) -> ValidationResult<&str> {
    validate_non_empty_string("extension", code)?;
    validate_max_chars("extension", code, EXTENSION_CODE_MAX_CHARS)
}
