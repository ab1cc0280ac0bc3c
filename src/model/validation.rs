use thiserror::Error;

use crate::consts::consts::MAX_NAME_LENGTH;

use super::person::PersonField;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("field validation for '{0}' failed on the 'required' rule")]
    Required(PersonField),

    #[error("field validation for '{0}' failed on the 'alpha' rule")]
    Alpha(PersonField),

    #[error("field validation for '{field}' failed on the 'max' rule, at most {max} characters")]
    TooLong { field: PersonField, max: usize },
}

/// Implemented by every body the validation middleware accepts
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Checks run in order: required, alpha, max length
pub fn validate_name(field: PersonField, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Required(field));
    }

    if !value.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::Alpha(field));
    }

    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field,
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}
