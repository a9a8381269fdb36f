//! Request handlers module

pub mod department;
pub mod employee;
pub mod plan;

use crate::error::{AppError, AppResult};

/// Trim a required text field and check it is non-empty and at most `max_len` characters
pub(crate) fn required_text(field: &str, value: &str, max_len: usize) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", field)));
    }
    if trimmed.chars().count() > max_len {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(trimmed.to_string())
}
