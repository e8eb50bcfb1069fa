//! Client-side form checks, run before any network call.

use chrono::NaiveDate;
use std::path::Path;

use crate::error::ValidationError;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Same check for registration and password change forms.
pub fn check_password(password: &str, confirmation: &str) -> Result<(), ValidationError> {
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LEN));
    }
    Ok(())
}

pub fn require(field: &str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(field.to_string()))
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate(raw.to_string()))
}

pub fn parse_number(field: &str, raw: &str) -> Result<f64, ValidationError> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::InvalidNumber { field: field.to_string(), value: raw.to_string() })?;
    if !value.is_finite() {
        return Err(ValidationError::InvalidNumber { field: field.to_string(), value: raw.to_string() });
    }
    Ok(value)
}

/// L'import historique n'accepte que du CSV ou du JSON.
pub fn check_upload_file_name(name: &str) -> Result<(), ValidationError> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("csv") | Some("json") => Ok(()),
        _ => Err(ValidationError::UnsupportedFile(name.to_string())),
    }
}
