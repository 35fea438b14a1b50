use crate::error::{AppError, Result};

/// Longest accepted device fingerprint.
pub const MAX_SPEC_LEN: usize = 256;

/// Validates a device fingerprint.
///
/// # Arguments
///
/// * `spec` - The fingerprint to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the spec is usable as a binding key.
pub fn validate_spec(spec: &str) -> Result<()> {
    if spec.trim().is_empty() {
        return Err(AppError::InputMalformed("spec must not be empty".to_string()));
    }

    if spec.len() > MAX_SPEC_LEN {
        return Err(AppError::InputMalformed(format!(
            "spec must be at most {} bytes",
            MAX_SPEC_LEN
        )));
    }

    if spec.chars().any(char::is_control) {
        return Err(AppError::InputMalformed(
            "spec must not contain control characters".to_string(),
        ));
    }

    Ok(())
}

/// Validates a client serial number.
pub fn validate_serial_number(client_sn: &str) -> Result<()> {
    if client_sn.trim().is_empty() {
        return Err(AppError::InputMalformed(
            "client_sn must not be empty".to_string(),
        ));
    }

    if client_sn.len() > 255 {
        return Err(AppError::InputMalformed(
            "client_sn must be at most 255 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validates a username.
///
/// # Arguments
///
/// * `username` - The username to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the username is valid.
pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(AppError::InputMalformed(
            "Username must not be empty".to_string(),
        ));
    }

    if username.len() > 255 {
        return Err(AppError::InputMalformed(
            "Username must be at most 255 characters".to_string(),
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '@'))
    {
        return Err(AppError::InputMalformed(
            "Username can only contain letters, numbers, '_', '-', '.' and '@'".to_string(),
        ));
    }

    Ok(())
}
