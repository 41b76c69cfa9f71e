//! Checks run before any request is built. A failure here never reaches the
//! network.

use crate::{error::ValidationError, models::BroadcastRequest};

pub const MIN_PASSWORD_LEN: usize = 8;

/// validate_signup
///
/// Signup form checks, in the order the user sees them: the confirmation
/// must match, then the length is checked, then the email must be present.
/// The first failure wins.
pub fn validate_signup(
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), ValidationError> {
    if password != confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    if email.trim().is_empty() {
        return Err(ValidationError::MissingField("email"));
    }
    Ok(())
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(ValidationError::MissingField("email"));
    }
    if password.is_empty() {
        return Err(ValidationError::MissingField("password"));
    }
    Ok(())
}

pub fn validate_broadcast(request: &BroadcastRequest) -> Result<(), ValidationError> {
    if request.subject.trim().is_empty() {
        return Err(ValidationError::MissingField("subject"));
    }
    if request.body.trim().is_empty() {
        return Err(ValidationError::MissingField("body"));
    }
    Ok(())
}
