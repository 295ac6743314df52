//! Client-side form checks run before any request is issued.

#[cfg(test)]
#[path = "validation_test.rs"]
mod validation_test;

use crate::net::types::{LoginRequest, SignupRequest};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("email is required")]
    MissingEmail,
    #[error("password is required")]
    MissingPassword,
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("password must be at least 6 characters")]
    PasswordTooShort,
}

/// Raw signup form input, including the confirmation field the server never
/// sees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub name: String,
    pub phone_number: String,
    pub management_code: String,
}

impl SignupForm {
    /// Check the form and build the wire request. Blank optional fields are
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns the first failed check, in form order.
    pub fn validate(&self) -> Result<SignupRequest, ValidationError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(ValidationError::MissingEmail);
        }
        check_new_password(&self.password, &self.password_confirm)?;
        Ok(SignupRequest {
            email: email.to_owned(),
            password: self.password.clone(),
            name: non_blank(&self.name),
            phone_number: non_blank(&self.phone_number),
            management_code: non_blank(&self.management_code),
        })
    }
}

/// Check login input and build the wire request.
///
/// # Errors
///
/// Returns an error if either field is empty.
pub fn validate_login(email: &str, password: &str) -> Result<LoginRequest, ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::MissingEmail);
    }
    if password.is_empty() {
        return Err(ValidationError::MissingPassword);
    }
    Ok(LoginRequest::new(email, password))
}

/// Profile edit input. Password fields are optional: both empty means the
/// password is unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileEditForm {
    pub name: String,
    pub phone_number: String,
    pub management_code: String,
    pub password: String,
    pub password_confirm: String,
}

impl ProfileEditForm {
    /// Returns the new password when one was entered.
    ///
    /// # Errors
    ///
    /// Returns an error if a password was entered and fails the checks.
    pub fn validate(&self) -> Result<Option<String>, ValidationError> {
        if self.password.is_empty() && self.password_confirm.is_empty() {
            return Ok(None);
        }
        check_new_password(&self.password, &self.password_confirm)?;
        Ok(Some(self.password.clone()))
    }
}

fn check_new_password(password: &str, confirm: &str) -> Result<(), ValidationError> {
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_owned()) }
}
