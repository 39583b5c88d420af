//! Input normalization for the auth forms.
//!
//! These functions are pure: they never touch a store, so a rejected form
//! leaves no trace anywhere.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::session::AuthError;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("email pattern is valid")
});

/// Trims surrounding whitespace and lower-cases.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Conventional `local@domain.tld` shape, nothing more.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// A sign-up form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl SignUpInput {
    pub fn normalize(name: &str, email: &str, password: &str) -> Result<Self, AuthError> {
        let name = name.trim();
        let email = normalize_email(email);

        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingSignUpFields);
        }
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidEmail);
        }

        Ok(Self {
            name: name.to_string(),
            email,
            password: password.to_string(),
        })
    }
}

/// A login form that passed validation. The password is taken verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginInput {
    pub fn normalize(email: &str, password: &str) -> Result<Self, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingLoginFields);
        }
        Ok(Self {
            email,
            password: password.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("jane@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
        assert!(!is_valid_email("jane@example"));
        assert!(!is_valid_email("jane.example.com"));
        assert!(!is_valid_email("jane@@example.com"));
        assert!(!is_valid_email("ja ne@example.com"));
        assert!(!is_valid_email("jane@example.c"));
    }

    #[test]
    fn test_sign_up_normalizes() {
        let input = SignUpInput::normalize("  Jane ", "Jane@Example.com ", "secret1").unwrap();
        assert_eq!(input.name, "Jane");
        assert_eq!(input.email, "jane@example.com");
        assert_eq!(input.password, "secret1");
    }

    #[test]
    fn test_sign_up_rejects_blank_fields_before_email_shape() {
        assert_eq!(
            SignUpInput::normalize("   ", "not-an-email", "pw"),
            Err(AuthError::MissingSignUpFields)
        );
        assert_eq!(
            SignUpInput::normalize("Jane", "jane@example.com", ""),
            Err(AuthError::MissingSignUpFields)
        );
        assert_eq!(
            SignUpInput::normalize("Jane", "not-an-email", "pw"),
            Err(AuthError::InvalidEmail)
        );
    }

    #[test]
    fn test_login_keeps_password_verbatim() {
        let input = LoginInput::normalize(" JANE@example.com", " pw ").unwrap();
        assert_eq!(input.email, "jane@example.com");
        assert_eq!(input.password, " pw ");
        assert_eq!(LoginInput::normalize("  ", "pw"), Err(AuthError::MissingLoginFields));
    }
}
