use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A contact form submission.
///
/// The wire form is exactly `{name, email, message}`; the relay receives the
/// fields as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactForm {
    /// Visitor's name.
    pub name: String,
    /// Visitor's reply address.
    pub email: String,
    /// Free-form message; may span several lines.
    pub message: String,
}

impl ContactForm {
    /// Creates a form from its three fields.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            message: message.into(),
        }
    }

    /// Checks that every field is filled in and the email is plausible.
    ///
    /// Returns the first failing field as a [`Error::Validation`].
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("name", &self.name),
            ("email", &self.email),
            ("message", &self.message),
        ] {
            if value.trim().is_empty() {
                return Err(Error::validation(
                    "must not be empty",
                    Some(field.to_string()),
                ));
            }
        }
        if !is_plausible_email(self.email.trim()) {
            return Err(Error::validation(
                format!("{:?} is not an email address", self.email.trim()),
                Some("email".to_string()),
            ));
        }
        Ok(())
    }
}

fn is_plausible_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !domain.is_empty()
                && !email.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}
