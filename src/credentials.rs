//! Mailbox login credentials

use crate::error::{Error, Result};
use std::fmt;

/// Username (the full email address) and password for a mailbox.
///
/// The password is never exposed through `Debug` and has no public
/// accessor outside the crate.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    /// The part of the username after the last `@`, lowercased.
    #[must_use]
    pub fn domain(&self) -> Option<String> {
        self.username
            .rsplit_once('@')
            .map(|(_, domain)| domain.trim().to_ascii_lowercase())
            .filter(|domain| !domain.is_empty())
    }

    /// Reject empty usernames and passwords.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCredentials`] if either field is empty.
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::InvalidCredentials("username is empty".into()));
        }
        if self.password.is_empty() {
            return Err(Error::InvalidCredentials("password is empty".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
