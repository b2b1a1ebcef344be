//! API credential validation.
//!
//! Keys are pasted by hand, so two mistakes are common: invisible non-ASCII
//! characters copied along with the key, and a leading `Bearer ` copied from
//! an HTTP header.  [`Credential::parse`] rejects both before any gateway is
//! built, so a bad key never reaches the network.

use std::fmt;

use thiserror::Error;

/// Reasons a pasted credential is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// Nothing left after trimming whitespace.
    #[error("no API key provided")]
    Missing,

    /// The key contains characters outside ASCII (often hidden ones).
    #[error("API key contains non-ASCII characters; copy only the `sk-...` key itself")]
    NonAscii,

    /// The key starts with an authorization scheme such as `Bearer `.
    #[error("API key includes an authorization scheme prefix; paste only the `sk-...` key")]
    SchemePrefix,
}

/// A validated API key.
///
/// `Debug` is redacted so the key never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Trim and validate `raw`.
    ///
    /// ```
    /// use voice_assistant::credential::{Credential, CredentialError};
    ///
    /// assert!(Credential::parse("  sk-abc123  ").is_ok());
    /// assert_eq!(Credential::parse("Bearer sk-abc"), Err(CredentialError::SchemePrefix));
    /// ```
    pub fn parse(raw: &str) -> Result<Self, CredentialError> {
        let key = raw.trim();

        if key.is_empty() {
            return Err(CredentialError::Missing);
        }
        if !key.is_ascii() {
            return Err(CredentialError::NonAscii);
        }
        if key.to_ascii_lowercase().starts_with("bearer ") {
            return Err(CredentialError::SchemePrefix);
        }

        Ok(Self(key.to_string()))
    }

    /// The raw key, for building an `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_key_and_trims() {
        let cred = Credential::parse("\t sk-test-1234 \n").unwrap();
        assert_eq!(cred.expose(), "sk-test-1234");
    }

    #[test]
    fn rejects_empty_and_whitespace() {
        assert_eq!(Credential::parse(""), Err(CredentialError::Missing));
        assert_eq!(Credential::parse("   "), Err(CredentialError::Missing));
    }

    #[test]
    fn rejects_non_ascii() {
        assert_eq!(
            Credential::parse("sk-테스트"),
            Err(CredentialError::NonAscii)
        );
        // zero-width space hidden inside the key
        assert_eq!(
            Credential::parse("sk-ab\u{200b}cd"),
            Err(CredentialError::NonAscii)
        );
    }

    #[test]
    fn rejects_bearer_prefix_case_insensitively() {
        assert_eq!(
            Credential::parse("Bearer sk-abc"),
            Err(CredentialError::SchemePrefix)
        );
        assert_eq!(
            Credential::parse("BEARER sk-abc"),
            Err(CredentialError::SchemePrefix)
        );
    }

    #[test]
    fn bearer_without_space_is_just_a_key() {
        assert!(Credential::parse("bearerish-key").is_ok());
    }

    #[test]
    fn debug_is_redacted() {
        let cred = Credential::parse("sk-secret").unwrap();
        let rendered = format!("{cred:?}");
        assert!(!rendered.contains("sk-secret"));
    }
}
