//! Email address type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The input is empty after trimming.
    #[error("el email no puede estar vacío")]
    Empty,
    /// The input is longer than the RFC 5321 limit.
    #[error("el email debe tener como máximo {max} caracteres")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input does not have exactly one `@`.
    #[error("el email debe contener un solo símbolo @")]
    InvalidAtSymbol,
    /// The local part or the domain is empty.
    #[error("el email debe tener usuario y dominio")]
    MissingPart,
    /// The domain has no dot.
    #[error("el dominio del email no es válido")]
    InvalidDomain,
}

/// A normalized email address.
///
/// Parsing trims surrounding whitespace and lowercases the address, so two
/// registrations that differ only in case collide on the unique index.
///
/// ```
/// use dengo_core::Email;
///
/// let email = Email::parse("  Ana@Dengo.MX ").unwrap();
/// assert_eq!(email.as_str(), "ana@dengo.mx");
///
/// assert!(Email::parse("").is_err());
/// assert!(Email::parse("sin-arroba").is_err());
/// assert!(Email::parse("a@b@c.mx").is_err());
/// assert!(Email::parse("ana@localhost").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse and normalize an email address.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] describing the first structural problem found.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let normalized = s.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(EmailError::Empty);
        }
        if normalized.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let mut parts = normalized.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(EmailError::InvalidAtSymbol);
        };

        if local.is_empty() || domain.is_empty() {
            return Err(EmailError::MissingPart);
        }
        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(EmailError::InvalidDomain);
        }

        Ok(Self(normalized))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the domain part (after the `@`).
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(_, domain)| domain)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        let email = Email::parse(" Cliente@Ejemplo.Com ").unwrap();
        assert_eq!(email.as_str(), "cliente@ejemplo.com");
        assert_eq!(email.domain(), "ejemplo.com");
    }

    #[test]
    fn test_parse_rejects_structure_errors() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(Email::parse("nadie"), Err(EmailError::InvalidAtSymbol));
        assert_eq!(Email::parse("a@@b.mx"), Err(EmailError::InvalidAtSymbol));
        assert_eq!(Email::parse("@b.mx"), Err(EmailError::MissingPart));
        assert_eq!(Email::parse("a@"), Err(EmailError::MissingPart));
        assert_eq!(Email::parse("a@mx"), Err(EmailError::InvalidDomain));
        assert_eq!(Email::parse("a@.mx"), Err(EmailError::InvalidDomain));
    }

    #[test]
    fn test_parse_rejects_too_long() {
        let long = format!("{}@dengo.mx", "a".repeat(250));
        assert_eq!(
            Email::parse(&long),
            Err(EmailError::TooLong {
                max: Email::MAX_LENGTH
            })
        );
    }

    #[test]
    fn test_serde_goes_through_validation() {
        let ok: Email = serde_json::from_str("\"Pepe@Dengo.mx\"").unwrap();
        assert_eq!(ok.as_str(), "pepe@dengo.mx");
        assert!(serde_json::from_str::<Email>("\"pepe\"").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"pepe@dengo.mx\"");
    }
}
