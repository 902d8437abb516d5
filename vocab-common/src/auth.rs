//! Trigger authorization via bearer token
//!
//! Every external trigger (HTTP endpoint, scheduled workflow call) carries
//! `Authorization: Bearer <secret>`. When no secret is configured,
//! authorization is disabled.
//!
//! # Pure Functions
//!
//! No HTTP framework dependencies; the server wraps these in an extractor.

use sha2::{Digest, Sha256};

/// Authorization failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization` header
    MissingHeader,

    /// Header present but not `Bearer <token>`
    MalformedHeader,

    /// Token does not match the configured secret
    InvalidToken,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingHeader => write!(f, "Missing Authorization header"),
            AuthError::MalformedHeader => write!(f, "Authorization header is not a bearer token"),
            AuthError::InvalidToken => write!(f, "Invalid bearer token"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Extract the token from an `Authorization` header value
///
/// ```
/// use vocab_common::auth::parse_bearer;
///
/// assert_eq!(parse_bearer("Bearer abc").unwrap(), "abc");
/// assert!(parse_bearer("Basic abc").is_err());
/// ```
pub fn parse_bearer(header: &str) -> Result<&str, AuthError> {
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MalformedHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedHeader);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }
    Ok(token)
}

/// Check a request's `Authorization` header against the configured secret
///
/// `secret == None` disables the check.
pub fn authorize(header: Option<&str>, secret: Option<&str>) -> Result<(), AuthError> {
    let Some(secret) = secret else {
        return Ok(());
    };
    let header = header.ok_or(AuthError::MissingHeader)?;
    let token = parse_bearer(header)?;

    // Compare digests so the time taken does not depend on a shared prefix
    let provided = Sha256::digest(token.as_bytes());
    let expected = Sha256::digest(secret.as_bytes());
    let diff = provided
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));

    if diff == 0 {
        Ok(())
    } else {
        Err(AuthError::InvalidToken)
    }
}

/// Generate a random secret suitable for `trigger_secret`
pub fn generate_secret() -> String {
    use rand::Rng;

    let bytes: [u8; 32] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_when_no_secret() {
        assert!(authorize(None, None).is_ok());
        assert!(authorize(Some("Bearer anything"), None).is_ok());
    }

    #[test]
    fn test_valid_token_accepted() {
        assert!(authorize(Some("Bearer s3cret"), Some("s3cret")).is_ok());
        assert!(authorize(Some("bearer s3cret"), Some("s3cret")).is_ok());
    }

    #[test]
    fn test_wrong_token_rejected() {
        assert_eq!(
            authorize(Some("Bearer nope"), Some("s3cret")),
            Err(AuthError::InvalidToken)
        );
        assert_eq!(
            authorize(Some("Bearer s3cret2"), Some("s3cret")),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn test_missing_and_malformed_headers() {
        assert_eq!(authorize(None, Some("x")), Err(AuthError::MissingHeader));
        assert_eq!(authorize(Some("s3cret"), Some("x")), Err(AuthError::MalformedHeader));
        assert_eq!(authorize(Some("Bearer   "), Some("x")), Err(AuthError::MalformedHeader));
    }

    #[test]
    fn test_generated_secret_shape() {
        let a = generate_secret();
        let b = generate_secret();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
