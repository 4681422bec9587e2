//! Session-bound CSRF tokens.
//!
//! A token is the HMAC-SHA256 of the session identifier under a server secret,
//! so it needs no storage and dies with the session. `issue_token` is called
//! when a session is booted (login form, authenticated session); `verify_token`
//! guards every state-changing request.

use thiserror::Error;

use crate::crypto::{hmac_sha256_hex, verify_hmac_sha256_hex};

/// Header carrying the token on AJAX and form submissions.
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Minimum accepted secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CsrfError {
    #[error("CSRF token missing")]
    Missing,

    #[error("CSRF token mismatch")]
    Mismatch,

    #[error("No session to bind the CSRF token to")]
    NoSession,
}

/// Issues the CSRF token for a session.
pub fn issue_token(secret: &str, session_id: &str) -> String {
    hmac_sha256_hex(secret.as_bytes(), session_id.as_bytes())
}

/// Validates a submitted token against the session it must be bound to.
pub fn verify_token(
    secret: &str,
    session_id: Option<&str>,
    submitted: Option<&str>,
) -> Result<(), CsrfError> {
    let session_id = session_id.filter(|s| !s.is_empty()).ok_or(CsrfError::NoSession)?;
    let submitted = submitted
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(CsrfError::Missing)?;

    if verify_hmac_sha256_hex(secret.as_bytes(), session_id.as_bytes(), submitted) {
        Ok(())
    } else {
        Err(CsrfError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_issued_token_validates_for_same_session() {
        let token = issue_token(SECRET, "session-a");
        assert_eq!(verify_token(SECRET, Some("session-a"), Some(&token)), Ok(()));
    }

    #[test]
    fn test_token_is_bound_to_session() {
        let token = issue_token(SECRET, "session-a");
        assert_eq!(
            verify_token(SECRET, Some("session-b"), Some(&token)),
            Err(CsrfError::Mismatch)
        );
    }

    #[test]
    fn test_missing_token() {
        assert_eq!(
            verify_token(SECRET, Some("session-a"), None),
            Err(CsrfError::Missing)
        );
        assert_eq!(
            verify_token(SECRET, Some("session-a"), Some("  ")),
            Err(CsrfError::Missing)
        );
    }

    #[test]
    fn test_missing_session() {
        let token = issue_token(SECRET, "session-a");
        assert_eq!(
            verify_token(SECRET, None, Some(&token)),
            Err(CsrfError::NoSession)
        );
        assert_eq!(
            verify_token(SECRET, Some(""), Some(&token)),
            Err(CsrfError::NoSession)
        );
    }

    #[test]
    fn test_garbage_token_is_mismatch() {
        assert_eq!(
            verify_token(SECRET, Some("session-a"), Some("zz-not-hex")),
            Err(CsrfError::Mismatch)
        );
    }

    #[test]
    fn test_token_changes_with_secret() {
        let a = issue_token(SECRET, "s");
        let b = issue_token("another-secret-another-secret-xx", "s");
        assert_ne!(a, b);
    }
}
