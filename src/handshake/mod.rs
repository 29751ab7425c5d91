//! Two-Phase Authorisation Handshake
//!
//! Every mutating request type follows the same pattern without any
//! server-side session:
//!
//! ```text
//! ┌────────┐  authorize(claim)            ┌────────┐
//! │ client │ ───────────────────────────▶ │ server │  issue key K
//! │        │ ◀─────────────────────────── │        │
//! │        │  submit(claim, K)            │        │  recompute K', K == K'?
//! │        │ ───────────────────────────▶ │        │  then write
//! └────────┘                              └────────┘
//! ```
//!
//! Submit always recomputes the key from the submitted claim; nothing from
//! an earlier authorize call is remembered or trusted.

pub mod achievement;
pub mod download;
pub mod score;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::core::key::{AuthKey, KeyIssuer, KeyPayload};
use crate::core::salt::KeyTime;
use crate::error::{PbxError, Result};

pub use achievement::AchievementClaim;
pub use download::DownloadClaim;
pub use score::ScoreClaim;

/// A claim that can be authorised with a key.
pub trait Handshake {
    /// Purpose tag namespacing the key.
    const PURPOSE: &'static str;

    /// Human name of what is authorised, for error messages.
    const SUBJECT: &'static str;

    /// Canonical ordered payload.
    fn payload(&self) -> KeyPayload;

    /// Time the key is bound to.
    fn key_time(&self) -> Result<KeyTime>;
}

/// Result of the authorize phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// No key was supplied: here is a fresh one.
    Issued(AuthKey),
    /// A key was supplied: whether it is genuine.
    Verified(bool),
}

/// Recompute the key a claim should carry.
pub fn expected_key<H: Handshake>(claim: &H, issuer: &KeyIssuer, now: DateTime<Utc>) -> Result<AuthKey> {
    issuer.issue(H::PURPOSE, &claim.payload(), claim.key_time()?, now)
}

/// Authorize phase: issue a key, or check an attached one.
pub fn authorize<H: Handshake>(
    claim: &H,
    existing: Option<&str>,
    issuer: &KeyIssuer,
    now: DateTime<Utc>,
) -> Result<Authorization> {
    match existing {
        None => expected_key(claim, issuer, now).map(Authorization::Issued),
        Some(raw) => {
            let supplied = AuthKey::from_digest(raw)?;
            let expected = expected_key(claim, issuer, now)?;
            let genuine = expected.matches(&supplied);
            if !genuine {
                warn!(subject = H::SUBJECT, key = supplied.fingerprint(), "authorisation key did not match");
            }
            Ok(Authorization::Verified(genuine))
        }
    }
}

/// Submit phase gate: the supplied key must match the recomputed one.
pub fn verify<H: Handshake>(claim: &H, supplied: &str, issuer: &KeyIssuer, now: DateTime<Utc>) -> Result<()> {
    match authorize(claim, Some(supplied), issuer, now)? {
        Authorization::Verified(true) => Ok(()),
        _ => Err(PbxError::UnauthorizedSubmission(H::SUBJECT.to_string())),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2014, 1, 18, 12, 0, 0).unwrap()
    }

    fn claim(score: &str) -> ScoreClaim {
        ScoreClaim::new("Alice", score, "2014-01-18 12:30:46")
    }

    fn issued(claim: &ScoreClaim) -> AuthKey {
        match authorize(claim, None, &KeyIssuer::default(), now()).unwrap() {
            Authorization::Issued(key) => key,
            other => panic!("expected issued key, got {:?}", other),
        }
    }

    #[test]
    fn test_round_trip() {
        let issuer = KeyIssuer::default();
        let key = issued(&claim("100"));

        let again = authorize(&claim("100"), Some(key.as_str()), &issuer, now()).unwrap();
        assert_eq!(again, Authorization::Verified(true));
        assert!(verify(&claim("100"), key.as_str(), &issuer, now()).is_ok());
    }

    #[test]
    fn test_mutated_key() {
        let issuer = KeyIssuer::default();
        let key = issued(&claim("100"));
        let mut tampered = key.as_str().to_string();
        let first = if tampered.starts_with('f') { "e" } else { "f" };
        tampered.replace_range(0..1, first);

        let result = authorize(&claim("100"), Some(&tampered), &issuer, now()).unwrap();
        assert_eq!(result, Authorization::Verified(false));
        assert!(matches!(
            verify(&claim("100"), &tampered, &issuer, now()),
            Err(PbxError::UnauthorizedSubmission(_))
        ));
    }

    #[test]
    fn test_tampered_claim() {
        let issuer = KeyIssuer::default();
        let key = issued(&claim("100"));
        assert!(matches!(
            verify(&claim("9999"), key.as_str(), &issuer, now()),
            Err(PbxError::UnauthorizedSubmission(_))
        ));
    }

    #[test]
    fn test_malformed_key_rejected_first() {
        let issuer = KeyIssuer::default();
        // The claim's timestamp is invalid too; the key length is checked first.
        let stale = ScoreClaim::new("Alice", "100", "2001-01-01 00:00:00");
        assert_eq!(authorize(&stale, Some("deadbeef"), &issuer, now()), Err(PbxError::MalformedToken));
        assert_eq!(verify(&stale, "deadbeef", &issuer, now()), Err(PbxError::MalformedToken));
    }

    #[test]
    fn test_non_hex_key_is_malformed() {
        let issuer = KeyIssuer::default();
        let wide = "\u{e9}".repeat(32);
        let upper = issued(&claim("100")).as_str().to_uppercase();
        let letters = "g".repeat(64);
        for raw in [wide.as_str(), upper.as_str(), letters.as_str()] {
            assert_eq!(authorize(&claim("100"), Some(raw), &issuer, now()), Err(PbxError::MalformedToken));
            assert_eq!(verify(&claim("100"), raw, &issuer, now()), Err(PbxError::MalformedToken));
        }
    }

    #[test]
    fn test_stale_timestamp() {
        let issuer = KeyIssuer::default();
        let stale = ScoreClaim::new("Alice", "100", "2001-01-01 00:00:00");
        assert!(matches!(authorize(&stale, None, &issuer, now()), Err(PbxError::InvalidTimestamp(_))));
    }
}
