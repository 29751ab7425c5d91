//! Authorisation Keys
//!
//! Deterministic SHA-256 keys that prove the server approved a payload.
//!
//! ```text
//! preimage = PURPOSE ":" k1=v1& k2=v2& ... ":" salt
//! key      = hex(sha256(preimage))
//! ```
//!
//! The trailing `&` after the last pair is part of the canonical form.
//! Field order is the insertion order of [`KeyPayload`] and is part of the
//! contract: reordering fields yields a different key.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::salt::{derive_salt, KeyTime, TimeWindow};
use crate::error::{PbxError, Result};

/// Length of a hex-encoded SHA-256 digest.
pub const KEY_LEN: usize = 64;

/// Purpose tag for derived passwords.
pub const PASSWORD_PURPOSE: &str = "PBXDB";

/// Number of digest characters kept for a derived password.
pub const PASSWORD_LEN: usize = 25;

/// Ordered field-name/value pairs hashed into a key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPayload {
    fields: Vec<(String, String)>,
}

impl KeyPayload {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Canonical `k=v&` serialization.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.fields {
            out.push_str(name);
            out.push('=');
            out.push_str(value);
            out.push('&');
        }
        out
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the payload has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Incremental hasher producing key digests.
///
/// Order of updates is critical for determinism.
struct KeyHasher {
    hasher: Sha256,
}

impl KeyHasher {
    fn new(purpose: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(purpose.to_uppercase().as_bytes());
        Self { hasher }
    }

    #[inline]
    fn update_str(&mut self, s: &str) {
        self.hasher.update(s.as_bytes());
    }

    fn finalize_hex(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

/// Compute the hex digest for a purpose, payload and salt.
pub fn compute_digest(purpose: &str, payload: &KeyPayload, salt: i64) -> String {
    let mut hasher = KeyHasher::new(purpose);
    hasher.update_str(":");
    hasher.update_str(&payload.serialize());
    hasher.update_str(":");
    hasher.update_str(&salt.to_string());
    hasher.finalize_hex()
}

/// A 64-character hex authorisation key.
///
/// Never persisted: built, compared or handed back, then dropped.
#[derive(Clone)]
pub struct AuthKey {
    digest: String,
}

impl AuthKey {
    /// Wrap a client-supplied key.
    ///
    /// Rejects anything that is not exactly 64 lowercase hex characters
    /// before any comparison happens.
    pub fn from_digest(raw: &str) -> Result<Self> {
        if raw.len() != KEY_LEN || !raw.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(PbxError::MalformedToken);
        }
        Ok(Self { digest: raw.to_string() })
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.digest
    }

    /// Consume into the hex digest.
    pub fn into_string(self) -> String {
        self.digest
    }

    /// Constant-time comparison of two keys.
    pub fn matches(&self, other: &AuthKey) -> bool {
        bool::from(self.digest.as_bytes().ct_eq(other.digest.as_bytes()))
    }

    /// Short prefix safe to put in logs.
    pub fn fingerprint(&self) -> &str {
        // Always ASCII hex, so byte 8 is a char boundary.
        &self.digest[..8]
    }
}

impl PartialEq for AuthKey {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl Eq for AuthKey {}

impl std::fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthKey({}..)", self.fingerprint())
    }
}

/// Issues keys, enforcing the timestamp window.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyIssuer {
    window: TimeWindow,
}

impl KeyIssuer {
    /// Create an issuer with a custom window.
    pub fn new(window: TimeWindow) -> Self {
        Self { window }
    }

    /// The acceptance window in use.
    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    /// Issue a key for `payload` under `purpose` at `time`.
    pub fn issue(
        &self,
        purpose: &str,
        payload: &KeyPayload,
        time: KeyTime,
        now: DateTime<Utc>,
    ) -> Result<AuthKey> {
        self.window.admit(&time, now)?;
        let salt = derive_salt(time.parts());
        Ok(AuthKey { digest: compute_digest(purpose, payload, salt) })
    }
}

/// Issue a never-expiring key; no window applies.
pub fn issue_fixed(purpose: &str, payload: &KeyPayload) -> AuthKey {
    let salt = derive_salt(KeyTime::Override.parts());
    AuthKey { digest: compute_digest(purpose, payload, salt) }
}

/// Derive a stored credential from a secret.
pub fn derive_password(secret: &str) -> String {
    let payload = KeyPayload::new().with("pwd", secret);
    let mut key = issue_fixed(PASSWORD_PURPOSE, &payload).into_string();
    key.truncate(PASSWORD_LEN);
    key
}

// =============================================================================
// TESTS
// =============================================================================
