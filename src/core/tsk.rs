//! Temporary Storage Key (TSK) proofs
//!
//! A client that unlocked something while offline keeps the claimed time in
//! local storage together with a TSK proof:
//!
//! ```text
//! proof = hex(sha1(base64("TSK_AUTH_KEY:dateTime=<claimed>&:<playerName>")))
//! ```
//!
//! A matching proof lets the handshake trust the claimed time without the
//! window check. This is a weaker trust boundary than an [`AuthKey`]: it is
//! its own type and never stands in for one.
//!
//! [`AuthKey`]: super::key::AuthKey

use base64::Engine as _;
use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

/// Prefix of the TSK preimage.
const TSK_DOMAIN: &str = "TSK_AUTH_KEY";

/// A TSK proof as computed by the trusted client.
#[derive(Clone, PartialEq, Eq)]
pub struct TskProof(String);

impl TskProof {
    /// Compute the expected proof for a claimed time and player.
    pub fn compute(date_time: &str, player_name: &str) -> Self {
        let preimage = format!("{}:dateTime={}&:{}", TSK_DOMAIN, date_time, player_name);
        let encoded = base64::engine::general_purpose::STANDARD.encode(preimage);
        let mut hasher = Sha1::new();
        hasher.update(encoded.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Check a client-supplied proof in constant time.
    pub fn verify(date_time: &str, player_name: &str, supplied: &str) -> bool {
        let expected = Self::compute(date_time, player_name);
        bool::from(expected.0.as_bytes().ct_eq(supplied.as_bytes()))
    }

    /// The hex proof.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for TskProof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TskProof({}..)", self.0.get(..8).unwrap_or(&self.0))
    }
}
