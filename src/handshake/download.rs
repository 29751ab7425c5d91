//! Download-record handshake.
//!
//! Download keys never expire; they only stop clients from spamming the
//! download counter with arbitrary game ids.

use super::Handshake;
use crate::core::key::KeyPayload;
use crate::core::salt::KeyTime;
use crate::error::Result;

/// A claimed download of one game build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadClaim {
    /// Full game id with version, as sent.
    pub game_id: String,
}

impl DownloadClaim {
    /// Build a claim.
    pub fn new(game_id: &str) -> Self {
        Self { game_id: game_id.to_string() }
    }
}

impl Handshake for DownloadClaim {
    const PURPOSE: &'static str = "GAME_DOWNLOAD_RECORD";
    const SUBJECT: &'static str = "download";

    fn payload(&self) -> KeyPayload {
        KeyPayload::new().with("gameID", self.game_id.as_str())
    }

    fn key_time(&self) -> Result<KeyTime> {
        Ok(KeyTime::Override)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::key::{issue_fixed, KeyIssuer};
    use crate::handshake::expected_key;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_download_key_never_expires() {
        let claim = DownloadClaim::new("TEST-1.0.0.0");
        let issuer = KeyIssuer::default();
        let far_future = Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap();
        let key = expected_key(&claim, &issuer, far_future).unwrap();
        assert_eq!(key, issue_fixed("GAME_DOWNLOAD_RECORD", &claim.payload()));
    }
}
