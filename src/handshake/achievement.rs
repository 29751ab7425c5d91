//! Achievement handshake.
//!
//! Unlocks may be collected offline and submitted later. Such clients attach
//! a [`TskProof`] over the claimed time; a valid proof pins the key to the
//! sentinel time so the stale timestamp is not window-checked.

use super::Handshake;
use crate::core::game_id::code_prefix;
use crate::core::key::KeyPayload;
use crate::core::salt::KeyTime;
use crate::core::tsk::TskProof;
use crate::error::Result;

/// A claimed achievement unlock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementClaim {
    /// Registered player name (trimmed).
    pub player_name: String,
    /// Achievement id within the game, as sent.
    pub achievement_id: String,
    /// Full game id with version, as sent.
    pub game_id: String,
    /// Claimed unlock time.
    pub date_time: String,
    /// Whether a valid TSK proof accompanied the claim.
    offline_proven: bool,
}

impl AchievementClaim {
    /// Build a claim, checking the optional TSK proof.
    ///
    /// The proof covers the player name exactly as the client sent it.
    pub fn new(
        player_name: &str,
        achievement_id: &str,
        game_id: &str,
        date_time: &str,
        tsk_proof: Option<&str>,
    ) -> Self {
        let offline_proven = tsk_proof
            .map(|proof| TskProof::verify(date_time, player_name, proof))
            .unwrap_or(false);

        Self {
            player_name: player_name.trim().to_string(),
            achievement_id: achievement_id.trim().to_string(),
            game_id: game_id.to_string(),
            date_time: date_time.to_string(),
            offline_proven,
        }
    }

    /// Whether the claimed time is trusted via a TSK proof.
    pub fn is_offline_proven(&self) -> bool {
        self.offline_proven
    }

    /// Game code part of the game id.
    pub fn game_code(&self) -> &str {
        code_prefix(&self.game_id)
    }
}

impl Handshake for AchievementClaim {
    const PURPOSE: &'static str = "ACHIEVEMENT_AUTHORISATION_KEY";
    const SUBJECT: &'static str = "achievement";

    fn payload(&self) -> KeyPayload {
        KeyPayload::new()
            .with("playerName", self.player_name.as_str())
            .with("achivID", self.achievement_id.as_str())
            .with("gameID", self.game_id.as_str())
    }

    fn key_time(&self) -> Result<KeyTime> {
        if self.offline_proven {
            Ok(KeyTime::Override)
        } else {
            KeyTime::parse(&self.date_time)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::key::KeyIssuer;
    use crate::error::PbxError;
    use crate::handshake::{authorize, verify, Authorization};
    use chrono::{TimeZone, Utc};

    const STALE: &str = "2013-06-01 10:00:00";

    #[test]
    fn test_payload_order() {
        let claim = AchievementClaim::new("Alice", "3", "TEST-1.0.0.0", STALE, None);
        assert_eq!(claim.payload().serialize(), "playerName=Alice&achivID=3&gameID=TEST-1.0.0.0&");
        assert_eq!(claim.game_code(), "TEST");
    }

    #[test]
    fn test_tsk_proof_bypasses_window() {
        let issuer = KeyIssuer::default();
        let now = Utc.with_ymd_and_hms(2014, 1, 18, 12, 0, 0).unwrap();

        let plain = AchievementClaim::new("Alice", "3", "TEST-1.0.0.0", STALE, None);
        assert!(matches!(authorize(&plain, None, &issuer, now), Err(PbxError::InvalidTimestamp(_))));

        let proof = TskProof::compute(STALE, "Alice");
        let offline = AchievementClaim::new("Alice", "3", "TEST-1.0.0.0", STALE, Some(proof.as_str()));
        assert!(offline.is_offline_proven());

        let key = match authorize(&offline, None, &issuer, now).unwrap() {
            Authorization::Issued(key) => key,
            other => panic!("expected issued key, got {:?}", other),
        };
        assert!(verify(&offline, key.as_str(), &issuer, now).is_ok());
    }

    #[test]
    fn test_wrong_tsk_proof_is_ignored() {
        let claim = AchievementClaim::new("Alice", "3", "TEST-1.0.0.0", STALE, Some("not-a-proof"));
        assert!(!claim.is_offline_proven());
        assert!(matches!(claim.key_time(), Ok(KeyTime::At(_))));
    }
}
