//! Score handshake.

use super::Handshake;
use crate::core::key::KeyPayload;
use crate::core::salt::KeyTime;
use crate::error::Result;

/// A claimed high score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreClaim {
    /// Registered player name.
    pub player_name: String,
    /// Score exactly as the client reported it.
    pub score: String,
    /// Claimed time the score was achieved.
    pub date_time: String,
}

impl ScoreClaim {
    /// Build a claim; names and scores are trimmed.
    pub fn new(player_name: &str, score: &str, date_time: &str) -> Self {
        Self {
            player_name: player_name.trim().to_string(),
            score: score.trim().to_string(),
            date_time: date_time.to_string(),
        }
    }
}

impl Handshake for ScoreClaim {
    const PURPOSE: &'static str = "SCORE_AUTHORISATION_KEY";
    const SUBJECT: &'static str = "score";

    fn payload(&self) -> KeyPayload {
        KeyPayload::new()
            .with("playerName", self.player_name.as_str())
            .with("score", self.score.as_str())
    }

    fn key_time(&self) -> Result<KeyTime> {
        KeyTime::parse(&self.date_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_order() {
        let claim = ScoreClaim::new(" Alice ", "100", "2014-01-18 12:30:46");
        assert_eq!(claim.payload().serialize(), "playerName=Alice&score=100&");
    }
}
