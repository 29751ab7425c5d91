//! Game Identity
//!
//! Games are identified by a four-letter code plus a four-part version:
//! `TEST-1.0.2.0` is code `TEST`, major 1, minor 0, patch 2, dev 0.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PbxError;

/// Length of a game code.
pub const GAME_CODE_LEN: usize = 4;

/// Version suffix meaning "any version".
pub const WILDCARD_VERSION: &str = "*.*.*.*";

/// Four-part game version (major, minor, patch, dev).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameVersion(pub [u32; 4]);

impl GameVersion {
    /// Major version.
    pub fn major(&self) -> u32 {
        self.0[0]
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [major, minor, patch, dev] = self.0;
        write!(f, "{}.{}.{}.{}", major, minor, patch, dev)
    }
}

impl FromStr for GameVersion {
    type Err = PbxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || PbxError::MalformedRequest(format!("invalid game version '{}'", s));
        let mut parts = [0u32; 4];
        let mut fields = s.split('.');
        for slot in parts.iter_mut() {
            *slot = fields.next().and_then(|f| f.parse().ok()).ok_or_else(bad)?;
        }
        if fields.next().is_some() {
            return Err(bad());
        }
        Ok(Self(parts))
    }
}

/// Check a four-letter uppercase game code.
pub fn validate_code(code: &str) -> Result<(), PbxError> {
    if code.len() == GAME_CODE_LEN && code.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(PbxError::MalformedRequest(format!("invalid game code '{}'", code)))
    }
}

/// The game code prefix of a raw game identifier.
pub fn code_prefix(raw: &str) -> &str {
    raw.get(..GAME_CODE_LEN).unwrap_or(raw)
}

/// A specific released build of a game.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameId {
    /// Four-letter game code.
    pub code: String,
    /// Build version.
    pub version: GameVersion,
}

impl GameId {
    /// Create a game id from parts.
    pub fn new(code: impl Into<String>, version: [u32; 4]) -> Self {
        Self { code: code.into(), version: GameVersion(version) }
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.code, self.version)
    }
}

impl FromStr for GameId {
    type Err = PbxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (code, version) = s
            .split_once('-')
            .ok_or_else(|| PbxError::MalformedRequest(format!("invalid game id '{}'", s)))?;
        validate_code(code)?;
        Ok(Self { code: code.to_string(), version: version.parse()? })
    }
}

/// A game lookup: one exact build, or every build of a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameQuery {
    /// `CODE-M.m.p.d`
    Exact(GameId),
    /// `CODE-*.*.*.*`
    AnyVersion(String),
}

impl GameQuery {
    /// Game code of the query.
    pub fn code(&self) -> &str {
        match self {
            Self::Exact(id) => &id.code,
            Self::AnyVersion(code) => code,
        }
    }

    /// Whether `id` satisfies this query.
    pub fn matches(&self, id: &GameId) -> bool {
        match self {
            Self::Exact(exact) => exact == id,
            Self::AnyVersion(code) => &id.code == code,
        }
    }
}

impl FromStr for GameQuery {
    type Err = PbxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('-') {
            Some((code, WILDCARD_VERSION)) => {
                validate_code(code)?;
                Ok(Self::AnyVersion(code.to_string()))
            }
            _ => s.parse().map(Self::Exact),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let id: GameId = "TEST-1.0.2.0".parse().unwrap();
        assert_eq!(id.code, "TEST");
        assert_eq!(id.version, GameVersion([1, 0, 2, 0]));
        assert_eq!(id.to_string(), "TEST-1.0.2.0");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for raw in ["TEST", "TES-1.0.0.0", "test-1.0.0.0", "TEST-1.0.0", "TEST-1.0.0.0.0", "TEST-a.b.c.d"] {
            assert!(matches!(raw.parse::<GameId>(), Err(PbxError::MalformedRequest(_))), "{}", raw);
        }
    }

    #[test]
    fn test_version_ordering() {
        let v = |s: &str| s.parse::<GameVersion>().unwrap();
        assert!(v("1.0.0.0") > v("0.9.9.9"));
        assert!(v("1.2.0.0") > v("1.1.99.0"));
        assert!(v("1.0.0.10") > v("1.0.0.9"));
    }

    #[test]
    fn test_wildcard_query() {
        let query: GameQuery = "TEST-*.*.*.*".parse().unwrap();
        assert_eq!(query, GameQuery::AnyVersion("TEST".into()));
        assert!(query.matches(&GameId::new("TEST", [3, 1, 0, 0])));
        assert!(!query.matches(&GameId::new("OTHR", [3, 1, 0, 0])));

        let exact: GameQuery = "TEST-1.0.0.0".parse().unwrap();
        assert!(exact.matches(&GameId::new("TEST", [1, 0, 0, 0])));
        assert!(!exact.matches(&GameId::new("TEST", [1, 0, 0, 1])));
    }

    #[test]
    fn test_code_prefix() {
        assert_eq!(code_prefix("TEST-1.0.0.0"), "TEST");
        assert_eq!(code_prefix("AB"), "AB");
    }
}
