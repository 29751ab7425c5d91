//! Backend Errors
//!
//! Every failure a request can hit, raised where it is detected and carried
//! unmodified to the network boundary. Each kind maps to a stable `PBX###`
//! wire code understood by shipped game clients.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PbxError>;

/// What kind of record an [`PbxError::UnknownEntity`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A registered player name.
    Player,
    /// A game code or game version.
    Game,
    /// An achievement definition.
    Achievement,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Player => write!(f, "player"),
            Self::Game => write!(f, "game"),
            Self::Achievement => write!(f, "achievement"),
        }
    }
}

/// Backend errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PbxError {
    /// Required request fields are missing or unusable.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Supplied token is not a 64-character digest.
    #[error("malformed authorisation key")]
    MalformedToken,

    /// Timestamp is unparseable or outside the acceptance window.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Recomputed key does not match the supplied key.
    #[error("{0} was not authorised")]
    UnauthorizedSubmission(String),

    /// A unique record already exists.
    #[error("already exists: {0}")]
    DuplicateEntity(String),

    /// A referenced record does not exist.
    #[error("unknown {kind}: {name}")]
    UnknownEntity {
        /// Record kind.
        kind: EntityKind,
        /// Identifier that failed to resolve.
        name: String,
    },

    /// A player name failed the length or word filter.
    #[error("unacceptable name: {0}")]
    RejectedName(String),

    /// No handler is registered for the request type.
    #[error("unknown request type: {0}")]
    UnknownRequestType(String),

    /// The datastore or another collaborator failed.
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),
}

impl PbxError {
    /// Shorthand for an unknown player.
    pub fn unknown_player(name: impl Into<String>) -> Self {
        Self::UnknownEntity { kind: EntityKind::Player, name: name.into() }
    }

    /// Shorthand for an unknown game.
    pub fn unknown_game(name: impl Into<String>) -> Self {
        Self::UnknownEntity { kind: EntityKind::Game, name: name.into() }
    }

    /// Wire code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) | Self::UnknownRequestType(_) => "PBX401",
            Self::UpstreamFailure(_) => "PBX502",
            Self::InvalidTimestamp(_) => "PBX601",
            Self::UnauthorizedSubmission(_) => "PBX602",
            Self::MalformedToken => "PBX603",
            Self::DuplicateEntity(_) => "PBX701",
            Self::UnknownEntity { kind: EntityKind::Game, .. } => "PBX801",
            Self::UnknownEntity { .. } => "PBX702",
            Self::RejectedName(_) => "PBX703",
        }
    }

    /// Whether a caller could reasonably retry the same request.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::UpstreamFailure(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_codes() {
        assert_eq!(PbxError::MalformedRequest("x".into()).code(), "PBX401");
        assert_eq!(PbxError::UnknownRequestType("x".into()).code(), "PBX401");
        assert_eq!(PbxError::InvalidTimestamp("x".into()).code(), "PBX601");
        assert_eq!(PbxError::UnauthorizedSubmission("Score".into()).code(), "PBX602");
        assert_eq!(PbxError::MalformedToken.code(), "PBX603");
        assert_eq!(PbxError::DuplicateEntity("bob".into()).code(), "PBX701");
        assert_eq!(PbxError::unknown_player("bob").code(), "PBX702");
        assert_eq!(PbxError::unknown_game("TEST").code(), "PBX801");
        assert_eq!(PbxError::RejectedName("x".into()).code(), "PBX703");
        assert_eq!(PbxError::UpstreamFailure("db".into()).code(), "PBX502");
    }

    #[test]
    fn test_only_upstream_is_transient() {
        assert!(PbxError::UpstreamFailure("db down".into()).is_transient());
        assert!(!PbxError::MalformedToken.is_transient());
        assert!(!PbxError::UnauthorizedSubmission("Score".into()).is_transient());
    }

    #[test]
    fn test_display() {
        let err = PbxError::unknown_player("alice");
        assert_eq!(err.to_string(), "unknown player: alice");
    }
}
