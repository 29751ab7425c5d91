//! Datastore Boundary
//!
//! The relational store behind the backend, reduced to the operations the
//! handlers need. Every uniqueness rule is enforced by the store in a single
//! atomic step (`insert_*` returns `false` instead of duplicating), so no
//! handler ever does a separate read-then-write.

pub mod memory;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::core::game_id::GameId;
use crate::error::Result;

pub use memory::MemoryStore;

/// A submitted high score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    /// Player name.
    pub player_name: String,
    /// Score value.
    pub score: i64,
    /// Optional level label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Claimed time of the score.
    pub date_time: NaiveDateTime,
    /// Game build the score was set in.
    pub game: GameId,
    /// ISO country code of the submitting address, when resolvable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

/// A recorded achievement unlock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockRecord {
    /// Player name.
    pub player_name: String,
    /// Achievement id within the game.
    pub achievement_id: u32,
    /// Game build the unlock happened in.
    pub game: GameId,
    /// Claimed unlock time.
    pub date_time: NaiveDateTime,
}

/// A recorded game download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    /// Downloaded build.
    pub game: GameId,
    /// Upper-cased platform label.
    pub platform: String,
    /// Server time the download was recorded.
    pub date_time: NaiveDateTime,
}

/// An achievement definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDef {
    /// Game code the achievement belongs to.
    pub game_code: String,
    /// Id within the game.
    pub id: u32,
    /// Display title.
    pub title: String,
    /// Description.
    pub description: String,
}

/// Persistent storage used by the request handlers.
///
/// Failures of the underlying store surface as
/// [`PbxError::UpstreamFailure`](crate::error::PbxError::UpstreamFailure).
pub trait Datastore: Send + Sync {
    /// Whether a player name is registered.
    fn player_exists(&self, name: &str) -> Result<bool>;

    /// Register a name. `false` if it was already taken.
    fn insert_player(&self, name: &str) -> Result<bool>;

    /// Rename a player atomically.
    ///
    /// Fails with `UnknownEntity` if `old` is missing and `DuplicateEntity`
    /// if `new` is taken.
    fn rename_player(&self, old: &str, new: &str) -> Result<()>;

    /// Insert a score; the player must exist.
    fn insert_score(&self, record: ScoreRecord) -> Result<()>;

    /// All scores, in insertion order.
    fn scores(&self) -> Result<Vec<ScoreRecord>>;

    /// Whether `(achievement, game code, player)` is already unlocked.
    fn unlock_exists(&self, achievement_id: u32, game_code: &str, player_name: &str) -> Result<bool>;

    /// Record an unlock unless the same triple exists. The player must exist.
    fn insert_unlock(&self, record: UnlockRecord) -> Result<bool>;

    /// Unlocks of one player in one game.
    fn unlocks_for(&self, game_code: &str, player_name: &str) -> Result<Vec<UnlockRecord>>;

    /// Record a download.
    fn insert_download(&self, record: DownloadRecord) -> Result<()>;

    /// Number of recorded downloads of a build.
    fn download_count(&self, game: &GameId) -> Result<u64>;

    /// All downloads, in insertion order.
    fn downloads(&self) -> Result<Vec<DownloadRecord>>;

    /// Every known game build.
    fn game_versions(&self) -> Result<Vec<GameId>>;

    /// Record a game build. `false` if already known.
    fn insert_game_version(&self, game: &GameId) -> Result<bool>;

    /// Display title of a game code.
    fn game_title(&self, code: &str) -> Result<Option<String>>;

    /// Set the display title of a game code.
    fn upsert_game_title(&self, code: &str, title: &str) -> Result<()>;

    /// Every achievement definition.
    fn achievements(&self) -> Result<Vec<AchievementDef>>;

    /// Insert or replace an achievement definition.
    fn upsert_achievement(&self, def: AchievementDef) -> Result<()>;
}
