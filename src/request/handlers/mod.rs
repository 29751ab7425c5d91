//! Request handlers, one per request-type id.

pub mod achievement;
pub mod download;
pub mod game;
pub mod leaderboard;
pub mod name;
pub mod score;

pub use achievement::{AuthAchiv, GetAchievements, UnlockAchiv};
pub use download::{AuthDownload, RecordGameDownload};
pub use game::AuthGame;
pub use leaderboard::GetLeaderboards;
pub use name::{AuthName, NameFilter, WordListFilter};
pub use score::{AuthScore, CountryResolver, NoCountry, PushScore};
