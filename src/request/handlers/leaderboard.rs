//! Leaderboard handler: `getLeaderboards`.
//!
//! Scopes without `playerName`: `ranked` (default), `bestAllTime`,
//! `bestToday`, `bestWeek`, `summaryPlayers`, `gamesThatExist`, `topN`.
//! Scopes with `playerName`: `ranked` (default), `lastEntry`, `bestScore`.
//! An unrecognised scope falls back to `ranked`.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::catalog::Catalog;
use crate::core::game_id::code_prefix;
use crate::error::{PbxError, Result};
use crate::request::{optional, parse_field, require, require_json, HandlerContext, Outcome, Params, RequestHandler};
use crate::store::ScoreRecord;

/// Leaderboard selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every score, ranked.
    Ranked,
    /// Best score per player and game.
    BestAllTime,
    /// Best per player and game, set today (UTC).
    BestToday,
    /// Best per player and game, set in the last seven days.
    BestWeek,
    /// One summary row per player.
    SummaryPlayers,
    /// Games that have scores.
    GamesThatExist,
    /// The top `n` ranked scores.
    Top(usize),
    /// A player's most recent score.
    LastEntry,
    /// A player's best score per game.
    BestScore,
}

impl Scope {
    /// Parse a scope; player-only scopes apply only when a player is given.
    pub fn parse(raw: Option<&str>, for_player: bool) -> Self {
        let raw = raw.unwrap_or_default();
        if for_player {
            return match raw {
                "lastEntry" => Self::LastEntry,
                "bestScore" => Self::BestScore,
                _ => Self::Ranked,
            };
        }
        match raw {
            "bestAllTime" => Self::BestAllTime,
            "bestToday" => Self::BestToday,
            "bestWeek" => Self::BestWeek,
            "summaryPlayers" => Self::SummaryPlayers,
            "gamesThatExist" => Self::GamesThatExist,
            other => other
                .strip_prefix("top")
                .and_then(|n| n.parse().ok())
                .filter(|n| *n > 0)
                .map(Self::Top)
                .unwrap_or(Self::Ranked),
        }
    }
}

/// One ranked leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// Rank; equal scores share a rank.
    pub rank: usize,
    /// Player name.
    pub player_name: String,
    /// Score value.
    pub score: i64,
    /// Level label, if submitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// When the score was set.
    pub date_time: NaiveDateTime,
    /// Full game id of the build.
    #[serde(rename = "gameID")]
    pub game_id: String,
    /// Game title, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_name: Option<String>,
    /// Country of the submitting address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

/// Per-player summary row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    /// Player name.
    pub player_name: String,
    /// Number of scores submitted.
    pub scores_submitted: usize,
    /// Best score.
    pub best_score: i64,
    /// Most recent score time.
    pub last_played: NaiveDateTime,
}

/// A game that has scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    /// Game code.
    #[serde(rename = "gameID")]
    pub game_id: String,
    /// Game title, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_name: Option<String>,
}

fn rank(mut scores: Vec<ScoreRecord>, catalog: &Catalog) -> Vec<LeaderboardEntry> {
    scores.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(a.date_time.cmp(&b.date_time))
            .then(a.player_name.cmp(&b.player_name))
    });

    let mut entries: Vec<LeaderboardEntry> = Vec::with_capacity(scores.len());
    for (i, s) in scores.into_iter().enumerate() {
        let rank = match entries.last() {
            Some(prev) if prev.score == s.score => prev.rank,
            _ => i + 1,
        };
        entries.push(LeaderboardEntry {
            rank,
            game_name: catalog.title(&s.game.code).map(str::to_string),
            game_id: s.game.to_string(),
            player_name: s.player_name,
            score: s.score,
            level: s.level,
            date_time: s.date_time,
            country_code: s.country_code,
        });
    }
    entries
}

/// Keep the best score of each player in each game.
fn best_per_player(scores: Vec<ScoreRecord>) -> Vec<ScoreRecord> {
    let mut best: BTreeMap<(String, String), ScoreRecord> = BTreeMap::new();
    for s in scores {
        let key = (s.player_name.clone(), s.game.code.clone());
        let beats = |kept: &ScoreRecord| (s.score, Reverse(s.date_time)) > (kept.score, Reverse(kept.date_time));
        if best.get(&key).map_or(true, beats) {
            best.insert(key, s);
        }
    }
    best.into_values().collect()
}

fn summarise_players(scores: &[ScoreRecord]) -> Vec<PlayerSummary> {
    let mut players: BTreeMap<&str, PlayerSummary> = BTreeMap::new();
    for s in scores {
        players
            .entry(s.player_name.as_str())
            .and_modify(|p| {
                p.scores_submitted += 1;
                p.best_score = p.best_score.max(s.score);
                p.last_played = p.last_played.max(s.date_time);
            })
            .or_insert_with(|| PlayerSummary {
                player_name: s.player_name.clone(),
                scores_submitted: 1,
                best_score: s.score,
                last_played: s.date_time,
            });
    }
    let mut summaries: Vec<_> = players.into_values().collect();
    summaries.sort_by(|a, b| b.best_score.cmp(&a.best_score).then(a.player_name.cmp(&b.player_name)));
    summaries
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| PbxError::UpstreamFailure(e.to_string()))
}

/// Serves leaderboards from submitted scores.
pub struct GetLeaderboards {
    ctx: Arc<HandlerContext>,
}

impl GetLeaderboards {
    /// Create the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

impl RequestHandler for GetLeaderboards {
    fn id(&self) -> &'static str {
        "getLeaderboards"
    }

    fn validate(&self, params: &Params) -> Result<()> {
        require(params, &["format"])?;
        require_json(params)
    }

    fn execute(&self, params: &Params) -> Result<Outcome> {
        let player = optional(params, "playerName").map(str::trim);
        let game = optional(params, "gameID").map(|g| code_prefix(g.trim()).to_string());
        let scope = Scope::parse(optional(params, "scope"), player.is_some());
        let mut limit: Option<usize> = match optional(params, "limit") {
            Some(_) => Some(parse_field(params, "limit")?),
            None => None,
        };

        let catalog = self.ctx.catalog();
        let mut scores = self.ctx.store.scores()?;
        if let Some(code) = &game {
            scores.retain(|s| &s.game.code == code);
        }

        let now = self.ctx.now().naive_utc();
        let mut entries = match scope {
            Scope::SummaryPlayers => return Ok(Outcome::Message(to_json(&summarise_players(&scores))?)),
            Scope::GamesThatExist => {
                let mut codes: Vec<String> = scores.iter().map(|s| s.game.code.clone()).collect();
                codes.sort();
                codes.dedup();
                let games: Vec<GameSummary> = codes
                    .into_iter()
                    .map(|code| GameSummary { game_name: catalog.title(&code).map(str::to_string), game_id: code })
                    .collect();
                return Ok(Outcome::Message(to_json(&games)?));
            }
            Scope::Ranked => rank(scores, &catalog),
            Scope::Top(n) => {
                limit = Some(n);
                rank(scores, &catalog)
            }
            Scope::BestAllTime | Scope::BestScore => rank(best_per_player(scores), &catalog),
            Scope::BestToday => {
                scores.retain(|s| s.date_time.date() == now.date());
                rank(best_per_player(scores), &catalog)
            }
            Scope::BestWeek => {
                let since = now - Duration::days(7);
                scores.retain(|s| s.date_time >= since);
                rank(best_per_player(scores), &catalog)
            }
            Scope::LastEntry => rank(scores, &catalog),
        };

        if let Some(name) = player {
            entries.retain(|e| e.player_name == name);
        }
        if scope == Scope::LastEntry {
            if let Some(last) = entries.iter().max_by_key(|e| e.date_time).cloned() {
                entries = vec![last];
            }
        }
        if let Some(n) = limit {
            entries.truncate(n);
        }

        Ok(Outcome::Message(to_json(&entries)?))
    }
}

// =============================================================================
// TESTS
// =============================================================================
