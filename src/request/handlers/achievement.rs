//! Achievement handlers: `authAchiv`, `unlockAchiv` and `getAchievements`.
//!
//! Both mutating handlers short-circuit to a declined reply when the
//! (achievement, game code, player) triple is already recorded. The final
//! insert is itself atomic, so a concurrent duplicate that slips past the
//! first check is declined the same way.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::core::game_id::{code_prefix, GameId};
use crate::core::salt::parse_timestamp;
use crate::error::{EntityKind, PbxError, Result};
use crate::handshake::{authorize, verify, AchievementClaim};
use crate::request::{
    field, optional, parse_field, require, require_json, HandlerContext, Outcome, Params, RequestHandler,
};
use crate::store::UnlockRecord;

fn claim(params: &Params) -> Result<AchievementClaim> {
    Ok(AchievementClaim::new(
        field(params, "playerName")?,
        field(params, "achivID")?,
        field(params, "gameID")?,
        field(params, "dateTime")?,
        optional(params, "tskAuthKey"),
    ))
}

fn already_unlocked(ctx: &HandlerContext, claim: &AchievementClaim, id: u32) -> Result<bool> {
    ctx.store.unlock_exists(id, claim.game_code(), &claim.player_name)
}

/// Issues or checks achievement keys.
pub struct AuthAchiv {
    ctx: Arc<HandlerContext>,
}

impl AuthAchiv {
    /// Create the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

impl RequestHandler for AuthAchiv {
    fn id(&self) -> &'static str {
        "authAchiv"
    }

    fn validate(&self, params: &Params) -> Result<()> {
        require(params, &["playerName", "dateTime", "gameID", "achivID"])
    }

    fn execute(&self, params: &Params) -> Result<Outcome> {
        let claim = claim(params)?;
        if already_unlocked(&self.ctx, &claim, parse_field(params, "achivID")?)? {
            return Ok(Outcome::Declined);
        }
        let auth = authorize(&claim, optional(params, "achivAuthKey"), &self.ctx.issuer, self.ctx.now())?;
        Ok(auth.into())
    }
}

/// Records an authorised unlock and replies with the achievement title.
pub struct UnlockAchiv {
    ctx: Arc<HandlerContext>,
}

impl UnlockAchiv {
    /// Create the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

impl RequestHandler for UnlockAchiv {
    fn id(&self) -> &'static str {
        "unlockAchiv"
    }

    fn validate(&self, params: &Params) -> Result<()> {
        require(params, &["playerName", "achivID", "dateTime", "achivAuthKey", "gameID"])
    }

    fn execute(&self, params: &Params) -> Result<Outcome> {
        let claim = claim(params)?;
        let id: u32 = parse_field(params, "achivID")?;
        if already_unlocked(&self.ctx, &claim, id)? {
            return Ok(Outcome::Declined);
        }

        verify(&claim, field(params, "achivAuthKey")?, &self.ctx.issuer, self.ctx.now())?;

        let game: GameId = claim.game_id.parse()?;
        let catalog = self.ctx.catalog();
        let def = catalog.achievement(&game.code, id).ok_or_else(|| PbxError::UnknownEntity {
            kind: EntityKind::Achievement,
            name: format!("{}#{}", game.code, id),
        })?;

        let record = UnlockRecord {
            player_name: claim.player_name.clone(),
            achievement_id: id,
            date_time: parse_timestamp(&claim.date_time)?,
            game,
        };
        if !self.ctx.store.insert_unlock(record)? {
            return Ok(Outcome::Declined);
        }
        Ok(Outcome::Message(def.title.clone()))
    }
}

/// One achievement as listed to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementView {
    /// Id within the game.
    pub id: u32,
    /// Display title.
    pub title: String,
    /// Description.
    pub description: String,
    /// When it was unlocked, for unlocked achievements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<NaiveDateTime>,
}

/// Unlock progress of one player in one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementStats {
    /// Achievements unlocked.
    pub unlocked: usize,
    /// Achievements still locked.
    pub locked: usize,
    /// Achievements defined for the game.
    pub total: usize,
    /// Unlocked fraction, two decimals.
    pub percent_unlocked: String,
    /// Locked fraction, two decimals.
    pub percent_locked: String,
}

impl AchievementStats {
    fn new(unlocked: usize, total: usize) -> Self {
        let locked = total.saturating_sub(unlocked);
        let fraction = |n: usize| {
            if total == 0 {
                "0.00".to_string()
            } else {
                format!("{:.2}", n as f64 / total as f64)
            }
        };
        Self { unlocked, locked, total, percent_unlocked: fraction(unlocked), percent_locked: fraction(locked) }
    }
}

/// Lists a player's unlocked or locked achievements, or their stats.
pub struct GetAchievements {
    ctx: Arc<HandlerContext>,
}

impl GetAchievements {
    /// Create the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

impl RequestHandler for GetAchievements {
    fn id(&self) -> &'static str {
        "getAchievements"
    }

    fn validate(&self, params: &Params) -> Result<()> {
        require(params, &["playerName", "format", "gameID", "scope"])?;
        require_json(params)
    }

    fn execute(&self, params: &Params) -> Result<Outcome> {
        let player = field(params, "playerName")?.trim();
        let code = code_prefix(field(params, "gameID")?.trim());
        let catalog = self.ctx.catalog();

        let unlocked: BTreeMap<u32, NaiveDateTime> = self
            .ctx
            .store
            .unlocks_for(code, player)?
            .into_iter()
            .map(|u| (u.achievement_id, u.date_time))
            .collect();

        let view = |want_unlocked: bool| -> Vec<AchievementView> {
            catalog
                .achievements_of(code)
                .filter(|def| unlocked.contains_key(&def.id) == want_unlocked)
                .map(|def| AchievementView {
                    id: def.id,
                    title: def.title.clone(),
                    description: def.description.clone(),
                    date_time: unlocked.get(&def.id).copied(),
                })
                .collect()
        };

        let json = match field(params, "scope")? {
            "unlocked" => serde_json::to_string(&view(true)),
            "locked" => serde_json::to_string(&view(false)),
            "stats" => {
                let total = catalog.achievements_of(code).count();
                let count = catalog.achievements_of(code).filter(|d| unlocked.contains_key(&d.id)).count();
                serde_json::to_string(&AchievementStats::new(count, total))
            }
            other => return Err(PbxError::MalformedRequest(format!("invalid scope '{}'", other))),
        }
        .map_err(|e| PbxError::UpstreamFailure(e.to_string()))?;

        Ok(Outcome::Message(json))
    }
}

// =============================================================================
// TESTS
// =============================================================================
