//! Score handlers: `authScore` and `pushScore`.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::game_id::GameId;
use crate::core::salt::parse_timestamp;
use crate::error::Result;
use crate::handshake::{authorize, verify, ScoreClaim};
use crate::request::{field, optional, parse_field, require, HandlerContext, Outcome, Params, RequestHandler};
use crate::store::ScoreRecord;

/// Resolves a player's address to an ISO country code.
pub trait CountryResolver: Send + Sync {
    /// Country of `ip`, if known.
    fn country_of(&self, ip: &str) -> Option<String>;
}

/// Resolver that never knows.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCountry;

impl CountryResolver for NoCountry {
    fn country_of(&self, _ip: &str) -> Option<String> {
        None
    }
}

impl CountryResolver for BTreeMap<String, String> {
    fn country_of(&self, ip: &str) -> Option<String> {
        self.get(ip).cloned()
    }
}

fn claim(params: &Params) -> Result<ScoreClaim> {
    Ok(ScoreClaim::new(
        field(params, "playerName")?,
        field(params, "score")?,
        field(params, "dateTime")?,
    ))
}

/// Issues or checks score keys.
pub struct AuthScore {
    ctx: Arc<HandlerContext>,
}

impl AuthScore {
    /// Create the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

impl RequestHandler for AuthScore {
    fn id(&self) -> &'static str {
        "authScore"
    }

    fn validate(&self, params: &Params) -> Result<()> {
        require(params, &["playerName", "dateTime", "score"])
    }

    fn execute(&self, params: &Params) -> Result<Outcome> {
        let claim = claim(params)?;
        let auth = authorize(&claim, optional(params, "scoreAuthKey"), &self.ctx.issuer, self.ctx.now())?;
        Ok(auth.into())
    }
}

/// Records an authorised score.
pub struct PushScore {
    ctx: Arc<HandlerContext>,
    countries: Arc<dyn CountryResolver>,
}

impl PushScore {
    /// Create the handler.
    pub fn new(ctx: Arc<HandlerContext>, countries: Arc<dyn CountryResolver>) -> Self {
        Self { ctx, countries }
    }
}

impl RequestHandler for PushScore {
    fn id(&self) -> &'static str {
        "pushScore"
    }

    fn validate(&self, params: &Params) -> Result<()> {
        require(params, &["playerName", "scoreAuthKey", "score", "dateTime", "playerIP", "gameID"])
    }

    fn execute(&self, params: &Params) -> Result<Outcome> {
        let claim = claim(params)?;
        verify(&claim, field(params, "scoreAuthKey")?, &self.ctx.issuer, self.ctx.now())?;

        let game: GameId = field(params, "gameID")?.parse()?;
        let record = ScoreRecord {
            score: parse_field(params, "score")?,
            level: optional(params, "level").map(str::to_string),
            date_time: parse_timestamp(&claim.date_time)?,
            game,
            country_code: self.countries.country_of(field(params, "playerIP")?.trim()),
            player_name: claim.player_name,
        };
        self.ctx.store.insert_score(record)?;
        Ok(Outcome::Accepted)
    }
}

// =============================================================================
// TESTS
// =============================================================================
