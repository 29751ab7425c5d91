//! Download handlers: `authDownload` and `recordGameDownload`.

use std::sync::Arc;

use crate::core::game_id::{GameId, GameQuery};
use crate::error::{PbxError, Result};
use crate::handshake::{authorize, verify, DownloadClaim};
use crate::request::{field, optional, require, HandlerContext, Outcome, Params, RequestHandler};
use crate::store::DownloadRecord;

fn known_build(ctx: &HandlerContext, raw: &str) -> Result<GameId> {
    let game: GameId = raw.parse()?;
    if ctx.catalog().has(&GameQuery::Exact(game.clone())) {
        Ok(game)
    } else {
        Err(PbxError::unknown_game(raw))
    }
}

/// Issues or checks download keys for known builds.
pub struct AuthDownload {
    ctx: Arc<HandlerContext>,
}

impl AuthDownload {
    /// Create the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

impl RequestHandler for AuthDownload {
    fn id(&self) -> &'static str {
        "authDownload"
    }

    fn validate(&self, params: &Params) -> Result<()> {
        require(params, &["gameID"])
    }

    fn execute(&self, params: &Params) -> Result<Outcome> {
        let raw = field(params, "gameID")?;
        known_build(&self.ctx, raw)?;
        let claim = DownloadClaim::new(raw);
        let auth = authorize(&claim, optional(params, "downloadKey"), &self.ctx.issuer, self.ctx.now())?;
        Ok(auth.into())
    }
}

/// Counts a download of a known build.
pub struct RecordGameDownload {
    ctx: Arc<HandlerContext>,
}

impl RecordGameDownload {
    /// Create the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

impl RequestHandler for RecordGameDownload {
    fn id(&self) -> &'static str {
        "recordGameDownload"
    }

    fn validate(&self, params: &Params) -> Result<()> {
        require(params, &["gameID", "downloadKey", "platform"])
    }

    fn execute(&self, params: &Params) -> Result<Outcome> {
        let raw = field(params, "gameID")?;
        verify(&DownloadClaim::new(raw), field(params, "downloadKey")?, &self.ctx.issuer, self.ctx.now())?;

        let game = known_build(&self.ctx, raw)?;
        let platform = field(params, "platform")?.trim().to_uppercase();
        let date_time = self.ctx.now().naive_utc();
        self.ctx.store.insert_download(DownloadRecord { game, platform, date_time })?;
        Ok(Outcome::Accepted)
    }
}
