//! Game version handler: `authGame`.
//!
//! Answers three questions about a game build:
//!
//! | flag             | reply                                         |
//! |------------------|-----------------------------------------------|
//! | (none)           | accepted, or "Update available: ..."          |
//! | `getDownloadURL` | download link of the newest build of the code |
//! | `getTitle`       | display title of the code                     |

use std::sync::Arc;

use crate::core::game_id::{code_prefix, validate_code, GameQuery};
use crate::error::{PbxError, Result};
use crate::request::{field, optional, require, HandlerContext, Outcome, Params, RequestHandler};

/// Checks builds against the catalog.
pub struct AuthGame {
    ctx: Arc<HandlerContext>,
}

impl AuthGame {
    /// Create the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

impl RequestHandler for AuthGame {
    fn id(&self) -> &'static str {
        "authGame"
    }

    fn validate(&self, params: &Params) -> Result<()> {
        require(params, &["gameID"])
    }

    fn execute(&self, params: &Params) -> Result<Outcome> {
        let raw = field(params, "gameID")?.trim();
        let want_url = optional(params, "getDownloadURL").is_some();
        let want_title = optional(params, "getTitle").is_some();

        let query = if want_url || want_title {
            let code = code_prefix(raw);
            validate_code(code)?;
            GameQuery::AnyVersion(code.to_string())
        } else {
            raw.parse()?
        };

        let catalog = self.ctx.catalog();
        if !catalog.has(&query) {
            return Err(PbxError::unknown_game(raw));
        }
        let latest = catalog.latest(query.code()).ok_or_else(|| PbxError::unknown_game(raw))?;

        if want_url {
            let base = self.ctx.settings.download_base_url.trim_end_matches('/');
            return Ok(Outcome::Message(format!("{}/{}.exe", base, latest)));
        }
        if want_title {
            let title = catalog.title(query.code()).ok_or_else(|| PbxError::unknown_game(raw))?;
            return Ok(Outcome::Message(title.to_string()));
        }

        match &query {
            GameQuery::Exact(id) if id == latest => Ok(Outcome::Accepted),
            _ => Ok(Outcome::Message(format!("Update available: latest version is v{}", latest.version))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::handlers::testing::Fixture;

    #[test]
    fn test_latest_build_is_current() {
        let fixture = Fixture::new();
        assert_eq!(fixture.call("authGame", &[("gameID", "TEST-1.2.0.0")]), Ok(Outcome::Accepted));
    }

    #[test]
    fn test_older_build_gets_update_notice() {
        let fixture = Fixture::new();
        assert_eq!(
            fixture.call("authGame", &[("gameID", "TEST-1.0.0.0")]),
            Ok(Outcome::Message("Update available: latest version is v1.2.0.0".into()))
        );
    }

    #[test]
    fn test_unknown_build() {
        let fixture = Fixture::new();
        assert_eq!(
            fixture.call("authGame", &[("gameID", "TEST-0.0.0.1")]),
            Err(PbxError::unknown_game("TEST-0.0.0.1"))
        );
        assert_eq!(
            fixture.call("authGame", &[("gameID", "NOPE-*.*.*.*"), ("getTitle", "")]),
            Err(PbxError::unknown_game("NOPE-*.*.*.*"))
        );
    }

    #[test]
    fn test_download_url_and_title() {
        let fixture = Fixture::new();
        assert_eq!(
            fixture.call("authGame", &[("gameID", "TEST-1.0.0.0"), ("getDownloadURL", "1")]),
            Ok(Outcome::Message("http://games.test/TEST-1.2.0.0.exe".into()))
        );
        assert_eq!(
            fixture.call("authGame", &[("gameID", "TEST"), ("getTitle", "1")]),
            Ok(Outcome::Message("Test Game".into()))
        );
    }

    #[test]
    fn test_malformed_game_id() {
        let fixture = Fixture::new();
        assert!(matches!(
            fixture.call("authGame", &[("gameID", "TEST-1.0")]),
            Err(PbxError::MalformedRequest(_))
        ));
    }
}
