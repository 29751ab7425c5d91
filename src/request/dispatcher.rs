//! Request dispatcher.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, error, warn};

use super::handlers::{
    AuthAchiv, AuthDownload, AuthGame, AuthName, AuthScore, CountryResolver, GetAchievements, GetLeaderboards,
    NameFilter, PushScore, RecordGameDownload, UnlockAchiv,
};
use super::{HandlerContext, Outcome, Params, RequestHandler};
use crate::error::{PbxError, Result};

/// Registry of request handlers keyed by request-type id.
#[derive(Default)]
pub struct RequestManager {
    handlers: BTreeMap<&'static str, Box<dyn RequestHandler>>,
}

impl RequestManager {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every backend request type.
    pub fn standard(
        ctx: Arc<HandlerContext>,
        names: Arc<dyn NameFilter>,
        countries: Arc<dyn CountryResolver>,
    ) -> Self {
        let mut manager = Self::new();
        manager.register(AuthGame::new(ctx.clone()));
        manager.register(AuthDownload::new(ctx.clone()));
        manager.register(RecordGameDownload::new(ctx.clone()));
        manager.register(AuthName::new(ctx.clone(), names));
        manager.register(AuthScore::new(ctx.clone()));
        manager.register(PushScore::new(ctx.clone(), countries));
        manager.register(GetLeaderboards::new(ctx.clone()));
        manager.register(GetAchievements::new(ctx.clone()));
        manager.register(AuthAchiv::new(ctx.clone()));
        manager.register(UnlockAchiv::new(ctx));
        manager
    }

    /// Add a handler, replacing any with the same id.
    pub fn register(&mut self, handler: impl RequestHandler + 'static) -> &mut Self {
        self.handlers.insert(handler.id(), Box::new(handler));
        self
    }

    /// Registered request-type ids, sorted.
    pub fn handler_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    /// Route a request to its handler.
    pub fn dispatch(&self, request_type: &str, params: &Params) -> Result<Outcome> {
        debug!(request_type, "dispatching request");

        let handler = self
            .handlers
            .get(request_type)
            .ok_or_else(|| PbxError::UnknownRequestType(request_type.to_string()))?;

        let result = handler.validate(params).and_then(|()| handler.execute(params));
        if let Err(err) = &result {
            match err {
                PbxError::UpstreamFailure(_) => error!(request_type, code = err.code(), "{}", err),
                PbxError::InvalidTimestamp(_)
                | PbxError::UnauthorizedSubmission(_)
                | PbxError::MalformedToken => warn!(request_type, code = err.code(), "{}", err),
                _ => debug!(request_type, code = err.code(), "{}", err),
            }
        }
        result
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::handlers::testing::Fixture;
    use crate::request::require;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo {
        executed: Arc<AtomicUsize>,
    }

    impl RequestHandler for Echo {
        fn id(&self) -> &'static str {
            "echo"
        }

        fn validate(&self, params: &Params) -> Result<()> {
            require(params, &["text"])
        }

        fn execute(&self, params: &Params) -> Result<Outcome> {
            self.executed.fetch_add(1, Ordering::SeqCst);
            Ok(Outcome::Message(params["text"].clone()))
        }
    }

    #[test]
    fn test_routes_by_id() {
        let executed = Arc::new(AtomicUsize::new(0));
        let mut manager = RequestManager::new();
        manager.register(Echo { executed: executed.clone() });

        let mut params = Params::new();
        params.insert("text".into(), "hello".into());
        assert_eq!(manager.dispatch("echo", &params), Ok(Outcome::Message("hello".into())));
        assert_eq!(
            manager.dispatch("shout", &params),
            Err(PbxError::UnknownRequestType("shout".into()))
        );
        assert_eq!(executed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_validation_precedes_execution() {
        let executed = Arc::new(AtomicUsize::new(0));
        let mut manager = RequestManager::new();
        manager.register(Echo { executed: executed.clone() });

        assert!(matches!(manager.dispatch("echo", &Params::new()), Err(PbxError::MalformedRequest(_))));
        assert_eq!(executed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_standard_registry() {
        let fixture = Fixture::new();
        let ids: Vec<_> = fixture.manager.handler_ids().collect();
        assert_eq!(
            ids,
            vec![
                "authAchiv",
                "authDownload",
                "authGame",
                "authName",
                "authScore",
                "getAchievements",
                "getLeaderboards",
                "pushScore",
                "recordGameDownload",
                "unlockAchiv",
            ]
        );
    }
}
