//! Request Handling
//!
//! Every inbound request is a request-type id plus a flat string map of
//! parameters. The [`RequestManager`] routes it to the one registered
//! [`RequestHandler`] with that id:
//!
//! ```text
//! ┌────────────┐   ┌────────────────┐   ┌──────────────┐   ┌───────────┐
//! │ transport  │──▶│ RequestManager │──▶│   handler    │──▶│ Datastore │
//! │ (network/) │   │  (id → handler)│   │ validate/exec│   │  Catalog  │
//! └────────────┘   └────────────────┘   └──────┬───────┘   └───────────┘
//!                                              │
//!                                        handshake/ + core/
//! ```

pub mod dispatcher;
pub mod handlers;
pub mod settings;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::catalog::{Catalog, CatalogCell};
use crate::core::clock::Clock;
use crate::core::key::KeyIssuer;
use crate::error::{PbxError, Result};
use crate::handshake::Authorization;
use crate::store::Datastore;

pub use dispatcher::RequestManager;
pub use settings::BackendSettings;

/// Request parameters, as sent by the client.
pub type Params = BTreeMap<String, String>;

/// Successful result of a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Bare success with no message.
    Accepted,
    /// The request was understood but declined without error (`"false"`).
    Declined,
    /// Success carrying a message or payload.
    Message(String),
}

impl Outcome {
    /// Message text sent to the client, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Accepted => None,
            Self::Declined => Some("false"),
            Self::Message(msg) => Some(msg),
        }
    }
}

impl From<Authorization> for Outcome {
    fn from(auth: Authorization) -> Self {
        match auth {
            Authorization::Issued(key) => Self::Message(key.into_string()),
            Authorization::Verified(true) => Self::Accepted,
            Authorization::Verified(false) => Self::Declined,
        }
    }
}

/// A handler for one request type.
pub trait RequestHandler: Send + Sync {
    /// Request-type id this handler answers to.
    fn id(&self) -> &'static str;

    /// Check the parameters before anything else runs.
    fn validate(&self, params: &Params) -> Result<()>;

    /// Run the request.
    fn execute(&self, params: &Params) -> Result<Outcome>;
}

/// Fail unless every named field is present.
pub fn require(params: &Params, fields: &[&str]) -> Result<()> {
    let missing: Vec<&str> = fields.iter().copied().filter(|f| !params.contains_key(*f)).collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PbxError::MalformedRequest(format!("missing {}", missing.join(", "))))
    }
}

/// A required field.
pub fn field<'a>(params: &'a Params, name: &str) -> Result<&'a str> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| PbxError::MalformedRequest(format!("missing {}", name)))
}

/// An optional field.
pub fn optional<'a>(params: &'a Params, name: &str) -> Option<&'a str> {
    params.get(name).map(String::as_str)
}

/// Parse a field, reporting which one was unusable.
pub fn parse_field<T: std::str::FromStr>(params: &Params, name: &str) -> Result<T> {
    let raw = field(params, name)?;
    raw.trim()
        .parse()
        .map_err(|_| PbxError::MalformedRequest(format!("invalid {} '{}'", name, raw)))
}

/// Only JSON results are produced.
pub fn require_json(params: &Params) -> Result<()> {
    match field(params, "format")? {
        "json" => Ok(()),
        other => Err(PbxError::MalformedRequest(format!("unsupported format '{}'", other))),
    }
}

/// Shared state every handler works against.
pub struct HandlerContext {
    /// Persistent storage.
    pub store: Arc<dyn Datastore>,
    /// Current catalog snapshot holder.
    pub catalog: Arc<CatalogCell>,
    /// Source of "now" for key windows.
    pub clock: Arc<dyn Clock>,
    /// Key issuer.
    pub issuer: KeyIssuer,
    /// Backend settings.
    pub settings: BackendSettings,
}

impl HandlerContext {
    /// Create a context with the default key window.
    pub fn new(
        store: Arc<dyn Datastore>,
        catalog: Arc<CatalogCell>,
        clock: Arc<dyn Clock>,
        settings: BackendSettings,
    ) -> Self {
        Self { store, catalog, clock, issuer: KeyIssuer::default(), settings }
    }

    /// Current instant.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Current catalog snapshot.
    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.current()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_require_lists_missing_fields() {
        let p = params(&[("playerName", "Alice")]);
        assert!(require(&p, &["playerName"]).is_ok());
        assert_eq!(
            require(&p, &["playerName", "score", "dateTime"]),
            Err(PbxError::MalformedRequest("missing score, dateTime".into()))
        );
    }

    #[test]
    fn test_parse_field() {
        let p = params(&[("score", " 120 "), ("limit", "ten")]);
        assert_eq!(parse_field::<i64>(&p, "score"), Ok(120));
        assert!(matches!(parse_field::<usize>(&p, "limit"), Err(PbxError::MalformedRequest(_))));
        assert!(matches!(parse_field::<usize>(&p, "absent"), Err(PbxError::MalformedRequest(_))));
    }

    #[test]
    fn test_outcome_messages() {
        assert_eq!(Outcome::Accepted.message(), None);
        assert_eq!(Outcome::Declined.message(), Some("false"));
        assert_eq!(Outcome::Message("hi".into()).message(), Some("hi"));
        assert_eq!(Outcome::from(Authorization::Verified(true)), Outcome::Accepted);
        assert_eq!(Outcome::from(Authorization::Verified(false)), Outcome::Declined);
    }

    #[test]
    fn test_require_json() {
        assert!(require_json(&params(&[("format", "json")])).is_ok());
        assert!(require_json(&params(&[("format", "xml")])).is_err());
        assert!(require_json(&params(&[])).is_err());
    }
}
