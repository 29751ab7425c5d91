//! Player name handler: `authName`.
//!
//! One request type covers three operations:
//! - register `playerName` (fails if taken)
//! - reclaim `playerName` with the override code `o` (fails if it does not exist)
//! - rename `playerName` to `update`

use std::path::Path;
use std::sync::Arc;

use crate::error::{PbxError, Result};
use crate::request::{field, optional, require, HandlerContext, Outcome, Params, RequestHandler};

/// Shortest acceptable name, in characters.
pub const MIN_NAME_LEN: usize = 3;

/// Longest acceptable name, in characters.
pub const MAX_NAME_LEN: usize = 30;

/// Decides whether a player name is acceptable.
pub trait NameFilter: Send + Sync {
    /// Whether `name` passes the filter.
    fn is_acceptable(&self, name: &str) -> bool;
}

/// Rejects names containing any listed word, ignoring case.
#[derive(Debug, Clone, Default)]
pub struct WordListFilter {
    words: Vec<String>,
}

impl WordListFilter {
    /// Filter over the given words.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    /// Parse a newline-separated word list.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.lines())
    }

    /// Load a word list file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PbxError::UpstreamFailure(format!("word list {}: {}", path.display(), e)))?;
        Ok(Self::from_text(&text))
    }

    /// Number of words in the list.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl NameFilter for WordListFilter {
    fn is_acceptable(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        !self.words.iter().any(|w| name.contains(w.as_str()))
    }
}

fn check_length(name: &str) -> Result<()> {
    let len = name.chars().count();
    if (MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
        Ok(())
    } else {
        Err(PbxError::RejectedName(format!(
            "name must be {} to {} characters",
            MIN_NAME_LEN, MAX_NAME_LEN
        )))
    }
}

/// Registers, reclaims and renames players.
pub struct AuthName {
    ctx: Arc<HandlerContext>,
    filter: Arc<dyn NameFilter>,
}

impl AuthName {
    /// Create the handler.
    pub fn new(ctx: Arc<HandlerContext>, filter: Arc<dyn NameFilter>) -> Self {
        Self { ctx, filter }
    }

    fn check_words(&self, name: &str) -> Result<()> {
        if self.filter.is_acceptable(name) {
            Ok(())
        } else {
            Err(PbxError::RejectedName("a match in the name was found to be unacceptable".into()))
        }
    }
}

impl RequestHandler for AuthName {
    fn id(&self) -> &'static str {
        "authName"
    }

    fn validate(&self, params: &Params) -> Result<()> {
        require(params, &["playerName"])?;
        if params.contains_key("o") && params.contains_key("update") {
            return Err(PbxError::MalformedRequest(
                "cannot update and override a name at the same time".into(),
            ));
        }
        Ok(())
    }

    fn execute(&self, params: &Params) -> Result<Outcome> {
        let name = field(params, "playerName")?.trim();
        let reclaim = optional(params, "o").is_some_and(|code| self.ctx.settings.is_override_code(code));
        let update = optional(params, "update").map(str::trim).filter(|n| !n.is_empty());

        self.check_words(name)?;
        if let Some(new_name) = update {
            self.check_words(new_name)?;
        }
        check_length(name)?;

        let store = &self.ctx.store;
        if let Some(new_name) = update {
            check_length(new_name)?;
            if new_name == name {
                return Err(PbxError::RejectedName("cannot update to the same name".into()));
            }
            store.rename_player(name, new_name)?;
        } else if reclaim {
            if !store.player_exists(name)? {
                return Err(PbxError::unknown_player(name));
            }
        } else if !store.insert_player(name)? {
            return Err(PbxError::DuplicateEntity(name.to_string()));
        }
        Ok(Outcome::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::handlers::testing::Fixture;
    use crate::store::Datastore;

    #[test]
    fn test_register_once() {
        let fixture = Fixture::new();
        assert_eq!(fixture.call("authName", &[("playerName", " Alice ")]), Ok(Outcome::Accepted));
        assert!(fixture.store.player_exists("Alice").unwrap());
        assert_eq!(
            fixture.call("authName", &[("playerName", "Alice")]),
            Err(PbxError::DuplicateEntity("Alice".into()))
        );
    }

    #[test]
    fn test_reclaim_with_override_code() {
        let fixture = Fixture::with_players(&["Alice"]);
        assert_eq!(fixture.call("authName", &[("playerName", "Alice"), ("o", "123456")]), Ok(Outcome::Accepted));
        assert_eq!(
            fixture.call("authName", &[("playerName", "Bobby"), ("o", "123456")]),
            Err(PbxError::unknown_player("Bobby"))
        );
        // A wrong code is an ordinary registration.
        assert_eq!(
            fixture.call("authName", &[("playerName", "Alice"), ("o", "000000")]),
            Err(PbxError::DuplicateEntity("Alice".into()))
        );
    }

    #[test]
    fn test_rename() {
        let fixture = Fixture::with_players(&["Alice", "Carol"]);
        assert_eq!(
            fixture.call("authName", &[("playerName", "Alice"), ("update", "Alicia")]),
            Ok(Outcome::Accepted)
        );
        assert!(fixture.store.player_exists("Alicia").unwrap());
        assert_eq!(
            fixture.call("authName", &[("playerName", "Alicia"), ("update", "Carol")]),
            Err(PbxError::DuplicateEntity("Carol".into()))
        );
        assert!(matches!(
            fixture.call("authName", &[("playerName", "Carol"), ("update", "Carol")]),
            Err(PbxError::RejectedName(_))
        ));
        assert_eq!(
            fixture.call("authName", &[("playerName", "Nobody"), ("update", "Somebody")]),
            Err(PbxError::unknown_player("Nobody"))
        );
    }

    #[test]
    fn test_override_and_update_together() {
        let fixture = Fixture::with_players(&["Alice"]);
        let result = fixture.call("authName", &[("playerName", "Alice"), ("o", "123456"), ("update", "Alicia")]);
        assert!(matches!(result, Err(PbxError::MalformedRequest(_))));
    }

    #[test]
    fn test_rejected_names() {
        let fixture = Fixture::new();
        for name in ["Al", "x".repeat(31).as_str(), "MyBadWordName"] {
            assert!(
                matches!(fixture.call("authName", &[("playerName", name)]), Err(PbxError::RejectedName(_))),
                "{}",
                name
            );
        }
        assert_eq!(fixture.call("authName", &[("playerName", &"x".repeat(30))]), Ok(Outcome::Accepted));
    }

    #[test]
    fn test_word_list_parsing() {
        let filter = WordListFilter::from_text("Foo\n\n  bar  \n");
        assert_eq!(filter.len(), 2);
        assert!(!filter.is_acceptable("xxFOOxx"));
        assert!(!filter.is_acceptable("Barbara"));
        assert!(filter.is_acceptable("Alice"));
        assert!(WordListFilter::default().is_acceptable("anything"));
    }
}
