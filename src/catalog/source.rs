//! Catalog inputs.
//!
//! Where the catalog learns about games: a definitions file (titles and
//! achievements) and a release listing (which builds are published).
//! Both sit behind traits so deployments can swap the transport.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::game_id::{validate_code, GameId};
use crate::error::{PbxError, Result};

/// File extension of published builds.
const RELEASE_EXTENSION: &str = ".exe";

/// One achievement in the definitions file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementEntry {
    /// Id within the game.
    pub id: u32,
    /// Display title.
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: String,
}

/// One game in the definitions file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEntry {
    /// Four-letter game code.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Achievements of the game.
    #[serde(default)]
    pub achievements: Vec<AchievementEntry>,
}

/// Contents of the definitions file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFile {
    /// Games with titles and achievements.
    #[serde(default)]
    pub games: Vec<GameEntry>,
}

impl CatalogFile {
    /// Parse from JSON, validating game codes.
    pub fn from_json(s: &str) -> Result<Self> {
        let file: Self = serde_json::from_str(s)
            .map_err(|e| PbxError::UpstreamFailure(format!("invalid catalog file: {}", e)))?;
        for game in &file.games {
            validate_code(&game.id)?;
        }
        Ok(file)
    }

    /// Read and parse a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PbxError::UpstreamFailure(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }
}

/// Source of game titles and achievement definitions.
pub trait DefinitionSource: Send + Sync {
    /// Load the current definitions.
    fn load(&self) -> Result<CatalogFile>;
}

/// Definitions read from a JSON file on every refresh.
#[derive(Debug, Clone)]
pub struct JsonDefinitions {
    path: PathBuf,
}

impl JsonDefinitions {
    /// Read definitions from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DefinitionSource for JsonDefinitions {
    fn load(&self) -> Result<CatalogFile> {
        CatalogFile::load(&self.path)
    }
}

impl DefinitionSource for CatalogFile {
    fn load(&self) -> Result<CatalogFile> {
        Ok(self.clone())
    }
}

/// Listing of published game builds.
pub trait ReleaseSource: Send + Sync {
    /// Every published build.
    fn list_releases(&self) -> Result<Vec<GameId>>;
}

/// Builds published as `CODE-M.m.p.d.exe` files in a directory.
#[derive(Debug, Clone)]
pub struct DirectoryReleases {
    dir: PathBuf,
}

impl DirectoryReleases {
    /// List releases found in `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

/// Parse a published file name into a game id.
pub fn parse_release_name(file_name: &str) -> Option<GameId> {
    file_name.strip_suffix(RELEASE_EXTENSION)?.parse().ok()
}

impl ReleaseSource for DirectoryReleases {
    fn list_releases(&self) -> Result<Vec<GameId>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            PbxError::UpstreamFailure(format!("cannot open releases directory {}: {}", self.dir.display(), e))
        })?;

        let mut releases = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PbxError::UpstreamFailure(e.to_string()))?;
            let name = entry.file_name();
            match name.to_str().and_then(parse_release_name) {
                Some(id) => releases.push(id),
                None => debug!("Skipping non-release file {:?}", name),
            }
        }
        releases.sort();
        Ok(releases)
    }
}

impl ReleaseSource for Vec<GameId> {
    fn list_releases(&self) -> Result<Vec<GameId>> {
        Ok(self.clone())
    }
}

/// Operator alerts, e.g. mail to the studio.
pub trait Notifier: Send + Sync {
    /// Raise an alert.
    fn alert(&self, subject: &str, message: &str);
}

/// Alerts emitted as warning log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn alert(&self, subject: &str, message: &str) {
        warn!(alert = subject, "{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_release_name() {
        assert_eq!(parse_release_name("TEST-1.2.3.4.exe"), Some(GameId::new("TEST", [1, 2, 3, 4])));
        assert_eq!(parse_release_name("TEST-1.2.3.4.zip"), None);
        assert_eq!(parse_release_name("."), None);
        assert_eq!(parse_release_name("test-1.2.3.4.exe"), None);
    }

    #[test]
    fn test_catalog_file_json() {
        let file = CatalogFile::from_json(
            r#"{"games":[{"id":"TEST","title":"Test Game","achievements":[{"id":0,"title":"First","description":"Do it"}]}]}"#,
        )
        .unwrap();
        assert_eq!(file.games[0].title, "Test Game");
        assert_eq!(file.games[0].achievements[0].title, "First");

        assert!(CatalogFile::from_json(r#"{"games":[{"id":"bad","title":"x"}]}"#).is_err());
        assert!(CatalogFile::from_json("not json").is_err());
    }

    #[test]
    fn test_directory_releases() {
        let dir = std::env::temp_dir().join(format!("pbx-releases-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("TEST-1.0.0.0.exe"), b"").unwrap();
        std::fs::write(dir.join("TEST-1.1.0.0.exe"), b"").unwrap();
        std::fs::write(dir.join("README.txt"), b"").unwrap();

        let releases = DirectoryReleases::new(&dir).list_releases().unwrap();
        assert_eq!(releases, vec![GameId::new("TEST", [1, 0, 0, 0]), GameId::new("TEST", [1, 1, 0, 0])]);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_directory_is_upstream_failure() {
        let source = DirectoryReleases::new("/nonexistent/pbx/releases");
        assert!(matches!(source.list_releases(), Err(PbxError::UpstreamFailure(_))));
    }
}
