//! Backend settings.

use std::path::PathBuf;

use subtle::ConstantTimeEq;

use crate::core::key::derive_password;

/// Paths and secrets the request handlers and catalog refresh need.
#[derive(Debug, Clone)]
pub struct BackendSettings {
    /// Catalog definitions file (game titles and achievements).
    pub catalog_path: PathBuf,
    /// Directory listing the published `CODE-M.m.p.d.exe` builds.
    pub releases_dir: PathBuf,
    /// Base URL download links are built from.
    pub download_base_url: String,
    /// Newline-separated list of words rejected in player names.
    pub badwords_path: Option<PathBuf>,
    /// Code that lets a client reclaim an existing player name.
    pub name_override_code: Option<String>,
    /// Secret the datastore credential is derived from.
    pub db_secret: Option<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("resources/catalog.json"),
            releases_dir: PathBuf::from("releases"),
            download_base_url: "http://localhost/releases".to_string(),
            badwords_path: None,
            name_override_code: None,
            db_secret: None,
        }
    }
}

impl BackendSettings {
    /// Load settings from `PBX_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            catalog_path: std::env::var("PBX_CATALOG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.catalog_path),
            releases_dir: std::env::var("PBX_RELEASES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.releases_dir),
            download_base_url: std::env::var("PBX_DOWNLOAD_BASE_URL").unwrap_or(defaults.download_base_url),
            badwords_path: std::env::var("PBX_BADWORDS_PATH").ok().map(PathBuf::from),
            name_override_code: std::env::var("PBX_NAME_OVERRIDE_CODE").ok().filter(|c| !c.is_empty()),
            db_secret: std::env::var("PBX_DB_SECRET").ok().filter(|s| !s.is_empty()),
        }
    }

    /// Datastore credential, when a secret is configured.
    pub fn db_credential(&self) -> Option<String> {
        self.db_secret.as_deref().map(derive_password)
    }

    /// Whether `code` is the configured name override code.
    pub fn is_override_code(&self, code: &str) -> bool {
        self.name_override_code
            .as_deref()
            .is_some_and(|expected| bool::from(expected.as_bytes().ct_eq(code.as_bytes())))
    }
}
