//! Game Catalog
//!
//! Known game builds, titles and achievement definitions as an immutable
//! [`Catalog`] snapshot. Handlers read whatever snapshot is current; a
//! [`CatalogCell::refresh`] call syncs the sources into the datastore and
//! swaps in a new snapshot without blocking readers for long.

pub mod source;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::core::game_id::{GameId, GameQuery};
use crate::error::Result;
use crate::store::{AchievementDef, Datastore};

pub use source::{
    CatalogFile, DefinitionSource, DirectoryReleases, JsonDefinitions, LogNotifier, Notifier, ReleaseSource,
};

/// Immutable view of the known games.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    versions: BTreeSet<GameId>,
    titles: BTreeMap<String, String>,
    achievements: BTreeMap<String, BTreeMap<u32, AchievementDef>>,
}

impl Catalog {
    /// Catalog with nothing in it.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from the datastore.
    pub fn load(store: &dyn Datastore) -> Result<Self> {
        let versions = store.game_versions()?.into_iter().collect::<BTreeSet<_>>();

        let mut titles = BTreeMap::new();
        let codes: BTreeSet<String> = versions.iter().map(|v| v.code.clone()).collect();
        for code in codes {
            if let Some(title) = store.game_title(&code)? {
                titles.insert(code, title);
            }
        }

        let mut achievements: BTreeMap<String, BTreeMap<u32, AchievementDef>> = BTreeMap::new();
        for def in store.achievements()? {
            if !titles.contains_key(&def.game_code) {
                if let Some(title) = store.game_title(&def.game_code)? {
                    titles.insert(def.game_code.clone(), title);
                }
            }
            achievements.entry(def.game_code.clone()).or_default().insert(def.id, def);
        }

        Ok(Self { versions, titles, achievements })
    }

    /// Whether any known build satisfies the query.
    pub fn has(&self, query: &GameQuery) -> bool {
        match query {
            GameQuery::Exact(id) => self.versions.contains(id),
            GameQuery::AnyVersion(code) => self.latest(code).is_some(),
        }
    }

    /// Highest known build of a game code.
    pub fn latest(&self, code: &str) -> Option<&GameId> {
        self.versions.iter().filter(|v| v.code == code).max()
    }

    /// Display title of a game code.
    pub fn title(&self, code: &str) -> Option<&str> {
        self.titles.get(code).map(String::as_str)
    }

    /// One achievement definition.
    pub fn achievement(&self, code: &str, id: u32) -> Option<&AchievementDef> {
        self.achievements.get(code).and_then(|defs| defs.get(&id))
    }

    /// All achievements of a game code, by id.
    pub fn achievements_of(&self, code: &str) -> impl Iterator<Item = &AchievementDef> {
        self.achievements.get(code).into_iter().flat_map(|defs| defs.values())
    }

    /// Number of known builds.
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }
}

/// Where a refresh reads from.
pub struct CatalogSources {
    /// Titles and achievements.
    pub definitions: Box<dyn DefinitionSource>,
    /// Published builds.
    pub releases: Box<dyn ReleaseSource>,
    /// Alert sink for inconsistencies.
    pub notifier: Box<dyn Notifier>,
}

/// What a refresh changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Builds seen for the first time.
    pub new_versions: Vec<GameId>,
    /// New builds whose game code has no title.
    pub untitled: Vec<String>,
    /// Achievement definitions written.
    pub achievements: usize,
}

/// Holder of the current catalog snapshot.
pub struct CatalogCell {
    current: RwLock<Arc<Catalog>>,
}

impl CatalogCell {
    /// Start from a given snapshot.
    pub fn new(catalog: Catalog) -> Self {
        Self { current: RwLock::new(Arc::new(catalog)) }
    }

    /// The current snapshot.
    pub fn current(&self) -> Arc<Catalog> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Swap in a new snapshot.
    pub fn replace(&self, catalog: Catalog) {
        let catalog = Arc::new(catalog);
        match self.current.write() {
            Ok(mut guard) => *guard = catalog,
            Err(poisoned) => *poisoned.into_inner() = catalog,
        }
    }

    /// Sync sources into the datastore, then rebuild the snapshot.
    pub fn refresh(&self, sources: &CatalogSources, store: &dyn Datastore) -> Result<RefreshReport> {
        let mut report = RefreshReport::default();

        let definitions = sources.definitions.load()?;
        for game in &definitions.games {
            store.upsert_game_title(&game.id, &game.title)?;
            for entry in &game.achievements {
                store.upsert_achievement(AchievementDef {
                    game_code: game.id.clone(),
                    id: entry.id,
                    title: entry.title.clone(),
                    description: entry.description.clone(),
                })?;
                report.achievements += 1;
            }
        }

        for release in sources.releases.list_releases()? {
            if !store.insert_game_version(&release)? {
                continue;
            }
            if store.game_title(&release.code)?.is_none() {
                sources.notifier.alert(
                    "untitled game release",
                    &format!(
                        "The game with the id {} was published as {} but has no title in the catalog",
                        release.code, release
                    ),
                );
                report.untitled.push(release.code.clone());
            }
            report.new_versions.push(release);
        }

        let catalog = Catalog::load(store)?;
        info!(
            "Catalog refreshed: {} builds ({} new), {} achievements",
            catalog.version_count(),
            report.new_versions.len(),
            report.achievements
        );
        self.replace(catalog);
        Ok(report)
    }
}

/// A catalog cell bound to its sources and store, for periodic refresh.
pub struct CatalogRefresher {
    cell: Arc<CatalogCell>,
    sources: CatalogSources,
    store: Arc<dyn Datastore>,
}

impl CatalogRefresher {
    /// Bind a cell to where it refreshes from.
    pub fn new(cell: Arc<CatalogCell>, sources: CatalogSources, store: Arc<dyn Datastore>) -> Self {
        Self { cell, sources, store }
    }

    /// Run one refresh.
    pub fn refresh(&self) -> Result<RefreshReport> {
        self.cell.refresh(&self.sources, self.store.as_ref())
    }

    /// The refreshed cell.
    pub fn cell(&self) -> &Arc<CatalogCell> {
        &self.cell
    }
}

// =============================================================================
// TESTS
// =============================================================================
