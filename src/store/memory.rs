//! In-memory datastore.
//!
//! All tables sit behind one `RwLock`, so each trait call is a single
//! atomic unit: check-then-insert sequences cannot interleave.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{AchievementDef, Datastore, DownloadRecord, ScoreRecord, UnlockRecord};
use crate::core::game_id::GameId;
use crate::error::{PbxError, Result};

/// Unlock uniqueness key: (achievement id, game code, player).
type UnlockKey = (u32, String, String);

#[derive(Default)]
struct Tables {
    players: BTreeSet<String>,
    scores: Vec<ScoreRecord>,
    unlocks: BTreeMap<UnlockKey, UnlockRecord>,
    downloads: Vec<DownloadRecord>,
    versions: BTreeSet<GameId>,
    titles: BTreeMap<String, String>,
    achievements: BTreeMap<(String, u32), AchievementDef>,
}

/// Datastore kept entirely in process memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| PbxError::UpstreamFailure("datastore lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| PbxError::UpstreamFailure("datastore lock poisoned".into()))
    }
}

impl Datastore for MemoryStore {
    fn player_exists(&self, name: &str) -> Result<bool> {
        Ok(self.read()?.players.contains(name))
    }

    fn insert_player(&self, name: &str) -> Result<bool> {
        Ok(self.write()?.players.insert(name.to_string()))
    }

    fn rename_player(&self, old: &str, new: &str) -> Result<()> {
        let mut tables = self.write()?;
        if !tables.players.contains(old) {
            return Err(PbxError::unknown_player(old));
        }
        if tables.players.contains(new) {
            return Err(PbxError::DuplicateEntity(new.to_string()));
        }
        tables.players.remove(old);
        tables.players.insert(new.to_string());

        for score in tables.scores.iter_mut().filter(|s| s.player_name == old) {
            score.player_name = new.to_string();
        }
        let moved: Vec<UnlockKey> = tables.unlocks.keys().filter(|k| k.2 == old).cloned().collect();
        for key in moved {
            if let Some(mut record) = tables.unlocks.remove(&key) {
                record.player_name = new.to_string();
                tables.unlocks.insert((key.0, key.1, new.to_string()), record);
            }
        }
        Ok(())
    }

    fn insert_score(&self, record: ScoreRecord) -> Result<()> {
        let mut tables = self.write()?;
        if !tables.players.contains(&record.player_name) {
            return Err(PbxError::unknown_player(record.player_name));
        }
        tables.scores.push(record);
        Ok(())
    }

    fn scores(&self) -> Result<Vec<ScoreRecord>> {
        Ok(self.read()?.scores.clone())
    }

    fn unlock_exists(&self, achievement_id: u32, game_code: &str, player_name: &str) -> Result<bool> {
        let key = (achievement_id, game_code.to_string(), player_name.to_string());
        Ok(self.read()?.unlocks.contains_key(&key))
    }

    fn insert_unlock(&self, record: UnlockRecord) -> Result<bool> {
        let mut tables = self.write()?;
        if !tables.players.contains(&record.player_name) {
            return Err(PbxError::unknown_player(record.player_name));
        }
        let key = (record.achievement_id, record.game.code.clone(), record.player_name.clone());
        if tables.unlocks.contains_key(&key) {
            return Ok(false);
        }
        tables.unlocks.insert(key, record);
        Ok(true)
    }

    fn unlocks_for(&self, game_code: &str, player_name: &str) -> Result<Vec<UnlockRecord>> {
        Ok(self
            .read()?
            .unlocks
            .values()
            .filter(|u| u.game.code == game_code && u.player_name == player_name)
            .cloned()
            .collect())
    }

    fn insert_download(&self, record: DownloadRecord) -> Result<()> {
        self.write()?.downloads.push(record);
        Ok(())
    }

    fn download_count(&self, game: &GameId) -> Result<u64> {
        Ok(self.read()?.downloads.iter().filter(|d| &d.game == game).count() as u64)
    }

    fn downloads(&self) -> Result<Vec<DownloadRecord>> {
        Ok(self.read()?.downloads.clone())
    }

    fn game_versions(&self) -> Result<Vec<GameId>> {
        Ok(self.read()?.versions.iter().cloned().collect())
    }

    fn insert_game_version(&self, game: &GameId) -> Result<bool> {
        Ok(self.write()?.versions.insert(game.clone()))
    }

    fn game_title(&self, code: &str) -> Result<Option<String>> {
        Ok(self.read()?.titles.get(code).cloned())
    }

    fn upsert_game_title(&self, code: &str, title: &str) -> Result<()> {
        self.write()?.titles.insert(code.to_string(), title.to_string());
        Ok(())
    }

    fn achievements(&self) -> Result<Vec<AchievementDef>> {
        Ok(self.read()?.achievements.values().cloned().collect())
    }

    fn upsert_achievement(&self, def: AchievementDef) -> Result<()> {
        self.write()?.achievements.insert((def.game_code.clone(), def.id), def);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::salt::parse_timestamp;
    use std::sync::Arc;

    fn unlock(player: &str, id: u32, game: &str) -> UnlockRecord {
        UnlockRecord {
            player_name: player.into(),
            achievement_id: id,
            game: game.parse().unwrap(),
            date_time: parse_timestamp("2014-01-18 12:30:46").unwrap(),
        }
    }

    fn score(player: &str, value: i64) -> ScoreRecord {
        ScoreRecord {
            player_name: player.into(),
            score: value,
            level: None,
            date_time: parse_timestamp("2014-01-18 12:30:46").unwrap(),
            game: "TEST-1.0.0.0".parse().unwrap(),
            country_code: None,
        }
    }

    #[test]
    fn test_player_uniqueness() {
        let store = MemoryStore::new();
        assert!(store.insert_player("alice").unwrap());
        assert!(!store.insert_player("alice").unwrap());
        assert!(store.player_exists("alice").unwrap());
        assert!(!store.player_exists("bob").unwrap());
    }

    #[test]
    fn test_unlock_uniqueness_ignores_version() {
        let store = MemoryStore::new();
        store.insert_player("alice").unwrap();
        assert!(store.insert_unlock(unlock("alice", 1, "TEST-1.0.0.0")).unwrap());
        assert!(!store.insert_unlock(unlock("alice", 1, "TEST-1.1.0.0")).unwrap());
        assert!(store.unlock_exists(1, "TEST", "alice").unwrap());
        assert_eq!(store.unlocks_for("TEST", "alice").unwrap().len(), 1);
    }

    #[test]
    fn test_unlock_requires_player() {
        let store = MemoryStore::new();
        let result = store.insert_unlock(unlock("ghost", 1, "TEST-1.0.0.0"));
        assert_eq!(result, Err(PbxError::unknown_player("ghost")));
    }

    #[test]
    fn test_score_requires_player() {
        let store = MemoryStore::new();
        assert!(store.insert_score(score("ghost", 10)).is_err());
        store.insert_player("ghost").unwrap();
        store.insert_score(score("ghost", 10)).unwrap();
        assert_eq!(store.scores().unwrap().len(), 1);
    }

    #[test]
    fn test_rename_moves_records() {
        let store = MemoryStore::new();
        store.insert_player("alice").unwrap();
        store.insert_player("carol").unwrap();
        store.insert_score(score("alice", 10)).unwrap();
        store.insert_unlock(unlock("alice", 2, "TEST-1.0.0.0")).unwrap();

        assert_eq!(store.rename_player("alice", "carol"), Err(PbxError::DuplicateEntity("carol".into())));
        assert_eq!(store.rename_player("nobody", "dave"), Err(PbxError::unknown_player("nobody")));

        store.rename_player("alice", "alicia").unwrap();
        assert!(!store.player_exists("alice").unwrap());
        assert_eq!(store.scores().unwrap()[0].player_name, "alicia");
        assert!(store.unlock_exists(2, "TEST", "alicia").unwrap());
    }

    #[test]
    fn test_concurrent_duplicate_unlocks() {
        let store = Arc::new(MemoryStore::new());
        store.insert_player("alice").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.insert_unlock(unlock("alice", 7, "TEST-1.0.0.0")).unwrap())
            })
            .collect();

        let inserted = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();
        assert_eq!(inserted, 1);
        assert_eq!(store.unlocks_for("TEST", "alice").unwrap().len(), 1);
    }

    #[test]
    fn test_versions_and_titles() {
        let store = MemoryStore::new();
        let id: GameId = "TEST-1.0.0.0".parse().unwrap();
        assert!(store.insert_game_version(&id).unwrap());
        assert!(!store.insert_game_version(&id).unwrap());
        assert_eq!(store.game_versions().unwrap(), vec![id.clone()]);

        assert_eq!(store.game_title("TEST").unwrap(), None);
        store.upsert_game_title("TEST", "Test Game").unwrap();
        assert_eq!(store.game_title("TEST").unwrap().as_deref(), Some("Test Game"));

        let record = DownloadRecord {
            game: id.clone(),
            platform: "WIN".into(),
            date_time: parse_timestamp("2014-01-18 12:00:00").unwrap(),
        };
        store.insert_download(record.clone()).unwrap();
        assert_eq!(store.download_count(&id).unwrap(), 1);
        assert_eq!(store.downloads().unwrap(), vec![record]);
    }
}
