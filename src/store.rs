use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use teloxide::types::{FileId, UserId};

use crate::error::CoverBotError;

/// Per-user usage counters. Values only ever grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub videos: u64,
    pub covers_changed: u64,
}

/// File-backed key-value store with three logical tables: saved covers,
/// usage counters, and the unique-user registry. Callers hold it behind a
/// mutex, so every read-modify-write here runs to completion unobserved.
pub struct Store {
    covers: HashMap<String, HashMap<String, FileId>>,
    counters: HashMap<String, Counters>,
    users: HashMap<String, String>,
    data_dir: PathBuf,
    loaded: bool,
}

impl Store {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            covers: HashMap::new(),
            counters: HashMap::new(),
            users: HashMap::new(),
            data_dir,
            loaded: false,
        }
    }

    fn covers_file(&self) -> PathBuf {
        self.data_dir.join("covers.json")
    }

    fn counters_file(&self) -> PathBuf {
        self.data_dir.join("counters.json")
    }

    fn users_file(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }

    async fn load(&mut self) {
        if self.loaded {
            return;
        }
        if let Ok(data) = tokio::fs::read_to_string(self.covers_file()).await {
            if let Ok(parsed) = serde_json::from_str(&data) {
                self.covers = parsed;
            }
        }
        if let Ok(data) = tokio::fs::read_to_string(self.counters_file()).await {
            if let Ok(parsed) = serde_json::from_str(&data) {
                self.counters = parsed;
            }
        }
        if let Ok(data) = tokio::fs::read_to_string(self.users_file()).await {
            if let Ok(parsed) = serde_json::from_str(&data) {
                self.users = parsed;
            }
        }
        self.loaded = true;
    }

    async fn save_table<T: Serialize>(
        &self,
        path: PathBuf,
        table: &T,
    ) -> Result<(), CoverBotError> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let json = serde_json::to_string_pretty(table)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub async fn covers(&mut self, user: UserId) -> HashMap<String, FileId> {
        self.load().await;
        self.covers.get(&user.to_string()).cloned().unwrap_or_default()
    }

    pub async fn put_cover(
        &mut self,
        user: UserId,
        name: &str,
        file_id: FileId,
    ) -> Result<(), CoverBotError> {
        self.load().await;
        self.covers
            .entry(user.to_string())
            .or_default()
            .insert(name.to_string(), file_id);
        self.save_table(self.covers_file(), &self.covers).await
    }

    /// Removes one saved cover. Returns false when the name was not there.
    pub async fn delete_cover(
        &mut self,
        user: UserId,
        name: &str,
    ) -> Result<bool, CoverBotError> {
        self.load().await;
        let removed = self
            .covers
            .get_mut(&user.to_string())
            .map(|m| m.remove(name).is_some())
            .unwrap_or(false);
        if removed {
            self.save_table(self.covers_file(), &self.covers).await?;
        }
        Ok(removed)
    }

    pub async fn counters(&mut self, user: UserId) -> Counters {
        self.load().await;
        self.counters.get(&user.to_string()).copied().unwrap_or_default()
    }

    pub async fn bump_videos(&mut self, user: UserId) -> Result<u64, CoverBotError> {
        self.load().await;
        let entry = self.counters.entry(user.to_string()).or_default();
        entry.videos += 1;
        let value = entry.videos;
        self.save_table(self.counters_file(), &self.counters).await?;
        Ok(value)
    }

    pub async fn bump_covers_changed(&mut self, user: UserId) -> Result<u64, CoverBotError> {
        self.load().await;
        let entry = self.counters.entry(user.to_string()).or_default();
        entry.covers_changed += 1;
        let value = entry.covers_changed;
        self.save_table(self.counters_file(), &self.counters).await?;
        Ok(value)
    }

    /// Membership registration. Re-registering an already-known user
    /// keeps the original marker and does not rewrite the table.
    pub async fn register_user(
        &mut self,
        user: UserId,
        marker: &str,
    ) -> Result<(), CoverBotError> {
        self.load().await;
        let key = user.to_string();
        if self.users.contains_key(&key) {
            return Ok(());
        }
        self.users.insert(key, marker.to_string());
        self.save_table(self.users_file(), &self.users).await
    }

    pub async fn user_count(&mut self) -> usize {
        self.load().await;
        self.users.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: UserId = UserId(42);

    fn store(dir: &tempfile::TempDir) -> Store {
        Store::new(dir.path().to_path_buf())
    }

    fn fid(s: &str) -> FileId {
        FileId(s.to_string())
    }

    #[tokio::test]
    async fn test_register_user_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(&dir);
        store.register_user(USER, "alice").await.unwrap();
        store.register_user(USER, "alice again").await.unwrap();
        assert_eq!(store.user_count().await, 1);
        store.register_user(UserId(43), "bob").await.unwrap();
        assert_eq!(store.user_count().await, 2);
    }

    #[tokio::test]
    async fn test_cover_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(&dir);
        store.put_cover(USER, "sunset", fid("f1")).await.unwrap();

        let covers = store.covers(USER).await;
        assert_eq!(covers.len(), 1);
        assert_eq!(covers.get("sunset"), Some(&fid("f1")));

        assert!(store.delete_cover(USER, "sunset").await.unwrap());
        assert!(store.covers(USER).await.is_empty());
    }

    #[tokio::test]
    async fn test_default_name_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(&dir);
        store.put_cover(USER, "default", fid("first")).await.unwrap();
        store.put_cover(USER, "default", fid("second")).await.unwrap();

        let covers = store.covers(USER).await;
        assert_eq!(covers.len(), 1);
        assert_eq!(covers.get("default"), Some(&fid("second")));
    }

    #[tokio::test]
    async fn test_counters_monotonic() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(&dir);
        assert_eq!(store.counters(USER).await, Counters::default());

        for _ in 0..3 {
            store.bump_videos(USER).await.unwrap();
        }
        store.bump_covers_changed(USER).await.unwrap();

        let counters = store.counters(USER).await;
        assert_eq!(counters.videos, 3);
        assert_eq!(counters.covers_changed, 1);
    }

    #[tokio::test]
    async fn test_delete_missing_cover() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(&dir);
        assert!(!store.delete_cover(USER, "ghost").await.unwrap());
        assert_eq!(store.counters(USER).await, Counters::default());
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = store(&dir);
            store.put_cover(USER, "keep", fid("f9")).await.unwrap();
            store.bump_videos(USER).await.unwrap();
            store.register_user(USER, "alice").await.unwrap();
        }

        let mut reopened = Store::new(dir.path().to_path_buf());
        assert_eq!(reopened.covers(USER).await.get("keep"), Some(&fid("f9")));
        assert_eq!(reopened.counters(USER).await.videos, 1);
        assert_eq!(reopened.user_count().await, 1);
    }
}
