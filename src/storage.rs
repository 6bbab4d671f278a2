//! Persistent bot state: per-user channel sets and the scheduled post queue.
//!
//! Single JSON document on disk, rewritten on every mutation. One mutex
//! guards the whole read-modify-write-persist sequence, shared by the
//! update handlers and the scheduler task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;

/// Registered channel or group, stored per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub title: String,
    pub added_at: DateTime<Utc>,
}

/// Message queued for future delivery.
///
/// `channels` is the snapshot of the user's channel ids taken when the
/// post was scheduled; the scheduler re-checks it against the live set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledPost {
    pub id: String,
    pub user_id: i64,
    pub message: String,
    pub schedule_time: DateTime<Utc>,
    pub channels: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserRecord {
    channels: BTreeMap<String, ChannelInfo>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    users: BTreeMap<i64, UserRecord>,
    scheduled_posts: Vec<ScheduledPost>,
}

/// JSON-file backed store.
pub struct Storage {
    path: PathBuf,
    max_channels_per_user: usize,
    state: Mutex<StoreData>,
}

impl Storage {
    /// Open the store at `path`, creating parent directories as needed.
    /// A missing or unparsable file yields the empty document.
    pub fn open<P: AsRef<Path>>(path: P, max_channels_per_user: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let state = Self::load(&path);
        Ok(Self {
            path,
            max_channels_per_user,
            state: Mutex::new(state),
        })
    }

    fn load(path: &Path) -> StoreData {
        if !path.exists() {
            return StoreData::default();
        }
        match std::fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!("⚠️ Failed to parse {}: {}", path.display(), e);
                StoreData::default()
            }),
            Err(e) => {
                warn!("⚠️ Failed to read {}: {}", path.display(), e);
                StoreData::default()
            }
        }
    }

    /// Write the document to disk. Called with the state lock held.
    fn persist(&self, data: &StoreData) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json.as_bytes())?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(
            "💾 Saved {} users, {} scheduled posts",
            data.users.len(),
            data.scheduled_posts.len()
        );
        Ok(())
    }

    /// Register a channel for a user.
    ///
    /// Returns `Ok(false)` without mutating when the user already holds the
    /// maximum number of channels, even if `channel_id` is among them.
    /// Below the limit an existing id is overwritten.
    pub async fn add_channel(&self, user_id: i64, channel_id: &str, title: &str) -> Result<bool> {
        let mut data = self.state.lock().await;
        let channels = &mut data.users.entry(user_id).or_default().channels;

        if channels.len() >= self.max_channels_per_user {
            return Ok(false);
        }

        channels.insert(
            channel_id.to_string(),
            ChannelInfo {
                title: title.to_string(),
                added_at: Utc::now(),
            },
        );
        self.persist(&data)?;
        Ok(true)
    }

    /// Remove a user's channel. `Ok(false)` if it was not registered.
    pub async fn remove_channel(&self, user_id: i64, channel_id: &str) -> Result<bool> {
        let mut data = self.state.lock().await;
        let removed = data
            .users
            .get_mut(&user_id)
            .map(|user| user.channels.remove(channel_id).is_some())
            .unwrap_or(false);

        if !removed {
            return Ok(false);
        }
        self.persist(&data)?;
        Ok(true)
    }

    /// Snapshot of a user's registered channels; empty for unknown users.
    pub async fn user_channels(&self, user_id: i64) -> BTreeMap<String, ChannelInfo> {
        let data = self.state.lock().await;
        data.users
            .get(&user_id)
            .map(|user| user.channels.clone())
            .unwrap_or_default()
    }

    /// Queue a post for delivery at `schedule_time`. Returns the new post id.
    /// Whether the time is in the future is the caller's concern.
    pub async fn add_scheduled_post(
        &self,
        user_id: i64,
        message: &str,
        schedule_time: DateTime<Utc>,
        channels: Vec<String>,
    ) -> Result<String> {
        let post = ScheduledPost {
            id: Uuid::new_v4().to_string(),
            user_id,
            message: message.to_string(),
            schedule_time,
            channels,
            created_at: Utc::now(),
            attempts: 0,
        };
        let id = post.id.clone();

        let mut data = self.state.lock().await;
        data.scheduled_posts.push(post);
        self.persist(&data)?;
        Ok(id)
    }

    /// Posts whose schedule time has passed, in insertion order.
    pub async fn due_posts(&self, now: DateTime<Utc>) -> Vec<ScheduledPost> {
        let data = self.state.lock().await;
        data.scheduled_posts
            .iter()
            .filter(|post| post.schedule_time <= now)
            .cloned()
            .collect()
    }

    /// Remove a queued post by id. `Ok(false)` if no such post.
    pub async fn remove_scheduled_post(&self, id: &str) -> Result<bool> {
        let mut data = self.state.lock().await;
        let idx = match data.scheduled_posts.iter().position(|post| post.id == id) {
            Some(idx) => idx,
            None => return Ok(false),
        };
        data.scheduled_posts.remove(idx);
        self.persist(&data)?;
        Ok(true)
    }

    /// Count one delivery attempt against a queued post.
    pub async fn record_attempt(&self, id: &str) -> Result<bool> {
        let mut data = self.state.lock().await;
        match data.scheduled_posts.iter_mut().find(|post| post.id == id) {
            Some(post) => post.attempts += 1,
            None => return Ok(false),
        }
        self.persist(&data)?;
        Ok(true)
    }

    /// All queued posts belonging to a user, in insertion order.
    pub async fn user_scheduled_posts(&self, user_id: i64) -> Vec<ScheduledPost> {
        let data = self.state.lock().await;
        data.scheduled_posts
            .iter()
            .filter(|post| post.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Look up one of the user's queued posts by id.
    pub async fn find_scheduled_post(&self, user_id: i64, id: &str) -> Option<ScheduledPost> {
        let data = self.state.lock().await;
        data.scheduled_posts
            .iter()
            .find(|post| post.user_id == user_id && post.id == id)
            .cloned()
    }

    /// Number of posts currently queued, across all users.
    pub async fn scheduled_posts_count(&self) -> usize {
        let data = self.state.lock().await;
        data.scheduled_posts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn temp_store(max_channels: usize) -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path().join("bot_data.json"), max_channels).unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn add_channel_registers_until_limit() {
        let (_dir, storage) = temp_store(2);

        assert!(storage.add_channel(1, "@one", "One").await.unwrap());
        assert!(storage.add_channel(1, "@two", "Two").await.unwrap());
        assert!(!storage.add_channel(1, "@three", "Three").await.unwrap());

        let channels = storage.user_channels(1).await;
        assert_eq!(channels.len(), 2);
        assert!(!channels.contains_key("@three"));
    }

    #[tokio::test]
    async fn at_limit_even_existing_id_is_rejected() {
        let (_dir, storage) = temp_store(1);

        assert!(storage.add_channel(1, "@one", "One").await.unwrap());
        // Limit check comes first, so re-registering is refused too.
        assert!(!storage.add_channel(1, "@one", "One again").await.unwrap());
        assert_eq!(storage.user_channels(1).await["@one"].title, "One");
    }

    #[tokio::test]
    async fn below_limit_existing_id_is_overwritten() {
        let (_dir, storage) = temp_store(5);

        assert!(storage.add_channel(1, "@one", "Old title").await.unwrap());
        assert!(storage.add_channel(1, "@one", "New title").await.unwrap());

        let channels = storage.user_channels(1).await;
        assert_eq!(channels.len(), 1);
        assert_eq!(channels["@one"].title, "New title");
    }

    #[tokio::test]
    async fn limits_are_per_user() {
        let (_dir, storage) = temp_store(1);

        assert!(storage.add_channel(1, "@one", "One").await.unwrap());
        assert!(storage.add_channel(2, "@one", "One").await.unwrap());
    }

    #[tokio::test]
    async fn remove_channel_reports_absence() {
        let (_dir, storage) = temp_store(10);

        storage.add_channel(1, "@one", "One").await.unwrap();
        assert!(storage.remove_channel(1, "@one").await.unwrap());
        assert!(!storage.remove_channel(1, "@one").await.unwrap());
        assert!(!storage.remove_channel(42, "@one").await.unwrap());
    }

    #[tokio::test]
    async fn user_channels_empty_for_unknown_user() {
        let (_dir, storage) = temp_store(10);
        assert!(storage.user_channels(404).await.is_empty());
    }

    #[tokio::test]
    async fn store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot_data.json");

        {
            let storage = Storage::open(&path, 10).unwrap();
            storage.add_channel(1, "@one", "One").await.unwrap();
            storage
                .add_scheduled_post(1, "hello", Utc::now() + Duration::hours(1), vec!["@one".into()])
                .await
                .unwrap();
        }

        let storage = Storage::open(&path, 10).unwrap();
        assert_eq!(storage.user_channels(1).await.len(), 1);
        assert_eq!(storage.user_scheduled_posts(1).await.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_file_yields_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot_data.json");
        std::fs::write(&path, "{ not json").unwrap();

        let storage = Storage::open(&path, 10).unwrap();
        assert!(storage.user_channels(1).await.is_empty());
        // Still usable for writes afterwards.
        assert!(storage.add_channel(1, "@one", "One").await.unwrap());
    }

    #[tokio::test]
    async fn due_posts_keep_insertion_order_not_time_order() {
        let (_dir, storage) = temp_store(10);
        let now = Utc::now();

        let first = storage
            .add_scheduled_post(1, "later", now - Duration::minutes(1), vec![])
            .await
            .unwrap();
        let second = storage
            .add_scheduled_post(1, "earlier", now - Duration::minutes(30), vec![])
            .await
            .unwrap();

        let due = storage.due_posts(now).await;
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].id, first);
        assert_eq!(due[1].id, second);
    }

    #[tokio::test]
    async fn due_posts_exclude_future_entries() {
        let (_dir, storage) = temp_store(10);
        let now = Utc::now();

        storage
            .add_scheduled_post(1, "due", now - Duration::seconds(5), vec![])
            .await
            .unwrap();
        storage
            .add_scheduled_post(1, "future", now + Duration::hours(2), vec![])
            .await
            .unwrap();

        let due = storage.due_posts(now).await;
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].message, "due");
    }

    #[tokio::test]
    async fn remove_scheduled_post_reports_absence() {
        let (_dir, storage) = temp_store(10);

        let id = storage
            .add_scheduled_post(1, "hello", Utc::now(), vec![])
            .await
            .unwrap();
        assert!(storage.remove_scheduled_post(&id).await.unwrap());
        assert!(!storage.remove_scheduled_post(&id).await.unwrap());
    }

    #[tokio::test]
    async fn record_attempt_increments_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot_data.json");

        let id = {
            let storage = Storage::open(&path, 10).unwrap();
            let id = storage
                .add_scheduled_post(1, "hello", Utc::now(), vec![])
                .await
                .unwrap();
            assert!(storage.record_attempt(&id).await.unwrap());
            assert!(!storage.record_attempt("missing").await.unwrap());
            id
        };

        let storage = Storage::open(&path, 10).unwrap();
        let post = storage.find_scheduled_post(1, &id).await.unwrap();
        assert_eq!(post.attempts, 1);
    }

    #[tokio::test]
    async fn find_scheduled_post_checks_owner() {
        let (_dir, storage) = temp_store(10);

        let id = storage
            .add_scheduled_post(1, "mine", Utc::now(), vec![])
            .await
            .unwrap();

        assert!(storage.find_scheduled_post(1, &id).await.is_some());
        assert!(storage.find_scheduled_post(2, &id).await.is_none());
    }

    #[tokio::test]
    async fn user_scheduled_posts_filters_by_user() {
        let (_dir, storage) = temp_store(10);
        let when = Utc::now() + Duration::hours(1);

        storage.add_scheduled_post(1, "a", when, vec![]).await.unwrap();
        storage.add_scheduled_post(2, "b", when, vec![]).await.unwrap();
        storage.add_scheduled_post(1, "c", when, vec![]).await.unwrap();

        let posts = storage.user_scheduled_posts(1).await;
        assert_eq!(posts.len(), 2);
        assert!(posts.iter().all(|post| post.user_id == 1));
        assert_eq!(storage.scheduled_posts_count().await, 3);
    }

    #[tokio::test]
    async fn scheduled_post_ids_are_unique() {
        let (_dir, storage) = temp_store(10);
        let when = Utc::now() + Duration::hours(1);

        let a = storage.add_scheduled_post(1, "same", when, vec![]).await.unwrap();
        let b = storage.add_scheduled_post(1, "same", when, vec![]).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn attempts_field_defaults_for_older_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot_data.json");
        // Document written before the attempts counter existed.
        std::fs::write(
            &path,
            r#"{
  "users": {},
  "scheduled_posts": [
    {
      "id": "legacy",
      "user_id": 1,
      "message": "hi",
      "schedule_time": "2025-01-01T00:00:00Z",
      "channels": [],
      "created_at": "2025-01-01T00:00:00Z"
    }
  ]
}"#,
        )
        .unwrap();

        let storage = Storage::open(&path, 10).unwrap();
        let post = storage.find_scheduled_post(1, "legacy").await.unwrap();
        assert_eq!(post.attempts, 0);
    }

    #[tokio::test]
    async fn file_layout_matches_expected_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot_data.json");

        let storage = Storage::open(&path, 10).unwrap();
        storage.add_channel(77, "@news", "News").await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["users"]["77"]["channels"]["@news"]["title"] == "News");
        assert!(value["scheduled_posts"].as_array().unwrap().is_empty());
    }
}
