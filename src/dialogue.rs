//! Per-user conversation state and schedule-time parsing.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{Error, Result};

/// Where a user currently is in a multi-step flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UserState {
    #[default]
    Idle,
    AwaitingPostMessage,
    AwaitingScheduleMessage,
    /// The message text is stashed while we wait for the time.
    AwaitingScheduleTime {
        message: String,
    },
    AwaitingChannelId,
}

/// In-memory conversation state, one entry per user, process lifetime.
#[derive(Default)]
pub struct SessionStore {
    states: RwLock<HashMap<i64, UserState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn state(&self, user_id: i64) -> UserState {
        self.states
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn set(&self, user_id: i64, state: UserState) {
        self.states.write().await.insert(user_id, state);
    }

    pub async fn reset(&self, user_id: i64) {
        self.states.write().await.remove(&user_id);
    }
}

/// Parse user input against the configured formats, first match wins.
///
/// Input is wall-clock local time; the result is stored as UTC. Times that
/// do not map to a single local instant (DST gaps) are treated as invalid,
/// and the result must be strictly in the future.
pub fn parse_schedule_time(
    input: &str,
    formats: &[String],
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();

    let mut parsed: Option<NaiveDateTime> = None;
    for format in formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            parsed = Some(naive);
            break;
        }
    }

    let naive = parsed.ok_or_else(|| Error::InvalidTimeFormat(trimmed.to_string()))?;
    let local = Local
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| Error::InvalidTimeFormat(trimmed.to_string()))?;
    let utc = local.with_timezone(&Utc);

    if utc <= now {
        return Err(Error::TimeInPast);
    }
    Ok(utc)
}

/// Render a stored schedule time back as local "дд.мм.гггг чч:мм".
pub fn format_schedule_time(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%d.%m.%Y %H:%M").to_string()
}
