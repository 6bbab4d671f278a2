//! Telegram Broadcast & Scheduling Bot Library
//!
//! This library provides tools to:
//! - Register channels and groups per user (bot admin rights verified)
//! - Broadcast a message to every registered channel at once
//! - Queue posts for future delivery and send them from a background loop
//! - Persist channel sets and the post queue in a JSON file
//! - Expose Prometheus metrics for sends and scheduler cycles

pub mod config;
pub mod dialogue;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod keyboards;
pub mod metrics;
pub mod scheduler;
pub mod storage;
pub mod telegram;
pub mod texts;

// Re-export common types
pub use config::Config;
pub use dialogue::{SessionStore, UserState};
pub use dispatcher::{BroadcastTarget, DeliveryReport, Dispatcher};
pub use error::{Error, Result};
pub use handlers::AppState;
pub use scheduler::Scheduler;
pub use storage::{ChannelInfo, ScheduledPost, Storage};
pub use telegram::{ChatMeta, Messenger, TelegramMessenger};
