//! Inline keyboards for the bot menus.

use std::collections::BTreeMap;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::dialogue::format_schedule_time;
use crate::storage::{ChannelInfo, ScheduledPost};
use crate::texts;

/// Build main menu keyboard.
pub fn main_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            texts::BTN_POST_NOW,
            "post_now",
        )],
        vec![InlineKeyboardButton::callback(
            texts::BTN_SCHEDULE,
            "schedule_post",
        )],
        vec![InlineKeyboardButton::callback(
            texts::BTN_ADD_CHANNEL,
            "add_channel",
        )],
        vec![InlineKeyboardButton::callback(
            texts::BTN_LIST_CHANNELS,
            "list_channels",
        )],
        vec![InlineKeyboardButton::callback(
            texts::BTN_SCHEDULED,
            "scheduled_posts",
        )],
        vec![InlineKeyboardButton::callback(
            texts::BTN_REMOVE_CHANNEL,
            "remove_channel",
        )],
    ])
}

/// One button per registered channel plus a back row.
/// `action` becomes the callback prefix, e.g. "remove" -> "remove_ch_<id>".
pub fn channel_list(
    channels: &BTreeMap<String, ChannelInfo>,
    action: &str,
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = channels
        .iter()
        .map(|(channel_id, info)| {
            vec![InlineKeyboardButton::callback(
                format!("📢 {}", info.title),
                format!("{}_ch_{}", action, channel_id),
            )]
        })
        .collect();
    rows.push(vec![InlineKeyboardButton::callback(
        texts::BTN_BACK,
        "back_to_main",
    )]);
    InlineKeyboardMarkup::new(rows)
}

/// One button per queued post, labeled with its time and a short preview.
pub fn scheduled_posts_list(posts: &[ScheduledPost]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = posts
        .iter()
        .map(|post| {
            let label = format!(
                "⏰ {} - {}",
                format_schedule_time(post.schedule_time),
                message_preview(&post.message, 30)
            );
            vec![InlineKeyboardButton::callback(
                label,
                format!("scheduled_detail_{}", post.id),
            )]
        })
        .collect();
    rows.push(vec![InlineKeyboardButton::callback(
        texts::BTN_BACK,
        "back_to_main",
    )]);
    InlineKeyboardMarkup::new(rows)
}

/// Delete / back actions for one queued post.
pub fn scheduled_post_detail(post_id: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            texts::BTN_DELETE,
            format!("delete_scheduled_{}", post_id),
        )],
        vec![InlineKeyboardButton::callback(
            texts::BTN_BACK,
            "scheduled_posts",
        )],
    ])
}

/// Single cancel button shown during input flows.
pub fn cancel_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        texts::BTN_CANCEL,
        "cancel",
    )]])
}

/// Truncate a message for a button label, char-boundary safe.
pub fn message_preview(message: &str, max_chars: usize) -> String {
    if message.chars().count() > max_chars {
        let truncated: String = message.chars().take(max_chars).collect();
        format!("{}...", truncated)
    } else {
        message.to_string()
    }
}
