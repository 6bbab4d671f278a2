//! Обработчики команд, текстовых сообщений и callback-кнопок.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MessageId};
use tracing::{info, warn};

use crate::config::Config;
use crate::dialogue::{format_schedule_time, parse_schedule_time, SessionStore, UserState};
use crate::dispatcher::{BroadcastTarget, DeliveryReport, Dispatcher};
use crate::error::{Error, Result};
use crate::keyboards;
use crate::metrics;
use crate::storage::{ChannelInfo, ScheduledPost, Storage};
use crate::telegram::Messenger;
use crate::texts;

/// Shared bot context, cloned into every dptree endpoint.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub sessions: Arc<SessionStore>,
    pub messenger: Arc<dyn Messenger>,
    pub dispatcher: Arc<Dispatcher>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(storage: Arc<Storage>, messenger: Arc<dyn Messenger>, config: Arc<Config>) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(messenger.clone())),
            sessions: Arc::new(SessionStore::new()),
            storage,
            messenger,
            config,
        }
    }
}

/// Commands and the text side of the state machine.
pub async fn handle_message(bot: Bot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let text = match msg.text() {
        Some(text) => text,
        None => return Ok(()),
    };
    let user_id = match msg.from() {
        Some(user) => user.id.0 as i64,
        None => return Ok(()),
    };

    match text {
        "/start" => {
            bot.send_message(msg.chat.id, texts::WELCOME)
                .reply_markup(keyboards::main_menu())
                .await?;
            return Ok(());
        }
        "/help" => {
            bot.send_message(msg.chat.id, texts::HELP)
                .reply_markup(keyboards::main_menu())
                .await?;
            return Ok(());
        }
        "/post" => {
            if state.storage.user_channels(user_id).await.is_empty() {
                bot.send_message(msg.chat.id, texts::NO_CHANNELS).await?;
            } else {
                state
                    .sessions
                    .set(user_id, UserState::AwaitingPostMessage)
                    .await;
                bot.send_message(msg.chat.id, texts::ENTER_MESSAGE)
                    .reply_markup(keyboards::cancel_keyboard())
                    .await?;
            }
            return Ok(());
        }
        "/schedule" => {
            if state.storage.user_channels(user_id).await.is_empty() {
                bot.send_message(msg.chat.id, texts::NO_CHANNELS).await?;
            } else {
                state
                    .sessions
                    .set(user_id, UserState::AwaitingScheduleMessage)
                    .await;
                bot.send_message(msg.chat.id, texts::ENTER_SCHEDULE_MESSAGE)
                    .reply_markup(keyboards::cancel_keyboard())
                    .await?;
            }
            return Ok(());
        }
        "/manage" => {
            bot.send_message(msg.chat.id, texts::MAIN_MENU)
                .reply_markup(keyboards::main_menu())
                .await?;
            return Ok(());
        }
        _ => {}
    }

    // The cancel button is a plain text message, not a callback.
    if text == texts::BTN_CANCEL {
        state.sessions.reset(user_id).await;
        bot.send_message(msg.chat.id, texts::CANCELLED)
            .reply_markup(keyboards::main_menu())
            .await?;
        return Ok(());
    }

    match state.sessions.state(user_id).await {
        UserState::AwaitingPostMessage => {
            let report = run_immediate_broadcast(&state, user_id, text).await;
            bot.send_message(msg.chat.id, report.summary())
                .reply_markup(keyboards::main_menu())
                .await?;
        }
        UserState::AwaitingScheduleMessage => {
            state
                .sessions
                .set(
                    user_id,
                    UserState::AwaitingScheduleTime {
                        message: text.to_string(),
                    },
                )
                .await;
            bot.send_message(msg.chat.id, texts::ENTER_SCHEDULE_TIME)
                .await?;
        }
        UserState::AwaitingScheduleTime { message } => {
            match enqueue_scheduled_post(&state, user_id, &message, text).await {
                Ok(schedule_time) => {
                    bot.send_message(
                        msg.chat.id,
                        texts::message_scheduled(&format_schedule_time(schedule_time)),
                    )
                    .reply_markup(keyboards::main_menu())
                    .await?;
                }
                // The state stays put so the user can retype the time.
                Err(Error::TimeInPast) => {
                    bot.send_message(msg.chat.id, texts::TIME_IN_PAST).await?;
                }
                Err(Error::InvalidTimeFormat(_)) => {
                    bot.send_message(msg.chat.id, texts::INVALID_TIME).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        UserState::AwaitingChannelId => {
            let reply = match register_channel(&state, user_id, text).await {
                Ok(RegisterOutcome::Added(title)) => texts::channel_added(&title),
                Ok(RegisterOutcome::NotAdmin(title)) => texts::bot_not_admin(&title),
                Ok(RegisterOutcome::LimitReached) => texts::MAX_CHANNELS.to_string(),
                Err(e) => {
                    warn!("Channel registration failed for user {}: {}", user_id, e);
                    texts::channel_error(&e.to_string())
                }
            };
            state.sessions.reset(user_id).await;
            bot.send_message(msg.chat.id, reply)
                .reply_markup(keyboards::main_menu())
                .await?;
        }
        UserState::Idle => {}
    }

    Ok(())
}

/// Menu callbacks. Every query is answered and menu screens are edited
/// in place.
pub async fn handle_callback(bot: Bot, q: CallbackQuery, state: AppState) -> anyhow::Result<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let data = match q.data.as_deref() {
        Some(data) => data,
        None => return Ok(()),
    };
    let user_id = q.from.id.0 as i64;
    let (chat_id, message_id) = match q.message {
        Some(ref message) => (message.chat.id, message.id),
        None => return Ok(()),
    };

    match data {
        "post_now" => {
            if state.storage.user_channels(user_id).await.is_empty() {
                edit_screen(
                    &bot,
                    chat_id,
                    message_id,
                    texts::NO_CHANNELS,
                    keyboards::main_menu(),
                )
                .await?;
            } else {
                state
                    .sessions
                    .set(user_id, UserState::AwaitingPostMessage)
                    .await;
                edit_screen(
                    &bot,
                    chat_id,
                    message_id,
                    texts::ENTER_MESSAGE,
                    keyboards::cancel_keyboard(),
                )
                .await?;
            }
        }
        "schedule_post" => {
            if state.storage.user_channels(user_id).await.is_empty() {
                edit_screen(
                    &bot,
                    chat_id,
                    message_id,
                    texts::NO_CHANNELS,
                    keyboards::main_menu(),
                )
                .await?;
            } else {
                state
                    .sessions
                    .set(user_id, UserState::AwaitingScheduleMessage)
                    .await;
                edit_screen(
                    &bot,
                    chat_id,
                    message_id,
                    texts::ENTER_SCHEDULE_MESSAGE,
                    keyboards::cancel_keyboard(),
                )
                .await?;
            }
        }
        "add_channel" => {
            state
                .sessions
                .set(user_id, UserState::AwaitingChannelId)
                .await;
            edit_screen(
                &bot,
                chat_id,
                message_id,
                texts::ENTER_CHANNEL_ID,
                keyboards::cancel_keyboard(),
            )
            .await?;
        }
        "list_channels" => {
            let channels = state.storage.user_channels(user_id).await;
            let text = if channels.is_empty() {
                texts::NO_CHANNELS.to_string()
            } else {
                channels_overview(&channels)
            };
            edit_screen(&bot, chat_id, message_id, text, keyboards::main_menu()).await?;
        }
        "remove_channel" => {
            let channels = state.storage.user_channels(user_id).await;
            if channels.is_empty() {
                edit_screen(
                    &bot,
                    chat_id,
                    message_id,
                    texts::NO_CHANNELS,
                    keyboards::main_menu(),
                )
                .await?;
            } else {
                edit_screen(
                    &bot,
                    chat_id,
                    message_id,
                    texts::CHOOSE_CHANNEL_TO_REMOVE,
                    keyboards::channel_list(&channels, "remove"),
                )
                .await?;
            }
        }
        "scheduled_posts" => {
            let posts = state.storage.user_scheduled_posts(user_id).await;
            if posts.is_empty() {
                edit_screen(
                    &bot,
                    chat_id,
                    message_id,
                    texts::NO_SCHEDULED,
                    keyboards::main_menu(),
                )
                .await?;
            } else {
                edit_screen(
                    &bot,
                    chat_id,
                    message_id,
                    texts::SCHEDULED_LIST,
                    keyboards::scheduled_posts_list(&posts),
                )
                .await?;
            }
        }
        "back_to_main" => {
            edit_screen(
                &bot,
                chat_id,
                message_id,
                texts::MAIN_MENU,
                keyboards::main_menu(),
            )
            .await?;
        }
        "cancel" => {
            state.sessions.reset(user_id).await;
            edit_screen(
                &bot,
                chat_id,
                message_id,
                texts::CANCELLED,
                keyboards::main_menu(),
            )
            .await?;
        }
        _ => {
            if let Some(channel_id) = data.strip_prefix("remove_ch_") {
                let removed = state.storage.remove_channel(user_id, channel_id).await?;
                let text = if removed {
                    info!("🗑 User {} removed channel {}", user_id, channel_id);
                    texts::CHANNEL_REMOVED
                } else {
                    texts::CHANNEL_REMOVE_ERROR
                };
                edit_screen(&bot, chat_id, message_id, text, keyboards::main_menu()).await?;
            } else if let Some(post_id) = data.strip_prefix("scheduled_detail_") {
                match state.storage.find_scheduled_post(user_id, post_id).await {
                    Some(post) => {
                        edit_screen(
                            &bot,
                            chat_id,
                            message_id,
                            scheduled_post_details(&post),
                            keyboards::scheduled_post_detail(post_id),
                        )
                        .await?;
                    }
                    None => {
                        edit_screen(
                            &bot,
                            chat_id,
                            message_id,
                            texts::POST_NOT_FOUND,
                            keyboards::main_menu(),
                        )
                        .await?;
                    }
                }
            } else if let Some(post_id) = data.strip_prefix("delete_scheduled_") {
                // Only the owner of a queued post may delete it.
                let deleted = match state.storage.find_scheduled_post(user_id, post_id).await {
                    Some(_) => state.storage.remove_scheduled_post(post_id).await?,
                    None => false,
                };
                let text = if deleted {
                    info!("🗑 User {} deleted scheduled post {}", user_id, post_id);
                    texts::SCHEDULED_DELETED
                } else {
                    texts::SCHEDULED_DELETE_ERROR
                };
                edit_screen(&bot, chat_id, message_id, text, keyboards::main_menu()).await?;
            }
        }
    }

    Ok(())
}

async fn edit_screen(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    text: impl Into<String>,
    markup: InlineKeyboardMarkup,
) -> anyhow::Result<()> {
    bot.edit_message_text(chat_id, message_id, text)
        .reply_markup(markup)
        .await?;
    Ok(())
}

/// Broadcast `message` to every channel the user has right now. The
/// dialogue state is cleared before the sends start.
async fn run_immediate_broadcast(state: &AppState, user_id: i64, message: &str) -> DeliveryReport {
    let channels = state.storage.user_channels(user_id).await;
    state.sessions.reset(user_id).await;

    let targets: Vec<BroadcastTarget> = channels
        .into_iter()
        .map(|(channel_id, info)| BroadcastTarget {
            channel_id,
            title: info.title,
        })
        .collect();

    let started = Instant::now();
    let report = state.dispatcher.deliver(message, &targets).await;
    metrics::record_broadcast("immediate", started.elapsed());
    report
}

/// Parse the schedule time and queue the post with a snapshot of the
/// user's current channels. Parse failures leave the dialogue state
/// untouched.
async fn enqueue_scheduled_post(
    state: &AppState,
    user_id: i64,
    message: &str,
    time_input: &str,
) -> Result<DateTime<Utc>> {
    let schedule_time = parse_schedule_time(time_input, &state.config.time_formats, Utc::now())?;
    let channels: Vec<String> = state
        .storage
        .user_channels(user_id)
        .await
        .into_keys()
        .collect();
    let post_id = state
        .storage
        .add_scheduled_post(user_id, message, schedule_time, channels)
        .await?;
    state.sessions.reset(user_id).await;
    info!(
        "📅 User {} scheduled post {} for {}",
        user_id, post_id, schedule_time
    );
    Ok(schedule_time)
}

enum RegisterOutcome {
    Added(String),
    NotAdmin(String),
    LimitReached,
}

/// Resolve the chat, check the bot's rights there and register the
/// channel for the user.
async fn register_channel(
    state: &AppState,
    user_id: i64,
    channel_id: &str,
) -> Result<RegisterOutcome> {
    let meta = state.messenger.resolve_chat(channel_id).await?;
    if !state.messenger.bot_is_admin(channel_id).await? {
        return Ok(RegisterOutcome::NotAdmin(meta.title));
    }
    if state
        .storage
        .add_channel(user_id, channel_id, &meta.title)
        .await?
    {
        info!(
            "➕ User {} added channel {} ({})",
            user_id, channel_id, meta.title
        );
        Ok(RegisterOutcome::Added(meta.title))
    } else {
        Ok(RegisterOutcome::LimitReached)
    }
}

fn channels_overview(channels: &std::collections::BTreeMap<String, ChannelInfo>) -> String {
    let mut text = format!("{}\n\n", texts::CHANNELS_HEADER);
    for (channel_id, info) in channels {
        text.push_str(&format!("📢 {}\n   ID: {}\n\n", info.title, channel_id));
    }
    text
}

fn scheduled_post_details(post: &ScheduledPost) -> String {
    format!(
        "⏰ Запланированный пост:\n\n📅 Время: {}\n📝 Сообщение: {}\n📢 Каналов: {}",
        format_schedule_time(post.schedule_time),
        keyboards::message_preview(&post.message, 100),
        post.channels.len()
    )
}
