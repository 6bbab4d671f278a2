//! Telegram Bot API collaborator behind the `Messenger` trait.
//!
//! Handlers, dispatcher and scheduler talk to Telegram only through this
//! seam, so delivery logic stays testable without a live bot.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, Recipient};

use crate::error::{Error, Result};

/// Chat metadata for a registered channel.
#[derive(Debug, Clone)]
pub struct ChatMeta {
    pub title: String,
}

/// Outbound Telegram operations.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Deliver a post to a channel or group (HTML markup enabled).
    async fn send_post(&self, channel_id: &str, text: &str) -> Result<()>;

    /// Send a plain service message to a user's private chat.
    async fn send_user_text(&self, user_id: i64, text: &str) -> Result<()>;

    /// Resolve a channel id to its metadata.
    async fn resolve_chat(&self, channel_id: &str) -> Result<ChatMeta>;

    /// Whether the bot is administrator or owner of the chat.
    async fn bot_is_admin(&self, channel_id: &str) -> Result<bool>;
}

/// Stored channel ids are either `@username` or a numeric chat id.
fn parse_recipient(channel_id: &str) -> Result<Recipient> {
    if channel_id.starts_with('@') {
        Ok(Recipient::ChannelUsername(channel_id.to_string()))
    } else if let Ok(chat_id) = channel_id.parse::<i64>() {
        Ok(Recipient::Id(ChatId(chat_id)))
    } else {
        Err(Error::InvalidChannelId(channel_id.to_string()))
    }
}

/// `Messenger` over a live teloxide `Bot`.
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_post(&self, channel_id: &str, text: &str) -> Result<()> {
        let recipient = parse_recipient(channel_id)?;
        self.bot
            .send_message(recipient, text)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }

    async fn send_user_text(&self, user_id: i64, text: &str) -> Result<()> {
        self.bot.send_message(ChatId(user_id), text).await?;
        Ok(())
    }

    async fn resolve_chat(&self, channel_id: &str) -> Result<ChatMeta> {
        let recipient = parse_recipient(channel_id)?;
        let chat = self.bot.get_chat(recipient).await?;
        let title = chat
            .title()
            .map(|t| t.to_string())
            .unwrap_or_else(|| channel_id.to_string());
        Ok(ChatMeta { title })
    }

    async fn bot_is_admin(&self, channel_id: &str) -> Result<bool> {
        let recipient = parse_recipient(channel_id)?;
        let me = self.bot.get_me().await?;
        let member = self.bot.get_chat_member(recipient, me.id).await?;
        Ok(member.kind.is_privileged())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_recipient_detects_usernames() {
        match parse_recipient("@news").unwrap() {
            Recipient::ChannelUsername(name) => assert_eq!(name, "@news"),
            other => panic!("unexpected recipient: {:?}", other),
        }
    }

    #[test]
    fn parse_recipient_detects_numeric_chat_ids() {
        match parse_recipient("-1001234567890").unwrap() {
            Recipient::Id(ChatId(id)) => assert_eq!(id, -1001234567890),
            other => panic!("unexpected recipient: {:?}", other),
        }
    }

    #[test]
    fn parse_recipient_rejects_garbage() {
        let err = parse_recipient("news-channel").unwrap_err();
        assert!(matches!(err, Error::InvalidChannelId(_)));
    }

    #[tokio::test]
    async fn mock_messenger_scripts_failures() {
        let mock = mock::MockMessenger::new();
        mock.fail_channel("@bad", "chat not found");

        assert!(mock.send_post("@good", "hi").await.is_ok());
        assert!(mock.send_post("@bad", "hi").await.is_err());
        assert_eq!(mock.sent_posts().len(), 1);
    }
}
