//! Telegram adapters: channel publisher, operator notifier and the bot surface

pub mod bot;
pub mod broadcast;
pub mod keyboards;
mod notifier;
mod publisher;

pub use notifier::TelegramNotifier;
pub use publisher::TelegramPublisher;

use quizcast_domain::ChatRef;
use teloxide::RequestError;
use teloxide::types::{ChatId, Recipient};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Channel must be an @username or a numeric chat id, got '{0}'")]
    Invalid(String),
}

/// Parse a channel reference from configuration (`@name` or `-100...`)
pub fn parse_channel(channel: &str) -> Result<Recipient, ChannelError> {
    let channel = channel.trim();
    if let Some(name) = channel.strip_prefix('@') {
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(ChannelError::Invalid(channel.to_string()));
        }
        return Ok(Recipient::ChannelUsername(channel.to_string()));
    }

    channel
        .parse::<i64>()
        .map(|id| Recipient::Id(ChatId(id)))
        .map_err(|_| ChannelError::Invalid(channel.to_string()))
}

pub(crate) fn chat_id(chat: ChatRef) -> ChatId {
    ChatId(chat.0)
}

pub(crate) fn is_rate_limited(error: &RequestError) -> bool {
    matches!(error, RequestError::RetryAfter(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channel_username() {
        assert_eq!(
            parse_channel("@pydaily").unwrap(),
            Recipient::ChannelUsername("@pydaily".to_string())
        );
    }

    #[test]
    fn test_parse_channel_id() {
        assert_eq!(
            parse_channel(" -1001234567890 ").unwrap(),
            Recipient::Id(ChatId(-1001234567890))
        );
    }

    #[test]
    fn test_parse_channel_rejects_garbage() {
        assert!(parse_channel("pydaily").is_err());
        assert!(parse_channel("@").is_err());
        assert!(parse_channel("").is_err());
    }
}
