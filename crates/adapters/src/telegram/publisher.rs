//! Telegram channel publisher

use async_trait::async_trait;
use quizcast_domain::{ChannelPost, PollSpec, PublishError, PublishResult, Publisher};
use teloxide::RequestError;
use teloxide::prelude::*;
use teloxide::types::{InputFile, InputPollOption, Message, PollType, Recipient};

use super::is_rate_limited;

/// Delivers channel posts through the Bot API
pub struct TelegramPublisher {
    bot: Bot,
    channel: Recipient,
}

impl TelegramPublisher {
    pub fn new(bot: Bot, channel: Recipient) -> Self {
        Self { bot, channel }
    }

    async fn send_text(&self, text: &str, image_url: Option<&str>) -> Result<Message, PublishError> {
        if let Some(image_url) = image_url {
            let url = url::Url::parse(image_url)
                .map_err(|e| PublishError::InvalidContent(format!("Bad image URL: {}", e)))?;
            return self
                .bot
                .send_photo(self.channel.clone(), InputFile::url(url))
                .caption(text)
                .await
                .map_err(map_error);
        }

        self.bot
            .send_message(self.channel.clone(), text)
            .await
            .map_err(map_error)
    }

    async fn send_poll(&self, poll: &PollSpec) -> Result<Message, PublishError> {
        let correct = poll.correct_index;
        if usize::from(correct) >= poll.options.len() {
            return Err(PublishError::InvalidContent(format!(
                "Correct option {} outside {} options",
                correct,
                poll.options.len()
            )));
        }

        let options = poll.options.iter().cloned().map(InputPollOption::new);
        let mut request = self
            .bot
            .send_poll(self.channel.clone(), poll.question.clone(), options)
            .is_anonymous(poll.anonymous)
            .type_(PollType::Quiz)
            .correct_option_id(correct);
        if let Some(explanation) = &poll.explanation {
            request = request.explanation(explanation.clone());
        }

        request.await.map_err(map_error)
    }
}

fn map_error(error: RequestError) -> PublishError {
    if is_rate_limited(&error) {
        PublishError::RateLimited
    } else {
        PublishError::Api(error.to_string())
    }
}

#[async_trait]
impl Publisher for TelegramPublisher {
    async fn publish(&self, post: &ChannelPost) -> Result<PublishResult, PublishError> {
        let message = match post {
            ChannelPost::Text { text, image_url } => {
                self.send_text(text, image_url.as_deref()).await?
            }
            ChannelPost::Poll(poll) => self.send_poll(poll).await?,
        };

        tracing::debug!(message_id = message.id.0, "Channel message sent");

        Ok(PublishResult {
            id: message.id.0.to_string(),
            url: message.url().map(|u| u.to_string()),
        })
    }

    fn platform(&self) -> &'static str {
        "telegram"
    }
}
