//! Operator notifier: plain notices and draft previews in the operator chat

use std::collections::HashMap;

use async_trait::async_trait;
use quizcast_domain::{Category, ChatRef, NotifyError, OperatorNotifier, PollSpec, Preview};
use teloxide::prelude::*;
use teloxide::types::{InputFile, InputPollOption, MessageId, PollType};
use tokio::sync::Mutex;

use super::{chat_id, keyboards};

/// Sends notices and previews, keeping one live preview per chat and category
pub struct TelegramNotifier {
    bot: Bot,
    previews: Mutex<HashMap<(ChatRef, Category), Vec<MessageId>>>,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self {
            bot,
            previews: Mutex::new(HashMap::new()),
        }
    }

    async fn send_preview_messages(
        &self,
        chat: ChatId,
        preview: &Preview,
    ) -> Result<Vec<MessageId>, NotifyError> {
        let mut sent = Vec::new();
        let markup = keyboards::draft_actions(&preview.actions);

        if let Some(poll) = &preview.poll {
            sent.push(self.send_poll_mirror(chat, poll).await?);
        }

        if let Some(image_url) = preview.image_url.as_deref() {
            match url::Url::parse(image_url) {
                Ok(url) => {
                    match self
                        .bot
                        .send_photo(chat, InputFile::url(url))
                        .caption(preview.text.clone())
                        .reply_markup(markup.clone())
                        .await
                    {
                        Ok(message) => {
                            sent.push(message.id);
                            return Ok(sent);
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to send preview photo, falling back to text");
                        }
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Preview image URL is invalid"),
            }
        }

        let message = self
            .bot
            .send_message(chat, preview.text.clone())
            .reply_markup(markup)
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        sent.push(message.id);

        Ok(sent)
    }

    async fn send_poll_mirror(&self, chat: ChatId, poll: &PollSpec) -> Result<MessageId, NotifyError> {
        let options = poll.options.iter().cloned().map(InputPollOption::new);
        let mut request = self
            .bot
            .send_poll(chat, poll.question.clone(), options)
            .is_anonymous(poll.anonymous)
            .type_(PollType::Quiz)
            .correct_option_id(poll.correct_index);
        if let Some(explanation) = &poll.explanation {
            request = request.explanation(explanation.clone());
        }

        request
            .await
            .map(|message| message.id)
            .map_err(|e| NotifyError::Delivery(e.to_string()))
    }
}

#[async_trait]
impl OperatorNotifier for TelegramNotifier {
    async fn notify(&self, recipient: ChatRef, text: &str) -> Result<(), NotifyError> {
        self.bot
            .send_message(chat_id(recipient), text)
            .await
            .map(|_| ())
            .map_err(|e| NotifyError::Delivery(e.to_string()))
    }

    async fn show_preview(&self, recipient: ChatRef, preview: &Preview) -> Result<(), NotifyError> {
        let chat = chat_id(recipient);
        let key = (recipient, preview.category);

        // Hold the map across delete + send so two previews never interleave
        let mut previews = self.previews.lock().await;
        if let Some(old) = previews.remove(&key) {
            for message_id in old {
                if let Err(e) = self.bot.delete_message(chat, message_id).await {
                    tracing::debug!(error = %e, message_id = message_id.0, "Old preview already gone");
                }
            }
        }

        let sent = self.send_preview_messages(chat, preview).await?;
        previews.insert(key, sent);
        Ok(())
    }
}
