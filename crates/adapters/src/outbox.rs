//! JSONL outbox for dry-run mode: channel posts and operator messages are
//! appended to a file instead of reaching Telegram.

use async_trait::async_trait;
use quizcast_domain::model::{ChannelPost, ChatRef, Preview};
use quizcast_domain::ports::{
    NotifyError, OperatorNotifier, PublishError, PublishResult, Publisher,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct OutboxWriter {
    path: PathBuf,
    file: Arc<Mutex<tokio::fs::File>>,
}

impl OutboxWriter {
    pub async fn new(path: PathBuf) -> Result<Self, OutboxError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, record: &OutboxRecord<'_>) -> Result<(), OutboxError> {
        let entry = OutboxEntry {
            id: Uuid::new_v4(),
            written_at: OffsetDateTime::now_utc(),
            record,
        };
        let line = serde_json::to_string(&entry)?;
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct OutboxEntry<'a> {
    id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    written_at: OffsetDateTime,
    #[serde(flatten)]
    record: &'a OutboxRecord<'a>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutboxRecord<'a> {
    ChannelPost {
        channel: &'a str,
        post: &'a ChannelPost,
    },
    Notice {
        recipient: ChatRef,
        text: &'a str,
    },
    Preview {
        recipient: ChatRef,
        category: &'a str,
        text: &'a str,
        image_url: Option<&'a str>,
        poll_question: Option<&'a str>,
        actions: Vec<String>,
    },
}

/// Publisher that records channel posts in the outbox
#[derive(Debug, Clone)]
pub struct OutboxPublisher {
    writer: OutboxWriter,
    channel: String,
}

impl OutboxPublisher {
    pub fn new(writer: OutboxWriter, channel: impl Into<String>) -> Self {
        Self {
            writer,
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl Publisher for OutboxPublisher {
    async fn publish(&self, post: &ChannelPost) -> Result<PublishResult, PublishError> {
        let record = OutboxRecord::ChannelPost {
            channel: &self.channel,
            post,
        };

        self.writer
            .append(&record)
            .await
            .map_err(|error| PublishError::Api(format!("Outbox write failed: {}", error)))?;

        Ok(PublishResult {
            id: Uuid::new_v4().to_string(),
            url: None,
        })
    }

    fn platform(&self) -> &'static str {
        "outbox"
    }
}

/// Operator notifier that records notices and previews in the outbox
#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    writer: OutboxWriter,
}

impl OutboxNotifier {
    pub fn new(writer: OutboxWriter) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl OperatorNotifier for OutboxNotifier {
    async fn notify(&self, recipient: ChatRef, text: &str) -> Result<(), NotifyError> {
        self.writer
            .append(&OutboxRecord::Notice { recipient, text })
            .await
            .map_err(|e| NotifyError::Delivery(format!("Outbox write failed: {}", e)))
    }

    async fn show_preview(&self, recipient: ChatRef, preview: &Preview) -> Result<(), NotifyError> {
        let record = OutboxRecord::Preview {
            recipient,
            category: preview.category.as_str(),
            text: &preview.text,
            image_url: preview.image_url.as_deref(),
            poll_question: preview.poll.as_ref().map(|p| p.question.as_str()),
            actions: preview.actions.iter().map(|a| a.to_data()).collect(),
        };

        self.writer
            .append(&record)
            .await
            .map_err(|e| NotifyError::Delivery(format!("Outbox write failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizcast_domain::model::{AdminAction, CallbackCommand, Category, PollSpec};
    use serde_json::Value;
    use tempfile::TempDir;

    async fn read_lines(path: &Path) -> Vec<Value> {
        let contents = tokio::fs::read_to_string(path).await.expect("read outbox");
        contents
            .lines()
            .map(|line| serde_json::from_str(line).expect("valid json"))
            .collect()
    }

    #[tokio::test]
    async fn outbox_publisher_writes_poll_entry() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("outbox.jsonl");

        let writer = OutboxWriter::new(path.clone()).await.expect("writer");
        let publisher = OutboxPublisher::new(writer, "@pydaily");

        let post = ChannelPost::Poll(PollSpec {
            question: "2 + 2?".to_string(),
            options: vec!["3".into(), "4".into(), "5".into(), "22".into()],
            correct_index: 1,
            explanation: None,
            anonymous: true,
        });

        let result = publisher.publish(&post).await.expect("publish");
        assert!(!result.id.is_empty());

        let lines = read_lines(&path).await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["type"], "channel_post");
        assert_eq!(lines[0]["channel"], "@pydaily");
        assert_eq!(lines[0]["post"]["kind"], "poll");
        assert_eq!(lines[0]["post"]["correct_index"], 1);
        assert_eq!(lines[0]["post"]["anonymous"], true);
    }

    #[tokio::test]
    async fn outbox_notifier_appends_notices_and_previews() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("nested").join("outbox.jsonl");

        let writer = OutboxWriter::new(path.clone()).await.expect("writer");
        let notifier = OutboxNotifier::new(writer);

        notifier
            .notify(ChatRef(42), "Nothing to publish")
            .await
            .expect("notify");
        notifier
            .show_preview(
                ChatRef(42),
                &Preview {
                    category: Category::Morning,
                    text: "🌅 Morning draft\n\nHello".to_string(),
                    image_url: None,
                    poll: None,
                    actions: vec![CallbackCommand::new(AdminAction::Regen, Category::Morning)],
                },
            )
            .await
            .expect("preview");

        let lines = read_lines(&path).await;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "notice");
        assert_eq!(lines[0]["recipient"], 42);
        assert_eq!(lines[1]["type"], "preview");
        assert_eq!(lines[1]["actions"][0], "regen_morning");
    }
}
