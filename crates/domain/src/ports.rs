//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{
    BotUser, Category, ChannelPost, ChatRef, Draft, GenerateRequest, GeneratedContent, Preview,
};

/// Error type for content generation
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("LLM API error: {0}")]
    Api(String),
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Timeout")]
    Timeout,
    #[error("Category {0} needs a curriculum topic")]
    MissingTopic(Category),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Port for AI-backed content generation
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generate text, or a structured quiz for the quiz category
    async fn generate(&self, request: &GenerateRequest)
    -> Result<GeneratedContent, GenerateError>;
}

/// Error type for content store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Port for persisting drafts and the topic cursor
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Current draft for a category
    async fn get_draft(&self, category: Category) -> Result<Option<Draft>, StoreError>;

    /// Insert or replace the draft for its category
    async fn put_draft(&self, draft: &Draft) -> Result<(), StoreError>;

    /// All stored drafts, ordered by category
    async fn list_drafts(&self) -> Result<Vec<Draft>, StoreError>;

    /// Current topic cursor (0 when never advanced)
    async fn topic_cursor(&self) -> Result<u64, StoreError>;

    /// Atomically add one to the topic cursor, returning the new value
    async fn advance_topic_cursor(&self) -> Result<u64, StoreError>;
}

/// Port for the bot user registry
#[async_trait]
pub trait UserRegistry: Send + Sync {
    /// Record a user; returns false when the user was already known
    async fn register_user(&self, user: &BotUser) -> Result<bool, StoreError>;

    async fn count_users(&self) -> Result<u64, StoreError>;

    /// Every registered user id, oldest first
    async fn list_user_ids(&self) -> Result<Vec<i64>, StoreError>;
}

/// Error type for publisher operations
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Invalid content: {0}")]
    InvalidContent(String),
}

/// Result of a successful publish operation
#[derive(Debug, Clone)]
pub struct PublishResult {
    /// Platform-specific message id
    pub id: String,
    /// URL to the published content, if available
    pub url: Option<String>,
}

/// Port for delivering posts to the public channel
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, post: &ChannelPost) -> Result<PublishResult, PublishError>;

    /// Get the platform name (e.g., "telegram", "outbox")
    fn platform(&self) -> &'static str;
}

/// Error type for operator notifications
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Port for talking to the operator
#[async_trait]
pub trait OperatorNotifier: Send + Sync {
    /// Send a plain notification
    async fn notify(&self, recipient: ChatRef, text: &str) -> Result<(), NotifyError>;

    /// Show a draft preview with its action controls
    async fn show_preview(&self, recipient: ChatRef, preview: &Preview) -> Result<(), NotifyError>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
