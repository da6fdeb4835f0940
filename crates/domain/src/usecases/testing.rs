//! In-memory fakes for use case tests

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::model::{
    Category, ChannelPost, ChatRef, Draft, GenerateRequest, GeneratedContent, Preview, QuizPost,
};
use crate::ports::{
    Clock, ContentGenerator, ContentStore, GenerateError, NotifyError, OperatorNotifier,
    PublishError, PublishResult, Publisher, StoreError,
};

pub struct FakeClock {
    pub time: OffsetDateTime,
}

impl Clock for FakeClock {
    fn now(&self) -> OffsetDateTime {
        self.time
    }
}

/// Replays queued results, then falls back to canned content per category
#[derive(Default)]
pub struct FakeGenerator {
    queued: Mutex<VecDeque<Result<GeneratedContent, GenerateError>>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, result: Result<GeneratedContent, GenerateError>) {
        self.queued.lock().unwrap().push_back(result);
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<GeneratedContent, GenerateError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(result) = self.queued.lock().unwrap().pop_front() {
            return result;
        }

        let topic = request.topic.clone().unwrap_or_else(|| "anything".to_string());
        if request.category.is_quiz() {
            Ok(GeneratedContent::Quiz(QuizPost {
                question: format!("Which statement about {} is true?", topic),
                options: [
                    "first".to_string(),
                    "second".to_string(),
                    "third".to_string(),
                    "fourth".to_string(),
                ],
                correct_index: 2,
                explanation: format!("Only the third holds for {}.", topic),
            }))
        } else {
            Ok(GeneratedContent::Text {
                text: format!("{} post about {}", request.category, topic),
            })
        }
    }
}

#[derive(Default)]
pub struct FakeStore {
    drafts: Mutex<BTreeMap<Category, Draft>>,
    cursor: Mutex<u64>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cursor(&self, value: u64) {
        *self.cursor.lock().unwrap() = value;
    }
}

#[async_trait]
impl ContentStore for FakeStore {
    async fn get_draft(&self, category: Category) -> Result<Option<Draft>, StoreError> {
        Ok(self.drafts.lock().unwrap().get(&category).cloned())
    }

    async fn put_draft(&self, draft: &Draft) -> Result<(), StoreError> {
        self.drafts
            .lock()
            .unwrap()
            .insert(draft.category, draft.clone());
        Ok(())
    }

    async fn list_drafts(&self) -> Result<Vec<Draft>, StoreError> {
        Ok(self.drafts.lock().unwrap().values().cloned().collect())
    }

    async fn topic_cursor(&self) -> Result<u64, StoreError> {
        Ok(*self.cursor.lock().unwrap())
    }

    async fn advance_topic_cursor(&self) -> Result<u64, StoreError> {
        let mut cursor = self.cursor.lock().unwrap();
        *cursor += 1;
        Ok(*cursor)
    }
}

#[derive(Default)]
pub struct FakePublisher {
    sent: Mutex<Vec<ChannelPost>>,
    failure: Mutex<Option<String>>,
}

impl FakePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next publish fail with an API error
    pub fn fail_next(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn sent(&self) -> Vec<ChannelPost> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn publish(&self, post: &ChannelPost) -> Result<PublishResult, PublishError> {
        if let Some(message) = self.failure.lock().unwrap().take() {
            return Err(PublishError::Api(message));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(post.clone());
        Ok(PublishResult {
            id: sent.len().to_string(),
            url: None,
        })
    }

    fn platform(&self) -> &'static str {
        "fake"
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(ChatRef, String)>>,
    previews: Mutex<Vec<(ChatRef, Preview)>>,
    fail_previews: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_previews(&self) {
        self.fail_previews.store(true, Ordering::SeqCst);
    }

    pub fn notices(&self) -> Vec<(ChatRef, String)> {
        self.notices.lock().unwrap().clone()
    }

    pub fn previews(&self) -> Vec<(ChatRef, Preview)> {
        self.previews.lock().unwrap().clone()
    }
}

#[async_trait]
impl OperatorNotifier for RecordingNotifier {
    async fn notify(&self, recipient: ChatRef, text: &str) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .unwrap()
            .push((recipient, text.to_string()));
        Ok(())
    }

    async fn show_preview(&self, recipient: ChatRef, preview: &Preview) -> Result<(), NotifyError> {
        if self.fail_previews.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery("chat not found".to_string()));
        }
        self.previews
            .lock()
            .unwrap()
            .push((recipient, preview.clone()));
        Ok(())
    }
}
