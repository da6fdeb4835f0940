//! Draft pipeline - pick topic, generate, store and preview a draft

use std::sync::Arc;

use crate::{
    model::{
        Category, ChatRef, Curriculum, Draft, DraftContent, DraftTrigger, GenerateRequest,
        GeneratedContent, PrepareOutcome, TextPost,
    },
    policy::{ContentPolicy, PolicyConfig, fits_caption},
    ports::{Clock, ContentGenerator, ContentStore, OperatorNotifier},
    usecases::{
        imagery::{ImageConfig, ImageLinker},
        render::{RenderConfig, Renderer},
    },
};

/// Configuration for the draft pipeline
#[derive(Debug, Clone, Default)]
pub struct DraftConfig {
    pub policy: PolicyConfig,
    pub images: ImageConfig,
    pub render: RenderConfig,
}

/// Why a draft could not be built
#[derive(Debug)]
enum DraftFailure {
    Generation(String),
    Store(String),
}

/// Draft pipeline orchestrator
pub struct DraftPipeline {
    generator: Arc<dyn ContentGenerator>,
    store: Arc<dyn ContentStore>,
    notifier: Arc<dyn OperatorNotifier>,
    clock: Arc<dyn Clock>,
    curriculum: Arc<Curriculum>,
    policy: ContentPolicy,
    images: ImageLinker,
    renderer: Renderer,
}

impl DraftPipeline {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        store: Arc<dyn ContentStore>,
        notifier: Arc<dyn OperatorNotifier>,
        clock: Arc<dyn Clock>,
        curriculum: Arc<Curriculum>,
        config: DraftConfig,
    ) -> Self {
        Self {
            generator,
            store,
            notifier,
            clock,
            curriculum,
            policy: ContentPolicy::new(config.policy),
            images: ImageLinker::new(config.images),
            renderer: Renderer::new(config.render),
        }
    }

    /// Generate a fresh draft for `category`, replace the stored one and
    /// preview it to `recipient`
    pub async fn prepare(
        &self,
        category: Category,
        recipient: ChatRef,
        trigger: DraftTrigger,
    ) -> PrepareOutcome {
        tracing::info!(
            category = %category,
            recipient = %recipient,
            trigger = trigger.as_str(),
            "Preparing draft"
        );

        let draft = match self.build_draft(category).await {
            Ok(draft) => draft,
            Err(DraftFailure::Generation(error)) => {
                tracing::warn!(category = %category, error = %error, "Draft generation failed");
                self.notify(recipient, &self.renderer.draft_failed(category, &error))
                    .await;
                return PrepareOutcome::GenerationFailed { error };
            }
            Err(DraftFailure::Store(error)) => {
                tracing::error!(category = %category, error = %error, "Content store unavailable");
                self.notify(recipient, &self.renderer.draft_failed(category, &error))
                    .await;
                return PrepareOutcome::StoreUnavailable { error };
            }
        };

        if let Err(e) = self.store.put_draft(&draft).await {
            let error = e.to_string();
            tracing::error!(category = %category, error = %error, "Failed to store draft");
            self.notify(recipient, &self.renderer.draft_failed(category, &error))
                .await;
            return PrepareOutcome::StoreUnavailable { error };
        }

        tracing::info!(
            category = %category,
            draft_id = %draft.id,
            topic = ?draft.topic,
            "Stored draft"
        );

        let preview = self.renderer.preview(&draft);
        let previewed = match self.notifier.show_preview(recipient, &preview).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(category = %category, error = %e, "Failed to deliver preview");
                false
            }
        };

        PrepareOutcome::Prepared {
            category,
            topic: draft.topic,
            draft_id: draft.id,
            previewed,
        }
    }

    /// Topic for the next draft of a category, if it follows the curriculum
    pub async fn current_topic(&self, category: Category) -> Result<Option<String>, String> {
        self.select_topic(category).await.map_err(|failure| match failure {
            DraftFailure::Generation(error) | DraftFailure::Store(error) => error,
        })
    }

    async fn select_topic(&self, category: Category) -> Result<Option<String>, DraftFailure> {
        if !self.curriculum.is_linked(category) {
            return Ok(None);
        }

        let cursor = self
            .store
            .topic_cursor()
            .await
            .map_err(|e| DraftFailure::Store(e.to_string()))?;
        let topic = self.curriculum.topic_at(cursor).ok_or_else(|| {
            DraftFailure::Generation("The curriculum has no topics".to_string())
        })?;

        tracing::debug!(category = %category, cursor = cursor, topic = %topic, "Selected topic");
        Ok(Some(topic.to_string()))
    }

    async fn build_draft(&self, category: Category) -> Result<Draft, DraftFailure> {
        let topic = self.select_topic(category).await?;

        let request = GenerateRequest {
            category,
            topic: topic.clone(),
        };

        let generated = self
            .generator
            .generate(&request)
            .await
            .map_err(|e| DraftFailure::Generation(e.to_string()))?;

        let generated = self
            .policy
            .validate(&generated)
            .map_err(|e| DraftFailure::Generation(e.to_string()))?;

        let content = match generated {
            GeneratedContent::Text { text } => {
                let image_url = self
                    .images
                    .link(category, topic.as_deref())
                    .filter(|_| fits_caption(&text));
                DraftContent::Text(TextPost { text, image_url })
            }
            GeneratedContent::Quiz(quiz) => DraftContent::Quiz(quiz),
        };

        Draft::new(category, content, topic, self.clock.now())
            .map_err(|e| DraftFailure::Generation(e.to_string()))
    }

    async fn notify(&self, recipient: ChatRef, text: &str) {
        if let Err(e) = self.notifier.notify(recipient, text).await {
            tracing::warn!(recipient = %recipient, error = %e, "Failed to notify operator");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::testing::{FakeClock, FakeGenerator, FakeStore, RecordingNotifier};
    use time::macros::datetime;

    const OPERATOR: ChatRef = ChatRef(7);

    fn pipeline(
        generator: Arc<FakeGenerator>,
        store: Arc<FakeStore>,
        config: DraftConfig,
    ) -> DraftPipeline {
        DraftPipeline::new(
            generator,
            store,
            Arc::new(RecordingNotifier::new()),
            Arc::new(FakeClock {
                time: datetime!(2026-03-02 07:00 UTC),
            }),
            Arc::new(Curriculum::new(
                vec!["Lists".to_string(), "Dicts".to_string()],
                vec![Category::Noon, Category::Quiz],
            )),
            config,
        )
    }

    fn with_images() -> DraftConfig {
        DraftConfig {
            images: ImageConfig {
                enabled: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_prepared_draft_carries_topic_and_time() {
        let store = Arc::new(FakeStore::new());
        store.set_cursor(1);
        let pipeline = pipeline(Arc::new(FakeGenerator::new()), store.clone(), Default::default());

        let outcome = pipeline
            .prepare(Category::Noon, OPERATOR, DraftTrigger::Manual)
            .await;

        let draft = store.get_draft(Category::Noon).await.unwrap().unwrap();
        assert_eq!(
            outcome,
            PrepareOutcome::Prepared {
                category: Category::Noon,
                topic: Some("Dicts".to_string()),
                draft_id: draft.id,
                previewed: true,
            }
        );
        assert_eq!(draft.created_at, datetime!(2026-03-02 07:00 UTC));
    }

    #[tokio::test]
    async fn test_image_attached_when_caption_fits() {
        let store = Arc::new(FakeStore::new());
        let pipeline = pipeline(Arc::new(FakeGenerator::new()), store.clone(), with_images());

        pipeline
            .prepare(Category::Noon, OPERATOR, DraftTrigger::Scheduled)
            .await;

        let draft = store.get_draft(Category::Noon).await.unwrap().unwrap();
        assert_eq!(
            draft.image_url(),
            Some("https://image.pollinations.ai/prompt/python+programming+Lists")
        );
    }

    #[tokio::test]
    async fn test_image_dropped_for_long_text() {
        let store = Arc::new(FakeStore::new());
        let generator = Arc::new(FakeGenerator::new());
        generator.push(Ok(GeneratedContent::Text {
            text: "word ".repeat(400),
        }));
        let pipeline = pipeline(generator, store.clone(), with_images());

        pipeline
            .prepare(Category::Morning, OPERATOR, DraftTrigger::Scheduled)
            .await;

        let draft = store.get_draft(Category::Morning).await.unwrap().unwrap();
        assert!(draft.image_url().is_none());
    }

    #[tokio::test]
    async fn test_current_topic_only_for_linked_categories() {
        let store = Arc::new(FakeStore::new());
        store.set_cursor(3);
        let pipeline = pipeline(Arc::new(FakeGenerator::new()), store, Default::default());

        assert_eq!(
            pipeline.current_topic(Category::Quiz).await.unwrap(),
            Some("Dicts".to_string())
        );
        assert_eq!(pipeline.current_topic(Category::Evening).await.unwrap(), None);
    }
}
