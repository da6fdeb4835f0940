//! Publish pipeline - deliver the stored draft to the channel and advance the curriculum

use std::sync::Arc;

use crate::{
    model::{Category, ChatRef, Curriculum, PublishOutcome},
    ports::{ContentStore, OperatorNotifier, Publisher},
    usecases::render::{RenderConfig, Renderer},
};

/// Publish pipeline orchestrator
pub struct PublishPipeline {
    store: Arc<dyn ContentStore>,
    publisher: Arc<dyn Publisher>,
    notifier: Arc<dyn OperatorNotifier>,
    curriculum: Arc<Curriculum>,
    renderer: Renderer,
    operator: ChatRef,
}

impl PublishPipeline {
    pub fn new(
        store: Arc<dyn ContentStore>,
        publisher: Arc<dyn Publisher>,
        notifier: Arc<dyn OperatorNotifier>,
        curriculum: Arc<Curriculum>,
        render_config: RenderConfig,
        operator: ChatRef,
    ) -> Self {
        Self {
            store,
            publisher,
            notifier,
            curriculum,
            renderer: Renderer::new(render_config),
            operator,
        }
    }

    /// Publish the current draft of a category.
    ///
    /// Only a successful delivery advances the topic cursor, so a failed
    /// publish never skips a curriculum topic.
    pub async fn publish(&self, category: Category) -> PublishOutcome {
        let draft = match self.store.get_draft(category).await {
            Ok(Some(draft)) => draft,
            Ok(None) => {
                tracing::warn!(category = %category, "No draft to publish");
                self.notify(&self.renderer.missing_draft(category)).await;
                return PublishOutcome::MissingDraft;
            }
            Err(e) => {
                let error = e.to_string();
                tracing::error!(category = %category, error = %error, "Failed to read draft");
                self.notify(&self.renderer.delivery_failed(category, &error))
                    .await;
                return PublishOutcome::StoreUnavailable { error };
            }
        };

        let post = self.renderer.channel_post(&draft);

        tracing::info!(
            category = %category,
            draft_id = %draft.id,
            platform = self.publisher.platform(),
            "Publishing draft"
        );

        let result = match self.publisher.publish(&post).await {
            Ok(result) => result,
            Err(e) => {
                let error = e.to_string();
                tracing::error!(
                    category = %category,
                    platform = self.publisher.platform(),
                    error = %error,
                    "Failed to publish to channel"
                );
                self.notify(&self.renderer.delivery_failed(category, &error))
                    .await;
                return PublishOutcome::DeliveryFailed { error };
            }
        };

        let cursor = if self.curriculum.is_linked(category) {
            match self.store.advance_topic_cursor().await {
                Ok(cursor) => {
                    tracing::info!(category = %category, cursor = cursor, "Advanced topic cursor");
                    Some(cursor)
                }
                Err(e) => {
                    tracing::error!(category = %category, error = %e, "Failed to advance topic cursor");
                    self.notify(
                        &self
                            .renderer
                            .cursor_not_advanced(category, &e.to_string()),
                    )
                    .await;
                    None
                }
            }
        } else {
            None
        };

        self.notify(&self.renderer.published(&draft, cursor)).await;

        PublishOutcome::Published {
            category,
            message_id: result.id,
            cursor,
        }
    }

    async fn notify(&self, text: &str) {
        if let Err(e) = self.notifier.notify(self.operator, text).await {
            tracing::warn!(operator = %self.operator, error = %e, "Failed to notify operator");
        }
    }
}
