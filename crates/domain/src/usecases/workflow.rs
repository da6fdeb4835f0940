//! Content workflow - serializes draft and publish runs per category

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};

use crate::{
    model::{Category, ChatRef, DraftTrigger, PrepareOutcome, PublishOutcome},
    usecases::{
        prepare::DraftPipeline,
        publish::PublishPipeline,
        scheduler::{JobKind, ScheduleEntry, SlotRunner},
    },
};

/// One async mutex per category. Runs for the same category queue up,
/// runs for different categories proceed in parallel.
#[derive(Debug, Default)]
struct CategoryLocks {
    slots: [Mutex<()>; 4],
}

impl CategoryLocks {
    async fn lock(&self, category: Category) -> MutexGuard<'_, ()> {
        let index = match category {
            Category::Morning => 0,
            Category::Noon => 1,
            Category::Evening => 2,
            Category::Quiz => 3,
        };
        self.slots[index].lock().await
    }
}

/// Entry point shared by the scheduler, the bot and the CLI
pub struct ContentWorkflow {
    drafts: DraftPipeline,
    publishing: PublishPipeline,
    locks: CategoryLocks,
    operator: ChatRef,
}

impl ContentWorkflow {
    pub fn new(drafts: DraftPipeline, publishing: PublishPipeline, operator: ChatRef) -> Self {
        Self {
            drafts,
            publishing,
            locks: CategoryLocks::default(),
            operator,
        }
    }

    /// Create a draft on demand
    pub async fn prepare(&self, category: Category, recipient: ChatRef) -> PrepareOutcome {
        self.run_prepare(category, recipient, DraftTrigger::Manual)
            .await
    }

    /// Replace the current draft (and its preview) with a fresh one
    pub async fn regenerate(&self, category: Category, recipient: ChatRef) -> PrepareOutcome {
        self.run_prepare(category, recipient, DraftTrigger::Regenerate)
            .await
    }

    /// Publish the current draft immediately
    pub async fn publish(&self, category: Category) -> PublishOutcome {
        let _guard = self.locks.lock(category).await;
        let outcome = self.publishing.publish(category).await;
        tracing::info!(category = %category, outcome = ?outcome, "Publish finished");
        outcome
    }

    async fn run_prepare(
        &self,
        category: Category,
        recipient: ChatRef,
        trigger: DraftTrigger,
    ) -> PrepareOutcome {
        let _guard = self.locks.lock(category).await;
        let outcome = self.drafts.prepare(category, recipient, trigger).await;
        tracing::info!(category = %category, outcome = ?outcome, "Draft run finished");
        outcome
    }
}

#[async_trait]
impl SlotRunner for ContentWorkflow {
    async fn run(&self, entry: &ScheduleEntry) {
        match entry.kind {
            JobKind::Prepare => {
                self.run_prepare(entry.category, self.operator, DraftTrigger::Scheduled)
                    .await;
            }
            JobKind::Publish => {
                self.publish(entry.category).await;
            }
        }
    }
}
