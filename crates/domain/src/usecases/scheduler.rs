//! Daily wall-clock scheduler for prepare and publish slots

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use time::{Duration, OffsetDateTime, Time, UtcOffset};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{model::Category, ports::Clock};

/// What a slot does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Prepare,
    Publish,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Prepare => "prepare",
            JobKind::Publish => "publish",
        }
    }
}

/// A job fired every day at a fixed local time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub category: Category,
    pub kind: JobKind,
    pub at: Time,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("{category}: prepare time {prepare} must be earlier than publish time {publish}")]
    PrepareNotBeforePublish {
        category: Category,
        prepare: Time,
        publish: Time,
    },
    #[error("{0} is scheduled twice")]
    DuplicateCategory(Category),
}

/// Fixed daily slots in a single time zone
#[derive(Debug, Clone)]
pub struct Schedule {
    offset: UtcOffset,
    entries: Vec<ScheduleEntry>,
}

impl Schedule {
    pub fn new(offset: UtcOffset) -> Self {
        Self {
            offset,
            entries: Vec::new(),
        }
    }

    /// Register the prepare/publish pair of a category
    pub fn add_slot(
        &mut self,
        category: Category,
        prepare: Time,
        publish: Time,
    ) -> Result<(), ScheduleError> {
        if prepare >= publish {
            return Err(ScheduleError::PrepareNotBeforePublish {
                category,
                prepare,
                publish,
            });
        }
        if self.entries.iter().any(|e| e.category == category) {
            return Err(ScheduleError::DuplicateCategory(category));
        }

        self.entries.push(ScheduleEntry {
            category,
            kind: JobKind::Prepare,
            at: prepare,
        });
        self.entries.push(ScheduleEntry {
            category,
            kind: JobKind::Publish,
            at: publish,
        });
        Ok(())
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Earliest fire instant strictly after `after`, with every entry due then
    pub fn next_fire(&self, after: OffsetDateTime) -> Option<(OffsetDateTime, Vec<ScheduleEntry>)> {
        let local = after.to_offset(self.offset);
        let mut earliest: Option<(OffsetDateTime, Vec<ScheduleEntry>)> = None;

        for entry in &self.entries {
            let mut fire = local.replace_time(entry.at);
            if fire <= local {
                fire += Duration::days(1);
            }

            if earliest.as_ref().is_none_or(|(at, _)| fire < *at) {
                earliest = Some((fire, vec![*entry]));
            } else if let Some((at, due)) = earliest.as_mut() {
                if *at == fire {
                    due.push(*entry);
                }
            }
        }

        earliest
    }
}

/// Executes a fired slot
#[async_trait]
pub trait SlotRunner: Send + Sync {
    async fn run(&self, entry: &ScheduleEntry);
}

/// Runs the schedule until stopped
pub struct Scheduler {
    schedule: Schedule,
    runner: Arc<dyn SlotRunner>,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    pub fn new(schedule: Schedule, runner: Arc<dyn SlotRunner>, clock: Arc<dyn Clock>) -> Self {
        Self {
            schedule,
            runner,
            clock,
        }
    }

    /// Spawn the scheduler loop
    pub fn start(self) -> SchedulerHandle {
        let token = CancellationToken::new();
        let task = tokio::spawn(self.run(token.clone()));
        SchedulerHandle { token, task }
    }

    async fn run(self, token: CancellationToken) {
        tracing::info!(
            slots = self.schedule.entries().len(),
            offset = %self.schedule.offset(),
            "Scheduler started"
        );

        let mut last_fire = self.clock.now();

        loop {
            let now = self.clock.now();
            let after = last_fire.max(now);
            let Some((fire, due)) = self.schedule.next_fire(after) else {
                tracing::warn!("Schedule is empty, scheduler idle");
                token.cancelled().await;
                break;
            };

            let wait = (fire - now).max(Duration::ZERO).unsigned_abs();
            tracing::debug!(fire_at = %fire, wait_secs = wait.as_secs(), "Next slot");

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            for entry in due {
                tracing::info!(
                    category = %entry.category,
                    job = entry.kind.as_str(),
                    "Slot fired"
                );
                let runner = Arc::clone(&self.runner);
                tokio::spawn(async move {
                    runner.run(&entry).await;
                });
            }

            last_fire = fire;
        }

        tracing::info!("Scheduler stopped");
    }
}

/// Handle to a running scheduler
pub struct SchedulerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop firing new slots; jobs already running finish on their own
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Scheduler task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset, time};
    use tokio::sync::mpsc;

    fn daily() -> Schedule {
        let mut schedule = Schedule::new(offset!(+5));
        schedule
            .add_slot(Category::Morning, time!(07:00), time!(08:00))
            .unwrap();
        schedule
            .add_slot(Category::Quiz, time!(17:00), time!(18:00))
            .unwrap();
        schedule
    }

    #[test]
    fn test_rejects_prepare_after_publish() {
        let mut schedule = Schedule::new(offset!(+5));
        let err = schedule
            .add_slot(Category::Noon, time!(13:00), time!(12:00))
            .unwrap_err();
        assert!(matches!(err, ScheduleError::PrepareNotBeforePublish { .. }));

        let err = schedule
            .add_slot(Category::Noon, time!(12:00), time!(12:00))
            .unwrap_err();
        assert!(matches!(err, ScheduleError::PrepareNotBeforePublish { .. }));
        assert!(schedule.is_empty());
    }

    #[test]
    fn test_rejects_duplicate_category() {
        let mut schedule = daily();
        let err = schedule
            .add_slot(Category::Quiz, time!(09:00), time!(10:00))
            .unwrap_err();
        assert_eq!(err, ScheduleError::DuplicateCategory(Category::Quiz));
    }

    #[test]
    fn test_next_fire_uses_local_time() {
        // 01:30 UTC is 06:30 at +05:00
        let (fire, due) = daily().next_fire(datetime!(2026-03-02 01:30 UTC)).unwrap();
        assert_eq!(fire, datetime!(2026-03-02 07:00 +5));
        assert_eq!(
            due,
            vec![ScheduleEntry {
                category: Category::Morning,
                kind: JobKind::Prepare,
                at: time!(07:00),
            }]
        );
    }

    #[test]
    fn test_next_fire_is_strictly_after() {
        let (fire, due) = daily().next_fire(datetime!(2026-03-02 07:00 +5)).unwrap();
        assert_eq!(fire, datetime!(2026-03-02 08:00 +5));
        assert_eq!(due[0].kind, JobKind::Publish);
    }

    #[test]
    fn test_next_fire_rolls_to_next_day() {
        let (fire, due) = daily().next_fire(datetime!(2026-03-02 18:30 +5)).unwrap();
        assert_eq!(fire, datetime!(2026-03-03 07:00 +5));
        assert_eq!(due[0].category, Category::Morning);
    }

    #[test]
    fn test_next_fire_groups_simultaneous_slots() {
        let mut schedule = daily();
        schedule
            .add_slot(Category::Evening, time!(17:00), time!(19:00))
            .unwrap();

        let (_, due) = schedule.next_fire(datetime!(2026-03-02 16:00 +5)).unwrap();
        let categories: Vec<_> = due.iter().map(|e| e.category).collect();
        assert_eq!(categories, vec![Category::Quiz, Category::Evening]);
    }

    #[test]
    fn test_empty_schedule_never_fires() {
        assert!(Schedule::new(UtcOffset::UTC)
            .next_fire(datetime!(2026-03-02 00:00 UTC))
            .is_none());
    }

    /// Wall clock driven by tokio's (pausable) timer
    struct TokioClock {
        base: OffsetDateTime,
        started: tokio::time::Instant,
    }

    impl Clock for TokioClock {
        fn now(&self) -> OffsetDateTime {
            self.base + self.started.elapsed()
        }
    }

    struct ChannelRunner(mpsc::UnboundedSender<ScheduleEntry>);

    #[async_trait]
    impl SlotRunner for ChannelRunner {
        async fn run(&self, entry: &ScheduleEntry) {
            let _ = self.0.send(*entry);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_fires_slots_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let clock = Arc::new(TokioClock {
            base: datetime!(2026-03-02 06:59 +5),
            started: tokio::time::Instant::now(),
        });
        let handle = Scheduler::new(daily(), Arc::new(ChannelRunner(tx)), clock).start();

        let fired: Vec<_> = [
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
        ]
        .into_iter()
        .map(|e| (e.category, e.kind))
        .collect();

        assert_eq!(
            fired,
            vec![
                (Category::Morning, JobKind::Prepare),
                (Category::Morning, JobKind::Publish),
                (Category::Quiz, JobKind::Prepare),
                (Category::Quiz, JobKind::Publish),
                (Category::Morning, JobKind::Prepare),
            ]
        );

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_scheduler_fires_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let clock = Arc::new(TokioClock {
            base: datetime!(2026-03-02 06:00 +5),
            started: tokio::time::Instant::now(),
        });
        let handle = Scheduler::new(daily(), Arc::new(ChannelRunner(tx)), clock).start();

        handle.stop().await;
        tokio::time::sleep(std::time::Duration::from_secs(86_400)).await;

        assert!(rx.try_recv().is_err());
    }
}
