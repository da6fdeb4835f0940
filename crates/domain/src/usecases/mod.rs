//! Application use cases / business logic

pub mod imagery;
pub mod prepare;
pub mod publish;
pub mod render;
pub mod scheduler;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use imagery::{ImageConfig, ImageLinker};
pub use prepare::{DraftConfig, DraftPipeline};
pub use publish::PublishPipeline;
pub use render::{RenderConfig, Renderer};
pub use scheduler::{
    JobKind, Schedule, ScheduleEntry, ScheduleError, Scheduler, SchedulerHandle, SlotRunner,
};
pub use workflow::ContentWorkflow;
