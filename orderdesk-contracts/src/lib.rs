//! Trait surfaces that describe interactions with Orderdesk data models.

pub mod pipeline;
pub mod record_like;

/// Frequently used trait combinators for panel and orchestration code.
pub mod prelude {
    pub use super::pipeline::{PipelineCounts, PipelineItem, PipelineStage};
    pub use super::record_like::RecordLike;
}
