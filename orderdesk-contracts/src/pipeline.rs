//! Maps record statuses onto the scrape → convert → upload pipeline so
//! counters can be derived from whatever page is loaded.

use orderdesk_model::calls::{Call, CallStatus};
use orderdesk_model::orders::{Order, OrderStatus};

/// Where a record sits in the delivery pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    /// Captured but not yet ready for conversion.
    Intake,
    AwaitingConversion,
    AwaitingUpload,
    Delivered,
    Unclassified,
}

pub trait PipelineItem {
    fn stage(&self) -> PipelineStage;
}

impl PipelineItem for Order {
    fn stage(&self) -> PipelineStage {
        match self.status {
            OrderStatus::Pending => PipelineStage::Intake,
            OrderStatus::Scraped => PipelineStage::AwaitingConversion,
            OrderStatus::Converted => PipelineStage::AwaitingUpload,
            OrderStatus::Sent => PipelineStage::Delivered,
            OrderStatus::Unknown => PipelineStage::Unclassified,
        }
    }
}

impl PipelineItem for Call {
    fn stage(&self) -> PipelineStage {
        match self.status {
            CallStatus::Received => PipelineStage::AwaitingConversion,
            CallStatus::Converted => PipelineStage::AwaitingUpload,
            CallStatus::Sent => PipelineStage::Delivered,
            CallStatus::Unknown => PipelineStage::Unclassified,
        }
    }
}

/// Per-stage tallies over a slice of records.
///
/// Only as fresh as the slice it was computed from; a page-local tally
/// undercounts whenever the pending work spans more than one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineCounts {
    pub intake: u64,
    pub awaiting_conversion: u64,
    pub awaiting_upload: u64,
    pub delivered: u64,
    pub unclassified: u64,
}

impl PipelineCounts {
    pub fn tally<'a, T, I>(items: I) -> Self
    where
        T: PipelineItem + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let mut counts = Self::default();
        for item in items {
            match item.stage() {
                PipelineStage::Intake => counts.intake += 1,
                PipelineStage::AwaitingConversion => {
                    counts.awaiting_conversion += 1
                }
                PipelineStage::AwaitingUpload => counts.awaiting_upload += 1,
                PipelineStage::Delivered => counts.delivered += 1,
                PipelineStage::Unclassified => counts.unclassified += 1,
            }
        }
        counts
    }
}
