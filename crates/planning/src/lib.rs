//! Planning domain: Jobs, Outputs (PIs), Outcomes (QBOs) and the weighted
//! mappings between them.
//!
//! Everything here is deterministic domain logic (no IO, no HTTP, no storage).
//! The [`impact`] module holds the two-stage fan-in that derives each Job's
//! `impact_value` and each Outcome's `points` from the mapping graph.

pub mod impact;
pub mod job;
pub mod mapping;
pub mod outcome;
pub mod output;
pub mod ranking;
mod validate;

pub use impact::{ImpactGraph, ImpactReport, compute};
pub use job::{Job, JobDraft, JobPatch};
pub use mapping::{
    JobOutputMapping, JobOutputMappingDraft, JobOutputMappingPatch, OutputOutcomeMapping,
    OutputOutcomeMappingDraft, OutputOutcomeMappingPatch,
};
pub use outcome::{Outcome, OutcomeDraft, OutcomePatch};
pub use output::{Output, OutputDraft, OutputPatch};
pub use ranking::{RankedJob, rank_jobs};
