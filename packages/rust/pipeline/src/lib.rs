//! Submission pipeline for eventloom.
//!
//! Wires the fetch, extract, and store stages into one entry point,
//! `Pipeline::run`, which takes a submission from URL to persisted record.

pub mod orchestrator;

pub use orchestrator::{Pipeline, PipelineOutcome, PipelineState};
