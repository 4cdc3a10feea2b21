//! Shared types, errors, and configuration for eventloom.
//!
//! Every stage crate depends on this one. It defines the submission and
//! record types that move through the pipeline, the error taxonomy with
//! stage attribution, and the TOML-backed application config.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    AppConfig, DefaultsConfig, FetchConfig, ModelConfig, StoreConfig, config_file_path,
    init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{ExtractionFailureKind, PipelineError, Result, ScrapeFailureKind, Stage};
pub use types::{
    DEFAULT_CONFIDENCE, EventRecord, FetchedContent, Record, RecordId, RecordKind, StoredRecord,
    Submission, SubmissionId, UpdateRecord, parse_flexible_timestamp,
};
