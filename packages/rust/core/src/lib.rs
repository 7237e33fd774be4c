//! Batch drivers tying segmentation, analysis, and storage together:
//! ingestion of raw documents and end-to-end clause processing.

pub mod ingest;
pub mod pipeline;

pub use ingest::{IngestOutcome, IngestStatus, ingest_documents};
pub use pipeline::{
    BatchSummary, DocumentOutcome, ProcessConfig, ProcessReport, ProcessStatus, ProgressReporter,
    SilentProgress, process_documents,
};
