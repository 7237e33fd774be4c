//! Shared types, error model, and configuration for ClauseForge.
//!
//! This crate is the foundation depended on by all other ClauseForge crates.
//! It provides:
//! - [`ClauseForgeError`] — the unified error type
//! - Domain types ([`SourceDocument`], [`ClauseCandidate`], [`StandardClause`],
//!   [`ClauseCategory`], [`CountryLegalProfile`], [`RiskAssessment`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, PipelineConfig, ProviderConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{ClauseForgeError, Result};
pub use types::{
    CandidateStatus, ClauseCandidate, ClauseCategory, ClauseRisk, ClauseVariable,
    ComplianceIssue, CountryLegalProfile, DEFAULT_COUNTRY, DocumentFormat, DocumentMetadata,
    DocumentStatus, LegalSystem, PreferredDispute, RiskAssessment, ScoredClause, Severity,
    SourceDocument, StandardClause, VariableKind, default_taxonomy, new_id,
};
