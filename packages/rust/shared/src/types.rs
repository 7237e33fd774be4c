//! Core domain types for the ClauseForge pipeline.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Country code used for fallback taxonomy and profiles.
pub const DEFAULT_COUNTRY: &str = "default";

/// Generate a new time-sortable entity identifier (UUID v7).
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

// ---------------------------------------------------------------------------
// Source documents
// ---------------------------------------------------------------------------

/// Detected format of an ingested document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    PlainText,
    Markdown,
    Unknown,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "plain_text",
            Self::Markdown => "markdown",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "plain_text" => Self::PlainText,
            "markdown" => Self::Markdown,
            _ => Self::Unknown,
        }
    }
}

/// Processing status of a source document.
///
/// The only permitted transition is `Uploaded` → `Processed`, which happens
/// when the segmentation + classification stage completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Uploaded,
    Processed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Processed => "processed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "processed" => Self::Processed,
            _ => Self::Uploaded,
        }
    }
}

/// Metadata extracted from a document at ingestion time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Contract-related keywords found in the text.
    pub keyword_hits: Vec<String>,
    /// Rough page estimate (~1800 chars per page).
    pub estimated_pages: u32,
    /// Quality validation issues found during ingestion.
    pub quality_issues: Vec<String>,
}

/// A raw contract document, immutable once stored except for `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: String,
    pub raw_text: String,
    pub format: DocumentFormat,
    pub metadata: DocumentMetadata,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Clause variables
// ---------------------------------------------------------------------------

/// Kind of a templatable value inside a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Amount,
    Date,
    Duration,
    PartyName,
    Other,
}

impl VariableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amount => "amount",
            Self::Date => "date",
            Self::Duration => "duration",
            Self::PartyName => "party_name",
            Self::Other => "other",
        }
    }

    /// Parse a wire value, defaulting unknown kinds to `Other`.
    pub fn parse(s: &str) -> Self {
        match s {
            "amount" => Self::Amount,
            "date" => Self::Date,
            "duration" => Self::Duration,
            "party_name" => Self::PartyName,
            _ => Self::Other,
        }
    }
}

/// A substitutable value detected inside clause content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseVariable {
    /// Placeholder name used in the template (`{{name}}`).
    pub name: String,
    /// Literal value as it appeared in the original text.
    pub value: String,
    #[serde(rename = "type", default = "default_variable_kind")]
    pub kind: VariableKind,
    /// Byte offset of the value in the original content.
    #[serde(default)]
    pub position: usize,
}

fn default_variable_kind() -> VariableKind {
    VariableKind::Other
}

// ---------------------------------------------------------------------------
// Clause lifecycle entities
// ---------------------------------------------------------------------------

/// Review status of a clause candidate.
///
/// `Pending` → `Approved` (promotes into a [`StandardClause`] and deletes the
/// candidate) or `Pending` → `Rejected` (terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Pending,
    Approved,
    Rejected,
}

impl CandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::Pending,
        }
    }
}

/// A clause extracted from a source document, not yet reviewed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClauseCandidate {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Content with literal values replaced by `{{placeholder}}` tokens.
    pub template_content: String,
    pub category: String,
    /// Broader contract type this clause came from (e.g. "service", "employment").
    pub contract_category: String,
    pub tags: Vec<String>,
    pub variables: Vec<ClauseVariable>,
    /// Classification confidence in `[0, 1]`.
    pub confidence: f64,
    pub source_document_id: String,
    pub status: CandidateStatus,
    /// Set when classification confidence is low; prioritizes human review
    /// but never blocks persistence.
    pub needs_review: bool,
    pub created_at: DateTime<Utc>,
}

/// A reviewed, promoted, reusable clause template.
///
/// Created only via promotion of a [`ClauseCandidate`]; the two are mutually
/// exclusive representations of the same logical clause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardClause {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub variables: Vec<ClauseVariable>,
    /// Always 1.0 after review.
    pub confidence: f64,
    pub usage_count: u64,
    pub popularity: f64,
    pub country_code: String,
    pub is_active: bool,
}

// ---------------------------------------------------------------------------
// Taxonomy and jurisdiction profiles
// ---------------------------------------------------------------------------

/// A taxonomy node for clause classification, scoped to a jurisdiction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClauseCategory {
    pub key: String,
    pub name: String,
    pub country_code: String,
    pub risk_weight: f64,
    pub is_required: bool,
    pub sort_order: i32,
}

/// Legal system family of a jurisdiction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegalSystem {
    CivilLaw,
    CommonLaw,
    Mixed,
}

/// Preferred dispute-resolution mechanism of a jurisdiction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferredDispute {
    Litigation,
    Arbitration,
    Mediation,
}

/// Per-jurisdiction metadata consumed by the risk engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryLegalProfile {
    pub country_code: String,
    pub legal_system: LegalSystem,
    pub preferred_dispute: PreferredDispute,
    pub governing_law_required: bool,
    pub data_protection_required: bool,
    /// Risk multiplier per category key; absent categories weigh 0.5.
    pub risk_weights: HashMap<String, f64>,
    /// Jurisdiction-specific prompt framing, stored and served with the
    /// profile for provider integrations to pick up.
    pub prompt_template: String,
}

// ---------------------------------------------------------------------------
// Risk assessment (derived, never persisted)
// ---------------------------------------------------------------------------

/// A clause as fed into the risk engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredClause {
    pub category: String,
    /// Base risk score in `[1, 10]`.
    pub risk_score: f64,
    pub content: String,
}

/// Severity of a compliance issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A jurisdiction-specific compliance problem with the clause set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceIssue {
    /// Machine-readable kind, e.g. `missing_required_clause`.
    pub issue_type: String,
    pub severity: Severity,
    pub description: String,
}

/// Per-clause entry in a risk assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClauseRisk {
    pub category: String,
    pub risk_score: f64,
    pub weight: f64,
    pub weighted_risk: f64,
    /// Advisory only; never alters the numeric score.
    pub recommendations: Vec<String>,
}

/// The risk-scoring result for a contract in a target jurisdiction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Integer in `[1, 10]`.
    pub overall_risk: u8,
    pub clause_risks: Vec<ClauseRisk>,
    pub country_specific_issues: Vec<ComplianceIssue>,
}

// ---------------------------------------------------------------------------
// Default taxonomy
// ---------------------------------------------------------------------------

/// Built-in category set used when a jurisdiction has no seeded taxonomy.
pub fn default_taxonomy() -> Vec<ClauseCategory> {
    let rows: [(&str, &str, f64, bool); 11] = [
        ("purpose", "Purpose", 0.3, true),
        ("payment", "Payment & Fees", 0.8, true),
        ("term", "Term & Renewal", 0.5, false),
        ("confidentiality", "Confidentiality", 0.7, false),
        ("liability", "Liability & Indemnity", 0.9, false),
        ("termination", "Termination", 0.7, false),
        ("dispute_resolution", "Dispute Resolution", 0.8, false),
        ("governing_law", "Governing Law", 0.6, true),
        ("data_protection", "Data Protection", 0.9, false),
        ("intellectual_property", "Intellectual Property", 0.8, false),
        ("other", "Other", 0.5, false),
    ];

    rows.iter()
        .enumerate()
        .map(|(i, (key, name, weight, required))| ClauseCategory {
            key: (*key).into(),
            name: (*name).into(),
            country_code: DEFAULT_COUNTRY.into(),
            risk_weight: *weight,
            is_required: *required,
            sort_order: i as i32,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_kind_wire_names() {
        assert_eq!(VariableKind::PartyName.as_str(), "party_name");
        assert_eq!(VariableKind::parse("party_name"), VariableKind::PartyName);
        // Unknown kinds degrade to Other rather than failing
        assert_eq!(VariableKind::parse("postcode"), VariableKind::Other);
    }

    #[test]
    fn clause_variable_serde_uses_type_field() {
        let var = ClauseVariable {
            name: "amount".into(),
            value: "500만원".into(),
            kind: VariableKind::Amount,
            position: 4,
        };
        let json = serde_json::to_string(&var).expect("serialize");
        assert!(json.contains(r#""type":"amount"#));

        let parsed: ClauseVariable = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, var);
    }

    #[test]
    fn clause_variable_tolerates_missing_fields() {
        let json = r#"{"name": "party_a", "value": "갑"}"#;
        let parsed: ClauseVariable = serde_json::from_str(json).expect("deserialize");
        assert_eq!(parsed.kind, VariableKind::Other);
        assert_eq!(parsed.position, 0);
    }

    #[test]
    fn candidate_status_roundtrip() {
        for status in [
            CandidateStatus::Pending,
            CandidateStatus::Approved,
            CandidateStatus::Rejected,
        ] {
            assert_eq!(CandidateStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn default_taxonomy_shape() {
        let taxonomy = default_taxonomy();
        assert!(taxonomy.iter().any(|c| c.key == "other"));
        assert!(taxonomy.iter().any(|c| c.key == "governing_law" && c.is_required));
        // Sort order matches declaration order
        let orders: Vec<i32> = taxonomy.iter().map(|c| c.sort_order).collect();
        let mut sorted = orders.clone();
        sorted.sort();
        assert_eq!(orders, sorted);
    }

    #[test]
    fn ids_are_time_sortable() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert!(a <= b);
    }
}
