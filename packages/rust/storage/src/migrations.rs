//! SQL migration definitions for the ClauseForge database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed as a batch.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description:
            "Initial schema: documents, clause_candidates, standard_clauses, clause_categories, legal_profiles",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Ingested contract documents
CREATE TABLE IF NOT EXISTS documents (
    id            TEXT PRIMARY KEY,
    raw_text      TEXT NOT NULL,
    format        TEXT NOT NULL,
    metadata_json TEXT NOT NULL,
    status        TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(status);

-- Extracted clauses awaiting review
CREATE TABLE IF NOT EXISTS clause_candidates (
    id                 TEXT PRIMARY KEY,
    title              TEXT NOT NULL,
    content            TEXT NOT NULL,
    template_content   TEXT NOT NULL,
    category           TEXT NOT NULL,
    contract_category  TEXT NOT NULL,
    tags_json          TEXT NOT NULL,
    variables_json     TEXT NOT NULL,
    confidence         REAL NOT NULL,
    source_document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    status             TEXT NOT NULL,
    needs_review       INTEGER NOT NULL,
    created_at         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_candidates_status ON clause_candidates(status);
CREATE INDEX IF NOT EXISTS idx_candidates_document ON clause_candidates(source_document_id);

-- Promoted, reusable clause templates
CREATE TABLE IF NOT EXISTS standard_clauses (
    id             TEXT PRIMARY KEY,
    title          TEXT NOT NULL,
    content        TEXT NOT NULL,
    category       TEXT NOT NULL,
    tags_json      TEXT NOT NULL,
    variables_json TEXT NOT NULL,
    confidence     REAL NOT NULL,
    usage_count    INTEGER NOT NULL DEFAULT 0,
    popularity     REAL NOT NULL DEFAULT 0,
    country_code   TEXT NOT NULL,
    is_active      INTEGER NOT NULL DEFAULT 1,
    created_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_standard_country ON standard_clauses(country_code);
CREATE INDEX IF NOT EXISTS idx_standard_category ON standard_clauses(category);

-- Classification taxonomy, scoped per jurisdiction
CREATE TABLE IF NOT EXISTS clause_categories (
    key          TEXT NOT NULL,
    name         TEXT NOT NULL,
    country_code TEXT NOT NULL,
    risk_weight  REAL NOT NULL,
    is_required  INTEGER NOT NULL,
    sort_order   INTEGER NOT NULL,
    PRIMARY KEY (key, country_code)
);

-- Jurisdiction legal profiles, stored as JSON documents
CREATE TABLE IF NOT EXISTS legal_profiles (
    country_code TEXT PRIMARY KEY,
    profile_json TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

-- Seed the fallback taxonomy under the reserved 'default' country code
INSERT INTO clause_categories (key, name, country_code, risk_weight, is_required, sort_order) VALUES
    ('purpose', 'Purpose', 'default', 0.3, 1, 0),
    ('payment', 'Payment & Fees', 'default', 0.8, 1, 1),
    ('term', 'Term & Renewal', 'default', 0.5, 0, 2),
    ('confidentiality', 'Confidentiality', 'default', 0.7, 0, 3),
    ('liability', 'Liability & Indemnity', 'default', 0.9, 0, 4),
    ('termination', 'Termination', 'default', 0.7, 0, 5),
    ('dispute_resolution', 'Dispute Resolution', 'default', 0.8, 0, 6),
    ('governing_law', 'Governing Law', 'default', 0.6, 1, 7),
    ('data_protection', 'Data Protection', 'default', 0.9, 0, 8),
    ('intellectual_property', 'Intellectual Property', 'default', 0.8, 0, 9),
    ('other', 'Other', 'default', 0.5, 0, 10);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
