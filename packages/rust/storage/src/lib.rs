//! libSQL storage layer for the clause lifecycle.
//!
//! The [`Storage`] struct wraps a libSQL database holding source documents,
//! clause candidates, promoted standard clauses, the per-jurisdiction
//! taxonomy, and legal profiles.
//!
//! **Access rules:**
//! - CLI pipeline: read-write (sole writer) via [`Storage::open`]
//! - Reporting/export consumers: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::Utc;
use clauseforge_shared::{
    CandidateStatus, ClauseCandidate, ClauseCategory, ClauseForgeError, ClauseVariable,
    CountryLegalProfile, DEFAULT_COUNTRY, DocumentFormat, DocumentMetadata, DocumentStatus,
    Result, SourceDocument, StandardClause, default_taxonomy, new_id,
};
use libsql::{Connection, Database, params};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ClauseForgeError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    ClauseForgeError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(ClauseForgeError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Document operations
    // -----------------------------------------------------------------------

    /// Insert an ingested document.
    pub async fn insert_document(&self, doc: &SourceDocument) -> Result<()> {
        self.check_writable()?;
        let metadata_json = to_json(&doc.metadata)?;
        self.conn
            .execute(
                "INSERT INTO documents (id, raw_text, format, metadata_json, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    doc.id.as_str(),
                    doc.raw_text.as_str(),
                    doc.format.as_str(),
                    metadata_json.as_str(),
                    doc.status.as_str(),
                    doc.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Get a document by ID.
    pub async fn get_document(&self, id: &str) -> Result<Option<SourceDocument>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, raw_text, format, metadata_json, status, created_at
                 FROM documents WHERE id = ?1",
                params![id],
            )
            .await
            .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_document(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(ClauseForgeError::Storage(e.to_string())),
        }
    }

    /// List all documents, newest first.
    pub async fn list_documents(&self) -> Result<Vec<SourceDocument>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, raw_text, format, metadata_json, status, created_at
                 FROM documents ORDER BY created_at DESC",
                params![],
            )
            .await
            .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_document(&row)?);
        }
        Ok(results)
    }

    /// Flip a document's status to `processed`.
    pub async fn mark_document_processed(&self, id: &str) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "UPDATE documents SET status = ?1 WHERE id = ?2",
                params![DocumentStatus::Processed.as_str(), id],
            )
            .await
            .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Candidate operations
    // -----------------------------------------------------------------------

    /// Insert a freshly extracted clause candidate.
    pub async fn insert_candidate(&self, candidate: &ClauseCandidate) -> Result<()> {
        self.check_writable()?;
        let tags_json = to_json(&candidate.tags)?;
        let variables_json = to_json(&candidate.variables)?;
        self.conn
            .execute(
                "INSERT INTO clause_candidates
                 (id, title, content, template_content, category, contract_category,
                  tags_json, variables_json, confidence, source_document_id, status,
                  needs_review, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    candidate.id.as_str(),
                    candidate.title.as_str(),
                    candidate.content.as_str(),
                    candidate.template_content.as_str(),
                    candidate.category.as_str(),
                    candidate.contract_category.as_str(),
                    tags_json.as_str(),
                    variables_json.as_str(),
                    candidate.confidence,
                    candidate.source_document_id.as_str(),
                    candidate.status.as_str(),
                    candidate.needs_review as i64,
                    candidate.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Get a candidate by ID.
    pub async fn get_candidate(&self, id: &str) -> Result<Option<ClauseCandidate>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, title, content, template_content, category, contract_category,
                        tags_json, variables_json, confidence, source_document_id, status,
                        needs_review, created_at
                 FROM clause_candidates WHERE id = ?1",
                params![id],
            )
            .await
            .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_candidate(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(ClauseForgeError::Storage(e.to_string())),
        }
    }

    /// List candidates, optionally filtered by status, oldest first.
    pub async fn list_candidates(
        &self,
        status: Option<CandidateStatus>,
    ) -> Result<Vec<ClauseCandidate>> {
        let sql_all = "SELECT id, title, content, template_content, category, contract_category,
                              tags_json, variables_json, confidence, source_document_id, status,
                              needs_review, created_at
                       FROM clause_candidates ORDER BY created_at";
        let sql_filtered = "SELECT id, title, content, template_content, category, contract_category,
                                   tags_json, variables_json, confidence, source_document_id, status,
                                   needs_review, created_at
                            FROM clause_candidates WHERE status = ?1 ORDER BY created_at";

        let mut rows = match status {
            Some(s) => self.conn.query(sql_filtered, params![s.as_str()]).await,
            None => self.conn.query(sql_all, params![]).await,
        }
        .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_candidate(&row)?);
        }
        Ok(results)
    }

    /// Reject a pending candidate. Rejection is terminal; the record is kept
    /// for audit but can never be promoted.
    pub async fn reject_candidate(&self, id: &str) -> Result<()> {
        self.check_writable()?;
        let candidate = self
            .get_candidate(id)
            .await?
            .ok_or_else(|| ClauseForgeError::Conflict(format!("candidate {id} not found")))?;
        if candidate.status != CandidateStatus::Pending {
            return Err(ClauseForgeError::Conflict(format!(
                "candidate {id} is {}, only pending candidates can be rejected",
                candidate.status.as_str()
            )));
        }
        self.conn
            .execute(
                "UPDATE clause_candidates SET status = ?1 WHERE id = ?2",
                params![CandidateStatus::Rejected.as_str(), id],
            )
            .await
            .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Promote a pending candidate into a standard clause.
    ///
    /// The insert of the standard clause and the delete of the candidate
    /// happen in one transaction, so a clause is never visible in both
    /// tables (or in neither) after a crash.
    pub async fn promote_candidate(
        &self,
        id: &str,
        country_code: &str,
    ) -> Result<StandardClause> {
        self.check_writable()?;
        let candidate = self
            .get_candidate(id)
            .await?
            .ok_or_else(|| ClauseForgeError::Conflict(format!("candidate {id} not found")))?;
        if candidate.status != CandidateStatus::Pending {
            return Err(ClauseForgeError::Conflict(format!(
                "candidate {id} is {}, only pending candidates can be promoted",
                candidate.status.as_str()
            )));
        }

        let standard = StandardClause {
            id: new_id(),
            title: candidate.title.clone(),
            content: candidate.template_content.clone(),
            category: candidate.category.clone(),
            tags: candidate.tags.clone(),
            variables: candidate.variables.clone(),
            confidence: 1.0,
            usage_count: 0,
            popularity: 0.0,
            country_code: country_code.to_string(),
            is_active: true,
        };

        let tags_json = to_json(&standard.tags)?;
        let variables_json = to_json(&standard.variables)?;
        let now = Utc::now().to_rfc3339();

        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;

        tx.execute(
            "INSERT INTO standard_clauses
             (id, title, content, category, tags_json, variables_json, confidence,
              usage_count, popularity, country_code, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                standard.id.as_str(),
                standard.title.as_str(),
                standard.content.as_str(),
                standard.category.as_str(),
                tags_json.as_str(),
                variables_json.as_str(),
                standard.confidence,
                standard.usage_count as i64,
                standard.popularity,
                standard.country_code.as_str(),
                standard.is_active as i64,
                now.as_str(),
            ],
        )
        .await
        .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;

        tx.execute(
            "DELETE FROM clause_candidates WHERE id = ?1",
            params![id],
        )
        .await
        .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;

        Ok(standard)
    }

    // -----------------------------------------------------------------------
    // Standard clause operations
    // -----------------------------------------------------------------------

    /// Get a standard clause by ID.
    pub async fn get_standard_clause(&self, id: &str) -> Result<Option<StandardClause>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, title, content, category, tags_json, variables_json, confidence,
                        usage_count, popularity, country_code, is_active
                 FROM standard_clauses WHERE id = ?1",
                params![id],
            )
            .await
            .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_standard(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(ClauseForgeError::Storage(e.to_string())),
        }
    }

    /// List active standard clauses, optionally scoped to a country.
    pub async fn list_standard_clauses(
        &self,
        country_code: Option<&str>,
    ) -> Result<Vec<StandardClause>> {
        let sql_all = "SELECT id, title, content, category, tags_json, variables_json, confidence,
                              usage_count, popularity, country_code, is_active
                       FROM standard_clauses WHERE is_active = 1
                       ORDER BY usage_count DESC, title";
        let sql_country = "SELECT id, title, content, category, tags_json, variables_json, confidence,
                                  usage_count, popularity, country_code, is_active
                           FROM standard_clauses WHERE is_active = 1 AND country_code = ?1
                           ORDER BY usage_count DESC, title";

        let mut rows = match country_code {
            Some(code) => self.conn.query(sql_country, params![code]).await,
            None => self.conn.query(sql_all, params![]).await,
        }
        .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_standard(&row)?);
        }
        Ok(results)
    }

    /// Record one use of a standard clause.
    pub async fn increment_usage(&self, id: &str) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "UPDATE standard_clauses SET usage_count = usage_count + 1 WHERE id = ?1",
                params![id],
            )
            .await
            .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Taxonomy operations
    // -----------------------------------------------------------------------

    /// Resolve the taxonomy for a jurisdiction.
    ///
    /// Falls back to the seeded `default` country rows, then to the built-in
    /// taxonomy, so classification always has a category set to work with.
    pub async fn categories_for(&self, country_code: &str) -> Result<Vec<ClauseCategory>> {
        let rows = self.query_categories(country_code).await?;
        if !rows.is_empty() {
            return Ok(rows);
        }
        let fallback = self.query_categories(DEFAULT_COUNTRY).await?;
        if !fallback.is_empty() {
            return Ok(fallback);
        }
        Ok(default_taxonomy())
    }

    async fn query_categories(&self, country_code: &str) -> Result<Vec<ClauseCategory>> {
        let mut rows = self
            .conn
            .query(
                "SELECT key, name, country_code, risk_weight, is_required, sort_order
                 FROM clause_categories WHERE country_code = ?1 ORDER BY sort_order",
                params![country_code],
            )
            .await
            .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_category(&row)?);
        }
        Ok(results)
    }

    /// Insert or replace a taxonomy entry.
    pub async fn upsert_category(&self, category: &ClauseCategory) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO clause_categories (key, name, country_code, risk_weight, is_required, sort_order)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(key, country_code) DO UPDATE SET
                   name = excluded.name,
                   risk_weight = excluded.risk_weight,
                   is_required = excluded.is_required,
                   sort_order = excluded.sort_order",
                params![
                    category.key.as_str(),
                    category.name.as_str(),
                    category.country_code.as_str(),
                    category.risk_weight,
                    category.is_required as i64,
                    category.sort_order,
                ],
            )
            .await
            .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Legal profile operations
    // -----------------------------------------------------------------------

    /// Get a stored legal profile for a country, if any.
    pub async fn get_profile(&self, country_code: &str) -> Result<Option<CountryLegalProfile>> {
        let mut rows = self
            .conn
            .query(
                "SELECT profile_json FROM legal_profiles WHERE country_code = ?1",
                params![country_code],
            )
            .await
            .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let json: String = row
                    .get(0)
                    .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;
                let profile = serde_json::from_str(&json)
                    .map_err(|e| ClauseForgeError::Storage(format!("invalid profile: {e}")))?;
                Ok(Some(profile))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(ClauseForgeError::Storage(e.to_string())),
        }
    }

    /// Insert or replace a legal profile.
    pub async fn upsert_profile(&self, profile: &CountryLegalProfile) -> Result<()> {
        self.check_writable()?;
        let json = to_json(profile)?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO legal_profiles (country_code, profile_json, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(country_code) DO UPDATE SET
                   profile_json = excluded.profile_json,
                   updated_at = excluded.updated_at",
                params![profile.country_code.as_str(), json.as_str(), now.as_str()],
            )
            .await
            .map_err(|e| ClauseForgeError::Storage(e.to_string()))?;
        Ok(())
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| ClauseForgeError::Storage(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(json: &str, what: &str) -> Result<T> {
    serde_json::from_str(json)
        .map_err(|e| ClauseForgeError::Storage(format!("invalid {what}: {e}")))
}

fn get_string(row: &libsql::Row, idx: i32) -> Result<String> {
    row.get::<String>(idx)
        .map_err(|e| ClauseForgeError::Storage(e.to_string()))
}

fn get_datetime(row: &libsql::Row, idx: i32) -> Result<chrono::DateTime<Utc>> {
    let s = get_string(row, idx)?;
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ClauseForgeError::Storage(format!("invalid date: {e}")))
}

/// Convert a database row to a [`SourceDocument`].
fn row_to_document(row: &libsql::Row) -> Result<SourceDocument> {
    let metadata: DocumentMetadata = from_json(&get_string(row, 3)?, "document metadata")?;
    Ok(SourceDocument {
        id: get_string(row, 0)?,
        raw_text: get_string(row, 1)?,
        format: DocumentFormat::parse(&get_string(row, 2)?),
        metadata,
        status: DocumentStatus::parse(&get_string(row, 4)?),
        created_at: get_datetime(row, 5)?,
    })
}

/// Convert a database row to a [`ClauseCandidate`].
fn row_to_candidate(row: &libsql::Row) -> Result<ClauseCandidate> {
    let tags: Vec<String> = from_json(&get_string(row, 6)?, "candidate tags")?;
    let variables: Vec<ClauseVariable> = from_json(&get_string(row, 7)?, "candidate variables")?;
    Ok(ClauseCandidate {
        id: get_string(row, 0)?,
        title: get_string(row, 1)?,
        content: get_string(row, 2)?,
        template_content: get_string(row, 3)?,
        category: get_string(row, 4)?,
        contract_category: get_string(row, 5)?,
        tags,
        variables,
        confidence: row
            .get::<f64>(8)
            .map_err(|e| ClauseForgeError::Storage(e.to_string()))?,
        source_document_id: get_string(row, 9)?,
        status: CandidateStatus::parse(&get_string(row, 10)?),
        needs_review: row.get::<i64>(11).unwrap_or(0) != 0,
        created_at: get_datetime(row, 12)?,
    })
}

/// Convert a database row to a [`StandardClause`].
fn row_to_standard(row: &libsql::Row) -> Result<StandardClause> {
    let tags: Vec<String> = from_json(&get_string(row, 4)?, "clause tags")?;
    let variables: Vec<ClauseVariable> = from_json(&get_string(row, 5)?, "clause variables")?;
    Ok(StandardClause {
        id: get_string(row, 0)?,
        title: get_string(row, 1)?,
        content: get_string(row, 2)?,
        category: get_string(row, 3)?,
        tags,
        variables,
        confidence: row
            .get::<f64>(6)
            .map_err(|e| ClauseForgeError::Storage(e.to_string()))?,
        usage_count: row.get::<i64>(7).unwrap_or(0) as u64,
        popularity: row.get::<f64>(8).unwrap_or(0.0),
        country_code: get_string(row, 9)?,
        is_active: row.get::<i64>(10).unwrap_or(1) != 0,
    })
}

/// Convert a database row to a [`ClauseCategory`].
fn row_to_category(row: &libsql::Row) -> Result<ClauseCategory> {
    Ok(ClauseCategory {
        key: get_string(row, 0)?,
        name: get_string(row, 1)?,
        country_code: get_string(row, 2)?,
        risk_weight: row
            .get::<f64>(3)
            .map_err(|e| ClauseForgeError::Storage(e.to_string()))?,
        is_required: row.get::<i64>(4).unwrap_or(0) != 0,
        sort_order: row.get::<i64>(5).unwrap_or(0) as i32,
    })
}
