//! Batch processing: uploaded documents → classified, deduplicated,
//! templated clause candidates.
//!
//! Everything runs sequentially per document. Delegated-service failures
//! degrade inside the analysis engines and never abort the batch; storage
//! failures fail the affected document and the batch moves on.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, instrument, warn};

use clauseforge_analysis::{
    Classifier, ClauseRef, CompletionProvider, DedupChecker, Pacer, VariableExtractor,
};
use clauseforge_segmenter::Segmenter;
use clauseforge_shared::{
    AppConfig, CandidateStatus, ClauseCandidate, ClauseCategory, DocumentStatus, Result,
    SourceDocument, new_id,
};
use clauseforge_storage::Storage;

/// Contract type recorded on candidates until a dedicated contract-level
/// classification pass exists.
const DEFAULT_CONTRACT_CATEGORY: &str = "general";

/// Tuning for one processing run.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Jurisdiction whose taxonomy drives classification.
    pub country_code: String,
    pub dedup_sample: usize,
    pub preview_chars: usize,
    /// Candidates classified below this confidence are flagged for review.
    pub review_threshold: f64,
    pub max_fallback_paragraphs: usize,
    /// Minimum gap between consecutive delegated calls.
    pub pacing: Duration,
}

impl ProcessConfig {
    /// Derive a run config from the application config, optionally overriding
    /// the jurisdiction.
    pub fn from_app_config(config: &AppConfig, country_code: Option<String>) -> Self {
        Self {
            country_code: country_code.unwrap_or_else(|| config.defaults.country_code.clone()),
            dedup_sample: config.pipeline.dedup_sample,
            preview_chars: config.pipeline.preview_chars,
            review_threshold: config.pipeline.review_threshold,
            max_fallback_paragraphs: config.pipeline.max_fallback_paragraphs,
            pacing: Duration::from_millis(config.provider.pacing_ms),
        }
    }
}

/// Processing outcome for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Processed,
    AlreadyProcessed,
    NotFound,
    Failed,
}

/// Per-document processing result.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentOutcome {
    pub document_id: String,
    pub status: ProcessStatus,
    /// Clauses produced by segmentation.
    pub total_clauses: usize,
    /// Candidates actually persisted.
    pub saved_clauses: usize,
    /// Clauses dropped as duplicates of already-analyzed ones.
    pub duplicates: usize,
}

/// Batch-level rollup across all documents of a run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Saved-candidate counts per category key.
    pub categories: BTreeMap<String, usize>,
}

/// Full result of a processing run.
#[derive(Debug, Serialize)]
pub struct ProcessReport {
    pub documents: Vec<DocumentOutcome>,
    pub summary: BatchSummary,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each clause of a document finishes its analysis steps.
    fn clause_processed(&self, document_id: &str, current: usize, total: usize);
    /// Called when a document finishes.
    fn document_done(&self, outcome: &DocumentOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn clause_processed(&self, _document_id: &str, _current: usize, _total: usize) {}
    fn document_done(&self, _outcome: &DocumentOutcome) {}
}

/// Process a batch of uploaded documents into clause candidates.
#[instrument(skip_all, fields(count = ids.len(), country = %config.country_code))]
pub async fn process_documents<P: CompletionProvider>(
    storage: &Storage,
    provider: &P,
    config: &ProcessConfig,
    ids: &[String],
    progress: &dyn ProgressReporter,
) -> Result<ProcessReport> {
    let categories = storage.categories_for(&config.country_code).await?;

    let segmenter = Segmenter::new(config.max_fallback_paragraphs);
    let classifier = Classifier::new(provider, config.preview_chars);
    let dedup = DedupChecker::new(provider, config.dedup_sample, config.preview_chars);
    let extractor = VariableExtractor::new(provider);
    let mut pacer = Pacer::new(config.pacing);

    // Dedup targets: a snapshot of the stored candidate corpus taken before
    // the batch starts, extended with clauses analyzed earlier in this run.
    let mut analyzed: Vec<ClauseRef> = storage
        .list_candidates(None)
        .await?
        .into_iter()
        .map(|c| ClauseRef {
            title: c.title,
            content: c.content,
        })
        .collect();
    let mut documents = Vec::with_capacity(ids.len());
    let mut category_counts: BTreeMap<String, usize> = BTreeMap::new();

    for id in ids {
        progress.phase(&format!("Processing document {id}"));

        let outcome = match storage.get_document(id).await {
            Ok(Some(doc)) if doc.status == DocumentStatus::Processed => DocumentOutcome {
                document_id: id.clone(),
                status: ProcessStatus::AlreadyProcessed,
                total_clauses: 0,
                saved_clauses: 0,
                duplicates: 0,
            },
            Ok(Some(doc)) => {
                process_one(
                    storage,
                    &doc,
                    &segmenter,
                    &classifier,
                    &dedup,
                    &extractor,
                    &mut pacer,
                    &mut analyzed,
                    &categories,
                    config,
                    &mut category_counts,
                    progress,
                )
                .await
            }
            Ok(None) => DocumentOutcome {
                document_id: id.clone(),
                status: ProcessStatus::NotFound,
                total_clauses: 0,
                saved_clauses: 0,
                duplicates: 0,
            },
            Err(e) => {
                warn!(id, error = %e, "failed to load document");
                DocumentOutcome {
                    document_id: id.clone(),
                    status: ProcessStatus::Failed,
                    total_clauses: 0,
                    saved_clauses: 0,
                    duplicates: 0,
                }
            }
        };

        progress.document_done(&outcome);
        documents.push(outcome);
    }

    let summary = BatchSummary {
        total: documents.len(),
        successful: documents
            .iter()
            .filter(|d| d.status == ProcessStatus::Processed)
            .count(),
        failed: documents
            .iter()
            .filter(|d| d.status == ProcessStatus::Failed)
            .count(),
        categories: category_counts,
    };

    info!(
        total = summary.total,
        successful = summary.successful,
        failed = summary.failed,
        "processing batch complete"
    );

    Ok(ProcessReport { documents, summary })
}

/// Run one uploaded document through segment → classify → dedup → template.
#[allow(clippy::too_many_arguments)]
async fn process_one<P: CompletionProvider>(
    storage: &Storage,
    doc: &SourceDocument,
    segmenter: &Segmenter,
    classifier: &Classifier<&P>,
    dedup: &DedupChecker<&P>,
    extractor: &VariableExtractor<&P>,
    pacer: &mut Pacer,
    analyzed: &mut Vec<ClauseRef>,
    categories: &[ClauseCategory],
    config: &ProcessConfig,
    category_counts: &mut BTreeMap<String, usize>,
    progress: &dyn ProgressReporter,
) -> DocumentOutcome {
    let clauses = segmenter.segment(&doc.raw_text);
    let total_clauses = clauses.len();
    let mut saved_clauses = 0usize;
    let mut duplicates = 0usize;

    for (i, clause) in clauses.iter().enumerate() {
        pacer.pause().await;
        let classification = classifier
            .classify(&clause.title, &clause.content, categories)
            .await;

        pacer.pause().await;
        let verdict = dedup.check(&clause.title, &clause.content, analyzed).await;

        analyzed.push(ClauseRef {
            title: clause.title.clone(),
            content: clause.content.clone(),
        });

        if verdict.is_duplicate {
            info!(
                title = %clause.title,
                similarity = verdict.similarity,
                similar = verdict.similar_clause.as_deref().unwrap_or("?"),
                "duplicate clause, not saved"
            );
            duplicates += 1;
            progress.clause_processed(&doc.id, i + 1, total_clauses);
            continue;
        }

        pacer.pause().await;
        let extraction = extractor.extract(&clause.content).await;

        let variables = if extraction.variables.is_empty() {
            classification.variables.clone()
        } else {
            extraction.variables
        };

        let candidate = ClauseCandidate {
            id: new_id(),
            title: clause.title.clone(),
            content: clause.content.clone(),
            template_content: extraction.template_content,
            category: classification.category.clone(),
            contract_category: DEFAULT_CONTRACT_CATEGORY.to_string(),
            tags: classification.tags.clone(),
            variables,
            confidence: classification.confidence,
            source_document_id: doc.id.clone(),
            status: CandidateStatus::Pending,
            needs_review: classification.confidence < config.review_threshold,
            created_at: chrono::Utc::now(),
        };

        if let Err(e) = storage.insert_candidate(&candidate).await {
            warn!(id = %doc.id, title = %clause.title, error = %e, "failed to save candidate");
            return DocumentOutcome {
                document_id: doc.id.clone(),
                status: ProcessStatus::Failed,
                total_clauses,
                saved_clauses,
                duplicates,
            };
        }

        *category_counts
            .entry(classification.category)
            .or_insert(0) += 1;
        saved_clauses += 1;
        progress.clause_processed(&doc.id, i + 1, total_clauses);
    }

    if let Err(e) = storage.mark_document_processed(&doc.id).await {
        warn!(id = %doc.id, error = %e, "failed to mark document processed");
        return DocumentOutcome {
            document_id: doc.id.clone(),
            status: ProcessStatus::Failed,
            total_clauses,
            saved_clauses,
            duplicates,
        };
    }

    DocumentOutcome {
        document_id: doc.id.clone(),
        status: ProcessStatus::Processed,
        total_clauses,
        saved_clauses,
        duplicates,
    }
}
