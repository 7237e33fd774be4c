//! Document ingestion: raw text → stored document with metadata.

use chrono::Utc;
use tracing::{info, instrument, warn};

use clauseforge_segmenter::Segmenter;
use clauseforge_shared::{
    DocumentFormat, DocumentMetadata, DocumentStatus, SourceDocument, new_id,
};
use clauseforge_storage::Storage;

/// Rough page estimate divisor.
pub const CHARS_PER_PAGE: usize = 1800;

/// Keywords whose presence suggests the text is actually a contract.
const CONTRACT_KEYWORDS: &[&str] = &[
    "계약",
    "조항",
    "당사자",
    "손해배상",
    "해지",
    "contract",
    "agreement",
    "party",
    "clause",
    "liability",
];

/// Outcome of ingesting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestStatus {
    Uploaded,
    Skipped,
    Failed,
}

impl IngestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

/// Per-document ingestion result.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Assigned ID, present only when the document was stored.
    pub document_id: Option<String>,
    pub status: IngestStatus,
    /// Clauses a segmentation dry run would produce.
    pub clause_count: usize,
    /// Quality issues found, duplicated here for immediate reporting.
    pub issues: Vec<String>,
}

/// Detect the document format from its text.
pub fn detect_format(text: &str) -> DocumentFormat {
    let looks_markdown = text
        .lines()
        .any(|line| line.starts_with('#') || line.starts_with("```"));
    if looks_markdown {
        DocumentFormat::Markdown
    } else {
        DocumentFormat::PlainText
    }
}

/// Extract ingestion-time metadata: keyword hits, page estimate, quality issues.
pub fn extract_metadata(text: &str) -> DocumentMetadata {
    let lower = text.to_lowercase();
    let keyword_hits: Vec<String> = CONTRACT_KEYWORDS
        .iter()
        .filter(|kw| lower.contains(&kw.to_lowercase()))
        .map(|kw| (*kw).to_string())
        .collect();

    let chars = text.chars().count();
    let estimated_pages = (chars.div_ceil(CHARS_PER_PAGE)).max(1) as u32;

    let mut quality_issues = Vec::new();
    if chars < 100 {
        quality_issues.push("document is shorter than 100 characters".to_string());
    }
    if keyword_hits.is_empty() {
        quality_issues.push("no contract-related keywords found".to_string());
    }
    if text.contains('\u{FFFD}') {
        quality_issues.push("text contains replacement characters, encoding may be broken".to_string());
    }

    DocumentMetadata {
        keyword_hits,
        estimated_pages,
        quality_issues,
    }
}

/// Ingest a batch of raw document texts.
///
/// Blank documents are skipped, storage failures fail that item; neither
/// aborts the rest of the batch.
#[instrument(skip_all, fields(count = texts.len()))]
pub async fn ingest_documents(
    storage: &Storage,
    texts: &[String],
    max_fallback_paragraphs: usize,
) -> Vec<IngestOutcome> {
    let segmenter = Segmenter::new(max_fallback_paragraphs);
    let mut outcomes = Vec::with_capacity(texts.len());

    for text in texts {
        if text.trim().is_empty() {
            outcomes.push(IngestOutcome {
                document_id: None,
                status: IngestStatus::Skipped,
                clause_count: 0,
                issues: vec!["document is empty".to_string()],
            });
            continue;
        }

        let metadata = extract_metadata(text);
        let issues = metadata.quality_issues.clone();
        let clause_count = segmenter.segment(text).len();

        let doc = SourceDocument {
            id: new_id(),
            raw_text: text.clone(),
            format: detect_format(text),
            metadata,
            status: DocumentStatus::Uploaded,
            created_at: Utc::now(),
        };

        match storage.insert_document(&doc).await {
            Ok(()) => {
                info!(id = %doc.id, clause_count, "document ingested");
                outcomes.push(IngestOutcome {
                    document_id: Some(doc.id),
                    status: IngestStatus::Uploaded,
                    clause_count,
                    issues,
                });
            }
            Err(e) => {
                warn!(error = %e, "failed to store document");
                outcomes.push(IngestOutcome {
                    document_id: None,
                    status: IngestStatus::Failed,
                    clause_count,
                    issues,
                });
            }
        }
    }

    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("cf_core_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    const SERVICE_CONTRACT: &str = "제1조 (목적)\n본 계약은 용역의 제공에 관한 당사자 간의 권리와 의무를 정함을 목적으로 한다.\n제2조 (대금)\n대금은 500만원으로 하고 손해배상 책임은 별도로 정한다.";

    #[test]
    fn format_detection() {
        assert_eq!(detect_format("# 계약서\n내용"), DocumentFormat::Markdown);
        assert_eq!(detect_format(SERVICE_CONTRACT), DocumentFormat::PlainText);
    }

    #[test]
    fn metadata_keywords_and_pages() {
        let metadata = extract_metadata(SERVICE_CONTRACT);
        assert!(metadata.keyword_hits.contains(&"계약".to_string()));
        assert!(metadata.keyword_hits.contains(&"손해배상".to_string()));
        assert_eq!(metadata.estimated_pages, 1);

        let long = "계약 ".repeat(2000); // ~6000 chars
        assert!(extract_metadata(&long).estimated_pages >= 3);
    }

    #[test]
    fn metadata_flags_quality_issues() {
        let metadata = extract_metadata("오늘 점심 메뉴 논의");
        assert!(
            metadata
                .quality_issues
                .iter()
                .any(|i| i.contains("shorter than 100"))
        );
        assert!(
            metadata
                .quality_issues
                .iter()
                .any(|i| i.contains("keywords"))
        );
    }

    #[tokio::test]
    async fn ingest_stores_documents_and_skips_blanks() {
        let storage = test_storage().await;
        let texts = vec![
            SERVICE_CONTRACT.to_string(),
            "   \n  ".to_string(),
        ];

        let outcomes = ingest_documents(&storage, &texts, 30).await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].status, IngestStatus::Uploaded);
        assert_eq!(outcomes[0].clause_count, 2);
        let id = outcomes[0].document_id.as_ref().unwrap();
        let stored = storage.get_document(id).await.unwrap().unwrap();
        assert_eq!(stored.status, DocumentStatus::Uploaded);

        assert_eq!(outcomes[1].status, IngestStatus::Skipped);
        assert!(outcomes[1].document_id.is_none());
        assert_eq!(storage.list_documents().await.unwrap().len(), 1);
    }
}
