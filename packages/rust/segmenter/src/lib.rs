//! Document segmentation: raw contract text → ordered clause candidates.
//!
//! A cascade of structural-marker strategies (Korean article markers, western
//! article headings, numeric lists, labeled fields) is dry-run against the
//! normalized text; the strategy producing the most clauses wins, with
//! earlier cascade position breaking ties. Documents without any structural
//! marker fall back to paragraph splitting.
//!
//! A document that produces no usable clauses yields an empty list, not an
//! error — short fragments are non-clauses, not failures.

mod strategy;

use tracing::debug;

pub use strategy::{SegmentStrategy, cascade};

/// Minimum trimmed content length (chars) for an emitted clause.
pub const MIN_CONTENT_CHARS: usize = 20;

/// Minimum trimmed title length (chars) for an emitted clause.
pub const MIN_TITLE_CHARS: usize = 2;

/// Default cap on candidates from the paragraph-split fallback.
pub const DEFAULT_MAX_FALLBACK_PARAGRAPHS: usize = 30;

/// One clause candidate produced by segmentation.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedClause {
    /// Marker number, or 1-based sequence for unnumbered strategies.
    pub number: u32,
    pub title: String,
    /// Full clause slice, marker line included.
    pub content: String,
    /// Strategy confidence, not classification confidence.
    pub confidence: f64,
    /// Name of the strategy that produced this clause.
    pub extraction_method: String,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize raw text: unify line endings, collapse blank runs to a single
/// blank line, strip trailing whitespace per line, trim the whole document.
pub fn normalize(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(unified.len());
    let mut blank_run = 0usize;
    for line in unified.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }

    out.trim().to_string()
}

// ---------------------------------------------------------------------------
// Segmenter
// ---------------------------------------------------------------------------

/// Segments normalized contract text into clause candidates.
pub struct Segmenter {
    strategies: Vec<Box<dyn SegmentStrategy>>,
    max_fallback_paragraphs: usize,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FALLBACK_PARAGRAPHS)
    }
}

impl Segmenter {
    pub fn new(max_fallback_paragraphs: usize) -> Self {
        Self {
            strategies: cascade(),
            max_fallback_paragraphs,
        }
    }

    /// Segment `raw` into an ordered clause list.
    pub fn segment(&self, raw: &str) -> Vec<SegmentedClause> {
        let text = normalize(raw);
        if text.is_empty() {
            return Vec::new();
        }

        // Dry-run every strategy; most clauses wins, earlier position breaks ties.
        let mut best: Option<(usize, Vec<SegmentedClause>)> = None;
        for strategy in &self.strategies {
            let clauses = strategy.segment(&text);
            if clauses.is_empty() {
                continue;
            }
            let better = match &best {
                Some((count, _)) => clauses.len() > *count,
                None => true,
            };
            if better {
                best = Some((clauses.len(), clauses));
            }
        }

        let clauses = match best {
            Some((count, clauses)) => {
                debug!(
                    method = %clauses[0].extraction_method,
                    count,
                    "structural strategy selected"
                );
                clauses
            }
            None => {
                debug!("no structural markers, falling back to paragraph split");
                self.split_paragraphs(&text)
            }
        };

        clauses.into_iter().filter(passes_floors).collect()
    }

    /// Blank-line paragraph fallback for marker-free documents.
    fn split_paragraphs(&self, text: &str) -> Vec<SegmentedClause> {
        text.split("\n\n")
            .map(str::trim)
            .filter(|p| p.chars().count() >= MIN_CONTENT_CHARS)
            .take(self.max_fallback_paragraphs)
            .enumerate()
            .map(|(i, para)| {
                let first_line = para.lines().next().unwrap_or(para);
                SegmentedClause {
                    number: (i + 1) as u32,
                    title: clip_chars(first_line, 40),
                    content: para.to_string(),
                    confidence: 0.4,
                    extraction_method: "paragraph_fallback".into(),
                }
            })
            .collect()
    }
}

/// Candidates below the content/title floors are non-clauses; drop silently.
fn passes_floors(clause: &SegmentedClause) -> bool {
    clause.content.trim().chars().count() >= MIN_CONTENT_CHARS
        && clause.title.trim().chars().count() >= MIN_TITLE_CHARS
}

fn clip_chars(s: &str, max_chars: usize) -> String {
    let trimmed = s.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => trimmed[..idx].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_unifies_line_endings_and_blank_runs() {
        let raw = "제1조 (목적)\r\n내용 첫 줄   \r\r\n\n\n제2조 (정의)\n내용";
        let text = normalize(raw);
        assert!(!text.contains('\r'));
        assert!(!text.contains("\n\n\n"));
        assert!(text.starts_with("제1조"));
        assert!(text.contains("첫 줄\n"));
    }

    #[test]
    fn korean_two_clause_scenario() {
        let text = "제1조 (목적)\n본 계약의 목적은...\n제2조 (대금)\n대금은 500만원으로 한다.";
        let clauses = Segmenter::default().segment(text);
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].title, "목적");
        assert_eq!(clauses[1].title, "대금");
        assert_eq!(clauses[0].extraction_method, "article_kr");
    }

    #[test]
    fn floors_always_hold() {
        let text = "제1조 (a)\n짧다\n제2조 (손해배상)\n수급인이 본 계약을 위반한 경우 그로 인하여 발생한 모든 손해를 배상하여야 한다.";
        let clauses = Segmenter::default().segment(text);
        for clause in &clauses {
            assert!(clause.content.trim().chars().count() >= MIN_CONTENT_CHARS);
            assert!(clause.title.trim().chars().count() >= MIN_TITLE_CHARS);
        }
        // 제1조 dropped: single-char title and short body
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].title, "손해배상");
    }

    #[test]
    fn most_matches_wins_over_cascade_order() {
        // One stray Korean article marker, but the document is really a
        // numbered list — the list strategy yields more clauses and wins.
        let text = "제1조 (총칙)\n총칙에 관한 일반적인 규정을 아래와 같이 둔다.\n\
                    1. The supplier shall deliver the goods to the buyer by March 1st.\n\
                    2. Payment is due within fourteen days of delivery of the goods.\n\
                    3. Either party may terminate upon thirty days written notice.";
        let clauses = Segmenter::default().segment(text);
        assert!(clauses.len() >= 3);
        assert_eq!(clauses[0].extraction_method, "numbered_list");
    }

    #[test]
    fn paragraph_fallback_for_unstructured_text() {
        let text = "양 당사자는 상호 신뢰를 바탕으로 본 계약을 성실히 이행하기로 한다.\n\n\
                    계약의 해석에 관하여 다툼이 있는 경우 상호 협의하여 해결한다.";
        let clauses = Segmenter::default().segment(text);
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].extraction_method, "paragraph_fallback");
        assert_eq!(clauses[0].number, 1);
        assert_eq!(clauses[1].number, 2);
    }

    #[test]
    fn short_unstructured_document_yields_empty_list() {
        let clauses = Segmenter::default().segment("메모: 짧은 글");
        assert!(clauses.is_empty());

        let clauses = Segmenter::default().segment("");
        assert!(clauses.is_empty());
    }

    #[test]
    fn fallback_respects_paragraph_cap() {
        let para = "이 단락은 길이 요건을 충족할 만큼 충분히 길게 작성된 본문 단락이다.";
        let text = vec![para; 50].join("\n\n");
        let clauses = Segmenter::new(30).segment(&text);
        assert_eq!(clauses.len(), 30);
    }
}
