//! Structural-marker segmentation strategies.
//!
//! Each strategy recognizes one family of clause markers and slices the
//! document at marker positions. The cascade in [`crate::Segmenter`] dry-runs
//! all of them and keeps the strongest result.

use std::sync::LazyLock;

use regex::Regex;

use crate::SegmentedClause;

/// Korean statutory article markers: `제1조 (목적)` or `제1조 목적`.
static ARTICLE_KR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^제\s*(\d+)\s*조(?:\s*\(([^)\n]*)\)|[ \t]+([^\n]*))?").expect("valid regex")
});

/// Western article/section headings: `Article 1. Purpose`, `Section 2: Fees`.
static ARTICLE_WEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^(?:article|section)\s+(\d+)\s*[.:)]?[ \t]*([^\n]*)$").expect("valid regex")
});

/// Numeric list markers at line start: `1. …` or `1) …`.
static NUMERIC_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(\d{1,2})[.)][ \t]+(\S[^\n]*)$").expect("valid regex")
});

/// Labeled-field lines: `계약금액: 5,000,000원` or `Deposit: USD 500`.
static LABELED_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([\p{Hangul}A-Za-z][\p{Hangul}A-Za-z0-9 /·]{1,24})[ \t]*[:：][ \t]*(\S[^\n]*)$")
        .expect("valid regex")
});

/// A contiguous family of structural markers the cascade can try.
pub trait SegmentStrategy: Send + Sync {
    /// Identifier recorded as `extraction_method` on emitted clauses.
    fn name(&self) -> &'static str;

    /// Split `text` into clauses. Returns an empty vec when no marker of this
    /// family appears.
    fn segment(&self, text: &str) -> Vec<SegmentedClause>;
}

/// The segmentation cascade, in priority order. Earlier strategies win
/// dry-run ties.
pub fn cascade() -> Vec<Box<dyn SegmentStrategy>> {
    vec![
        Box::new(KoreanArticleStrategy),
        Box::new(WesternArticleStrategy),
        Box::new(NumericListStrategy),
        Box::new(LabeledFieldStrategy),
    ]
}

// ---------------------------------------------------------------------------
// Marker slicing
// ---------------------------------------------------------------------------

struct Marker {
    start: usize,
    number: u32,
    title: String,
}

/// Slice the document at marker start offsets. Each clause keeps its marker
/// line so that short bodies still carry context (and survive the length
/// floor applied by the caller).
fn slice_at_markers(
    text: &str,
    markers: Vec<Marker>,
    confidence: f64,
    method: &'static str,
) -> Vec<SegmentedClause> {
    let ends: Vec<usize> = markers
        .iter()
        .skip(1)
        .map(|m| m.start)
        .chain(std::iter::once(text.len()))
        .collect();

    markers
        .into_iter()
        .zip(ends)
        .map(|(marker, end)| SegmentedClause {
            number: marker.number,
            title: marker.title,
            content: text[marker.start..end].trim().to_string(),
            confidence,
            extraction_method: method.into(),
        })
        .collect()
}

/// Truncate a title on a char boundary.
fn clip_title(raw: &str, max_chars: usize) -> String {
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => trimmed[..idx].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

pub struct KoreanArticleStrategy;

impl SegmentStrategy for KoreanArticleStrategy {
    fn name(&self) -> &'static str {
        "article_kr"
    }

    fn segment(&self, text: &str) -> Vec<SegmentedClause> {
        let markers: Vec<Marker> = ARTICLE_KR
            .captures_iter(text)
            .filter_map(|cap| {
                let m = cap.get(0)?;
                let number = cap.get(1)?.as_str().parse().ok()?;
                let title = cap
                    .get(2)
                    .or_else(|| cap.get(3))
                    .map(|t| t.as_str().trim().to_string())
                    .unwrap_or_default();
                Some(Marker {
                    start: m.start(),
                    number,
                    title,
                })
            })
            .collect();

        slice_at_markers(text, markers, 0.9, self.name())
    }
}

pub struct WesternArticleStrategy;

impl SegmentStrategy for WesternArticleStrategy {
    fn name(&self) -> &'static str {
        "article_west"
    }

    fn segment(&self, text: &str) -> Vec<SegmentedClause> {
        let markers: Vec<Marker> = ARTICLE_WEST
            .captures_iter(text)
            .filter_map(|cap| {
                let m = cap.get(0)?;
                let number = cap.get(1)?.as_str().parse().ok()?;
                let title = cap
                    .get(2)
                    .map(|t| t.as_str().trim().to_string())
                    .unwrap_or_default();
                Some(Marker {
                    start: m.start(),
                    number,
                    title,
                })
            })
            .collect();

        slice_at_markers(text, markers, 0.85, self.name())
    }
}

pub struct NumericListStrategy;

impl SegmentStrategy for NumericListStrategy {
    fn name(&self) -> &'static str {
        "numbered_list"
    }

    fn segment(&self, text: &str) -> Vec<SegmentedClause> {
        let markers: Vec<Marker> = NUMERIC_LIST
            .captures_iter(text)
            .filter_map(|cap| {
                let m = cap.get(0)?;
                let number = cap.get(1)?.as_str().parse().ok()?;
                let title = clip_title(cap.get(2)?.as_str(), 40);
                Some(Marker {
                    start: m.start(),
                    number,
                    title,
                })
            })
            .collect();

        slice_at_markers(text, markers, 0.7, self.name())
    }
}

pub struct LabeledFieldStrategy;

impl SegmentStrategy for LabeledFieldStrategy {
    fn name(&self) -> &'static str {
        "labeled_field"
    }

    fn segment(&self, text: &str) -> Vec<SegmentedClause> {
        let markers: Vec<Marker> = LABELED_FIELD
            .captures_iter(text)
            .enumerate()
            .filter_map(|(i, cap)| {
                let m = cap.get(0)?;
                Some(Marker {
                    start: m.start(),
                    number: (i + 1) as u32,
                    title: cap.get(1)?.as_str().trim().to_string(),
                })
            })
            .collect();

        slice_at_markers(text, markers, 0.6, self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn korean_articles_with_parenthesized_titles() {
        let text = "제1조 (목적)\n이 계약은 양 당사자 간의 권리와 의무를 정한다.\n제2조 (정의)\n이 계약에서 사용하는 용어의 뜻은 다음과 같다.";
        let clauses = KoreanArticleStrategy.segment(text);
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].number, 1);
        assert_eq!(clauses[0].title, "목적");
        assert_eq!(clauses[1].title, "정의");
        assert!(clauses[0].content.starts_with("제1조"));
        assert!(clauses[0].content.contains("권리와 의무"));
        assert!(!clauses[0].content.contains("제2조"));
    }

    #[test]
    fn korean_articles_with_bare_titles() {
        let text = "제 3 조 손해배상\n수급인이 계약을 위반한 경우 그로 인한 손해를 배상하여야 한다.";
        let clauses = KoreanArticleStrategy.segment(text);
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].number, 3);
        assert_eq!(clauses[0].title, "손해배상");
    }

    #[test]
    fn western_articles() {
        let text = "Article 1. Purpose\nThis agreement sets out the rights and duties of the parties hereto.\nSection 2: Fees\nThe client shall pay the contractor within thirty days of invoice.";
        let clauses = WesternArticleStrategy.segment(text);
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].title, "Purpose");
        assert_eq!(clauses[1].number, 2);
        assert_eq!(clauses[1].title, "Fees");
    }

    #[test]
    fn numeric_list_items() {
        let text = "1. The supplier shall deliver all goods no later than March 1st.\n2) Payment is due within 14 days of delivery of the goods.";
        let clauses = NumericListStrategy.segment(text);
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].number, 1);
        assert!(clauses[0].title.starts_with("The supplier"));
        // Title clipped to 40 chars
        assert!(clauses[0].title.chars().count() <= 40);
    }

    #[test]
    fn labeled_fields() {
        let text = "계약금액: 금 오백만원 (₩5,000,000) 으로 한다\n계약기간: 2025년 1월 1일부터 12월 31일까지로 한다";
        let clauses = LabeledFieldStrategy.segment(text);
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].title, "계약금액");
        assert_eq!(clauses[1].number, 2);
    }

    #[test]
    fn no_markers_yields_empty() {
        let text = "이 문서에는 구조적인 조항 표시가 전혀 없다.";
        assert!(KoreanArticleStrategy.segment(text).is_empty());
        assert!(WesternArticleStrategy.segment(text).is_empty());
        assert!(NumericListStrategy.segment(text).is_empty());
    }
}
