//! Deduplication of new clauses against already-analyzed ones.

use serde::Deserialize;
use tracing::warn;

use crate::json::extract_json;
use crate::provider::CompletionProvider;
use crate::truncate_chars;

/// Similarity above this is a duplicate.
pub const DUPLICATE_THRESHOLD: f64 = 0.8;

/// Default number of existing clauses sampled per check.
pub const DEFAULT_SAMPLE_SIZE: usize = 5;

/// A previously analyzed clause offered as a comparison target.
#[derive(Debug, Clone)]
pub struct ClauseRef {
    pub title: String,
    pub content: String,
}

/// Outcome of a dedup check.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupVerdict {
    pub is_duplicate: bool,
    /// In `[0, 1]`.
    pub similarity: f64,
    /// Title of the most similar existing clause, when one stood out.
    pub similar_clause: Option<String>,
    pub analysis: String,
}

impl DedupVerdict {
    fn not_duplicate(analysis: impl Into<String>) -> Self {
        Self {
            is_duplicate: false,
            similarity: 0.0,
            similar_clause: None,
            analysis: analysis.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    similarity: f64,
    /// 1-based index into the offered sample.
    #[serde(default)]
    most_similar_index: Option<usize>,
    #[serde(default)]
    analysis: String,
}

/// Checks a new clause against a bounded sample of existing clauses.
pub struct DedupChecker<P> {
    provider: P,
    sample_size: usize,
    preview_chars: usize,
}

impl<P: CompletionProvider> DedupChecker<P> {
    pub fn new(provider: P, sample_size: usize, preview_chars: usize) -> Self {
        Self {
            provider,
            sample_size,
            preview_chars,
        }
    }

    /// Compare `content` against the first `sample_size` entries of
    /// `existing`. An empty sample short-circuits without a provider call;
    /// provider failures fail open (never block pipeline progress).
    pub async fn check(&self, title: &str, content: &str, existing: &[ClauseRef]) -> DedupVerdict {
        let sample = &existing[..existing.len().min(self.sample_size)];
        if sample.is_empty() {
            return DedupVerdict::not_duplicate("no existing clauses to compare against");
        }

        let prompt = self.build_prompt(title, content, sample);
        let raw = match self.provider.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, title, "dedup call failed, treating as not a duplicate");
                return DedupVerdict::not_duplicate("deduplication check unavailable");
            }
        };

        let parsed: RawVerdict = match serde_json::from_str(extract_json(&raw)) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, title, "dedup response unparseable, treating as not a duplicate");
                return DedupVerdict::not_duplicate("deduplication check unavailable");
            }
        };

        let similarity = parsed.similarity.clamp(0.0, 1.0);
        let similar_clause = parsed
            .most_similar_index
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| sample.get(i))
            .map(|c| c.title.clone());

        DedupVerdict {
            is_duplicate: similarity > DUPLICATE_THRESHOLD,
            similarity,
            similar_clause,
            analysis: parsed.analysis,
        }
    }

    fn build_prompt(&self, title: &str, content: &str, sample: &[ClauseRef]) -> String {
        let listing = sample
            .iter()
            .enumerate()
            .map(|(i, c)| {
                format!(
                    "{}. [{}] {}",
                    i + 1,
                    c.title,
                    truncate_chars(&c.content, self.preview_chars)
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are a legal contract analyst. Judge whether the new clause below \
             duplicates any of the existing clauses.\n\n\
             Existing clauses:\n{listing}\n\n\
             New clause title: {title}\n\
             New clause content:\n{}\n\n\
             Respond with JSON only, no prose, in this shape:\n\
             {{\"similarity\": <0..1>, \"most_similar_index\": <1-based index or null>, \
             \"analysis\": \"...\"}}",
            truncate_chars(content, self.preview_chars),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeProvider;

    fn sample(n: usize) -> Vec<ClauseRef> {
        (1..=n)
            .map(|i| ClauseRef {
                title: format!("제{i}조"),
                content: format!("기존 조항 {i}의 내용으로 충분히 긴 본문이다."),
            })
            .collect()
    }

    #[tokio::test]
    async fn empty_sample_short_circuits_without_provider_call() {
        let provider = FakeProvider::with_responses(vec![]);
        let checker = DedupChecker::new(provider, DEFAULT_SAMPLE_SIZE, 500);

        let verdict = checker.check("새 조항", "새 조항의 내용", &[]).await;

        assert!(!verdict.is_duplicate);
        assert_eq!(verdict.similarity, 0.0);
        assert_eq!(verdict.similar_clause, None);
        assert_eq!(checker.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn similarity_above_threshold_is_duplicate() {
        let provider = FakeProvider::with_responses(vec![Ok(
            r#"{"similarity": 0.93, "most_similar_index": 2, "analysis": "near identical"}"#.into(),
        )]);
        let checker = DedupChecker::new(provider, DEFAULT_SAMPLE_SIZE, 500);

        let verdict = checker.check("새 조항", "내용", &sample(3)).await;

        assert!(verdict.is_duplicate);
        assert_eq!(verdict.similarity, 0.93);
        assert_eq!(verdict.similar_clause.as_deref(), Some("제2조"));
    }

    #[tokio::test]
    async fn threshold_is_strict() {
        // similarity > 0.8, not >=
        let provider = FakeProvider::with_responses(vec![Ok(
            r#"{"similarity": 0.8, "analysis": "borderline"}"#.into(),
        )]);
        let checker = DedupChecker::new(provider, DEFAULT_SAMPLE_SIZE, 500);

        let verdict = checker.check("새 조항", "내용", &sample(1)).await;
        assert!(!verdict.is_duplicate);
        assert_eq!(verdict.similarity, 0.8);
    }

    #[tokio::test]
    async fn provider_failure_fails_open() {
        let provider = FakeProvider::with_responses(vec![Err("timeout".into())]);
        let checker = DedupChecker::new(provider, DEFAULT_SAMPLE_SIZE, 500);

        let verdict = checker.check("새 조항", "내용", &sample(2)).await;
        assert!(!verdict.is_duplicate);
        assert_eq!(verdict.similarity, 0.0);
    }

    #[tokio::test]
    async fn sample_is_bounded_to_first_n() {
        let provider = FakeProvider::with_responses(vec![Ok(
            r#"{"similarity": 0.1, "analysis": "distinct"}"#.into(),
        )]);
        let checker = DedupChecker::new(provider, 5, 500);

        checker.check("새 조항", "내용", &sample(9)).await;

        let prompts = checker.provider.prompts();
        assert!(prompts[0].contains("제5조"));
        assert!(!prompts[0].contains("제6조"));
    }

    #[tokio::test]
    async fn out_of_range_similar_index_is_dropped() {
        let provider = FakeProvider::with_responses(vec![Ok(
            r#"{"similarity": 0.9, "most_similar_index": 7, "analysis": ""}"#.into(),
        )]);
        let checker = DedupChecker::new(provider, 5, 500);

        let verdict = checker.check("새 조항", "내용", &sample(2)).await;
        assert!(verdict.is_duplicate);
        assert_eq!(verdict.similar_clause, None);
    }
}
