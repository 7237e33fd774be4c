//! Clause classification via the delegated completion service.

use serde::Deserialize;
use tracing::warn;

use clauseforge_shared::{ClauseCategory, ClauseVariable};

use crate::json::extract_json;
use crate::provider::CompletionProvider;
use crate::truncate_chars;

/// Category assigned when classification cannot run or cannot be parsed.
pub const FALLBACK_CATEGORY: &str = "other";

/// Confidence assigned to fallback classifications.
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Outcome of classifying one clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: String,
    /// In `[0, 1]`; clamped on parse.
    pub confidence: f64,
    pub reason: String,
    pub tags: Vec<String>,
    /// Variable hints the model spotted while classifying.
    pub variables: Vec<ClauseVariable>,
}

impl Classification {
    /// The degraded result guaranteeing the pipeline always gets a usable
    /// (if low-confidence) classification.
    pub fn fallback() -> Self {
        Self {
            category: FALLBACK_CATEGORY.into(),
            confidence: FALLBACK_CONFIDENCE,
            reason: "automatic classification failed".into(),
            tags: Vec::new(),
            variables: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    category: String,
    confidence: f64,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    variables: Vec<ClauseVariable>,
}

/// Classifies clauses against a jurisdiction's taxonomy.
pub struct Classifier<P> {
    provider: P,
    preview_chars: usize,
}

impl<P: CompletionProvider> Classifier<P> {
    pub fn new(provider: P, preview_chars: usize) -> Self {
        Self {
            provider,
            preview_chars,
        }
    }

    /// Classify one clause. Never fails: any provider or parse problem
    /// degrades to [`Classification::fallback`].
    pub async fn classify(
        &self,
        title: &str,
        content: &str,
        categories: &[ClauseCategory],
    ) -> Classification {
        let prompt = self.build_prompt(title, content, categories);

        let raw = match self.provider.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, title, "classification call failed, using fallback");
                return Classification::fallback();
            }
        };

        match parse_classification(&raw, categories) {
            Ok(classification) => classification,
            Err(e) => {
                warn!(error = %e, title, "classification response unparseable, using fallback");
                Classification::fallback()
            }
        }
    }

    fn build_prompt(&self, title: &str, content: &str, categories: &[ClauseCategory]) -> String {
        let category_list = categories
            .iter()
            .map(|c| format!("- {} ({})", c.key, c.name))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are a legal contract analyst. Classify the following contract clause \
             into exactly one of the listed categories.\n\n\
             Categories:\n{category_list}\n\n\
             Clause title: {title}\n\
             Clause content:\n{}\n\n\
             Respond with JSON only, no prose, in this shape:\n\
             {{\"category\": \"<key>\", \"confidence\": <0..1>, \"reason\": \"...\", \
             \"tags\": [\"...\"], \
             \"variables\": [{{\"name\": \"...\", \"value\": \"...\", \"type\": \
             \"amount|date|duration|party_name|other\", \"position\": 0}}]}}",
            truncate_chars(content, self.preview_chars),
        )
    }
}

/// Parse and sanitize a classification response.
fn parse_classification(
    raw: &str,
    categories: &[ClauseCategory],
) -> clauseforge_shared::Result<Classification> {
    let parsed: RawClassification = serde_json::from_str(extract_json(raw))
        .map_err(|e| clauseforge_shared::ClauseForgeError::Service(format!("bad JSON: {e}")))?;

    // Unknown categories degrade to "other" rather than polluting the taxonomy.
    let category = if categories.iter().any(|c| c.key == parsed.category) {
        parsed.category
    } else {
        FALLBACK_CATEGORY.to_string()
    };

    Ok(Classification {
        category,
        confidence: parsed.confidence.clamp(0.0, 1.0),
        reason: parsed.reason,
        tags: parsed.tags,
        variables: parsed.variables,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeProvider;
    use clauseforge_shared::default_taxonomy;

    #[tokio::test]
    async fn parses_well_formed_response() {
        let provider = FakeProvider::with_responses(vec![Ok(r#"{
            "category": "payment",
            "confidence": 0.92,
            "reason": "mentions fees and a due date",
            "tags": ["fees"],
            "variables": [{"name": "amount", "value": "500만원", "type": "amount", "position": 4}]
        }"#
        .into())]);

        let classifier = Classifier::new(provider, 1500);
        let result = classifier
            .classify("대금", "대금은 500만원으로 한다.", &default_taxonomy())
            .await;

        assert_eq!(result.category, "payment");
        assert_eq!(result.confidence, 0.92);
        assert_eq!(result.variables.len(), 1);
    }

    #[tokio::test]
    async fn provider_failure_yields_fallback_not_error() {
        let provider = FakeProvider::with_responses(vec![Err("connection refused".into())]);
        let classifier = Classifier::new(provider, 1500);

        let result = classifier
            .classify("대금", "대금은 500만원으로 한다.", &default_taxonomy())
            .await;

        assert_eq!(result.category, "other");
        assert_eq!(result.confidence, 0.3);
        assert_eq!(result.reason, "automatic classification failed");
        assert!(result.tags.is_empty());
    }

    #[tokio::test]
    async fn unparseable_response_yields_fallback() {
        let provider =
            FakeProvider::with_responses(vec![Ok("Sure! The category is payment.".into())]);
        let classifier = Classifier::new(provider, 1500);

        let result = classifier
            .classify("대금", "대금은 500만원으로 한다.", &default_taxonomy())
            .await;
        assert_eq!(result.category, "other");
        assert_eq!(result.confidence, 0.3);
    }

    #[tokio::test]
    async fn fenced_response_is_accepted() {
        let provider = FakeProvider::with_responses(vec![Ok(
            "```json\n{\"category\": \"termination\", \"confidence\": 0.8}\n```".into(),
        )]);
        let classifier = Classifier::new(provider, 1500);

        let result = classifier
            .classify("해지", "계약의 해지에 관한 조항", &default_taxonomy())
            .await;
        assert_eq!(result.category, "termination");
    }

    #[tokio::test]
    async fn confidence_is_clamped_and_unknown_category_degrades() {
        let provider = FakeProvider::with_responses(vec![Ok(
            r#"{"category": "weird_new_thing", "confidence": 1.7}"#.into(),
        )]);
        let classifier = Classifier::new(provider, 1500);

        let result = classifier
            .classify("기타", "기타 사항에 관한 조항", &default_taxonomy())
            .await;
        assert_eq!(result.category, "other");
        assert_eq!(result.confidence, 1.0);
    }

    #[tokio::test]
    async fn prompt_embeds_truncated_preview_and_categories() {
        let provider = FakeProvider::with_responses(vec![Ok(
            r#"{"category": "other", "confidence": 0.5}"#.into(),
        )]);
        let long_content = "조항 ".repeat(2000);
        let classifier = Classifier::new(provider, 100);

        classifier
            .classify("제목", &long_content, &default_taxonomy())
            .await;

        let prompts = classifier.provider.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("governing_law"));
        assert!(prompts[0].contains("JSON only"));
        assert!(prompts[0].len() < long_content.len());
    }
}
