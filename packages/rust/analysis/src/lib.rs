//! Delegated-service analysis engines: classification, deduplication, and
//! variable extraction, plus the completion-provider boundary and call pacer.
//!
//! Every engine follows the same failure policy: a delegated-service problem
//! (network, non-2xx, timeout, unparseable response) degrades to a documented
//! fallback result instead of erroring, so a flaky provider can never stall
//! or crash a batch.

pub mod classify;
pub mod dedup;
pub mod json;
pub mod pacer;
pub mod provider;
pub mod variables;

pub use classify::{Classification, Classifier, FALLBACK_CATEGORY, FALLBACK_CONFIDENCE};
pub use dedup::{ClauseRef, DUPLICATE_THRESHOLD, DEFAULT_SAMPLE_SIZE, DedupChecker, DedupVerdict};
pub use json::extract_json;
pub use pacer::Pacer;
pub use provider::{CompletionProvider, HttpCompletionProvider};
pub use variables::{Extraction, VariableExtractor, render_template};

/// Truncate on a char boundary, appending a marker when content was cut.
pub(crate) fn truncate_chars(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}\n[... truncated ...]", &content[..idx]),
        None => content.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use clauseforge_shared::{ClauseForgeError, Result};

    use crate::provider::CompletionProvider;

    /// Scripted provider for engine tests: pops canned responses in order and
    /// records every prompt it receives.
    pub struct FakeProvider {
        responses: Mutex<VecDeque<std::result::Result<String, String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeProvider {
        pub fn with_responses(responses: Vec<std::result::Result<String, String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    impl CompletionProvider for FakeProvider {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.responses.lock().unwrap().pop_front() {
                Some(Ok(response)) => Ok(response),
                Some(Err(message)) => Err(ClauseForgeError::Service(message)),
                None => Err(ClauseForgeError::Service(
                    "fake provider exhausted".into(),
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_short_content_is_untouched() {
        assert_eq!(truncate_chars("짧은 조항", 100), "짧은 조항");
    }

    #[test]
    fn truncate_long_content_is_marked() {
        let content = "조".repeat(200);
        let result = truncate_chars(&content, 100);
        assert!(result.chars().count() < 200);
        assert!(result.contains("truncated"));
    }
}
