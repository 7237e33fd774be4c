//! Variable extraction and clause templating.

use serde::Deserialize;
use tracing::warn;

use clauseforge_shared::ClauseVariable;

use crate::json::extract_json;
use crate::provider::CompletionProvider;

/// Variables found in a clause plus its templated rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub variables: Vec<ClauseVariable>,
    /// Original content with each literal value replaced by `{{name}}`.
    pub template_content: String,
}

impl Extraction {
    /// Degraded result: no variables, content untouched. Templating failure
    /// never drops a clause.
    fn untemplated(content: &str) -> Self {
        Self {
            variables: Vec::new(),
            template_content: content.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawExtraction {
    #[serde(default)]
    variables: Vec<ClauseVariable>,
    #[serde(default)]
    template_content: String,
}

/// Identifies substitutable values (amounts, dates, durations, party names)
/// and produces a templated clause.
pub struct VariableExtractor<P> {
    provider: P,
}

impl<P: CompletionProvider> VariableExtractor<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Extract variables from `content`. Never fails: provider or parse
    /// problems return the original content with no variables.
    pub async fn extract(&self, content: &str) -> Extraction {
        let prompt = build_prompt(content);

        let raw = match self.provider.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "variable extraction call failed, keeping original content");
                return Extraction::untemplated(content);
            }
        };

        let parsed: RawExtraction = match serde_json::from_str(extract_json(&raw)) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "variable extraction response unparseable, keeping original content");
                return Extraction::untemplated(content);
            }
        };

        // A template with no placeholders for its variables is worse than no
        // template at all.
        if parsed.template_content.trim().is_empty() {
            return Extraction::untemplated(content);
        }

        Extraction {
            variables: parsed.variables,
            template_content: parsed.template_content,
        }
    }
}

/// Substitute extracted values back into a template. Inverse of templating,
/// used for round-trip checks and for instantiating standard clauses.
pub fn render_template(template: &str, variables: &[ClauseVariable]) -> String {
    let mut rendered = template.to_string();
    for var in variables {
        rendered = rendered.replace(&format!("{{{{{}}}}}", var.name), &var.value);
    }
    rendered
}

// Templating needs the full clause, so no preview truncation here.
fn build_prompt(content: &str) -> String {
    format!(
        "You are a legal contract analyst. Find the substitutable values in the \
         clause below (amounts, dates, durations, party names) and rewrite the \
         clause with each value replaced by a {{{{placeholder}}}} token named after \
         the variable.\n\n\
         Clause content:\n{content}\n\n\
         Respond with JSON only, no prose, in this shape:\n\
         {{\"variables\": [{{\"name\": \"...\", \"value\": \"...\", \"type\": \
         \"amount|date|duration|party_name|other\", \"position\": 0}}], \
         \"template_content\": \"...\"}}"
    )
}
