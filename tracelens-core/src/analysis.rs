//! Retrieval-grounded analysis of error reports.
//!
//! One call runs retrieve → build context → build prompt → generate. Retrieval
//! failures abort the call; generation problems never do. An unconfigured or
//! failing provider degrades to a fixed explanatory string instead.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::memory::{Document, SearchResult};
use crate::provider::{Provider, ProviderError};
use crate::retrieval::{RetrievalError, Retriever, TEXT_KEY};

/// Default number of similar errors retrieved and shown to the model.
pub const DEFAULT_CONTEXT_LIMIT: usize = 3;

/// Metadata key naming where a stored error came from.
pub const SOURCE_KEY: &str = "source";

pub const SYSTEM_PROMPT: &str = "You are a helpful debugging assistant. You analyze stack traces and error messages to help developers understand and fix issues.

When given a stack trace and relevant context from similar errors, you should:
1. Identify the root cause of the error
2. Explain why this error occurs
3. Suggest concrete solutions

Be concise and practical. Focus on actionable advice.";

/// Returned in place of an analysis when no provider is configured.
pub const UNCONFIGURED_MESSAGE: &str =
    "LLM not configured. Set GROQ_API_KEY environment variable for AI-powered analysis.";

const CONTEXT_HEADER: &str = "Here are similar errors and their solutions:";
const INSTRUCTION: &str = "Analyze this error and provide a solution.";

/// Result of one analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub analysis: String,
    pub similar_errors: Vec<SearchResult>,
    pub context_used: bool,
}

/// What happened when the provider was asked for text.
#[derive(Debug)]
pub enum GenerationOutcome {
    Generated(String),
    Unconfigured,
    Failed(ProviderError),
}

impl GenerationOutcome {
    /// Collapse the outcome into the text shown to the caller.
    pub fn into_text(self) -> String {
        match self {
            Self::Generated(text) => text,
            Self::Unconfigured => UNCONFIGURED_MESSAGE.to_string(),
            Self::Failed(e) => format!("LLM error: {e}"),
        }
    }
}

/// Combines retrieval with an optional text generator.
pub struct Analyzer<P> {
    retriever: Arc<Retriever>,
    provider: Option<P>,
    context_limit: usize,
}

impl<P: Provider> Analyzer<P> {
    pub fn new(retriever: Arc<Retriever>, provider: Option<P>) -> Self {
        Self {
            retriever,
            provider,
            context_limit: DEFAULT_CONTEXT_LIMIT,
        }
    }

    pub fn with_context_limit(mut self, limit: usize) -> Self {
        self.context_limit = limit;
        self
    }

    pub fn retriever(&self) -> &Arc<Retriever> {
        &self.retriever
    }

    pub fn provider(&self) -> Option<&P> {
        self.provider.as_ref()
    }

    /// Analyze `stack_trace`, optionally grounding the prompt in similar
    /// stored errors.
    pub async fn analyze(
        &self,
        stack_trace: &str,
        use_retrieval: bool,
    ) -> Result<Analysis, RetrievalError> {
        let similar_errors = if use_retrieval && self.retriever.store_size() > 0 {
            self.retriever.query(stack_trace, self.context_limit)?
        } else {
            Vec::new()
        };

        let context = build_context(&similar_errors, self.context_limit);
        let prompt = build_prompt(stack_trace, &context);

        let analysis = self.generate(&prompt).await.into_text();
        let context_used = !similar_errors.is_empty();
        Ok(Analysis {
            analysis,
            similar_errors,
            context_used,
        })
    }

    async fn generate(&self, prompt: &str) -> GenerationOutcome {
        let Some(provider) = self.provider.as_ref() else {
            return GenerationOutcome::Unconfigured;
        };
        match provider.generate(SYSTEM_PROMPT, prompt).await {
            Ok(text) => GenerationOutcome::Generated(text),
            Err(e) => {
                log::warn!("generation with {} failed: {e}", provider.model_name());
                GenerationOutcome::Failed(e)
            }
        }
    }
}

/// Render up to `limit` results as a numbered list. Empty when there are none.
pub fn build_context(results: &[SearchResult], limit: usize) -> String {
    if results.is_empty() || limit == 0 {
        return String::new();
    }
    let mut parts = vec![CONTEXT_HEADER.to_string()];
    for (i, result) in results.iter().take(limit).enumerate() {
        let source = field(&result.metadata, SOURCE_KEY).unwrap_or_else(|| "unknown".into());
        let text = field(&result.metadata, TEXT_KEY).unwrap_or_default();
        parts.push(format!("\n{}. [{source}] {text}", i + 1));
    }
    parts.join("\n")
}

/// Wrap the stack trace in a code fence, append context, then the instruction.
pub fn build_prompt(stack_trace: &str, context: &str) -> String {
    let mut prompt = format!("Stack trace:\n```\n{stack_trace}\n```");
    if !context.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(context);
    }
    prompt.push_str("\n\n");
    prompt.push_str(INSTRUCTION);
    prompt
}

/// Read a metadata value as display text. Strings are used verbatim; other
/// values are rendered as JSON.
fn field(metadata: &Document, key: &str) -> Option<String> {
    metadata.get(key).map(|value| match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}
