//! Prompt templates and context assembly.
//!
//! A [`PromptTemplate`] is plain text with exactly two slots, `{context}` and `{query}`.
//! The [`PromptComposer`] joins retrieved chunks into the context, enforcing a character
//! budget by dropping the lowest-ranked chunks first, and renders the template.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{RagError, Result};
use crate::types::RetrievedChunk;

const CONTEXT_SLOT: &str = "{context}";
const QUERY_SLOT: &str = "{query}";

/// Default context budget in characters.
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 4000;

/// Default separator placed between chunks in the context.
pub const DEFAULT_CONTEXT_SEPARATOR: &str = "\n";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Context,
    Query,
}

/// A prompt layout with `{context}` and `{query}` slots.
///
/// Slots are substituted in a single pass, so braces inside the context or the query
/// are never interpreted as slots.
///
/// # Example
///
/// ```rust
/// use docqa_rag::PromptTemplate;
///
/// let template = PromptTemplate::plain();
/// assert_eq!(
///     template.render("The sky is blue.", "What color is the sky?"),
///     "Context:\nThe sky is blue.\n\nQuestion: What color is the sky?\nAnswer:"
/// );
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TemplateRepr", into = "TemplateRepr")]
pub struct PromptTemplate {
    text: String,
    segments: Vec<Segment>,
    answer_marker: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct TemplateRepr {
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    answer_marker: Option<String>,
}

impl TryFrom<TemplateRepr> for PromptTemplate {
    type Error = RagError;

    fn try_from(repr: TemplateRepr) -> Result<Self> {
        let template = Self::new(repr.text)?;
        Ok(match repr.answer_marker {
            Some(marker) => template.with_answer_marker(marker),
            None => template,
        })
    }
}

impl From<PromptTemplate> for TemplateRepr {
    fn from(template: PromptTemplate) -> Self {
        Self {
            text: template.text,
            answer_marker: template.answer_marker,
        }
    }
}

impl fmt::Debug for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptTemplate")
            .field("text", &self.text)
            .field("answer_marker", &self.answer_marker)
            .finish()
    }
}

impl PromptTemplate {
    /// Parses a template.
    ///
    /// # Errors
    /// Returns [`RagError::InvalidArgument`] unless both `{context}` and `{query}` occur
    /// exactly once.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        for slot in [CONTEXT_SLOT, QUERY_SLOT] {
            let count = text.matches(slot).count();
            if count != 1 {
                return Err(RagError::InvalidArgument(format!(
                    "prompt template must contain {slot} exactly once (found {count})"
                )));
            }
        }
        let segments = parse(&text);
        Ok(Self {
            text,
            segments,
            answer_marker: None,
        })
    }

    /// The plain completion layout:
    /// `Context:\n{context}\n\nQuestion: {query}\nAnswer:`.
    #[must_use]
    pub fn plain() -> Self {
        Self::from_known("Context:\n{context}\n\nQuestion: {query}\nAnswer:")
    }

    /// An instruction-tuned layout wrapped in `[INST]` tags.
    ///
    /// The answer is whatever follows `[/INST]` in the model output.
    #[must_use]
    pub fn instruct() -> Self {
        Self::from_known("<s>[INST] Context: {context}\n\nQuestion: {query}\nAnswer: [/INST]")
            .with_answer_marker("[/INST]")
    }

    fn from_known(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            segments: parse(text),
            answer_marker: None,
        }
    }

    /// Keeps only the generated text after `marker` when it appears in the output.
    #[must_use]
    pub fn with_answer_marker(mut self, marker: impl Into<String>) -> Self {
        let marker = marker.into();
        self.answer_marker = (!marker.is_empty()).then_some(marker);
        self
    }

    /// The raw template text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The answer marker, if any.
    #[must_use]
    pub fn answer_marker(&self) -> Option<&str> {
        self.answer_marker.as_deref()
    }

    /// Substitutes the slots.
    #[must_use]
    pub fn render(&self, context: &str, query: &str) -> String {
        let mut prompt = String::with_capacity(self.text.len() + context.len() + query.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => prompt.push_str(text),
                Segment::Context => prompt.push_str(context),
                Segment::Query => prompt.push_str(query),
            }
        }
        prompt
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::plain()
    }
}

fn parse(mut text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    loop {
        let next = [(CONTEXT_SLOT, Segment::Context), (QUERY_SLOT, Segment::Query)]
            .into_iter()
            .filter_map(|(slot, segment)| text.find(slot).map(|at| (at, slot, segment)))
            .min_by_key(|(at, _, _)| *at);

        let Some((at, slot, segment)) = next else {
            if !text.is_empty() {
                segments.push(Segment::Literal(text.to_owned()));
            }
            return segments;
        };
        if at > 0 {
            segments.push(Segment::Literal(text[..at].to_owned()));
        }
        segments.push(segment);
        text = &text[at + slot.len()..];
    }
}

/// Builds the final prompt from a query and its retrieved chunks.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    template: PromptTemplate,
    max_context_chars: usize,
    separator: String,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new(
            PromptTemplate::plain(),
            DEFAULT_MAX_CONTEXT_CHARS,
            DEFAULT_CONTEXT_SEPARATOR,
        )
    }
}

impl PromptComposer {
    /// Creates a composer.
    #[must_use]
    pub fn new(
        template: PromptTemplate,
        max_context_chars: usize,
        separator: impl Into<String>,
    ) -> Self {
        Self {
            template,
            max_context_chars,
            separator: separator.into(),
        }
    }

    /// The template in use.
    #[must_use]
    pub const fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Joins retrieved chunk texts in rank order.
    ///
    /// Chunks are dropped from the end until the joined context fits the character
    /// budget. Returns the context and how many chunks it holds.
    #[must_use]
    pub fn build_context(&self, retrieved: &[RetrievedChunk]) -> (String, usize) {
        let separator_chars = self.separator.chars().count();
        let mut used = 0usize;
        let mut kept = 0usize;
        for item in retrieved {
            let cost = item.chunk.text().chars().count() + if kept > 0 { separator_chars } else { 0 };
            if used + cost > self.max_context_chars {
                break;
            }
            used += cost;
            kept += 1;
        }

        if kept < retrieved.len() {
            warn!(
                retrieved = retrieved.len(),
                kept,
                max_context_chars = self.max_context_chars,
                "context budget exceeded; dropped lowest-ranked chunks"
            );
        }

        let context = retrieved[..kept]
            .iter()
            .map(|item| item.chunk.text())
            .collect::<Vec<_>>()
            .join(&self.separator);
        (context, kept)
    }

    /// Renders the prompt for `query` over `retrieved`.
    #[must_use]
    pub fn compose(&self, query: &str, retrieved: &[RetrievedChunk]) -> String {
        let (context, _) = self.build_context(retrieved);
        self.template.render(&context, query)
    }
}
