//! Generation orchestration and answer normalization.

use std::sync::Arc;

use docqa_core::{Generator, SamplingConfig};
use tracing::debug;

use crate::error::{RagError, Result};

/// Drives a [`Generator`] and cleans its output into an answer.
pub struct Answerer<G> {
    generator: Arc<G>,
    sampling: SamplingConfig,
    answer_marker: Option<String>,
}

impl<G> Clone for Answerer<G> {
    fn clone(&self) -> Self {
        Self {
            generator: Arc::clone(&self.generator),
            sampling: self.sampling,
            answer_marker: self.answer_marker.clone(),
        }
    }
}

impl<G> std::fmt::Debug for Answerer<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Answerer")
            .field("sampling", &self.sampling)
            .field("answer_marker", &self.answer_marker)
            .finish_non_exhaustive()
    }
}

impl<G: Generator> Answerer<G> {
    /// Creates an answerer.
    pub fn new(generator: Arc<G>, sampling: SamplingConfig, answer_marker: Option<String>) -> Self {
        Self {
            generator,
            sampling,
            answer_marker,
        }
    }

    /// Sampling parameters passed to every generation.
    pub const fn sampling(&self) -> &SamplingConfig {
        &self.sampling
    }

    /// Returns the underlying generator.
    pub const fn generator(&self) -> &Arc<G> {
        &self.generator
    }

    /// Generates an answer for a fully assembled prompt.
    ///
    /// # Errors
    /// Returns [`RagError::Generation`] when the generator fails.
    pub async fn answer(&self, prompt: &str) -> Result<String> {
        let raw = self
            .generator
            .generate(prompt, &self.sampling)
            .await
            .map_err(RagError::Generation)?;
        debug!(raw_chars = raw.len(), "generator returned");
        Ok(normalize_answer(&raw, prompt, self.answer_marker.as_deref()))
    }
}

/// Extracts the answer from raw generator output.
///
/// An exact echo of `prompt` at the start of `raw` is removed. If a marker is given and
/// still occurs in the remainder, only the text between its first and second occurrence
/// is kept. The result is always trimmed of surrounding whitespace.
#[must_use]
pub fn normalize_answer(raw: &str, prompt: &str, answer_marker: Option<&str>) -> String {
    let mut answer = raw.strip_prefix(prompt).unwrap_or(raw);
    if let Some(marker) = answer_marker {
        if let Some((_, after)) = answer.split_once(marker) {
            answer = after.split(marker).next().unwrap_or(after);
        }
    }
    answer.trim().to_owned()
}
