//! Raw prompt completion.
//!
//! A [`Generator`] takes a fully assembled prompt and returns whatever text the underlying
//! model produced. Some engines echo the prompt back before the completion; callers are
//! expected to normalize that themselves.

use core::future::Future;

/// Sampling parameters handed to a [`Generator`].
///
/// Defaults mirror a short, lightly creative answer: 100 new tokens, temperature `0.7`,
/// nucleus cutoff `0.9`.
///
/// ```rust
/// use docqa_core::SamplingConfig;
///
/// let sampling = SamplingConfig::default()
///     .max_new_tokens(256)
///     .temperature(0.0)
///     .seed(7);
/// assert!(sampling.is_greedy());
/// assert!(sampling.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SamplingConfig {
    /// Upper bound on the number of generated tokens.
    pub max_new_tokens: u32,
    /// Sampling temperature. `0` selects greedy decoding.
    pub temperature: f32,
    /// Nucleus sampling cutoff in `(0, 1]`.
    pub top_p: f32,
    /// Random seed for reproducible sampling.
    pub seed: Option<u32>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 100,
            temperature: 0.7,
            top_p: 0.9,
            seed: None,
        }
    }
}

impl SamplingConfig {
    /// Sets the generated-token cap.
    #[must_use]
    pub const fn max_new_tokens(mut self, value: u32) -> Self {
        self.max_new_tokens = value;
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, value: f32) -> Self {
        self.temperature = value;
        self
    }

    /// Sets the nucleus sampling cutoff.
    #[must_use]
    pub const fn top_p(mut self, value: f32) -> Self {
        self.top_p = value;
        self
    }

    /// Pins the sampling seed.
    #[must_use]
    pub const fn seed(mut self, value: u32) -> Self {
        self.seed = Some(value);
        self
    }

    /// Returns `true` when decoding should always pick the most likely token.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_greedy(&self) -> bool {
        self.temperature == 0.0
    }

    /// Checks that every field is within its accepted range.
    ///
    /// # Errors
    /// Fails when `max_new_tokens` is zero, the temperature is negative or not finite, or
    /// `top_p` falls outside `(0, 1]`.
    pub fn validate(&self) -> crate::Result<()> {
        anyhow::ensure!(self.max_new_tokens > 0, "max_new_tokens must be positive");
        anyhow::ensure!(
            self.temperature.is_finite() && self.temperature >= 0.0,
            "temperature must be a finite, non-negative number (got {})",
            self.temperature
        );
        anyhow::ensure!(
            self.top_p > 0.0 && self.top_p <= 1.0,
            "top_p must be in (0, 1] (got {})",
            self.top_p
        );
        Ok(())
    }
}

/// Completes prompts with a language model.
///
/// Implementations may run on any compute they like; the pipeline only cares about the
/// returned text.
///
/// # Example
///
/// ```rust
/// use docqa_core::{Generator, SamplingConfig};
///
/// struct Echo;
///
/// impl Generator for Echo {
///     async fn generate(&self, prompt: &str, _: &SamplingConfig) -> docqa_core::Result {
///         Ok(format!("{prompt} 42"))
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let raw = Echo.generate("Answer:", &SamplingConfig::default()).await.unwrap();
/// assert_eq!(raw, "Answer: 42");
/// # });
/// ```
pub trait Generator: Send + Sync {
    /// Generates a completion for `prompt`.
    ///
    /// The returned text is raw model output and may begin with an echo of the prompt.
    fn generate(
        &self,
        prompt: &str,
        sampling: &SamplingConfig,
    ) -> impl Future<Output = crate::Result> + Send;
}
