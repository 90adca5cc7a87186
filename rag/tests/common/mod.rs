//! Deterministic collaborators for pipeline tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use docqa_core::{EmbeddingModel, Generator, SamplingConfig, TextExtractor};

pub const SKY_DOCUMENT: &str = "The sky is blue. The grass is green. Water is wet.";

/// Bag-of-words embedder: one dimension per vocabulary word, L2-normalized.
pub struct VocabularyEmbedder {
    vocabulary: Vec<&'static str>,
    reported_dim: Option<usize>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl VocabularyEmbedder {
    pub fn new(vocabulary: &[&'static str]) -> Self {
        Self {
            vocabulary: vocabulary.to_vec(),
            reported_dim: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn sky() -> Self {
        Self::new(&[
            "the", "sky", "is", "blue", "grass", "green", "water", "wet", "color", "what",
        ])
    }

    /// Claims a dimension different from the vectors it returns.
    pub fn misreporting(mut self, dim: usize) -> Self {
        self.reported_dim = Some(dim);
        self
    }

    /// Sleeps before every embedding.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingModel for VocabularyEmbedder {
    fn dim(&self) -> usize {
        self.reported_dim.unwrap_or(self.vocabulary.len())
    }

    async fn embed(&self, text: &str) -> docqa_core::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut vector = vec![0.0f32; self.vocabulary.len()];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            if let Some(slot) = self.vocabulary.iter().position(|v| *v == word) {
                vector[slot] += 1.0;
            }
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        Ok(vector)
    }
}

/// Generator returning a fixed reply, optionally echoing the prompt first.
pub struct ScriptedGenerator {
    reply: String,
    echo: bool,
    fail: bool,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_owned(),
            echo: false,
            fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn echoing(reply: &str) -> Self {
        Self {
            echo: true,
            ..Self::replying(reply)
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::replying("")
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

impl Generator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, _sampling: &SamplingConfig) -> docqa_core::Result {
        self.prompts.lock().unwrap().push(prompt.to_owned());
        if self.fail {
            anyhow::bail!("generator crashed");
        }
        if self.echo {
            Ok(format!("{prompt}{}", self.reply))
        } else {
            Ok(self.reply.clone())
        }
    }
}

/// UTF-8 extractor that fails on documents starting with `%BROKEN`.
pub struct ScriptedExtractor;

impl TextExtractor for ScriptedExtractor {
    fn extract_text(&self, bytes: &[u8]) -> docqa_core::Result<String> {
        if bytes.starts_with(b"%BROKEN") {
            anyhow::bail!("unreadable document");
        }
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}
