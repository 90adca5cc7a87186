use crate::error::LlamaError;
use docqa_core::{Embedding, EmbeddingModel, Generator, SamplingConfig};
use llama_cpp_2::{
    LlamaCppError,
    context::{
        LlamaContext,
        params::{LlamaContextParams, LlamaPoolingType},
    },
    llama_backend::LlamaBackend,
    llama_batch::LlamaBatch,
    model::{AddBos, LlamaModel, params::LlamaModelParams},
    sampling::LlamaSampler,
};
use std::{
    future::{Future, ready},
    num::NonZeroU32,
    path::{Path, PathBuf},
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{debug, warn};

fn init_backend() -> Result<LlamaBackend, LlamaError> {
    match LlamaBackend::init() {
        Ok(backend) => Ok(backend),
        Err(LlamaCppError::BackendAlreadyInitialized) => Ok(LlamaBackend {}),
        Err(err) => Err(LlamaError::Model(err.to_string())),
    }
}

/// Local llama.cpp GGUF model usable as both a [`Generator`] and an [`EmbeddingModel`].
///
/// A generator and an embedder are normally two different GGUF files, each loaded with
/// its own `Llama`. Every request gets a fresh llama.cpp context, so a single instance
/// can be shared between tasks.
#[derive(Debug, Clone)]
pub struct Llama {
    inner: Arc<LlamaConfig>,
    model: Arc<LlamaModel>,
    backend: Arc<LlamaBackend>,
}

impl Llama {
    /// Load a GGUF model from disk with default options.
    ///
    /// # Errors
    /// Fails when the backend cannot start or the file is not a loadable model.
    pub fn from_file(model_path: impl AsRef<Path>) -> Result<Self, LlamaError> {
        Self::builder(model_path).build()
    }

    /// Start configuring a model.
    #[must_use]
    pub fn builder(model_path: impl AsRef<Path>) -> Builder {
        Builder::new(model_path)
    }

    /// Path the model was loaded from.
    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.inner.model_path
    }

    /// Human-readable model name derived from the file name.
    #[must_use]
    pub fn name(&self) -> &str {
        model_name(&self.inner.model_path)
    }

    /// Context window used for requests, in tokens.
    #[must_use]
    pub fn context_length(&self) -> u32 {
        self.inner
            .n_ctx
            .unwrap_or_else(|| self.model.n_ctx_train().max(512))
    }

    /// Override the context size used for later requests.
    #[must_use]
    pub fn with_n_ctx(mut self, n_ctx: u32) -> Self {
        Arc::make_mut(&mut self.inner).n_ctx = Some(n_ctx);
        self
    }

    fn complete(&self, prompt: &str, sampling: &SamplingConfig) -> Result<String, LlamaError> {
        sampling
            .validate()
            .map_err(|err| LlamaError::Unsupported(err.to_string()))?;

        let tokens = self
            .model
            .str_to_token(prompt, AddBos::Always)
            .map_err(|err| LlamaError::Token(err.to_string()))?;
        if tokens.is_empty() {
            return Err(LlamaError::Unsupported(
                "cannot generate from an empty prompt".to_string(),
            ));
        }

        let n_ctx = self.context_length();
        ensure_fits(tokens.len(), sampling.max_new_tokens, n_ctx)?;
        let mut context = self.create_context(n_ctx, false)?;

        let mut prompt_batch = LlamaBatch::new(tokens.len(), 1);
        prompt_batch
            .add_sequence(&tokens, 0, false)
            .map_err(|err| LlamaError::Decode(err.to_string()))?;
        context
            .decode(&mut prompt_batch)
            .map_err(|err| LlamaError::Decode(err.to_string()))?;

        let mut sampler = build_sampler(sampling);
        sampler.accept_many(tokens.iter());

        let mut generated = String::new();
        let mut decoder = encoding_rs::UTF_8.new_decoder();
        let mut pos = i32::try_from(tokens.len())
            .map_err(|_| LlamaError::Context("prompt is too long".to_string()))?;

        for _ in 0..sampling.max_new_tokens {
            let token = sampler.sample(&context, -1);
            sampler.accept(token);

            if self.model.is_eog_token(token) {
                break;
            }

            let piece = self
                .model
                .token_to_piece(token, &mut decoder, true, None)
                .map_err(|err| LlamaError::Token(err.to_string()))?;
            generated.push_str(&piece);

            let mut step = LlamaBatch::new(1, 1);
            step.add(token, pos, &[0], true)
                .map_err(|err| LlamaError::Decode(err.to_string()))?;
            context
                .decode(&mut step)
                .map_err(|err| LlamaError::Decode(err.to_string()))?;
            pos += 1;
        }

        let generated_tokens = generated_count(pos, tokens.len())?;
        debug!(
            model = self.name(),
            prompt_tokens = tokens.len(),
            generated_tokens,
            "completion finished"
        );
        Ok(generated)
    }

    fn embed_text(&self, text: &str) -> Result<Embedding, LlamaError> {
        let mut tokens = self
            .model
            .str_to_token(text, AddBos::Always)
            .map_err(|err| LlamaError::Token(err.to_string()))?;
        if tokens.is_empty() {
            return Err(LlamaError::Unsupported(
                "cannot embed empty token sequence".to_string(),
            ));
        }

        let n_ctx = self.context_length();
        let limit = n_ctx as usize;
        if tokens.len() > limit {
            warn!(
                model = self.name(),
                tokens = tokens.len(),
                limit,
                "truncating embedding input to the context window"
            );
            tokens.truncate(limit);
        }

        let mut context = self.create_context(n_ctx, true)?;
        let mut batch = LlamaBatch::new(tokens.len(), 1);
        batch
            .add_sequence(&tokens, 0, false)
            .map_err(|err| LlamaError::Decode(err.to_string()))?;
        context
            .decode(&mut batch)
            .map_err(|err| LlamaError::Decode(err.to_string()))?;

        if let Ok(embedding) = context.embeddings_seq_ith(0) {
            return Ok(embedding.to_vec());
        }

        let last = i32::try_from(tokens.len() - 1)
            .map_err(|_| LlamaError::Context("embedding input is too long".to_string()))?;
        let embedding = context
            .embeddings_ith(last)
            .map_err(|err| LlamaError::Decode(err.to_string()))?;
        Ok(embedding.to_vec())
    }

    fn create_context(&self, n_ctx: u32, embeddings: bool) -> Result<LlamaContext<'_>, LlamaError> {
        let cfg = &self.inner;
        let mut params = LlamaContextParams::default()
            .with_n_ctx(NonZeroU32::new(n_ctx))
            .with_n_batch(n_ctx)
            .with_n_threads(cfg.n_threads)
            .with_n_threads_batch(cfg.n_threads_batch);

        if embeddings {
            params = params
                .with_n_ubatch(n_ctx)
                .with_embeddings(true)
                .with_pooling_type(cfg.pooling);
        }

        self.model
            .new_context(&self.backend, params)
            .map_err(|err| LlamaError::Context(err.to_string()))
    }
}

impl Generator for Llama {
    fn generate(
        &self,
        prompt: &str,
        sampling: &SamplingConfig,
    ) -> impl Future<Output = docqa_core::Result> + Send {
        ready(self.complete(prompt, sampling).map_err(Into::into))
    }
}

impl EmbeddingModel for Llama {
    fn dim(&self) -> usize {
        usize::try_from(self.model.n_embd()).unwrap_or_default()
    }

    fn embed(&self, text: &str) -> impl Future<Output = docqa_core::Result<Embedding>> + Send {
        ready(self.embed_text(text).map_err(Into::into))
    }
}

#[derive(Debug, Clone)]
struct LlamaConfig {
    model_path: PathBuf,
    n_ctx: Option<u32>,
    n_threads: i32,
    n_threads_batch: i32,
    pooling: LlamaPoolingType,
}

/// Builder for local llama.cpp model configuration.
#[derive(Debug, Clone)]
pub struct Builder {
    model_path: PathBuf,
    n_gpu_layers: u32,
    use_mlock: bool,
    n_ctx: Option<u32>,
    n_threads: i32,
    n_threads_batch: i32,
    pooling: LlamaPoolingType,
}

impl Builder {
    fn new(model_path: impl AsRef<Path>) -> Self {
        Self {
            model_path: model_path.as_ref().to_path_buf(),
            n_gpu_layers: 0,
            use_mlock: false,
            n_ctx: None,
            n_threads: 4,
            n_threads_batch: 4,
            pooling: LlamaPoolingType::Mean,
        }
    }

    /// Number of layers offloaded to GPU.
    #[must_use]
    pub const fn n_gpu_layers(mut self, n_gpu_layers: u32) -> Self {
        self.n_gpu_layers = n_gpu_layers;
        self
    }

    /// Keep model pages in RAM when possible.
    #[must_use]
    pub const fn use_mlock(mut self, use_mlock: bool) -> Self {
        self.use_mlock = use_mlock;
        self
    }

    /// Generation/embedding context size. Defaults to the size the model was trained with.
    #[must_use]
    pub const fn n_ctx(mut self, n_ctx: u32) -> Self {
        self.n_ctx = Some(n_ctx);
        self
    }

    /// Number of decode threads.
    #[must_use]
    pub const fn n_threads(mut self, n_threads: i32) -> Self {
        self.n_threads = n_threads;
        self
    }

    /// Number of batch decode threads.
    #[must_use]
    pub const fn n_threads_batch(mut self, n_threads_batch: i32) -> Self {
        self.n_threads_batch = n_threads_batch;
        self
    }

    /// How token embeddings are pooled into one sentence embedding. Defaults to mean pooling.
    #[must_use]
    pub const fn pooling(mut self, pooling: LlamaPoolingType) -> Self {
        self.pooling = pooling;
        self
    }

    /// Load the model.
    ///
    /// # Errors
    /// Fails when the backend cannot start or the file is not a loadable model.
    pub fn build(self) -> Result<Llama, LlamaError> {
        if !self.model_path.is_file() {
            return Err(LlamaError::Model(format!(
                "model file not found: {}",
                self.model_path.display()
            )));
        }

        let model_params = LlamaModelParams::default()
            .with_n_gpu_layers(self.n_gpu_layers)
            .with_use_mlock(self.use_mlock);
        let backend = Arc::new(init_backend()?);
        let model = LlamaModel::load_from_file(backend.as_ref(), &self.model_path, &model_params)
            .map_err(|err| LlamaError::Model(err.to_string()))?;

        debug!(
            model = model_name(&self.model_path),
            gpu_layers = self.n_gpu_layers,
            "loaded GGUF model"
        );

        Ok(Llama {
            inner: Arc::new(LlamaConfig {
                model_path: self.model_path,
                n_ctx: self.n_ctx,
                n_threads: self.n_threads,
                n_threads_batch: self.n_threads_batch,
                pooling: self.pooling,
            }),
            model: Arc::new(model),
            backend,
        })
    }
}

fn model_name(path: &Path) -> &str {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("llama-local")
}

fn ensure_fits(prompt_tokens: usize, max_new_tokens: u32, n_ctx: u32) -> Result<(), LlamaError> {
    let needed = prompt_tokens.saturating_add(max_new_tokens as usize);
    if needed > n_ctx as usize {
        return Err(LlamaError::Context(format!(
            "prompt of {prompt_tokens} tokens plus {max_new_tokens} new tokens exceeds the {n_ctx}-token context"
        )));
    }
    Ok(())
}

fn build_sampler(sampling: &SamplingConfig) -> LlamaSampler {
    if sampling.is_greedy() {
        return LlamaSampler::greedy();
    }
    LlamaSampler::chain_simple([
        LlamaSampler::top_p(sampling.top_p, 1),
        LlamaSampler::temp(sampling.temperature),
        LlamaSampler::dist(sampling_seed(sampling.seed)),
    ])
}

#[allow(clippy::cast_possible_truncation)]
fn sampling_seed(seed: Option<u32>) -> u32 {
    if let Some(seed) = seed {
        return seed;
    }
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|value| value.as_nanos() as u64)
        .unwrap_or(1);
    ((now ^ (now >> 32)) & 0xFFFF_FFFF) as u32
}

/// Tokens decoded after the prompt, given the next free position.
fn generated_count(pos: i32, prompt_tokens: usize) -> Result<usize, LlamaError> {
    usize::try_from(pos)
        .ok()
        .and_then(|pos| pos.checked_sub(prompt_tokens))
        .ok_or_else(|| LlamaError::Context(format!("invalid token position {pos}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_seed_is_used_verbatim() {
        assert_eq!(sampling_seed(Some(7)), 7);
    }

    #[test]
    fn prompt_and_budget_must_fit_the_context() {
        assert!(ensure_fits(400, 100, 512).is_ok());
        assert!(ensure_fits(412, 100, 512).is_ok());
        let err = ensure_fits(413, 100, 512).unwrap_err();
        assert!(matches!(err, LlamaError::Context(_)));
        assert!(err.to_string().contains("413 tokens"));
    }

    #[test]
    fn generated_tokens_are_counted_from_the_prompt_end() {
        assert_eq!(generated_count(120, 100).unwrap(), 20);
        assert_eq!(generated_count(100, 100).unwrap(), 0);
        assert!(matches!(generated_count(-1, 0), Err(LlamaError::Context(_))));
        assert!(matches!(generated_count(5, 10), Err(LlamaError::Context(_))));
    }

    #[test]
    fn model_name_comes_from_the_file_stem() {
        assert_eq!(
            model_name(Path::new("/models/mistral-7b-instruct.Q4_K_M.gguf")),
            "mistral-7b-instruct.Q4_K_M"
        );
        assert_eq!(model_name(Path::new("")), "llama-local");
    }

    #[test]
    fn missing_model_file_is_reported_before_loading() {
        let err = Llama::builder("/definitely/not/here.gguf")
            .n_gpu_layers(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, LlamaError::Model(message) if message.contains("not found")));
    }
}
