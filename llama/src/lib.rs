//! llama.cpp backend for docqa, built on the `llama-cpp-2` bindings.
//!
//! A [`Llama`] loads one GGUF checkpoint and implements both collaborator traits from
//! `docqa-core`:
//! - [`Generator`](docqa_core::Generator) completes the raw prompt (no chat template is
//!   applied), sampling with top-p and temperature, or greedily when the temperature is 0.
//! - [`EmbeddingModel`](docqa_core::EmbeddingModel) returns the pooled sequence embedding.
//!
//! ```no_run
//! use docqa_core::{Generator, SamplingConfig};
//! use docqa_llama::Llama;
//!
//! # async fn run() -> docqa_core::Result<()> {
//! let llama = Llama::builder("./models/mistral-7b-instruct.Q4_K_M.gguf")
//!     .n_ctx(4_096)
//!     .n_gpu_layers(99)
//!     .build()?;
//!
//! let sampling = SamplingConfig::default().max_new_tokens(64);
//! let text = llama.generate("Question: why is the sky blue?\nAnswer:", &sampling).await?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```

mod client;
mod error;

pub use client::{Builder, Llama};
pub use error::LlamaError;
pub use llama_cpp_2::context::params::LlamaPoolingType;
