//! # docqa-core
//!
//! `docqa-core` hosts the no-std trait seams between the retrieval pipeline and the
//! heavyweight collaborators it leans on. The pipeline in `docqa-rag` never loads a
//! model or parses a file itself; it talks to these traits, and backend crates
//! (`docqa-llama`, `docqa-pdf`) implement them.
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │   docqa-rag     │───▶│   docqa-core     │◀───│    Backends     │
//! │                 │    │   (this crate)   │    │                 │
//! │ - chunking      │    │ - EmbeddingModel │    │ - llama.cpp     │
//! │ - vector index  │    │ - Generator      │    │ - lopdf         │
//! │ - prompts       │    │ - TextExtractor  │    │ - your own      │
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//! ```
//!
//! | Capability | Trait | Description |
//! |------------|-------|-------------|
//! | **Embeddings** | [`EmbeddingModel`] | Convert text to fixed-dimension vectors |
//! | **Generation** | [`Generator`] | Complete a raw prompt under a [`SamplingConfig`] |
//! | **Extraction** | [`TextExtractor`] | Turn document bytes into text or sentences |
//!
//! ## Example
//!
//! ```rust
//! use docqa_core::{Generator, SamplingConfig};
//!
//! async fn complete(model: impl Generator) -> docqa_core::Result {
//!     let sampling = SamplingConfig::default().temperature(0.0).max_new_tokens(32);
//!     model.generate("Question: what is two plus two?\nAnswer:", &sampling).await
//! }
//! ```

#![no_std]
extern crate alloc;

/// Text embeddings.
pub mod embedding;
/// Text extraction from raw document bytes.
pub mod extraction;
/// Prompt completion and sampling parameters.
pub mod generation;

use alloc::string::String;

#[doc(inline)]
pub use embedding::{Embedding, EmbeddingModel};
#[doc(inline)]
pub use extraction::{SENTENCE_DELIMITER, TextExtractor};
#[doc(inline)]
pub use generation::{Generator, SamplingConfig};

/// Result type used throughout the crate.
///
/// Type alias for [`anyhow::Result<T>`](anyhow::Result) with [`String`] as default success type.
pub type Result<T = String> = anyhow::Result<T>;

pub use anyhow::Error;
