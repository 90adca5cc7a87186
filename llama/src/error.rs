use thiserror::Error;

/// Errors raised by the llama.cpp backend.
#[derive(Debug, Error)]
pub enum LlamaError {
    /// Backend initialization or model loading failed.
    #[error("model error: {0}")]
    Model(String),
    /// A llama.cpp context could not be created or is too small for the request.
    #[error("context error: {0}")]
    Context(String),
    /// Tokenization or detokenization failed.
    #[error("token error: {0}")]
    Token(String),
    /// Decoding a batch failed.
    #[error("decode error: {0}")]
    Decode(String),
    /// The request cannot be served by this backend.
    #[error("unsupported request: {0}")]
    Unsupported(String),
}
