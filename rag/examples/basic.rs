//! Basic question answering with a toy embedder and a generator that quotes its context.

use docqa_core::{EmbeddingModel, Generator, Result, SamplingConfig};
use docqa_rag::{Rag, RagConfig};

#[derive(Clone)]
struct DemoEmbedder;

impl EmbeddingModel for DemoEmbedder {
    fn dim(&self) -> usize {
        26
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; self.dim()];
        for byte in text
            .to_ascii_lowercase()
            .bytes()
            .filter(u8::is_ascii_lowercase)
        {
            vector[usize::from(byte - b'a')] += 1.0;
        }
        Ok(vector)
    }
}

struct QuoteContext;

impl Generator for QuoteContext {
    async fn generate(&self, prompt: &str, _: &SamplingConfig) -> Result {
        let context = prompt
            .split("Question:")
            .next()
            .unwrap_or_default()
            .trim_start_matches("Context:")
            .trim();
        Ok(format!("From the document: {context}"))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let rag = Rag::builder(DemoEmbedder, QuoteContext)
        .config(RagConfig::builder().sentences().default_top_k(1).build())
        .build()?;

    let report = rag
        .ingest(b"Retrieval-Augmented Generation uses embeddings to fetch context. Chunking splits large files into passages for indexing. Rust focuses on performance and safety.")
        .await?;
    println!("Indexed {} chunks ({} dims)", report.chunks, report.dimension);

    let answer = rag.ask_detailed("How do I prep documents?", 2).await?;
    println!("{}", answer.text);
    for (rank, hit) in answer.retrieved.iter().enumerate() {
        println!(
            "{rank}: (distance = {:.3}) {}",
            hit.distance,
            hit.chunk.text()
        );
    }

    Ok(())
}
