//! Embedding boundary: the [`EmbedText`] seam, the Ollama-compatible HTTP
//! provider, and the cosine similarity primitive.

mod ollama;

pub use ollama::OllamaEmbedder;

#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("empty input batch")]
    EmptyBatch,

    #[error("embedding API rate limited. Please retry later.")]
    RateLimited,

    #[error("embedding API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("invalid embedding response: {0}")]
    BadResponse(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Turn text into fixed-dimensional vectors.
///
/// Implemented by [`OllamaEmbedder`] for production; mock implementations
/// used in tests. Results are returned in input order, one vector per text.
/// Corpus and query vectors must come from the same implementation, or
/// similarity scores are meaningless.
pub trait EmbedText {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let batch = [text.to_string()];
        let mut vectors = self.embed(&batch).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbedError::BadResponse("empty embedding batch".into()))
    }
}

/// Cosine similarity between two vectors, in `[-1.0, 1.0]`.
///
/// Empty or length-mismatched inputs yield `0.0` rather than an error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}
