//! Translation boundary: the [`TranslateText`] seam and the
//! LibreTranslate-compatible HTTP client.

mod libre;

pub use libre::LibreClient;

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("nothing to translate: input is empty")]
    EmptyInput,

    #[error("translation API rate limited. Please retry later.")]
    RateLimited,

    #[error("translation API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("invalid translation response: {0}")]
    BadResponse(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Translate text between two languages given as short codes.
///
/// Implemented by [`LibreClient`] for production; mock implementations used
/// in tests. Failures surface as [`TranslateError`]; callers decide whether
/// to degrade or abort.
pub trait TranslateText {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslateError>;
}
