//! Language detection boundary: the [`Lang`] type, the [`DetectLanguage`]
//! seam, and the short-input overrides applied on top of raw detection.

mod heuristic;

pub use heuristic::HeuristicDetector;

/// Detected input language.
///
/// `Unknown` is the detector's failure sentinel: detection never errors,
/// it degrades to `Unknown` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lang {
    En,
    /// ISO-639-1-like short code, e.g. `"ar"`, `"es"`.
    Other(String),
    Unknown,
}

impl Lang {
    pub fn other(code: &str) -> Self {
        Lang::Other(code.to_string())
    }

    pub fn code(&self) -> &str {
        match self {
            Lang::En => "en",
            Lang::Other(code) => code,
            Lang::Unknown => "unknown",
        }
    }

    /// The source code to translate through the English pivot, if any.
    ///
    /// `None` means the query is used verbatim: English needs no pivot, and
    /// `Unknown` must never reach the translator as a language code, so it
    /// proceeds as English.
    pub fn pivot_code(&self) -> Option<&str> {
        match self {
            Lang::Other(code) => Some(code),
            Lang::En | Lang::Unknown => None,
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Classify the language of a text. Total: returns [`Lang::Unknown`] when
/// there is no usable signal, never an error.
pub trait DetectLanguage {
    fn detect(&self, text: &str) -> Lang;
}

/// Common English greeting/courtesy phrases that statistical detectors
/// routinely misclassify.
const FORCED_ENGLISH_PHRASES: &[&str] = &["hello", "hi", "hey", "thanks", "thank you"];

/// Below this many characters, pure-ASCII input is treated as English.
const SHORT_ASCII_MAX: usize = 5;

/// Correct raw detection on inputs too short to classify reliably.
///
/// Runs unconditionally after the raw detection call and before any
/// translation decision: known English courtesy phrases and very short
/// all-ASCII inputs force [`Lang::En`]; everything else keeps the raw result.
pub fn refine(raw: Lang, input: &str) -> Lang {
    let trimmed = input.trim();

    if FORCED_ENGLISH_PHRASES.contains(&trimmed.to_lowercase().as_str()) {
        return Lang::En;
    }

    if trimmed.chars().count() < SHORT_ASCII_MAX && trimmed.is_ascii() {
        return Lang::En;
    }

    raw
}
