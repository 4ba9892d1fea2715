//! The query pipeline: detect → translate to the English pivot → nearest-FAQ
//! search → translate the answer back.

use tracing::{debug, info, warn};

use crate::corpus::{CorpusError, FaqStore, QueryResult, SearchError, search};
use crate::detect::{DetectLanguage, Lang, refine};
use crate::embedding::EmbedText;
use crate::translate::{TranslateError, TranslateText};

/// All non-English queries pivot through this language; the corpus only
/// carries content in it.
const PIVOT: &str = "en";

/// Per-stage failure, kept typed up to the reply boundary.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("translation failed: {0}")]
    Translation(#[from] TranslateError),

    #[error("FAQ corpus unavailable: {0}")]
    Corpus(#[from] CorpusError),

    #[error("search failed: {0}")]
    Search(#[from] SearchError),
}

/// What the chat surface renders: a real answer or a readable error
/// message, never a fault.
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    /// Detected input language after the short-input overrides.
    pub lang: Lang,
    /// English question that matched; absent on error replies.
    pub matched_question: Option<String>,
    /// Cosine score of the match; absent on error replies.
    pub score: Option<f32>,
}

/// Composes the three capability boundaries and the FAQ store.
///
/// Owns everything it needs; constructed once at startup and shared for
/// the process lifetime. The corpus loads lazily on the first query.
pub struct Pipeline<D, T, E> {
    detector: D,
    translator: T,
    embedder: E,
    store: FaqStore,
}

impl<D, T, E> Pipeline<D, T, E>
where
    D: DetectLanguage,
    T: TranslateText,
    E: EmbedText,
{
    pub fn new(detector: D, translator: T, embedder: E, store: FaqStore) -> Self {
        Self {
            detector,
            translator,
            embedder,
            store,
        }
    }

    /// Answer a free-text question in its own language.
    ///
    /// Infallible from the caller's perspective: every stage failure is
    /// converted into an error reply here and nothing propagates further.
    pub async fn answer(&self, question: &str) -> Reply {
        let lang = refine(self.detector.detect(question), question);
        debug!(lang = %lang, "input language classified");

        match self.try_answer(question, &lang).await {
            Ok((text, result)) => {
                info!(lang = %lang, score = result.score, matched = %result.matched_question, "answered");
                Reply {
                    text,
                    lang,
                    matched_question: Some(result.matched_question),
                    score: Some(result.score),
                }
            }
            Err(e) => {
                warn!(lang = %lang, error = %e, "query failed");
                Reply {
                    text: format!("An error occurred: {e}"),
                    lang,
                    matched_question: None,
                    score: None,
                }
            }
        }
    }

    /// The fallible pipeline body. Stages run strictly in order; each
    /// depends on the previous stage's output.
    async fn try_answer(
        &self,
        question: &str,
        lang: &Lang,
    ) -> Result<(String, QueryResult), PipelineError> {
        // English and unknown-language input is already pivot text.
        let pivot_question = match lang.pivot_code() {
            Some(source) => self.translator.translate(question, source, PIVOT).await?,
            None => question.to_string(),
        };

        let corpus = self.store.corpus(&self.embedder).await?;
        let result = search(&self.embedder, corpus, &pivot_question).await?;

        let text = match lang.pivot_code() {
            Some(target) => self.translator.translate(&result.answer, PIVOT, target).await?,
            None => result.answer.clone(),
        };

        Ok((text, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbedError;
    use std::collections::VecDeque;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct ScriptedDetector(Lang);

    impl DetectLanguage for ScriptedDetector {
        fn detect(&self, _text: &str) -> Lang {
            self.0.clone()
        }
    }

    type RecordedCall = (String, String, String);

    struct MockTranslator {
        responses: Mutex<VecDeque<Result<String, TranslateError>>>,
        calls: Arc<Mutex<Vec<RecordedCall>>>,
    }

    impl MockTranslator {
        fn with_responses(responses: Vec<Result<String, TranslateError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn unused() -> Self {
            Self::with_responses(Vec::new())
        }

        fn failing() -> Self {
            Self::with_responses(vec![Err(TranslateError::RateLimited)])
        }

        fn calls_handle(&self) -> Arc<Mutex<Vec<RecordedCall>>> {
            Arc::clone(&self.calls)
        }
    }

    impl TranslateText for MockTranslator {
        async fn translate(
            &self,
            text: &str,
            source: &str,
            target: &str,
        ) -> Result<String, TranslateError> {
            self.calls
                .lock()
                .unwrap()
                .push((text.to_string(), source.to_string(), target.to_string()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(TranslateError::RateLimited))
        }
    }

    fn mock_vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.1f32; 8];
        for (i, b) in text.bytes().enumerate() {
            v[(b as usize + i) % 8] += 1.0;
        }
        v
    }

    struct MockEmbedder {
        calls: AtomicUsize,
    }

    impl MockEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl EmbedText for MockEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| mock_vector(t)).collect())
        }
    }

    fn faq_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"question,answer\n\
              What are your hours?,9-5 Mon-Fri\n\
              How do I reset my password?,Use the account page\n",
        )
        .unwrap();
        file.flush().unwrap();
        file
    }

    fn pipeline(
        detector: ScriptedDetector,
        translator: MockTranslator,
        file: &tempfile::NamedTempFile,
    ) -> Pipeline<ScriptedDetector, MockTranslator, MockEmbedder> {
        Pipeline::new(
            detector,
            translator,
            MockEmbedder::new(),
            FaqStore::new(file.path()),
        )
    }

    #[tokio::test]
    async fn english_query_makes_no_translator_calls() {
        let file = faq_file();
        let translator = MockTranslator::unused();
        let calls = translator.calls_handle();
        let p = pipeline(ScriptedDetector(Lang::En), translator, &file);

        let reply = p.answer("What are your hours?").await;

        assert_eq!(reply.text, "9-5 Mon-Fri");
        assert_eq!(reply.lang, Lang::En);
        assert!((reply.score.unwrap() - 1.0).abs() < 1e-6);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_english_query_translates_in_and_out() {
        let file = faq_file();
        let translator = MockTranslator::with_responses(vec![
            Ok("What are your hours?".to_string()),
            Ok("من ٩ إلى ٥".to_string()),
        ]);
        let calls = translator.calls_handle();
        let p = pipeline(ScriptedDetector(Lang::other("ar")), translator, &file);

        let reply = p.answer("ما هي مواعيد عملكم؟").await;

        assert_eq!(reply.text, "من ٩ إلى ٥");
        assert_eq!(reply.lang, Lang::other("ar"));
        assert_eq!(reply.matched_question.as_deref(), Some("What are your hours?"));

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0],
            ("ما هي مواعيد عملكم؟".into(), "ar".into(), "en".into())
        );
        assert_eq!(calls[1], ("9-5 Mon-Fri".into(), "en".into(), "ar".into()));
    }

    #[tokio::test]
    async fn greeting_override_forces_english_path() {
        let file = faq_file();
        let translator = MockTranslator::unused();
        let calls = translator.calls_handle();
        // Raw detection claims Tagalog; the greeting override must win.
        let p = pipeline(ScriptedDetector(Lang::other("tl")), translator, &file);

        let reply = p.answer("Hello").await;

        assert_eq!(reply.lang, Lang::En);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn short_ascii_override_forces_english_path() {
        let file = faq_file();
        let translator = MockTranslator::unused();
        let calls = translator.calls_handle();
        let p = pipeline(ScriptedDetector(Lang::other("de")), translator, &file);

        let reply = p.answer("why?").await;

        assert_eq!(reply.lang, Lang::En);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_language_skips_translation() {
        let file = faq_file();
        let translator = MockTranslator::unused();
        let calls = translator.calls_handle();
        let p = pipeline(ScriptedDetector(Lang::Unknown), translator, &file);

        let reply = p.answer("zxqwv prtkl mnbjh").await;

        assert_eq!(reply.lang, Lang::Unknown);
        assert!(reply.score.is_some());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn translation_failure_becomes_error_reply() {
        let file = faq_file();
        let p = pipeline(
            ScriptedDetector(Lang::other("es")),
            MockTranslator::failing(),
            &file,
        );

        let reply = p.answer("donde esta la oficina").await;

        assert!(reply.text.starts_with("An error occurred:"));
        assert!(reply.score.is_none());
        assert!(reply.matched_question.is_none());
    }

    #[tokio::test]
    async fn corpus_failure_becomes_error_reply() {
        let p = Pipeline::new(
            ScriptedDetector(Lang::En),
            MockTranslator::unused(),
            MockEmbedder::new(),
            FaqStore::new("/nonexistent/faqs.csv"),
        );

        let reply = p.answer("What are your hours?").await;

        assert!(reply.text.starts_with("An error occurred:"));
        assert!(!reply.text.is_empty());
        assert!(reply.score.is_none());
    }

    #[tokio::test]
    async fn try_answer_keeps_stage_errors_typed() {
        let file = faq_file();
        let p = pipeline(
            ScriptedDetector(Lang::other("es")),
            MockTranslator::failing(),
            &file,
        );
        let err = p
            .try_answer("donde esta la oficina", &Lang::other("es"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Translation(_)));

        let broken = Pipeline::new(
            ScriptedDetector(Lang::En),
            MockTranslator::unused(),
            MockEmbedder::new(),
            FaqStore::new("/nonexistent/faqs.csv"),
        );
        let err = broken
            .try_answer("What are your hours?", &Lang::En)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Corpus(_)));
    }

    #[tokio::test]
    async fn answer_is_never_empty() {
        let file = faq_file();
        for question in ["What are your hours?", "", "???", "hello"] {
            let p = pipeline(ScriptedDetector(Lang::En), MockTranslator::unused(), &file);
            let reply = p.answer(question).await;
            assert!(!reply.text.is_empty(), "empty reply for {question:?}");
        }
    }
}
