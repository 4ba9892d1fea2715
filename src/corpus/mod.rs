//! FAQ corpus: CSV loading, question embeddings, and nearest-entry search.

use std::path::{Path, PathBuf};

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::embedding::{EmbedError, EmbedText, cosine_similarity};

/// One question/answer record. Identity is its position in the corpus,
/// which follows the row order of the data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

/// The loaded FAQ set: entries paired 1:1 with their question embeddings.
///
/// `entries[i]` corresponds to `embeddings[i]`; the pairing is checked at
/// construction and the corpus is read-only afterwards.
#[derive(Debug)]
pub struct FaqCorpus {
    entries: Vec<FaqEntry>,
    embeddings: Vec<Vec<f32>>,
}

impl FaqCorpus {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> Option<&FaqEntry> {
        self.entries.get(index)
    }

    /// Index and cosine score of the entry nearest to `query`.
    ///
    /// Scans in index order with a strictly-greater comparison, so the
    /// lowest-index entry wins exact ties.
    pub fn best_match(&self, query: &[f32]) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (i, embedding) in self.embeddings.iter().enumerate() {
            let score = cosine_similarity(query, embedding);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((i, score));
            }
        }
        best
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("cannot read FAQ file: {0}")]
    Csv(#[from] csv::Error),

    #[error("FAQ file is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("FAQ file contains no records")]
    Empty,

    #[error("failed to embed FAQ questions: {0}")]
    Embed(#[from] EmbedError),
}

/// Read the FAQ CSV and embed every question in one batch.
///
/// The file must be UTF-8 with a header row and `question`/`answer`
/// columns. Any problem (unreadable file, missing column, ragged row,
/// zero records, embedding failure) is a hard error; no partial corpus
/// is ever returned.
pub async fn load(path: &Path, embedder: &impl EmbedText) -> Result<FaqCorpus, CorpusError> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    let q_idx = column_index(&headers, "question").ok_or(CorpusError::MissingColumn("question"))?;
    let a_idx = column_index(&headers, "answer").ok_or(CorpusError::MissingColumn("answer"))?;

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record?;
        entries.push(FaqEntry {
            question: record.get(q_idx).unwrap_or_default().trim().to_string(),
            answer: record.get(a_idx).unwrap_or_default().trim().to_string(),
        });
    }

    if entries.is_empty() {
        return Err(CorpusError::Empty);
    }

    let questions: Vec<String> = entries.iter().map(|e| e.question.clone()).collect();
    let embeddings = embedder.embed(&questions).await?;
    if embeddings.len() != entries.len() {
        return Err(CorpusError::Embed(EmbedError::BadResponse(format!(
            "expected {} embeddings, got {}",
            entries.len(),
            embeddings.len()
        ))));
    }

    let corpus = FaqCorpus {
        entries,
        embeddings,
    };
    info!(path = %path.display(), entries = corpus.len(), "FAQ corpus loaded");
    Ok(corpus)
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

/// Lazily-loaded, process-wide FAQ corpus.
///
/// The first caller triggers the load; concurrent first callers coalesce
/// into a single load via [`OnceCell`], and every later call reuses the
/// cached corpus without touching the file or the embedder again.
#[derive(Debug)]
pub struct FaqStore {
    path: PathBuf,
    corpus: OnceCell<FaqCorpus>,
}

impl FaqStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            corpus: OnceCell::new(),
        }
    }

    pub async fn corpus(&self, embedder: &impl EmbedText) -> Result<&FaqCorpus, CorpusError> {
        self.corpus
            .get_or_try_init(|| load(&self.path, embedder))
            .await
    }
}

/// Best-matching FAQ entry for a query, with its raw cosine score.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub matched_question: String,
    pub answer: String,
    pub score: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("FAQ corpus is empty")]
    EmptyCorpus,

    #[error("failed to embed query: {0}")]
    Embed(#[from] EmbedError),
}

/// Embed `query` and return the nearest corpus entry.
///
/// The query must go through the same embedder that built the corpus.
/// No minimum-score threshold is applied: the nearest entry is returned
/// even when it is semantically unrelated.
pub async fn search(
    embedder: &impl EmbedText,
    corpus: &FaqCorpus,
    query: &str,
) -> Result<QueryResult, SearchError> {
    if corpus.is_empty() {
        return Err(SearchError::EmptyCorpus);
    }

    let query_vec = embedder.embed_one(query).await?;

    let Some((index, score)) = corpus.best_match(&query_vec) else {
        return Err(SearchError::EmptyCorpus);
    };
    let Some(entry) = corpus.entry(index) else {
        return Err(SearchError::EmptyCorpus);
    };

    debug!(index, score, matched = %entry.question, "nearest FAQ entry");
    Ok(QueryResult {
        matched_question: entry.question.clone(),
        answer: entry.answer.clone(),
        score,
    })
}
