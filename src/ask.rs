//! Corpus question answering: retrieve context, ask the model once.
//!
//! Retrieval is an external collaborator behind [`ContextRetriever`] — a
//! vector store, a search index, whatever. The shipped
//! [`DirectoryRetriever`] is a lexical stand-in: it scores the `*.txt`
//! files of a directory by query-term overlap, which is enough for the CLI
//! and keeps the trait honest in tests. The answer step stuffs the top-k
//! chunks into one chat call and returns the model's text together with
//! the contexts it saw, so callers can show sources.

use crate::config::ProviderConfig;
use crate::error::PagecastError;
use crate::prompts::{qa_user_message, QA_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions};
use std::path::PathBuf;
use tracing::{debug, info};

/// One retrieved context excerpt.
#[derive(Debug, Clone)]
pub struct ContextChunk {
    /// Where the excerpt came from (file path, document id, …).
    pub source: String,
    /// Retriever-specific relevance score; higher is better.
    pub score: f64,
    pub text: String,
}

/// The retrieval boundary.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    /// Return up to `top_k` chunks relevant to `query`, best first.
    async fn retrieve(&self, query: &str, top_k: usize)
        -> Result<Vec<ContextChunk>, PagecastError>;
}

/// Lexical retrieval over the text files of one directory.
///
/// Scores each file by the number of distinct query terms it contains
/// (case-insensitive), tie-broken by filename so results are stable. Files
/// longer than `max_chunk_chars` are truncated at a character boundary —
/// this feeds a prompt, not an index.
pub struct DirectoryRetriever {
    corpus_dir: PathBuf,
    max_chunk_chars: usize,
}

impl DirectoryRetriever {
    pub fn new(corpus_dir: impl Into<PathBuf>) -> Self {
        Self {
            corpus_dir: corpus_dir.into(),
            max_chunk_chars: 4000,
        }
    }

    pub fn with_max_chunk_chars(mut self, n: usize) -> Self {
        self.max_chunk_chars = n.max(100);
        self
    }
}

#[async_trait]
impl ContextRetriever for DirectoryRetriever {
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ContextChunk>, PagecastError> {
        if !self.corpus_dir.is_dir() {
            return Err(PagecastError::CorpusNotFound {
                path: self.corpus_dir.clone(),
            });
        }

        let terms = query_terms(query);
        let mut scored: Vec<ContextChunk> = Vec::new();

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.corpus_dir)
            .map_err(|source| PagecastError::OutputDirUnwritable {
                path: self.corpus_dir.clone(),
                source,
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("txt"))
            .collect();
        paths.sort();

        for path in paths {
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            let haystack = content.to_lowercase();
            let hits = terms.iter().filter(|t| haystack.contains(*t)).count();
            if hits == 0 {
                continue;
            }
            scored.push(ContextChunk {
                source: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
                score: hits as f64 / terms.len().max(1) as f64,
                text: truncate_chars(&content, self.max_chunk_chars),
            });
        }

        // Best score first; the listing above already fixed the tiebreak.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        debug!("Retrieved {} chunks for query", scored.len());
        Ok(scored)
    }
}

/// Distinct lowercase query terms worth matching (3+ characters).
fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 3)
        .map(str::to_lowercase)
        .collect();
    terms.sort();
    terms.dedup();
    terms
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Configuration for one question.
#[derive(Debug, Clone)]
pub struct AskConfig {
    pub llm: ProviderConfig,
    /// How many chunks to stuff into the prompt. Default: 3.
    pub top_k: usize,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl Default for AskConfig {
    fn default() -> Self {
        Self {
            llm: ProviderConfig::default(),
            top_k: 3,
            temperature: 0.2,
            max_tokens: 2048,
        }
    }
}

/// An answer plus the contexts the model saw.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub contexts: Vec<ContextChunk>,
}

/// Answer `question` from the retriever's corpus.
///
/// Fatal on configuration problems (empty question, no provider, missing
/// corpus); a question the corpus cannot answer is the model's problem to
/// phrase, not an error.
pub async fn ask(
    retriever: &dyn ContextRetriever,
    question: &str,
    config: &AskConfig,
) -> Result<Answer, PagecastError> {
    if question.trim().is_empty() {
        return Err(PagecastError::EmptyQuestion);
    }

    let provider = config.llm.resolve()?;
    let contexts = retriever.retrieve(question, config.top_k).await?;
    info!("Answering with {} context chunks", contexts.len());

    let pairs: Vec<(String, String)> = contexts
        .iter()
        .map(|c| (c.source.clone(), c.text.clone()))
        .collect();
    let messages = vec![
        ChatMessage::system(QA_SYSTEM_PROMPT),
        ChatMessage::user(qa_user_message(question, &pairs)),
    ];
    let options = CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    };

    let response = provider
        .chat(&messages, Some(&options))
        .await
        .map_err(|e| PagecastError::ProviderNotConfigured {
            provider: "chat".to_string(),
            hint: e.to_string(),
        })?;

    Ok(Answer {
        text: response.content.trim().to_string(),
        contexts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn retriever_ranks_by_term_overlap() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("dataprep.txt"),
            "Dataprep is used for cleaning and preparing datasets.",
        )
        .unwrap();
        std::fs::write(dir.path().join("other.txt"), "Nothing relevant here.").unwrap();
        std::fs::write(
            dir.path().join("partial.txt"),
            "Datasets are mentioned, nothing else.",
        )
        .unwrap();

        let retriever = DirectoryRetriever::new(dir.path());
        let chunks = retriever
            .retrieve("what is dataprep used for with datasets", 2)
            .await
            .unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].source, "dataprep.txt");
        assert!(chunks[0].score > chunks[1].score);
    }

    #[tokio::test]
    async fn no_matches_yields_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha beta").unwrap();
        let retriever = DirectoryRetriever::new(dir.path());
        let chunks = retriever.retrieve("zzz qqq", 3).await.unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn missing_corpus_is_fatal() {
        let retriever = DirectoryRetriever::new("/no/such/corpus");
        let err = retriever.retrieve("anything", 3).await.unwrap_err();
        assert!(matches!(err, PagecastError::CorpusNotFound { .. }));
    }

    #[test]
    fn query_terms_dedup_and_drop_short_words() {
        let terms = query_terms("Is it the THE cat cat or a dog?");
        assert_eq!(terms, vec!["cat", "dog", "the"]);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let s = "ééééé";
        assert_eq!(truncate_chars(s, 3), "ééé");
    }

    #[tokio::test]
    async fn empty_question_is_fatal_before_retrieval() {
        struct Panicking;
        #[async_trait]
        impl ContextRetriever for Panicking {
            async fn retrieve(
                &self,
                _query: &str,
                _top_k: usize,
            ) -> Result<Vec<ContextChunk>, PagecastError> {
                panic!("retrieval must not run for an empty question");
            }
        }

        let err = ask(&Panicking, "   ", &AskConfig::default()).await.unwrap_err();
        assert!(matches!(err, PagecastError::EmptyQuestion));
    }
}
