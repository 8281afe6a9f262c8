use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use speechrag_core::traits::{Answerer, Embedder, VectorSearch};
use speechrag_core::types::{RetrievalResult, ScoredChunk};
use speechrag_core::{Error, Result};

use crate::prompt::PromptTemplate;

pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// One answered question with the chunks its context was built from.
#[derive(Debug, Clone)]
pub struct RagAnswer {
    pub question: String,
    pub answer: String,
    pub retrieved: RetrievalResult,
}

/// Retrieval texts in retrieval order, separated by a blank line.
pub fn build_context(hits: &[ScoredChunk]) -> String {
    hits.iter().map(|h| h.chunk.text.as_str()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}

/// Question → embed → retrieve → prompt → generate. Holds no mutable state
/// and is shared across concurrent requests.
pub struct RagPipeline {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorSearch>,
    answerer: Arc<dyn Answerer>,
    template: PromptTemplate,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorSearch>,
        answerer: Arc<dyn Answerer>,
        template: PromptTemplate,
        top_k: usize,
    ) -> Result<Self> {
        if top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be at least 1".to_string()));
        }
        if index.dim() != embedder.dim() {
            return Err(Error::DimensionMismatch { expected: index.dim(), actual: embedder.dim() });
        }
        Ok(Self { embedder, index, answerer, template, top_k })
    }

    pub fn index_len(&self) -> usize { self.index.len() }

    pub async fn retrieve(&self, question: &str) -> Result<RetrievalResult> {
        let embedder = self.embedder.clone();
        let text = question.to_string();
        let query = tokio::task::spawn_blocking(move || embedder.embed_text(&text))
            .await
            .map_err(|e| Error::capability("embedding", e.into()))?
            .map_err(|e| Error::capability("embedding", e))?;
        self.index.search_vec(&query, self.top_k)
    }

    pub async fn answer(&self, question: &str) -> Result<RagAnswer> {
        if question.trim().is_empty() {
            return Err(Error::InvalidArgument("question must not be empty".to_string()));
        }
        let started = Instant::now();
        let retrieved = self.retrieve(question).await?;
        let context = build_context(&retrieved);
        let prompt = self.template.render(&context, question);
        let answer = self
            .answerer
            .generate(&prompt)
            .await
            .map_err(|e| Error::capability("generation", e))?;
        let ms = started.elapsed().as_millis() as u64;
        debug!(hits = retrieved.len(), answerer = self.answerer.name(), ms, "question answered");
        Ok(RagAnswer { question: question.to_string(), answer, retrieved })
    }
}
