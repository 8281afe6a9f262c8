//! Serializable records returned by the service surface.

use serde::{Deserialize, Serialize};

use speechrag_core::config::Settings;
use speechrag_core::document::document_available;
use speechrag_core::types::Meta;
use speechrag_vector::index_exists;

use crate::pipeline::RagAnswer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitStatus {
    Success,
    AlreadyInitialized,
}

/// Whether initialization embedded the document or reused a persisted index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexSource {
    Built,
    Loaded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitOutcome {
    pub status: InitStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_source: Option<IndexSource>,
}

impl InitOutcome {
    pub fn initialized(chunks_count: usize, index_source: IndexSource) -> Self {
        Self {
            status: InitStatus::Success,
            message: "RAG service initialized successfully".to_string(),
            chunks_count: Some(chunks_count),
            index_source: Some(index_source),
        }
    }

    pub fn already_initialized() -> Self {
        Self {
            status: InitStatus::AlreadyInitialized,
            message: "RAG service already initialized".to_string(),
            chunks_count: None,
            index_source: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub initialized: bool,
    /// `uninitialized`, `initializing`, `ready` or `failed`.
    pub state: String,
    pub document_available: bool,
    pub index_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_indexed: Option<usize>,
}

impl ServiceStatus {
    /// What exists on disk for `settings`, before any initialization. Loads
    /// no model and contacts no server.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            initialized: false,
            state: "uninitialized".to_string(),
            document_available: document_available(&settings.document.path),
            index_available: index_exists(&settings.index.dir),
            last_error: None,
            chunks_indexed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub content: String,
    pub metadata: Meta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
    pub sources: Vec<Source>,
    pub sources_count: usize,
}

impl From<RagAnswer> for AskResponse {
    fn from(answer: RagAnswer) -> Self {
        let sources: Vec<Source> = answer
            .retrieved
            .into_iter()
            .map(|hit| Source { content: hit.chunk.text, metadata: hit.chunk.metadata })
            .collect();
        Self { question: answer.question, answer: answer.answer, sources_count: sources.len(), sources }
    }
}
