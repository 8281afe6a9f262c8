use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use speechrag_core::config::Settings;
use speechrag_core::document::load_document;
use speechrag_core::segmenter::Segmenter;
use speechrag_core::traits::{Answerer, Embedder};
use speechrag_core::{Error, Result};
use speechrag_vector::{build_index, fingerprint, index_exists, VectorIndex};

use crate::pipeline::{RagAnswer, RagPipeline};
use crate::prompt::PromptTemplate;
use crate::response::{AskResponse, IndexSource, InitOutcome, ServiceStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceState {
    Uninitialized,
    Initializing,
    Ready,
    Failed { reason: String },
}

impl ServiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "failed: {}", reason),
            other => f.write_str(other.as_str()),
        }
    }
}

struct Slot {
    state: ServiceState,
    pipeline: Option<Arc<RagPipeline>>,
    chunks_indexed: Option<usize>,
}

/// Owns initialization of the pipeline and serves questions from it.
///
/// `initialize` runs under an async mutex so concurrent callers never build
/// twice; late arrivals see the finished pipeline and get
/// `already_initialized`. Once ready, questions share the pipeline through an
/// `Arc` and never take the init lock. A failed initialization may be retried.
///
/// When `service.auto_initialize` is set, a question asked before
/// initialization triggers it; otherwise it fails with `NotReady`.
pub struct ServiceLifecycle {
    settings: Settings,
    template: PromptTemplate,
    embedder: Arc<dyn Embedder>,
    answerer: Arc<dyn Answerer>,
    init_lock: Mutex<()>,
    slot: RwLock<Slot>,
}

impl ServiceLifecycle {
    pub fn new(settings: Settings, embedder: Arc<dyn Embedder>, answerer: Arc<dyn Answerer>) -> Result<Self> {
        settings.validate()?;
        let template = PromptTemplate::new(settings.prompt.template.clone())?;
        Ok(Self {
            settings,
            template,
            embedder,
            answerer,
            init_lock: Mutex::new(()),
            slot: RwLock::new(Slot { state: ServiceState::Uninitialized, pipeline: None, chunks_indexed: None }),
        })
    }

    /// Construct with the embedder and answerer the settings select.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let embedder = speechrag_embed::get_default_embedder(&settings.embedding)
            .map_err(|e| Error::capability("embedder setup", e))?;
        let answerer = speechrag_llm::get_default_answerer(&settings.llm)
            .map_err(|e| Error::capability("answerer setup", e))?;
        Self::new(settings, embedder, answerer)
    }

    pub fn settings(&self) -> &Settings { &self.settings }

    pub fn state(&self) -> ServiceState { self.slot.read().state.clone() }

    pub fn is_ready(&self) -> bool { self.slot.read().state == ServiceState::Ready }

    pub async fn initialize(&self) -> Result<InitOutcome> {
        if self.is_ready() {
            return Ok(InitOutcome::already_initialized());
        }
        let _guard = self.init_lock.lock().await;
        if self.is_ready() {
            return Ok(InitOutcome::already_initialized());
        }
        self.slot.write().state = ServiceState::Initializing;
        info!(document = %self.settings.document.path.display(), "initializing RAG service");
        let started = Instant::now();

        match self.build_pipeline().await {
            Ok((pipeline, source)) => {
                let chunks = pipeline.index_len();
                let mut slot = self.slot.write();
                slot.pipeline = Some(Arc::new(pipeline));
                slot.chunks_indexed = Some(chunks);
                slot.state = ServiceState::Ready;
                drop(slot);
                let ms = started.elapsed().as_millis() as u64;
                info!(chunks, ?source, ms, "RAG service ready");
                Ok(InitOutcome::initialized(chunks, source))
            }
            Err(e) => {
                error!(error = %e, "RAG service initialization failed");
                let mut slot = self.slot.write();
                slot.pipeline = None;
                slot.chunks_indexed = None;
                slot.state = ServiceState::Failed { reason: e.to_string() };
                Err(e)
            }
        }
    }

    async fn build_pipeline(&self) -> Result<(RagPipeline, IndexSource)> {
        let document = load_document(&self.settings.document.path)?;
        let segmenter = Segmenter::new(self.settings.chunking.clone())?;
        let chunks = segmenter.split_document(&document);
        if chunks.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        info!(chunks = chunks.len(), chars = document.text.chars().count(), "document segmented");

        let fp = fingerprint(&document.text, segmenter.config(), self.embedder.id());
        let (index, source) = match self.load_persisted(&fp).await? {
            Some(index) => (index, IndexSource::Loaded),
            None => {
                let embedder = self.embedder.clone();
                let batch_size = self.settings.embedding.batch_size;
                let show_progress = self.settings.index.show_progress;
                let index = tokio::task::spawn_blocking(move || build_index(embedder.as_ref(), chunks, fp, batch_size, show_progress))
                    .await
                    .map_err(|e| Error::capability("embedding", e.into()))??;
                index.persist(&self.settings.index.dir).await?;
                (index, IndexSource::Built)
            }
        };

        self.answerer.ready().await.map_err(|e| Error::capability("answerer", e))?;
        let pipeline = RagPipeline::new(
            self.embedder.clone(),
            Arc::new(index),
            self.answerer.clone(),
            self.template.clone(),
            self.settings.index.top_k,
        )?;
        Ok((pipeline, source))
    }

    /// A persisted index usable for the current document and embedder, if any.
    async fn load_persisted(&self, fp: &str) -> Result<Option<VectorIndex>> {
        let dir = &self.settings.index.dir;
        if !index_exists(dir) {
            return Ok(None);
        }
        let index = match VectorIndex::load(dir).await {
            Ok(index) => index,
            Err(e) if self.settings.index.rebuild_on_corrupt => {
                warn!(error = %e, dir = %dir.display(), "persisted index unreadable; rebuilding");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        if index.dim() != self.embedder.dim() {
            warn!(stored = index.dim(), embedder = self.embedder.dim(), "persisted index has a different dimension; rebuilding");
            return Ok(None);
        }
        if self.settings.index.verify_fingerprint {
            let fresh = index.manifest().is_some_and(|m| m.matches(fp, self.embedder.dim()));
            if !fresh {
                warn!(dir = %dir.display(), "persisted index was built from a different document or model; rebuilding");
                return Ok(None);
            }
        }
        Ok(Some(index))
    }

    async fn ready_pipeline(&self) -> Result<Arc<RagPipeline>> {
        let current = self.slot.read().pipeline.clone();
        if let Some(pipeline) = current {
            return Ok(pipeline);
        }
        if !self.settings.service.auto_initialize {
            return Err(Error::NotReady(format!("service is {}", self.state())));
        }
        info!("auto-initializing before first question");
        self.initialize().await?;
        let current = self.slot.read().pipeline.clone();
        current.ok_or_else(|| Error::NotReady(format!("service is {}", self.state())))
    }

    /// Answer one question. Errors here never change the service state.
    pub async fn answer(&self, question: &str) -> Result<RagAnswer> {
        let pipeline = self.ready_pipeline().await?;
        pipeline.answer(question).await
    }

    pub async fn ask(&self, question: &str) -> Result<AskResponse> {
        Ok(self.answer(question).await?.into())
    }

    /// Snapshot of the lifecycle plus what exists on disk. No side effects.
    pub fn status(&self) -> ServiceStatus {
        let (state, chunks_indexed) = {
            let slot = self.slot.read();
            (slot.state.clone(), slot.chunks_indexed)
        };
        let last_error = match &state {
            ServiceState::Failed { reason } => Some(reason.clone()),
            _ => None,
        };
        ServiceStatus {
            initialized: state == ServiceState::Ready,
            state: state.as_str().to_string(),
            last_error,
            chunks_indexed,
            ..ServiceStatus::from_settings(&self.settings)
        }
    }
}
