#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use speechrag_core::config::Settings;
use speechrag_core::segmenter::ChunkingConfig;
use speechrag_core::traits::{Answerer, Embedder};
use speechrag_embed::HashEmbedder;

pub const SPEECH: &str = "Caste is not just a division of labour. It is a division of labourers. This is harmful to society.";

/// Hashing embedder that counts every text it embeds.
pub struct CountingEmbedder {
    inner: HashEmbedder,
    pub embedded: AtomicUsize,
    delay: Duration,
}

impl CountingEmbedder {
    pub fn new() -> Arc<Self> { Self::with_delay(Duration::ZERO) }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self { inner: HashEmbedder::new(512), embedded: AtomicUsize::new(0), delay })
    }

    pub fn count(&self) -> usize { self.embedded.load(Ordering::SeqCst) }
}

impl Embedder for CountingEmbedder {
    fn id(&self) -> &str { self.inner.id() }
    fn dim(&self) -> usize { self.inner.dim() }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if !self.delay.is_zero() { std::thread::sleep(self.delay); }
        self.embedded.fetch_add(texts.len(), Ordering::SeqCst);
        self.inner.embed_batch(texts)
    }
}

/// Answerer that records prompts and replies with a canned answer.
#[derive(Default)]
pub struct RecordingAnswerer {
    pub prompts: Mutex<Vec<String>>,
    pub fail_generate: bool,
    pub fail_ready: bool,
}

impl RecordingAnswerer {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }
    pub fn failing() -> Arc<Self> { Arc::new(Self { fail_generate: true, ..Self::default() }) }
    pub fn unreachable() -> Arc<Self> { Arc::new(Self { fail_ready: true, ..Self::default() }) }
    pub fn prompts(&self) -> Vec<String> { self.prompts.lock().clone() }
}

#[async_trait]
impl Answerer for RecordingAnswerer {
    fn name(&self) -> &str { "recording" }

    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if self.fail_generate { anyhow::bail!("model exploded"); }
        Ok("Caste divides labourers, not just labour.".to_string())
    }

    async fn ready(&self) -> anyhow::Result<()> {
        if self.fail_ready { anyhow::bail!("connection refused"); }
        Ok(())
    }
}

/// Settings rooted in `dir`, writing `text` as the document when given.
pub fn settings_in(dir: &Path, text: Option<&str>) -> Settings {
    let document = dir.join("speech.txt");
    if let Some(text) = text {
        std::fs::write(&document, text).expect("write document");
    }
    let mut settings = Settings::default();
    settings.document.path = document;
    settings.index.dir = dir.join("index_db");
    settings.chunking = ChunkingConfig { chunk_size: 40, chunk_overlap: 10, separator: ". ".to_string() };
    settings
}
