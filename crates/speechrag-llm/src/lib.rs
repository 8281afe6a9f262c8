use std::sync::Arc;

use speechrag_core::config::LlmSettings;
use speechrag_core::traits::Answerer;

pub mod ollama;

pub use ollama::{OllamaAnswerer, OllamaError};

pub fn get_default_answerer(settings: &LlmSettings) -> anyhow::Result<Arc<dyn Answerer>> {
    Ok(Arc::new(OllamaAnswerer::new(settings)?))
}
