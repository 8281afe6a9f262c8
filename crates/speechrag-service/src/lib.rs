//! Retrieval-augmented question answering over one document.

pub mod lifecycle;
pub mod pipeline;
pub mod prompt;
pub mod response;

pub use lifecycle::{ServiceLifecycle, ServiceState};
pub use pipeline::{build_context, RagAnswer, RagPipeline};
pub use prompt::PromptTemplate;
pub use response::{AskResponse, IndexSource, InitOutcome, InitStatus, ServiceStatus, Source};
