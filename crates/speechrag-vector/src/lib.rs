//! Vector index for chunk retrieval: an exhaustive in-memory cosine index,
//! batched chunk embedding, and LanceDB persistence with a fingerprint
//! manifest.

pub mod index;
pub mod indexer;
pub mod manifest;
pub mod schema;
pub mod store;
pub mod table;

pub use index::VectorIndex;
pub use indexer::{build_index, embed_chunks};
pub use manifest::{fingerprint, IndexManifest};
pub use store::index_exists;
