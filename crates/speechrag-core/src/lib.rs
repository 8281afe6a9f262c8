pub mod config;
pub mod document;
pub mod error;
pub mod segmenter;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
