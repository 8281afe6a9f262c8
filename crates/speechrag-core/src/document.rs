use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::Document;

/// Read the source document. A missing path is `DocumentNotFound`; bytes that
/// are not valid UTF-8 are decoded lossily.
pub fn load_document(path: &Path) -> Result<Document> {
    if !path.is_file() {
        return Err(Error::DocumentNotFound(path.to_path_buf()));
    }
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            warn!(path = %path.display(), "document is not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(&fs::read(path)?).into_owned()
        }
        Err(e) => return Err(e.into()),
    };
    debug!(path = %path.display(), bytes = text.len(), "document loaded");
    Ok(Document::new(path.to_string_lossy(), text))
}

pub fn document_available(path: &Path) -> bool {
    path.is_file()
}
