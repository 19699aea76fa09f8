//! Index sidecar files
//!
//! A sidecar holds the normalized index descriptors of one collection as a
//! pretty-printed JSON array of canonical extended-JSON documents. It is
//! written to a temporary file first and renamed into place, so a reader
//! never observes a half-written array.

use std::path::Path;

use bson::{Bson, Document};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{CodecError, Result};

/// Atomically write `descriptors` to `path`
pub async fn write_index_sidecar(path: &Path, descriptors: &[Document]) -> Result<()> {
    let values: Vec<serde_json::Value> = descriptors
        .iter()
        .map(|doc| Bson::Document(doc.clone()).into_canonical_extjson())
        .collect();
    let mut content =
        serde_json::to_string_pretty(&values).map_err(|e| CodecError::Encode(e.to_string()))?;
    content.push('\n');

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    let mut file = tokio::fs::File::create(tmp_path).await?;
    file.write_all(content.as_bytes()).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(tmp_path, path).await?;

    debug!("Wrote {} index descriptors to {}", descriptors.len(), path.display());
    Ok(())
}

/// Read the descriptors stored at `path`
///
/// # Returns
/// * `Ok(None)` - No sidecar exists
/// * `Ok(Some(descriptors))` - Descriptors in file order
pub async fn read_index_sidecar(path: &Path) -> Result<Option<Vec<Document>>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No index sidecar at {}", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let malformed = |message: String| CodecError::MalformedSidecar {
        path: path.to_path_buf(),
        message,
    };

    let values: Vec<serde_json::Value> =
        serde_json::from_str(&content).map_err(|e| malformed(e.to_string()))?;

    let mut descriptors = Vec::with_capacity(values.len());
    for (position, value) in values.into_iter().enumerate() {
        match Bson::try_from(value).map_err(|e| malformed(e.to_string()))? {
            Bson::Document(doc) => descriptors.push(doc),
            _ => return Err(malformed(format!("entry {position} is not a document")).into()),
        }
    }

    Ok(Some(descriptors))
}
