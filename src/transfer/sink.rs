//! Document sinks for the transfer engine

use std::path::PathBuf;

use async_trait::async_trait;
use mongodb::bson::Document;

use crate::error::Result;

/// Where a transfer writes to
///
/// For each collection the engine calls, in order: `begin_collection`, zero or
/// more `write_batch`, `finish_collection`, then `write_indexes`.
#[async_trait]
pub trait DocumentSink: Send {
    /// Prepare to receive the documents of `collection`
    async fn begin_collection(&mut self, collection: &str) -> Result<()>;

    /// Persist one batch; never called with an empty slice
    async fn write_batch(&mut self, collection: &str, docs: &[Document]) -> Result<()>;

    /// All documents of `collection` have been written
    async fn finish_collection(&mut self, collection: &str) -> Result<()>;

    /// Replicate normalized index descriptors, possibly an empty set
    async fn write_indexes(&mut self, collection: &str, descriptors: &[Document]) -> Result<()>;

    /// Output location, for sinks that write to the filesystem
    fn output_path(&self) -> Option<PathBuf> {
        None
    }

    /// Short human-readable description for logs
    fn describe(&self) -> String;
}
