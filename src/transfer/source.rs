//! Document sources for the transfer engine
//!
//! A source enumerates collections, opens a lazy document stream per
//! collection and reports each collection's raw index descriptors.

use async_trait::async_trait;
use mongodb::bson::Document;

use crate::error::Result;

/// Lazy, forward-only sequence of documents from one collection
///
/// A stream is opened once per collection and cannot be resumed after an error.
#[async_trait]
pub trait DocumentStream: Send {
    /// Next document, or `None` once the collection is exhausted
    async fn next_document(&mut self) -> Result<Option<Document>>;
}

/// Where a transfer reads from
#[async_trait]
pub trait DocumentSource: Send {
    /// Collection names in the order they will be transferred
    async fn collections(&mut self) -> Result<Vec<String>>;

    /// Open a stream over every document of `collection`
    async fn open(&mut self, collection: &str) -> Result<Box<dyn DocumentStream>>;

    /// Index descriptors of `collection` as stored at the source
    ///
    /// An absent index listing is an empty set, not an error.
    async fn indexes(&mut self, collection: &str) -> Result<Vec<Document>>;

    /// Short human-readable description for logs
    fn describe(&self) -> String;
}
