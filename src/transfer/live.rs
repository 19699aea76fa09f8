//! Live database endpoints
//!
//! [`DatabaseSource`] streams documents out of a database with one query-all
//! cursor per collection. [`DatabaseSink`] bulk-inserts batches and recreates
//! indexes from normalized descriptors.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::error::ErrorKind;
use mongodb::{Cursor, Database};
use tracing::{debug, info, warn};

use crate::catalog;
use crate::connection::ConnectionManager;
use crate::error::Result;
use crate::error::mongo::{ErrorInfo, extract_error_info};
use crate::index::{create_indexes_command, index_name};

use super::sink::DocumentSink;
use super::source::{DocumentSource, DocumentStream};

/// Delay between attempts of a retried batch insert.
const RETRY_DELAY: Duration = Duration::from_millis(250);

/// Server code returned when creating a collection that already exists.
const NAMESPACE_EXISTS: i32 = 48;

/// Cursor over one collection
pub struct CursorStream {
    cursor: Cursor<Document>,
    collection: String,
    fetched: u64,
}

impl CursorStream {
    pub fn new(cursor: Cursor<Document>, collection: &str) -> Self {
        Self {
            cursor,
            collection: collection.to_string(),
            fetched: 0,
        }
    }
}

#[async_trait]
impl DocumentStream for CursorStream {
    async fn next_document(&mut self) -> Result<Option<Document>> {
        match self.cursor.try_next().await? {
            Some(doc) => {
                self.fetched += 1;
                Ok(Some(doc))
            }
            None => {
                debug!(
                    "Cursor on '{}' exhausted after {} documents",
                    self.collection, self.fetched
                );
                Ok(None)
            }
        }
    }
}

/// Reads every user collection of one database
pub struct DatabaseSource {
    db: Database,
}

impl DatabaseSource {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Source over `db` on a connected manager
    pub fn from_connection(connection: &ConnectionManager, db: &str) -> Result<Self> {
        Ok(Self::new(connection.get_database(db)?))
    }
}

#[async_trait]
impl DocumentSource for DatabaseSource {
    async fn collections(&mut self) -> Result<Vec<String>> {
        let names = catalog::stored_collection_names(&self.db).await?;
        Ok(catalog::user_collections(names))
    }

    async fn open(&mut self, collection: &str) -> Result<Box<dyn DocumentStream>> {
        let cursor = self
            .db
            .collection::<Document>(collection)
            .find(doc! {})
            .await?;
        Ok(Box::new(CursorStream::new(cursor, collection)))
    }

    async fn indexes(&mut self, collection: &str) -> Result<Vec<Document>> {
        let cursor = self
            .db
            .run_cursor_command(doc! { "listIndexes": collection })
            .await?;
        let indexes: Vec<Document> = cursor.try_collect().await?;
        debug!("Collection '{}' has {} indexes", collection, indexes.len());
        Ok(indexes)
    }

    fn describe(&self) -> String {
        format!("database '{}'", self.db.name())
    }
}

/// Writes into one database
pub struct DatabaseSink {
    db: Database,
    /// Extra attempts for a failed insert; zero means fail on the first error
    insert_retries: u32,
    /// Documents inserted into the current collection
    inserted: u64,
}

impl DatabaseSink {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            insert_retries: 0,
            inserted: 0,
        }
    }

    /// Sink into `db` on a connected manager
    pub fn from_connection(connection: &ConnectionManager, db: &str) -> Result<Self> {
        Ok(Self::new(connection.get_database(db)?))
    }

    /// Retry a failed batch insert up to `retries` more times
    ///
    /// A retry re-sends the whole batch. Duplicate key failures are never
    /// retried, and documents stored by a partially failed attempt make the
    /// retry fail with one.
    pub fn with_insert_retries(mut self, retries: u32) -> Self {
        self.insert_retries = retries;
        self
    }

    /// Create `collection` so it exists even when it received no documents
    async fn ensure_collection(&self, collection: &str) -> Result<()> {
        match self.db.create_collection(collection).await {
            Ok(()) => Ok(()),
            Err(e) if matches!(e.kind.as_ref(), ErrorKind::Command(c) if c.code == NAMESPACE_EXISTS) => {
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl DocumentSink for DatabaseSink {
    async fn begin_collection(&mut self, collection: &str) -> Result<()> {
        debug!("Writing into '{}.{}'", self.db.name(), collection);
        self.inserted = 0;
        Ok(())
    }

    async fn write_batch(&mut self, collection: &str, docs: &[Document]) -> Result<()> {
        let coll = &self.db.collection::<Document>(collection);
        insert_with_retries(collection, docs.len(), self.insert_retries, RETRY_DELAY, move || {
            async move { coll.insert_many(docs).await.map(|_| ()) }
        })
        .await?;

        self.inserted += docs.len() as u64;
        Ok(())
    }

    async fn finish_collection(&mut self, collection: &str) -> Result<()> {
        if self.inserted == 0 {
            self.ensure_collection(collection).await?;
        }
        Ok(())
    }

    async fn write_indexes(&mut self, collection: &str, descriptors: &[Document]) -> Result<()> {
        if descriptors.is_empty() {
            return Ok(());
        }

        let command = create_indexes_command(collection, descriptors)?;
        self.db.run_command(command).await?;

        let names: Vec<&str> = descriptors.iter().map(index_name).collect();
        info!("Created indexes on '{}': {}", collection, names.join(", "));
        Ok(())
    }

    fn describe(&self) -> String {
        format!("database '{}'", self.db.name())
    }
}

/// Whether a failed insert is sent again
///
/// `attempt` counts the retries already made. Duplicate key failures are final.
fn should_retry(attempt: u32, retries: u32, info: &ErrorInfo) -> bool {
    attempt < retries && !info.is_duplicate_key()
}

/// Run `insert` until it succeeds or [`should_retry`] gives up
///
/// Returns the number of attempts made.
async fn insert_with_retries<F, Fut>(
    collection: &str,
    batch_len: usize,
    retries: u32,
    delay: Duration,
    mut insert: F,
) -> mongodb::error::Result<u32>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = mongodb::error::Result<()>>,
{
    let mut attempt = 0;

    loop {
        match insert().await {
            Ok(()) => return Ok(attempt + 1),
            Err(e) if should_retry(attempt, retries, &extract_error_info(&e)) => {
                attempt += 1;
                warn!(
                    "Insert of {} documents into '{}' failed (attempt {}/{}): {}",
                    batch_len,
                    collection,
                    attempt,
                    retries + 1,
                    e
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
