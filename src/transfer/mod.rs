//! Streaming transfer engine
//!
//! One algorithm copies a database from any [`DocumentSource`] to any
//! [`DocumentSink`]:
//!
//! - collections are enumerated once and processed one at a time, in order
//! - documents stream in source order and are flushed in batches of
//!   [`BATCH_CAPACITY`]
//! - index descriptors are normalized and replicated after the collection's
//!   documents have been written
//!
//! A failure aborts the transfer with a [`TransferFailure`] naming the
//! collection and step. Nothing already written is rolled back.
//!
//! [`TransferFailure`]: crate::error::TransferFailure

use std::path::{Path, PathBuf};

use mongodb::bson::Document;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::TransferConfig;
use crate::connection::ConnectionManager;
use crate::error::{Result, TransferStep};
use crate::index::normalize_indexes;
use crate::utils::time::timestamp_slug;

pub mod directory;
pub mod live;
pub mod progress;
pub mod sink;
pub mod source;

pub use directory::{DirectorySink, DirectorySource};
pub use live::{DatabaseSink, DatabaseSource};
pub use progress::{ChannelObserver, NoProgress, ProgressEvent, ProgressObserver, ProgressTracker};
pub use sink::DocumentSink;
pub use source::{DocumentSource, DocumentStream};

/// Maximum number of documents buffered before a flush.
pub const BATCH_CAPACITY: usize = 500;

/// Outcome of a completed transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferResult {
    /// Collections transferred
    pub collections: usize,
    /// Documents transferred across all collections
    pub documents: u64,
    /// Directory written, for exports
    pub output_path: Option<PathBuf>,
}

/// Knobs for transfers into a live database
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferOptions {
    /// Extra attempts for a failed batch insert
    pub insert_retries: u32,
}

impl From<&TransferConfig> for TransferOptions {
    fn from(config: &TransferConfig) -> Self {
        Self {
            insert_retries: config.insert_retries,
        }
    }
}

/// Copy every collection of `source` into `sink`
pub async fn transfer(
    source: &mut dyn DocumentSource,
    sink: &mut dyn DocumentSink,
    observer: &mut dyn ProgressObserver,
) -> Result<TransferResult> {
    info!("Transferring {} -> {}", source.describe(), sink.describe());

    let collections = source
        .collections()
        .await
        .map_err(|e| e.during(None, TransferStep::ListCollections))?;
    let total = collections.len();
    debug!("{} collections to transfer", total);

    let mut documents = 0u64;
    for (index, name) in collections.iter().enumerate() {
        observer.on_collection(name, index + 1, total);

        let copied = copy_documents(source, sink, name).await?;
        documents += copied;

        let raw = source
            .indexes(name)
            .await
            .map_err(|e| e.during(Some(name), TransferStep::ReadIndexes))?;
        let descriptors = normalize_indexes(&raw);
        sink.write_indexes(name, &descriptors)
            .await
            .map_err(|e| e.during(Some(name), TransferStep::CreateIndexes))?;

        debug!(
            "Collection '{}': {} documents, {} indexes",
            name,
            copied,
            descriptors.len()
        );
    }

    let result = TransferResult {
        collections: total,
        documents,
        output_path: sink.output_path(),
    };
    if total > 0 {
        observer.on_complete(&result);
    }

    info!(
        "Transferred {} collections ({} documents)",
        result.collections, result.documents
    );
    Ok(result)
}

/// Stream one collection's documents into the sink in bounded batches
async fn copy_documents(
    source: &mut dyn DocumentSource,
    sink: &mut dyn DocumentSink,
    name: &str,
) -> Result<u64> {
    let mut stream = source
        .open(name)
        .await
        .map_err(|e| e.during(Some(name), TransferStep::ReadDocuments))?;

    sink.begin_collection(name)
        .await
        .map_err(|e| e.during(Some(name), TransferStep::InsertBatch))?;

    let mut batch: Vec<Document> = Vec::with_capacity(BATCH_CAPACITY);
    let mut copied = 0u64;

    while let Some(doc) = stream
        .next_document()
        .await
        .map_err(|e| e.during(Some(name), TransferStep::ReadDocuments))?
    {
        batch.push(doc);
        if batch.len() == BATCH_CAPACITY {
            flush(sink, name, &mut batch).await?;
            copied += BATCH_CAPACITY as u64;
        }
    }

    if !batch.is_empty() {
        copied += batch.len() as u64;
        flush(sink, name, &mut batch).await?;
    }

    sink.finish_collection(name)
        .await
        .map_err(|e| e.during(Some(name), TransferStep::InsertBatch))?;

    Ok(copied)
}

async fn flush(sink: &mut dyn DocumentSink, name: &str, batch: &mut Vec<Document>) -> Result<()> {
    sink.write_batch(name, batch)
        .await
        .map_err(|e| e.during(Some(name), TransferStep::InsertBatch))?;
    batch.clear();
    Ok(())
}

/// Copy database `db` into `target_db`, on the same or another cluster
pub async fn clone_database(
    source: &ConnectionManager,
    db: &str,
    target: &ConnectionManager,
    target_db: &str,
    options: TransferOptions,
    observer: &mut dyn ProgressObserver,
) -> Result<TransferResult> {
    let mut src = DatabaseSource::from_connection(source, db)?;
    let mut dst =
        DatabaseSink::from_connection(target, target_db)?.with_insert_retries(options.insert_retries);
    transfer(&mut src, &mut dst, observer).await
}

/// Export database `db` into `out_dir`
pub async fn export_database(
    connection: &ConnectionManager,
    db: &str,
    out_dir: &Path,
    observer: &mut dyn ProgressObserver,
) -> Result<TransferResult> {
    let mut src = DatabaseSource::from_connection(connection, db)?;
    let mut dst = DirectorySink::create(out_dir).await?;
    transfer(&mut src, &mut dst, observer).await
}

/// Import the export in `dir` into `target_db`
///
/// A missing `dir` fails with `SourceNotFound` before the database is touched.
pub async fn import_database(
    dir: &Path,
    connection: &ConnectionManager,
    target_db: &str,
    options: TransferOptions,
    observer: &mut dyn ProgressObserver,
) -> Result<TransferResult> {
    let mut src = DirectorySource::open(dir).await?;
    let mut dst = DatabaseSink::from_connection(connection, target_db)?
        .with_insert_retries(options.insert_retries);
    transfer(&mut src, &mut dst, observer).await
}

/// Timestamped export directory for `db` under `base`
///
/// # Example
/// `<base>/shop_20250101_120000`
pub fn default_export_dir(base: &Path, db: &str) -> PathBuf {
    base.join(format!("{db}_{}", timestamp_slug()))
}
