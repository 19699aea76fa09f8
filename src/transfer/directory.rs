//! Directory endpoints
//!
//! A [`DirectorySink`] lays a database out as one record file and one index
//! sidecar per collection. A [`DirectorySource`] reads that layout back.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mongodb::bson::Document;
use tokio::fs::File;
use tokio::io::BufReader;
use tracing::{debug, info};

use crate::codec::{self, RecordReader, RecordWriter};
use crate::error::{CodecError, MongoportError, Result, TransferStep};
use crate::utils::fs::ensure_dir_exists;
use crate::utils::validate::is_valid_collection_name;

use super::sink::DocumentSink;
use super::source::{DocumentSource, DocumentStream};

#[async_trait]
impl DocumentStream for RecordReader<BufReader<File>> {
    async fn next_document(&mut self) -> Result<Option<Document>> {
        RecordReader::next_document(self).await
    }
}

/// Reads an exported database directory
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    /// Open `dir`, which must be an existing directory
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        match tokio::fs::metadata(dir).await {
            Ok(meta) if meta.is_dir() => Ok(Self {
                dir: dir.to_path_buf(),
            }),
            _ => Err(MongoportError::SourceNotFound(dir.to_path_buf())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl DocumentSource for DirectorySource {
    async fn collections(&mut self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }

            let path = entry.path();
            let Some(name) = codec::collection_name(&path) else {
                continue;
            };
            if !is_valid_collection_name(name) {
                return Err(CodecError::InvalidCollectionName(name.to_string()).into());
            }
            names.push(name.to_string());
        }

        names.sort();
        debug!("Found {} record files in {}", names.len(), self.dir.display());
        Ok(names)
    }

    async fn open(&mut self, collection: &str) -> Result<Box<dyn DocumentStream>> {
        let reader = RecordReader::open(&codec::record_path(&self.dir, collection)).await?;
        Ok(Box::new(reader))
    }

    async fn indexes(&mut self, collection: &str) -> Result<Vec<Document>> {
        let sidecar = codec::read_index_sidecar(&codec::sidecar_path(&self.dir, collection)).await?;
        Ok(sidecar.unwrap_or_default())
    }

    fn describe(&self) -> String {
        format!("directory '{}'", self.dir.display())
    }
}

/// Writes a database into a directory
///
/// Existing record files and sidecars of the same collections are replaced.
pub struct DirectorySink {
    dir: PathBuf,
    writer: Option<RecordWriter>,
}

impl DirectorySink {
    /// Create `dir` (and its parents) if needed
    pub async fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        ensure_dir_exists(dir).await?;
        info!("Writing export to {}", dir.display());

        Ok(Self {
            dir: dir.to_path_buf(),
            writer: None,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl DocumentSink for DirectorySink {
    async fn begin_collection(&mut self, collection: &str) -> Result<()> {
        if !codec::is_storable_name(collection) {
            let err = MongoportError::from(CodecError::InvalidCollectionName(collection.to_string()));
            return Err(err.during(Some(collection), TransferStep::WriteRecords));
        }

        let path = codec::record_path(&self.dir, collection);
        let writer = RecordWriter::create(&path)
            .await
            .map_err(|e| e.during(Some(collection), TransferStep::WriteRecords))?;
        self.writer = Some(writer);
        Ok(())
    }

    async fn write_batch(&mut self, collection: &str, docs: &[Document]) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(MongoportError::Generic(format!(
                "no record file open for collection '{collection}'"
            )));
        };

        writer
            .write_batch(docs)
            .await
            .map_err(|e| e.during(Some(collection), TransferStep::WriteRecords))?;
        Ok(())
    }

    async fn finish_collection(&mut self, collection: &str) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            let written = writer
                .finalize()
                .await
                .map_err(|e| e.during(Some(collection), TransferStep::WriteRecords))?;
            debug!("Exported {} documents from '{}'", written, collection);
        }
        Ok(())
    }

    async fn write_indexes(&mut self, collection: &str, descriptors: &[Document]) -> Result<()> {
        let path = codec::sidecar_path(&self.dir, collection);
        codec::write_index_sidecar(&path, descriptors)
            .await
            .map_err(|e| e.during(Some(collection), TransferStep::WriteIndexes))
    }

    fn output_path(&self) -> Option<PathBuf> {
        Some(self.dir.clone())
    }

    fn describe(&self) -> String {
        format!("directory '{}'", self.dir.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("mongoport-dir-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_open_missing_directory() {
        let result = DirectorySource::open(temp_path()).await;
        assert!(matches!(result, Err(MongoportError::SourceNotFound(_))));
    }

    #[tokio::test]
    async fn test_open_regular_file_is_not_a_source() {
        let dir = temp_path();
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let file = dir.join("users.jsonl");
        tokio::fs::write(&file, "").await.unwrap();

        let result = DirectorySource::open(&file).await;
        assert!(matches!(result, Err(MongoportError::SourceNotFound(_))));

        tokio::fs::remove_dir_all(dir).await.ok();
    }

    #[tokio::test]
    async fn test_collections_are_sorted_record_files() {
        let dir = temp_path();
        tokio::fs::create_dir_all(dir.join("nested.jsonl")).await.unwrap();
        for name in ["orders.jsonl", "audit.log.jsonl", "users.jsonl", "notes.txt"] {
            tokio::fs::write(dir.join(name), "").await.unwrap();
        }
        tokio::fs::write(dir.join("users.indexes.json"), "[]").await.unwrap();

        let mut source = DirectorySource::open(&dir).await.unwrap();
        assert_eq!(
            source.collections().await.unwrap(),
            vec!["audit.log", "orders", "users"]
        );

        tokio::fs::remove_dir_all(dir).await.ok();
    }

    #[tokio::test]
    async fn test_invalid_collection_name_is_rejected() {
        let dir = temp_path();
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("bad$name.jsonl"), "").await.unwrap();

        let mut source = DirectorySource::open(&dir).await.unwrap();
        let err = source.collections().await.unwrap_err();
        assert!(matches!(
            err,
            MongoportError::Codec(CodecError::InvalidCollectionName(_))
        ));

        tokio::fs::remove_dir_all(dir).await.ok();
    }

    #[tokio::test]
    async fn test_missing_sidecar_means_no_indexes() {
        let dir = temp_path();
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("users.jsonl"), "{\"n\":1}\n").await.unwrap();

        let mut source = DirectorySource::open(&dir).await.unwrap();
        assert!(source.indexes("users").await.unwrap().is_empty());

        let mut stream = source.open("users").await.unwrap();
        assert_eq!(stream.next_document().await.unwrap(), Some(doc! { "n": 1 }));
        assert_eq!(stream.next_document().await.unwrap(), None);

        tokio::fs::remove_dir_all(dir).await.ok();
    }

    #[tokio::test]
    async fn test_sink_writes_records_and_sidecar() {
        let dir = temp_path().join("nested").join("export");
        let mut sink = DirectorySink::create(&dir).await.unwrap();
        assert_eq!(sink.output_path(), Some(dir.clone()));

        sink.begin_collection("users").await.unwrap();
        sink.write_batch("users", &[doc! { "n": 1 }, doc! { "n": 2 }])
            .await
            .unwrap();
        sink.finish_collection("users").await.unwrap();
        sink.write_indexes("users", &[doc! { "key": { "n": 1 }, "name": "n_1" }])
            .await
            .unwrap();

        let records = tokio::fs::read_to_string(dir.join("users.jsonl")).await.unwrap();
        assert_eq!(records.lines().count(), 2);
        let sidecar = codec::read_index_sidecar(&dir.join("users.indexes.json"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sidecar.len(), 1);

        tokio::fs::remove_dir_all(temp_root(&dir)).await.ok();
    }

    #[tokio::test]
    async fn test_collection_with_path_separator_is_rejected() {
        let dir = temp_path();
        let mut sink = DirectorySink::create(&dir).await.unwrap();

        let err = sink.begin_collection("reports/2024").await.unwrap_err();
        let MongoportError::Transfer(failure) = &err else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(failure.collection.as_deref(), Some("reports/2024"));
        assert_eq!(failure.step, TransferStep::WriteRecords);
        assert!(matches!(
            *failure.cause,
            MongoportError::Codec(CodecError::InvalidCollectionName(_))
        ));
        assert!(!dir.join("reports").exists());

        tokio::fs::remove_dir_all(dir).await.ok();
    }

    #[tokio::test]
    async fn test_write_batch_without_begin_fails() {
        let dir = temp_path();
        let mut sink = DirectorySink::create(&dir).await.unwrap();
        assert!(sink.write_batch("users", &[doc! { "n": 1 }]).await.is_err());
        tokio::fs::remove_dir_all(dir).await.ok();
    }

    fn temp_root(dir: &Path) -> PathBuf {
        dir.ancestors().nth(2).unwrap().to_path_buf()
    }
}
