//! Line-delimited extended-JSON record files
//!
//! Writing converts each document to canonical extended JSON on a single line.
//! Reading is lazy: [`RecordReader`] yields one document per non-blank line and
//! fails on the first line that does not parse.

use std::path::{Path, PathBuf};

use bson::{Bson, Document};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter, Lines};
use tracing::debug;

use crate::error::{CodecError, Result};

/// Write buffer size for record files.
const WRITE_BUFFER_CAPACITY: usize = 1024 * 1024;

/// Serialize one document as a newline-terminated canonical extended-JSON line
pub fn write_record(doc: &Document) -> Result<String> {
    let value = Bson::Document(doc.clone()).into_canonical_extjson();
    let mut line =
        serde_json::to_string(&value).map_err(|e| CodecError::Encode(e.to_string()))?;
    line.push('\n');
    Ok(line)
}

/// Parse one extended-JSON line into a document
///
/// # Arguments
/// * `line` - Record text, without its newline
/// * `line_number` - 1-based line number used in error messages
pub fn read_record(line: &str, line_number: usize) -> Result<Document> {
    let malformed = |message: String| CodecError::MalformedRecord {
        line: line_number,
        message,
    };

    let value: serde_json::Value =
        serde_json::from_str(line).map_err(|e| malformed(e.to_string()))?;

    match Bson::try_from(value).map_err(|e| malformed(e.to_string()))? {
        Bson::Document(doc) => Ok(doc),
        other => {
            let found = format!("expected a document, found {:?}", other.element_type());
            Err(malformed(found).into())
        }
    }
}

/// Lazy reader over a record stream
pub struct RecordReader<R> {
    lines: Lines<R>,
    line_number: usize,
    documents_read: u64,
}

impl RecordReader<BufReader<File>> {
    /// Open a record file for reading
    pub async fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).await?;
        debug!("Opened record file: {}", path.display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: AsyncBufRead + Unpin> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
            documents_read: 0,
        }
    }

    /// Next document, skipping blank lines; `None` at end of stream
    pub async fn next_document(&mut self) -> Result<Option<Document>> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }

            let doc = read_record(&line, self.line_number)?;
            self.documents_read += 1;
            return Ok(Some(doc));
        }

        Ok(None)
    }

    pub fn documents_read(&self) -> u64 {
        self.documents_read
    }
}

/// Buffered writer producing one record file
pub struct RecordWriter {
    /// Buffered file writer
    writer: BufWriter<File>,
    /// Path to the output file
    path: PathBuf,
    /// Number of documents written
    written: u64,
}

impl RecordWriter {
    /// Create (or truncate) the record file at `path`
    pub async fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).await?;
        debug!("Created record file: {}", path.display());

        Ok(Self {
            writer: BufWriter::with_capacity(WRITE_BUFFER_CAPACITY, file),
            path: path.to_path_buf(),
            written: 0,
        })
    }

    /// Append a batch of documents
    ///
    /// # Returns
    /// * `Result<usize>` - Number of documents written
    pub async fn write_batch(&mut self, docs: &[Document]) -> Result<usize> {
        for doc in docs {
            let line = write_record(doc)?;
            self.writer.write_all(line.as_bytes()).await?;
        }

        self.written += docs.len() as u64;
        debug!(
            "Wrote {} documents to {} (total: {})",
            docs.len(),
            self.path.display(),
            self.written
        );

        Ok(docs.len())
    }

    /// Flush buffered records to disk
    pub async fn finalize(mut self) -> Result<u64> {
        self.writer.flush().await?;
        self.writer.get_mut().sync_all().await?;
        debug!("Finalized {} ({} documents)", self.path.display(), self.written);
        Ok(self.written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{
        Binary, DateTime, Decimal128, Timestamp, doc, oid::ObjectId, spec::BinarySubtype,
    };

    fn typed_document() -> Document {
        doc! {
            "_id": ObjectId::parse_str("65a1f0c2e4b0a1b2c3d4e5f6").unwrap(),
            "small": 7i32,
            "big": 9_007_199_254_740_993i64,
            "ratio": 0.25f64,
            "price": Decimal128::from_bytes([1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x40, 0x30]),
            "seen": Timestamp { time: 1_700_000_000, increment: 7 },
            "created": DateTime::from_millis(1_700_000_000_123),
            "uuid": Binary { subtype: BinarySubtype::Uuid, bytes: vec![0xab; 16] },
            "tags": ["a", "b"],
            "nested": { "none": null, "flag": true },
        }
    }

    #[test]
    fn test_write_record_is_single_line() {
        let line = write_record(&typed_document()).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.contains("$numberLong"));
        assert!(line.contains("$timestamp"));
        assert!(line.contains("$binary"));
    }

    #[test]
    fn test_typed_values_survive() {
        let original = typed_document();
        let line = write_record(&original).unwrap();
        let decoded = read_record(line.trim_end(), 1).unwrap();

        assert_eq!(decoded, original);
        assert!(matches!(decoded.get("small"), Some(Bson::Int32(7))));
        assert!(matches!(decoded.get("big"), Some(Bson::Int64(_))));
        assert!(matches!(decoded.get("seen"), Some(Bson::Timestamp(_))));
    }

    #[test]
    fn test_read_record_rejects_garbage() {
        let err = read_record("{not json", 4).unwrap_err();
        assert!(err.to_string().contains("line 4"));
    }

    #[test]
    fn test_read_record_rejects_non_document() {
        assert!(read_record("[1, 2, 3]", 1).is_err());
        assert!(read_record("42", 1).is_err());
    }

    #[tokio::test]
    async fn test_reader_skips_blank_lines() {
        let input = "{\"a\":{\"$numberInt\":\"1\"}}\n\n   \n{\"a\":{\"$numberInt\":\"2\"}}\n\t\n";
        let mut reader = RecordReader::new(input.as_bytes());

        let first = reader.next_document().await.unwrap().unwrap();
        let second = reader.next_document().await.unwrap().unwrap();
        assert_eq!(first, doc! { "a": 1 });
        assert_eq!(second, doc! { "a": 2 });
        assert!(reader.next_document().await.unwrap().is_none());
        assert_eq!(reader.documents_read(), 2);
    }

    #[tokio::test]
    async fn test_reader_fails_on_malformed_line() {
        let input = "{\"a\":1}\n\n{\"a\":\n";
        let mut reader = RecordReader::new(input.as_bytes());

        assert!(reader.next_document().await.unwrap().is_some());
        let err = reader.next_document().await.unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[tokio::test]
    async fn test_empty_stream() {
        let mut reader = RecordReader::new("".as_bytes());
        assert!(reader.next_document().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_writer_then_reader() {
        let dir = std::env::temp_dir().join(format!("mongoport-record-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("items.jsonl");

        let mut writer = RecordWriter::create(&path).await.unwrap();
        writer.write_batch(&[doc! { "n": 1 }, doc! { "n": 2 }]).await.unwrap();
        writer.write_batch(&[typed_document()]).await.unwrap();
        assert_eq!(writer.finalize().await.unwrap(), 3);

        let mut reader = RecordReader::open(&path).await.unwrap();
        let mut docs = Vec::new();
        while let Some(doc) = reader.next_document().await.unwrap() {
            docs.push(doc);
        }
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[2], typed_document());

        tokio::fs::remove_dir_all(dir).await.ok();
    }
}
