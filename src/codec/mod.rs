//! File codec for exported databases
//!
//! An exported database is a directory holding, per collection:
//!
//! - `<collection>.jsonl`: one canonical extended-JSON document per line
//! - `<collection>.indexes.json`: a JSON array of normalized index descriptors
//!
//! Canonical extended JSON keeps every BSON type distinguishable (`$numberLong`,
//! `$timestamp`, `$binary`, `$numberDecimal`, ...), so a record file reads back
//! into exactly the documents that were written.

use std::path::{Path, PathBuf};

pub mod record;
pub mod sidecar;

pub use record::{RecordReader, RecordWriter, read_record, write_record};
pub use sidecar::{read_index_sidecar, write_index_sidecar};

/// Extension of record files.
pub const RECORD_EXTENSION: &str = "jsonl";

/// Suffix of index sidecar files.
pub const SIDECAR_SUFFIX: &str = ".indexes.json";

/// Whether `collection` can be stored as a single file name
///
/// MongoDB allows path separators in collection names; an export cannot.
pub fn is_storable_name(collection: &str) -> bool {
    !collection.is_empty() && !collection.contains(['/', '\\'])
}

/// `<dir>/<collection>.jsonl`
pub fn record_path(dir: &Path, collection: &str) -> PathBuf {
    dir.join(format!("{collection}.{RECORD_EXTENSION}"))
}

/// `<dir>/<collection>.indexes.json`
pub fn sidecar_path(dir: &Path, collection: &str) -> PathBuf {
    dir.join(format!("{collection}{SIDECAR_SUFFIX}"))
}

/// Collection name of a record file, `None` for any other file
pub fn collection_name(path: &Path) -> Option<&str> {
    let file_name = path.file_name()?.to_str()?;
    let stem = file_name.strip_suffix(RECORD_EXTENSION)?.strip_suffix('.')?;
    (!stem.is_empty()).then_some(stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let dir = Path::new("/tmp/export");
        assert_eq!(record_path(dir, "users"), PathBuf::from("/tmp/export/users.jsonl"));
        assert_eq!(
            sidecar_path(dir, "audit.log"),
            PathBuf::from("/tmp/export/audit.log.indexes.json")
        );
    }

    #[test]
    fn test_storable_names() {
        assert!(is_storable_name("users"));
        assert!(is_storable_name("audit.log"));
        assert!(!is_storable_name("reports/2024"));
        assert!(!is_storable_name("reports\\2024"));
        assert!(!is_storable_name(""));
    }

    #[test]
    fn test_collection_name_from_record_file() {
        assert_eq!(collection_name(Path::new("/x/users.jsonl")), Some("users"));
        assert_eq!(collection_name(Path::new("audit.log.jsonl")), Some("audit.log"));
        assert_eq!(collection_name(Path::new("users.indexes.json")), None);
        assert_eq!(collection_name(Path::new("notes.txt")), None);
        assert_eq!(collection_name(Path::new(".jsonl")), None);
        assert_eq!(collection_name(Path::new("usersjsonl")), None);
    }
}
