//! Index descriptor normalization
//!
//! Descriptors read from a live collection look like
//! `{ v: 2, key: { email: 1 }, name: "email_1", ns: "shop.users", unique: true }`.
//! `v` and `ns` are bound to the collection they were read from and are rejected
//! when recreating the index elsewhere, and the `_id_` index always exists
//! already. Everything else is kept exactly as read, field order included.

use bson::{Bson, Document, doc};

use crate::error::{CodecError, Result};

/// Name the server gives the implicit identifier index.
pub const ID_INDEX_NAME: &str = "_id_";

/// Context-bound fields removed before a descriptor is reused.
const CONTEXT_FIELDS: &[&str] = &["v", "ns"];

/// Whether `descriptor` is the implicit `_id` index
pub fn is_id_index(descriptor: &Document) -> bool {
    if descriptor.get_str("name").is_ok_and(|name| name == ID_INDEX_NAME) {
        return true;
    }

    match descriptor.get_document("key") {
        Ok(key) if key.len() == 1 => key.get("_id").is_some_and(is_ascending),
        _ => false,
    }
}

fn is_ascending(direction: &Bson) -> bool {
    match direction {
        Bson::Int32(n) => *n == 1,
        Bson::Int64(n) => *n == 1,
        Bson::Double(n) => *n == 1.0,
        _ => false,
    }
}

/// Normalize one raw descriptor for recreation elsewhere.
///
/// Returns `None` for the implicit `_id` index.
pub fn normalize_index(raw: &Document) -> Option<Document> {
    if is_id_index(raw) {
        return None;
    }

    let mut descriptor = raw.clone();
    for field in CONTEXT_FIELDS {
        descriptor.remove(*field);
    }
    Some(descriptor)
}

/// Normalize a set of raw descriptors, dropping the implicit `_id` index
pub fn normalize_indexes<'a, I>(raws: I) -> Vec<Document>
where
    I: IntoIterator<Item = &'a Document>,
{
    raws.into_iter().filter_map(normalize_index).collect()
}

/// `createIndexes` command recreating `descriptors` on `collection`
///
/// Descriptors are sent as they are, so options keep their stored BSON type.
/// Each one must carry a `key` document.
pub fn create_indexes_command(collection: &str, descriptors: &[Document]) -> Result<Document> {
    if let Some(descriptor) = descriptors.iter().find(|d| d.get_document("key").is_err()) {
        return Err(CodecError::InvalidIndex {
            name: index_name(descriptor).to_string(),
            message: "missing 'key' document".into(),
        }
        .into());
    }

    let indexes: Vec<Bson> = descriptors.iter().cloned().map(Bson::Document).collect();
    Ok(doc! { "createIndexes": collection, "indexes": indexes })
}

/// Index name for logging
pub fn index_name(descriptor: &Document) -> &str {
    descriptor.get_str("name").unwrap_or("<unnamed>")
}
