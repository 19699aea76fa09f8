use std::fmt;

use mongodb::bson::{self, Bson, Document};
use serde::{Deserialize, Serialize};

/// Structured error information extracted from MongoDB driver errors.
///
/// Serialized to JSON when a driver error is displayed, so a failed insert or
/// index build reports the server code, its name and the offending index.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub(crate) error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) details: Option<ErrorDetails>,
}

/// Namespace, index and key extracted from a write error's details document.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) key: Option<Document>,
}

impl ErrorInfo {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(self.code, Some(11000 | 11001))
    }
}

/// Render a driver error as pretty JSON wrapped in an `error` field.
///
/// Used by the `Display` implementation of `MongoportError::MongoDb`.
pub fn format_mongodb_error(
    f: &mut fmt::Formatter<'_>,
    error: &mongodb::error::Error,
) -> fmt::Result {
    let info = extract_error_info(error);
    let wrapper = serde_json::json!({ "error": info });
    let json_output = serde_json::to_string_pretty(&wrapper).map_err(|_| fmt::Error)?;
    write!(f, "\n{json_output}")
}

/// Extract structured information from a driver error using its typed kinds.
pub fn extract_error_info(error: &mongodb::error::Error) -> ErrorInfo {
    use mongodb::error::{ErrorKind, WriteFailure};

    let mut info = ErrorInfo::default();

    match error.kind.as_ref() {
        ErrorKind::InsertMany(insert_error) => {
            // Bulk inserts of a batch surface here.
            info.error_type = Some("mongo.insert_many_error".to_string());

            if let Some(first_error) = insert_error
                .write_errors
                .as_ref()
                .and_then(|errors| errors.first())
            {
                info.code = Some(first_error.code);
                info.message = Some(first_error.message.clone());
                info.details = Some(extract_details(&first_error.details, &first_error.message));
            } else if let Some(wc_error) = &insert_error.write_concern_error {
                info.code = Some(wc_error.code);
                info.message = Some(wc_error.message.clone());
            }
        }
        ErrorKind::Write(write_failure) => {
            info.error_type = Some("mongo.write_error".to_string());

            match write_failure {
                WriteFailure::WriteError(write_error) => {
                    info.code = Some(write_error.code);
                    info.message = Some(write_error.message.clone());
                    info.details = Some(extract_details(&write_error.details, &write_error.message));
                }
                WriteFailure::WriteConcernError(wc_error) => {
                    info.code = Some(wc_error.code);
                    info.message = Some(wc_error.message.clone());
                }
                _ => {}
            }
        }
        ErrorKind::Command(command_error) => {
            info.error_type = Some("mongo.command_error".to_string());
            info.code = Some(command_error.code);
            info.message = Some(command_error.message.clone());
        }
        ErrorKind::Authentication { message, .. } => {
            info.error_type = Some("mongo.authentication_error".to_string());
            info.message = Some(message.clone());
        }
        ErrorKind::ServerSelection { message, .. } => {
            info.error_type = Some("mongo.server_selection_error".to_string());
            info.message = Some(message.clone());
        }
        ErrorKind::InvalidArgument { message, .. } => {
            info.error_type = Some("mongo.invalid_argument".to_string());
            info.message = Some(message.clone());
        }
        _ => {
            info.message = Some(error.to_string());
        }
    }

    info.name = info.code.and_then(error_name);
    if info.is_duplicate_key() {
        info.message = Some("Duplicate key error".to_string());
    }

    info
}

/// Human-readable name for the server codes a transfer commonly hits.
fn error_name(code: i32) -> Option<String> {
    let name = match code {
        11000 | 11001 => "DuplicateKey",
        13 => "Unauthorized",
        18 => "AuthenticationFailed",
        26 => "NamespaceNotFound",
        67 => "CannotCreateIndex",
        85 => "IndexOptionsConflict",
        86 => "IndexKeySpecsConflict",
        121 => "DocumentValidationFailure",
        _ => return None,
    };

    Some(name.to_string())
}

/// Pull namespace, index and key out of a write error.
///
/// The details document is preferred; the message is searched as a fallback
/// because duplicate-key errors only carry the index name in their text.
fn extract_details(error_details: &Option<Document>, message: &str) -> ErrorDetails {
    let mut details = ErrorDetails::default();

    if let Some(doc) = error_details {
        details.collection = string_field(doc, &["namespace", "ns"]);
        details.index = string_field(doc, &["index", "indexName"]);
        details.key = ["keyPattern", "keyValue"]
            .iter()
            .find_map(|field| match doc.get(*field) {
                Some(Bson::Document(key)) => Some(key.clone()),
                _ => None,
            });
    }

    if details.collection.is_none() {
        details.collection = word_after(message, "collection: ");
    }
    if details.index.is_none() {
        details.index = word_after(message, "index: ");
    }

    details
}

fn string_field(doc: &bson::Document, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match doc.get(*field) {
        Some(Bson::String(value)) => Some(value.clone()),
        _ => None,
    })
}

fn word_after(message: &str, marker: &str) -> Option<String> {
    let start = message.find(marker)? + marker.len();
    let rest = &message[start..];
    let end = rest.find(' ')?;
    Some(rest[..end].to_string())
}
