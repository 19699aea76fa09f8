//! Read-only inventory of a cluster
//!
//! The catalog turns an [`Inventory`] (normally a connected
//! [`ConnectionManager`](crate::connection::ConnectionManager)) into database and
//! collection metadata. System databases are never listed.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::Database;
use mongodb::results::{CollectionSpecification, CollectionType};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;

/// Databases reserved by the server; never listed nor transferred.
pub const SYSTEM_DATABASES: &[&str] = &["admin", "config", "local"];

/// One database as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseInfo {
    pub name: String,
    pub size_on_disk: u64,
}

/// One collection with its document count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub document_count: u64,
}

/// Aggregate statistics of one database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseStats {
    pub database: String,
    pub collections: Vec<CollectionInfo>,
    pub total_documents: u64,
}

impl DatabaseStats {
    pub fn collection_count(&self) -> usize {
        self.collections.len()
    }
}

/// Primitive inventory queries a backend must answer
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Every database on the cluster, including system ones, in server order
    async fn database_specs(&self) -> Result<Vec<DatabaseInfo>>;

    /// Names of the collections of `db` that hold documents, in server order
    async fn collection_names(&self, db: &str) -> Result<Vec<String>>;

    /// Exact document count of one collection
    async fn count_documents(&self, db: &str, collection: &str) -> Result<u64>;
}

pub fn is_system_database(name: &str) -> bool {
    SYSTEM_DATABASES.contains(&name)
}

/// Non-system databases in server order
pub async fn list_databases<I: Inventory + ?Sized>(inventory: &I) -> Result<Vec<DatabaseInfo>> {
    let databases: Vec<DatabaseInfo> = inventory
        .database_specs()
        .await?
        .into_iter()
        .filter(|db| !is_system_database(&db.name))
        .collect();

    debug!("Found {} user databases", databases.len());
    Ok(databases)
}

/// User collection names of `db`, sorted by name
///
/// `system.*` collections are server-managed and skipped.
pub async fn collection_names<I: Inventory + ?Sized>(
    inventory: &I,
    db: &str,
) -> Result<Vec<String>> {
    Ok(user_collections(inventory.collection_names(db).await?))
}

/// Names of the collections of `db` that hold documents, in server order
///
/// Views are left out: they have no storage or indexes of their own, and
/// their output is reproduced by copying the collections they read from.
pub async fn stored_collection_names(db: &Database) -> Result<Vec<String>> {
    let specs: Vec<CollectionSpecification> = db.list_collections().await?.try_collect().await?;
    Ok(stored_collections(specs))
}

/// Keep the names of plain collections
pub fn stored_collections<I>(specs: I) -> Vec<String>
where
    I: IntoIterator<Item = CollectionSpecification>,
{
    specs
        .into_iter()
        .filter_map(|spec| {
            if spec.collection_type == CollectionType::Collection {
                Some(spec.name)
            } else {
                debug!("Skipping {:?} '{}'", spec.collection_type, spec.name);
                None
            }
        })
        .collect()
}

/// Drop `system.*` names and sort the rest
pub fn user_collections(names: Vec<String>) -> Vec<String> {
    let mut names: Vec<String> = names
        .into_iter()
        .filter(|name| !name.starts_with("system."))
        .collect();
    names.sort();
    names
}

/// Collections of `db` with their document counts, sorted by name
///
/// Counts are fetched one collection at a time.
pub async fn list_collections<I: Inventory + ?Sized>(
    inventory: &I,
    db: &str,
) -> Result<Vec<CollectionInfo>> {
    let names = collection_names(inventory, db).await?;
    let mut collections = Vec::with_capacity(names.len());

    for name in names {
        let document_count = inventory.count_documents(db, &name).await?;
        collections.push(CollectionInfo {
            name,
            document_count,
        });
    }

    Ok(collections)
}

/// Collection list and total document count of `db`
pub async fn get_stats<I: Inventory + ?Sized>(inventory: &I, db: &str) -> Result<DatabaseStats> {
    let collections = list_collections(inventory, db).await?;
    let total_documents = collections.iter().map(|c| c.document_count).sum();

    debug!(
        "Database '{}': {} collections, {} documents",
        db,
        collections.len(),
        total_documents
    );

    Ok(DatabaseStats {
        database: db.to_string(),
        collections,
        total_documents,
    })
}
