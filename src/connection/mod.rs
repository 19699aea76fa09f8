//! Connection management for MongoDB
//!
//! [`ConnectionManager`] owns the lifecycle of one client handle to one
//! cluster. Every data operation goes through it and fails with
//! `ConnectionError::NotConnected` while no handle is held.

use async_trait::async_trait;
use mongodb::bson::{Document, doc};
use mongodb::error::ErrorKind;
use mongodb::{Client, Database, options::ClientOptions};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::catalog::{self, CollectionInfo, DatabaseInfo, DatabaseStats, Inventory};
use crate::config::ConnectionConfig;
use crate::error::{ConnectionError, Result};
use crate::utils::uri::sanitize_uri;

/// MongoDB connection manager
pub struct ConnectionManager {
    /// MongoDB client instance, present only while connected
    client: Option<Client>,

    /// Connection configuration
    config: ConnectionConfig,

    /// Current connection state
    state: Arc<RwLock<ConnectionState>>,

    /// Connection URI
    uri: String,
}

/// Connection state information
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,

    /// Currently connecting
    Connecting,

    /// Connected and ready
    Connected,

    /// Last connection attempt failed; no handle is held
    Failed(String),
}

impl ConnectionManager {
    /// Create a new, disconnected connection manager
    ///
    /// # Arguments
    /// * `uri` - MongoDB connection URI
    /// * `config` - Connection configuration
    pub fn new(uri: String, config: ConnectionConfig) -> Self {
        Self {
            client: None,
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            uri,
        }
    }

    /// Connect to the URI this manager was created with
    ///
    /// Server selection is bounded by `server_selection_timeout`; reachability
    /// is verified with a `ping`. On failure no handle is kept.
    pub async fn connect(&mut self) -> Result<()> {
        let uri = self.uri.clone();
        self.connect_to(&uri).await
    }

    /// Connect to `uri`, replacing the URI this manager targets
    pub async fn connect_to(&mut self, uri: &str) -> Result<()> {
        if uri.trim().is_empty() {
            return Err(ConnectionError::InvalidUri("connection string is empty".into()).into());
        }

        if self.client.is_some() {
            self.disconnect().await?;
        }

        self.uri = uri.to_string();
        self.set_state(ConnectionState::Connecting).await;
        info!("Connecting to {}", sanitize_uri(uri));

        match self.open_client(uri).await {
            Ok(client) => {
                self.client = Some(client);
                self.set_state(ConnectionState::Connected).await;
                info!("Connected to {}", sanitize_uri(uri));
                Ok(())
            }
            Err(err) => {
                warn!("Connection to {} failed: {}", sanitize_uri(uri), err);
                self.set_state(ConnectionState::Failed(err.to_string())).await;
                Err(err.into())
            }
        }
    }

    /// Disconnect from MongoDB
    ///
    /// Idempotent; succeeds locally even when the server is already gone.
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            client.shutdown().await;
            debug!("Closed client for {}", sanitize_uri(&self.uri));
        }
        self.set_state(ConnectionState::Disconnected).await;
        Ok(())
    }

    /// Get a database handle
    pub fn get_database(&self, name: &str) -> Result<Database> {
        Ok(self.get_client()?.database(name))
    }

    /// Get the MongoDB client
    pub fn get_client(&self) -> Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| ConnectionError::NotConnected.into())
    }

    /// Get current connection state
    pub async fn get_state(&self) -> ConnectionState {
        self.state.read().await.clone()
    }

    /// Check if currently connected
    pub async fn is_connected(&self) -> bool {
        matches!(*self.state.read().await, ConnectionState::Connected)
    }

    /// Connection URI with credentials hidden
    pub fn display_uri(&self) -> String {
        sanitize_uri(&self.uri)
    }

    /// Non-system databases with their size on disk
    pub async fn list_databases(&self) -> Result<Vec<DatabaseInfo>> {
        catalog::list_databases(self).await
    }

    /// Collections of `db` with their document counts
    pub async fn list_collections(&self, db: &str) -> Result<Vec<CollectionInfo>> {
        catalog::list_collections(self, db).await
    }

    /// Collection count and total document count of `db`
    pub async fn get_stats(&self, db: &str) -> Result<DatabaseStats> {
        catalog::get_stats(self, db).await
    }

    /// Drop a database
    pub async fn drop_database(&self, db: &str) -> Result<()> {
        info!("Dropping database '{}'", db);
        self.get_database(db)?.drop().await?;
        Ok(())
    }

    /// Server version reported by `buildInfo`
    pub async fn get_server_version(&self) -> Result<String> {
        let info = self
            .get_database("admin")?
            .run_command(doc! { "buildInfo": 1 })
            .await?;
        Ok(info.get_str("version").unwrap_or("unknown").to_string())
    }

    /// Update connection state
    async fn set_state(&self, new_state: ConnectionState) {
        *self.state.write().await = new_state;
    }

    /// Build a client for `uri` and verify it answers a ping
    async fn open_client(&self, uri: &str) -> std::result::Result<Client, ConnectionError> {
        let options = Self::parse_uri(uri).await?;
        let options = self.configure(options);

        let client = Client::with_options(options)
            .map_err(|e| ConnectionError::ConnectionFailed(e.to_string()))?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| match e.kind.as_ref() {
                ErrorKind::ServerSelection { .. } => ConnectionError::Timeout,
                _ => ConnectionError::ConnectionFailed(e.to_string()),
            })?;

        Ok(client)
    }

    /// Parse connection URI into client options
    async fn parse_uri(uri: &str) -> std::result::Result<ClientOptions, ConnectionError> {
        ClientOptions::parse(uri)
            .await
            .map_err(|e| ConnectionError::InvalidUri(format!("{}: {e}", sanitize_uri(uri))))
    }

    /// Apply server selection timeout and app name
    fn configure(&self, mut options: ClientOptions) -> ClientOptions {
        options.server_selection_timeout = Some(self.config.server_selection_timeout());
        if options.app_name.is_none() {
            options.app_name = Some(self.config.app_name.clone());
        }
        options
    }
}

#[async_trait]
impl Inventory for ConnectionManager {
    async fn database_specs(&self) -> Result<Vec<DatabaseInfo>> {
        let specs = self.get_client()?.list_databases().await?;
        Ok(specs
            .into_iter()
            .map(|spec| DatabaseInfo {
                name: spec.name,
                size_on_disk: spec.size_on_disk,
            })
            .collect())
    }

    async fn collection_names(&self, db: &str) -> Result<Vec<String>> {
        catalog::stored_collection_names(&self.get_database(db)?).await
    }

    async fn count_documents(&self, db: &str, collection: &str) -> Result<u64> {
        let count = self
            .get_database(db)?
            .collection::<Document>(collection)
            .count_documents(doc! {})
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MongoportError;

    fn manager(uri: &str) -> ConnectionManager {
        ConnectionManager::new(uri.to_string(), ConnectionConfig::default())
    }

    #[tokio::test]
    async fn test_new_manager_is_disconnected() {
        let manager = manager("mongodb://localhost:27017");
        assert_eq!(manager.get_state().await, ConnectionState::Disconnected);
        assert!(!manager.is_connected().await);
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let manager = manager("mongodb://localhost:27017");

        assert!(manager.get_client().unwrap_err().is_not_connected());
        assert!(manager.get_database("shop").unwrap_err().is_not_connected());
        assert!(manager.list_databases().await.unwrap_err().is_not_connected());
        assert!(manager.get_stats("shop").await.unwrap_err().is_not_connected());
        assert!(manager.drop_database("shop").await.unwrap_err().is_not_connected());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let mut manager = manager("mongodb://localhost:27017");
        tokio_test::assert_ok!(manager.disconnect().await);
        tokio_test::assert_ok!(manager.disconnect().await);
        assert_eq!(manager.get_state().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_empty_uri_is_rejected() {
        let mut manager = manager("   ");
        let err = manager.connect().await.unwrap_err();
        assert!(matches!(
            err,
            MongoportError::Connection(ConnectionError::InvalidUri(_))
        ));
        assert!(!manager.is_connected().await);
    }

    #[tokio::test]
    async fn test_malformed_uri_leaves_manager_failed() {
        let mut manager = manager("not-a-mongodb-uri");
        let err = manager.connect().await.unwrap_err();
        assert!(matches!(
            err,
            MongoportError::Connection(ConnectionError::InvalidUri(_))
        ));
        assert!(matches!(manager.get_state().await, ConnectionState::Failed(_)));
        assert!(manager.get_client().is_err());
    }

    #[test]
    fn test_display_uri_hides_credentials() {
        let manager = manager("mongodb://admin:hunter2@db:27017");
        assert_eq!(manager.display_uri(), "mongodb://***@db:27017");
    }
}
