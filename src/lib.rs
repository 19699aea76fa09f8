//! mongoport library
//!
//! Copies MongoDB databases between live clusters and directories of
//! line-delimited extended JSON, keeping every BSON type and the secondary
//! indexes of each collection.
//!
//! # Modules
//!
//! - `catalog`: Database and collection inventory
//! - `cli`: Command-line interface and argument parsing
//! - `codec`: Record files and index sidecars
//! - `config`: Configuration management
//! - `connection`: MongoDB connection management
//! - `error`: Error types and handling
//! - `index`: Index descriptor normalization
//! - `transfer`: Streaming transfer engine, sources, sinks and progress
//! - `utils`: Utility functions and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use mongoport::{config::Config, connection::ConnectionManager, transfer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let mut manager = ConnectionManager::new(
//!         "mongodb://localhost:27017".to_string(),
//!         config.connection,
//!     );
//!     manager.connect().await?;
//!
//!     let mut progress = |name: &str, position: usize, total: usize| {
//!         println!("[{position}/{total}] {name}");
//!     };
//!     let result =
//!         transfer::export_database(&manager, "shop", Path::new("./shop"), &mut progress).await?;
//!     println!("{} documents exported", result.documents);
//!
//!     manager.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod cli;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod index;
pub mod transfer;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use connection::ConnectionManager;
pub use error::{MongoportError, Result};
pub use transfer::{TransferResult, transfer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
