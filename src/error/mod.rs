//! Error handling for mongoport.
//!
//! - [`MongoportError`]: the crate-wide error, with a [`Result`] alias
//! - [`TransferFailure`]: a failed transfer step with collection context
//! - [`mongo`]: structured information extracted from MongoDB driver errors
//!
//! # Example
//!
//! ```rust,no_run
//! use mongoport::error::mongo::extract_error_info;
//!
//! fn log_driver_error(err: &mongodb::error::Error) {
//!     let info = extract_error_info(err);
//!     eprintln!("{}", info.to_json().unwrap_or_default());
//! }
//! ```

pub mod kinds;
pub mod mongo;

pub use kinds::{
    CodecError, ConfigError, ConnectionError, MongoportError, Result, TransferFailure,
    TransferStep,
};
pub use mongo::{ErrorDetails, ErrorInfo};
