//! Error types for mongo-conn-mgr

use std::sync::Arc;

use thiserror::Error;

/// Boxed error accepted from driver implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that may occur when working with mongo-conn-mgr
///
/// Sources are reference counted so the same failure can be returned to the
/// caller and recorded as the handle's last error.
#[derive(Error, Debug, Clone)]
pub enum Error {
   /// Failure raised by the underlying database driver while creating,
   /// opening or closing a client
   #[error("Driver error: {0}")]
   Driver(#[source] Arc<dyn std::error::Error + Send + Sync>),

   /// Connection or client configuration could not be parsed
   #[error("Invalid configuration: {0}")]
   InvalidConfig(String),
}

impl Error {
   /// Wrap any driver error (or plain message) as [`Error::Driver`]
   pub fn driver(err: impl Into<BoxError>) -> Self {
      Error::Driver(Arc::from(err.into()))
   }
}

impl From<serde_json::Error> for Error {
   fn from(err: serde_json::Error) -> Self {
      Error::InvalidConfig(err.to_string())
   }
}
