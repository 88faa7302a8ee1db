//! Connection parameters accepted when configuring a handle

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::config::ClientConfig;
use crate::logging::LogLevel;
use crate::uri::{FullParameters, build_connection_string};

/// Logging switches carried by the object forms of [`ConnectionSpec`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogOptions {
   /// Enable or disable logging. Enabled when absent.
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub logging: Option<bool>,

   /// Levels that are emitted. All levels when absent.
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub log_levels: Option<Vec<LogLevel>>,
}

/// A ready-made connection string plus logging options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseParameters {
   pub uri: String,
   #[serde(flatten)]
   pub log: LogOptions,
}

/// How a handle learns where to connect
///
/// Deserializes from a bare string, an object with a `uri` field, or an
/// object with the structured fields of [`FullParameters`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConnectionSpec {
   Uri(String),
   Sparse(SparseParameters),
   Full(FullParameters),
}

impl ConnectionSpec {
   /// Connection string this specification resolves to
   pub fn resolve_uri(&self) -> String {
      match self {
         ConnectionSpec::Uri(uri) => uri.clone(),
         ConnectionSpec::Sparse(sparse) => sparse.uri.clone(),
         ConnectionSpec::Full(full) => build_connection_string(full),
      }
   }

   /// Logging options; a bare string carries none
   pub fn log_options(&self) -> LogOptions {
      match self {
         ConnectionSpec::Uri(_) => LogOptions::default(),
         ConnectionSpec::Sparse(sparse) => sparse.log.clone(),
         ConnectionSpec::Full(full) => full.log.clone(),
      }
   }
}

impl From<&str> for ConnectionSpec {
   fn from(uri: &str) -> Self {
      ConnectionSpec::Uri(uri.to_string())
   }
}

impl From<String> for ConnectionSpec {
   fn from(uri: String) -> Self {
      ConnectionSpec::Uri(uri)
   }
}

impl From<SparseParameters> for ConnectionSpec {
   fn from(sparse: SparseParameters) -> Self {
      ConnectionSpec::Sparse(sparse)
   }
}

impl From<FullParameters> for ConnectionSpec {
   fn from(full: FullParameters) -> Self {
      ConnectionSpec::Full(full)
   }
}

/// Everything one configuration call needs
///
/// # Examples
///
/// ```
/// use mongo_conn_mgr::ClientInit;
///
/// let init = ClientInit::from_json(
///    r#"{ "connection": { "uri": "mongodb://db:27017", "logging": false }, "database": "orders" }"#,
/// )
/// .unwrap();
/// assert_eq!(init.connection.resolve_uri(), "mongodb://db:27017");
/// assert!(init.config.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInit {
   pub connection: ConnectionSpec,
   pub database: String,
   /// Driver options; the default configuration is used when absent
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub config: Option<ClientConfig>,
}

impl ClientInit {
   pub fn new(connection: impl Into<ConnectionSpec>, database: impl Into<String>) -> Self {
      Self {
         connection: connection.into(),
         database: database.into(),
         config: None,
      }
   }

   /// Attach driver options
   pub fn with_config(mut self, config: ClientConfig) -> Self {
      self.config = Some(config);
      self
   }

   /// Parse a configuration call from JSON
   pub fn from_json(json: &str) -> Result<Self> {
      Ok(serde_json::from_str(json)?)
   }
}
