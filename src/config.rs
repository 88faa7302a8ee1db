//! Driver options applied when a handle creates its client

use serde::{Deserialize, Serialize};

/// Stable API version requested from the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerApiVersion {
   #[serde(rename = "1")]
   V1,
}

/// Stable API declaration sent with every command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerApiConfig {
   pub version: ServerApiVersion,
   pub strict: bool,
   pub deprecation_errors: bool,
}

/// Options handed to the driver when a client is created
///
/// Every field is optional in serialized form; missing fields take their
/// default.
///
/// # Examples
///
/// ```
/// use mongo_conn_mgr::ClientConfig;
///
/// // Use defaults (stable API v1, strict, deprecation errors)
/// let config = ClientConfig::default();
/// assert!(config.server_api.is_some());
///
/// // Override just one field
/// let config = ClientConfig {
///    app_name: Some("billing".into()),
///    ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
   /// Stable API declaration
   ///
   /// Default: version 1, strict, deprecation errors enabled
   pub server_api: Option<ServerApiConfig>,

   /// Application name reported to the server
   pub app_name: Option<String>,

   /// Timeout for establishing a single connection (in seconds)
   pub connect_timeout_secs: Option<u64>,

   /// Timeout for selecting a suitable server (in seconds)
   pub server_selection_timeout_secs: Option<u64>,

   pub max_pool_size: Option<u32>,

   pub min_pool_size: Option<u32>,
}

impl Default for ClientConfig {
   fn default() -> Self {
      Self {
         server_api: Some(ServerApiConfig {
            version: ServerApiVersion::V1,
            strict: true,
            deprecation_errors: true,
         }),
         app_name: None,
         connect_timeout_secs: None,
         server_selection_timeout_secs: None,
         max_pool_size: None,
         min_pool_size: None,
      }
   }
}
