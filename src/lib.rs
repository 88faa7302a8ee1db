//! # mongo-conn-mgr
//!
//! Lazily established, idempotent MongoDB connection handles, plus a registry
//! of independently configured named clients within one process.
//!
//! ## Core Types
//!
//! - **[`ConnectionHandle`]**: Owns one driver client; connects on first use and
//!   tracks the connection status reported by the driver
//! - **[`ClientRegistry`]**: Maps identifiers to handles, creating them on first use
//! - **[`ClientScope`]**: Accessors bound to one registry entry
//! - **[`ConnectionSpec`]**: Where to connect: a URI, a URI with logging options,
//!   or structured parts built with [`build_connection_string`]
//! - **[`ClientConfig`]**: Options handed to the driver when a client is created
//! - **[`Driver`]**: The seam to a concrete driver; [`MemoryDriver`] runs in
//!   process and `MongoDriver` (feature `mongodb`) wraps the official client
//! - **[`Error`]**: Error type for connection operations
//!
//! ## Architecture
//!
//! - **Lazy connect**: Nothing is opened until a connection, database or
//!   collection is first requested
//! - **Single flight**: Concurrent callers share one in-flight connect, so a
//!   handle opens at most one client at a time
//! - **Event-driven status**: Driver lifecycle events flow through a channel
//!   into a single transition function per handle
//! - **First registration wins**: A registered identifier is never replaced;
//!   conflicting registrations only log a warning
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use mongo_conn_mgr::{ClientInit, ClientRegistry, ConnectionStatus, MemoryDriver};
//!
//! #[tokio::main]
//! async fn main() -> mongo_conn_mgr::Result<()> {
//!     let registry = ClientRegistry::new(MemoryDriver::new());
//!
//!     // First use creates and configures the client
//!     let orders = registry.use_client(
//!         "orders",
//!         Some(ClientInit::new("mongodb://localhost:27017", "orders")),
//!     );
//!     let invoices = orders.collection("invoices").await?;
//!     assert_eq!(invoices.name, "invoices");
//!
//!     // Later uses resolve the same handle
//!     let again = registry.use_client("orders", None);
//!     assert!(Arc::ptr_eq(orders.handle(), again.handle()));
//!     assert_eq!(again.handle().status(), ConnectionStatus::Ready);
//!
//!     registry.disconnect_all().await;
//!     Ok(())
//! }
//! ```
//!
mod config;
mod driver;
mod error;
mod handle;
mod logging;
mod memory;
#[cfg(feature = "mongodb")]
mod mongo;
mod params;
mod registry;
mod scope;
mod status;
mod uri;

// Re-export public types
pub use config::{ClientConfig, ServerApiConfig, ServerApiVersion};
pub use driver::{Driver, DriverEvent, EventSink};
pub use error::{BoxError, Error};
pub use handle::{Connection, ConnectionHandle, DEFAULT_URI};
pub use logging::{LOG_HISTORY_CAPACITY, LogLevel, LogRecord, Logger};
pub use memory::{MemoryClient, MemoryCollection, MemoryDatabase, MemoryDriver};
#[cfg(feature = "mongodb")]
pub use mongo::MongoDriver;
pub use params::{ClientInit, ConnectionSpec, LogOptions, SparseParameters};
pub use registry::{ClientRegistry, DEFAULT_CLIENT_ID};
pub use scope::ClientScope;
pub use status::{ConnectionStatus, StatusSnapshot};
pub use uri::{FullParameters, build_connection_string};

/// A type alias for Results with our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
