//! Lazily connected handle owning one driver client

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::Result;
use crate::config::ClientConfig;
use crate::driver::{Driver, DriverEvent, EventSink};
use crate::error::Error;
use crate::logging::Logger;
use crate::params::{ClientInit, ConnectionSpec};
use crate::status::{self, ConnectionStatus, StatusSnapshot};

/// Connection string used by a handle that was never configured
pub const DEFAULT_URI: &str = "mongodb://localhost:27017";

/// An open client together with its database
pub struct Connection<D: Driver> {
   pub client: Arc<D::Client>,
   pub database: Arc<D::Database>,
}

impl<D: Driver> Clone for Connection<D> {
   fn clone(&self) -> Self {
      Self {
         client: Arc::clone(&self.client),
         database: Arc::clone(&self.database),
      }
   }
}

impl<D: Driver> fmt::Debug for Connection<D> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("Connection")
         .field("client", &self.client)
         .field("database", &self.database)
         .finish()
   }
}

struct Settings {
   uri: String,
   database_name: String,
   config: ClientConfig,
}

/// A client created by the handle; `database` is set once the client is open
struct Live<D: Driver> {
   client: Arc<D::Client>,
   database: Option<Arc<D::Database>>,
   listener: JoinHandle<()>,
}

impl<D: Driver> Drop for Live<D> {
   fn drop(&mut self) {
      self.listener.abort();
   }
}

/// Handle for one logical database connection
///
/// The underlying client is created and opened on first use and reused
/// afterwards. Concurrent callers of [`connect`](Self::connect) wait for the
/// connect already in flight instead of starting another one, so at most one
/// client is opened per handle at a time.
///
/// Status is driven by the client's lifecycle events and can be read with
/// [`status`](Self::status) or followed with [`watch_status`](Self::watch_status).
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use mongo_conn_mgr::{ConnectionHandle, ConnectionStatus, Logger, MemoryDriver};
///
/// # async fn example() -> mongo_conn_mgr::Result<()> {
/// let handle = ConnectionHandle::new(Arc::new(MemoryDriver::new()), Logger::new());
/// handle.configure("mongodb://localhost:27017", "inventory", None);
///
/// let first = handle.connect().await?;
/// let second = handle.connect().await?;
/// assert!(Arc::ptr_eq(&first.client, &second.client));
/// assert_eq!(handle.status(), ConnectionStatus::Ready);
///
/// handle.disconnect().await;
/// assert_eq!(handle.status(), ConnectionStatus::Disconnected);
/// # Ok(())
/// # }
/// ```
pub struct ConnectionHandle<D: Driver> {
   driver: Arc<D>,
   logger: Logger,
   settings: RwLock<Settings>,
   /// Held for the whole of connect/disconnect; doubles as the in-flight guard
   live: Mutex<Option<Live<D>>>,
   /// The open pair, readable without waiting on `live`
   published: RwLock<Option<Connection<D>>>,
   state: Arc<watch::Sender<StatusSnapshot>>,
}

/// Puts back the prior status if a connect is dropped while still `Connecting`
struct Attempt<'a> {
   state: &'a watch::Sender<StatusSnapshot>,
   previous: ConnectionStatus,
}

impl Drop for Attempt<'_> {
   fn drop(&mut self) {
      let previous = self.previous;
      self.state.send_if_modified(|snapshot| {
         if snapshot.status != ConnectionStatus::Connecting {
            return false;
         }
         snapshot.status = previous;
         true
      });
   }
}

impl<D: Driver> ConnectionHandle<D> {
   /// Create an unconfigured handle
   ///
   /// Until [`configure`](Self::configure) is called the handle targets
   /// [`DEFAULT_URI`] with an empty database name and the default client
   /// configuration.
   pub fn new(driver: Arc<D>, logger: Logger) -> Self {
      let (state, _) = watch::channel(StatusSnapshot::new());
      Self {
         driver,
         logger,
         settings: RwLock::new(Settings {
            uri: DEFAULT_URI.to_string(),
            database_name: String::new(),
            config: ClientConfig::default(),
         }),
         live: Mutex::new(None),
         published: RwLock::new(None),
         state: Arc::new(state),
      }
   }

   /// Create a handle and apply one configuration call
   pub fn with_init(driver: Arc<D>, logger: Logger, init: ClientInit) -> Self {
      let handle = Self::new(driver, logger);
      handle.init(init);
      handle
   }

   /// Resolve the connection string, set the database name and client
   /// options, and apply the logging options
   ///
   /// `None` for `config` selects the default configuration. The new settings
   /// are used the next time a client is created; an open connection is left
   /// untouched.
   pub fn configure(
      &self,
      connection: impl Into<ConnectionSpec>,
      database: impl Into<String>,
      config: Option<ClientConfig>,
   ) {
      let connection = connection.into();

      let log = connection.log_options();
      self.logger.toggle_logging(log.logging.unwrap_or(true));
      self.logger.set_levels(log.log_levels.as_deref());

      let mut settings = self.settings.write();
      settings.uri = connection.resolve_uri();
      settings.database_name = database.into();
      settings.config = config.unwrap_or_default();

      debug!(database = %settings.database_name, "Configured connection handle");
   }

   /// Apply a bundled configuration call
   pub fn init(&self, init: ClientInit) {
      self.configure(init.connection, init.database, init.config);
   }

   /// Replace the client options; `None` restores the default configuration
   pub fn set_config(&self, config: Option<ClientConfig>) {
      self.settings.write().config = config.unwrap_or_default();
   }

   /// Open the connection, or return the one already open
   ///
   /// A caller arriving while another connect is in progress waits for it and
   /// receives the same client and database. On failure the status becomes
   /// [`ConnectionStatus::Error`] and the error is returned; a client that was
   /// created but failed to open is kept and reopened on the next call. The
   /// same holds when the returned future is dropped mid-connect.
   pub async fn connect(&self) -> Result<Connection<D>> {
      let mut live = self.live.lock().await;

      if let Some(current) = live.as_ref()
         && let Some(database) = &current.database
      {
         return Ok(Connection {
            client: Arc::clone(&current.client),
            database: Arc::clone(database),
         });
      }

      let (uri, database_name, config) = {
         let settings = self.settings.read();
         (
            settings.uri.clone(),
            settings.database_name.clone(),
            settings.config.clone(),
         )
      };

      let _attempt = Attempt {
         state: &self.state,
         previous: self.status(),
      };

      // The client stays in the slot across every await below
      let pending = live.as_ref().map(|pending| Arc::clone(&pending.client));
      let client = match pending {
         Some(client) => client,
         None => {
            let created = self.create_client(&uri, &config).await?;
            let client = Arc::clone(&created.client);
            *live = Some(created);
            client
         }
      };

      let opened = self.driver.connect(&client).await;
      if let Err(err) = opened {
         self.record_failure("Error connecting to MongoDB", &err);
         return Err(err);
      }

      let database = Arc::new(self.driver.database(&client, &database_name));
      if let Some(current) = live.as_mut() {
         current.database = Some(Arc::clone(&database));
      }
      let connection = Connection { client, database };
      *self.published.write() = Some(connection.clone());

      self.state.send_modify(|snapshot| snapshot.status = ConnectionStatus::Ready);
      self
         .logger
         .log(format!("Connected to MongoDB database '{database_name}'"));

      Ok(connection)
   }

   /// The database, connecting first if needed
   pub async fn database(&self) -> Result<Arc<D::Database>> {
      Ok(self.connect().await?.database)
   }

   /// A collection of the database, connecting first if needed
   pub async fn collection(&self, name: &str) -> Result<D::Collection> {
      let database = self.database().await?;
      Ok(self.driver.collection(&database, name))
   }

   /// The cached database without any I/O
   ///
   /// `None` until a connect succeeds and again after a successful
   /// disconnect. Never waits on a connect in flight.
   pub fn cached_database(&self) -> Option<Arc<D::Database>> {
      self
         .published
         .read()
         .as_ref()
         .map(|connection| Arc::clone(&connection.database))
   }

   /// Whether an open client and database are cached
   pub fn is_connected(&self) -> bool {
      self.published.read().is_some()
   }

   /// Whether the handle currently owns a client, open or not
   pub async fn has_client(&self) -> bool {
      self.live.lock().await.is_some()
   }

   /// Close the client and release it
   ///
   /// Without a client this only logs a warning. When closing fails the
   /// failure is recorded in the status and the client is kept.
   pub async fn disconnect(&self) {
      let mut live = self.live.lock().await;

      if live.is_none() {
         self.logger.warn("No MongoDB client to disconnect");
         return;
      }
      self.close_live(&mut live).await;
   }

   /// Disconnect only when a client is owned, checked under the same lock
   pub(crate) async fn disconnect_if_connected(&self) {
      let mut live = self.live.lock().await;
      if live.is_some() {
         self.close_live(&mut live).await;
      }
   }

   async fn close_live(&self, live: &mut Option<Live<D>>) {
      let Some(current) = live.as_ref() else {
         return;
      };

      let closed = self.driver.close(&current.client).await;
      match closed {
         Ok(()) => {
            *live = None;
            *self.published.write() = None;
            self.state.send_modify(|snapshot| {
               snapshot.epoch += 1;
               snapshot.status = ConnectionStatus::Disconnected;
            });
            self.logger.log("Disconnected from MongoDB");
         }
         Err(err) => self.record_failure("Error disconnecting from MongoDB", &err),
      }
   }

   /// Current connection status
   pub fn status(&self) -> ConnectionStatus {
      self.state.borrow().status
   }

   /// Most recent recorded failure, kept across later transitions
   pub fn last_error(&self) -> Option<Error> {
      self.state.borrow().last_error.clone()
   }

   /// Status and last error read together
   pub fn snapshot(&self) -> StatusSnapshot {
      self.state.borrow().clone()
   }

   /// Follow status changes
   pub fn watch_status(&self) -> watch::Receiver<StatusSnapshot> {
      self.state.subscribe()
   }

   /// The resolved connection string
   pub fn uri(&self) -> String {
      self.settings.read().uri.clone()
   }

   /// Name of the database opened on connect
   pub fn database_name(&self) -> String {
      self.settings.read().database_name.clone()
   }

   /// Client options used for the next client
   pub fn config(&self) -> ClientConfig {
      self.settings.read().config.clone()
   }

   /// Logger this handle reports through
   pub fn logger(&self) -> &Logger {
      &self.logger
   }

   async fn create_client(&self, uri: &str, config: &ClientConfig) -> Result<Live<D>> {
      let mut epoch = 0;
      self.state.send_modify(|snapshot| {
         snapshot.epoch += 1;
         snapshot.status = ConnectionStatus::Connecting;
         epoch = snapshot.epoch;
      });

      let (sink, events) = EventSink::channel();
      let client = match self.driver.create_client(uri, config, sink).await {
         Ok(client) => Arc::new(client),
         Err(err) => {
            self.record_failure("Error creating MongoDB client", &err);
            return Err(err);
         }
      };

      let listener = tokio::spawn(listen(
         events,
         Arc::clone(&self.state),
         epoch,
         self.logger.clone(),
      ));

      Ok(Live {
         client,
         database: None,
         listener,
      })
   }

   fn record_failure(&self, context: &str, err: &Error) {
      self.state.send_modify(|snapshot| {
         snapshot.status = ConnectionStatus::Error;
         snapshot.last_error = Some(err.clone());
      });
      self.logger.error(format!("{context}: {err}"));
   }
}

impl<D: Driver> fmt::Debug for ConnectionHandle<D> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("ConnectionHandle")
         .field("database_name", &self.settings.read().database_name)
         .field("status", &self.status())
         .finish_non_exhaustive()
   }
}

/// Feed one client's events through the transition function until the
/// client goes away
async fn listen(
   mut events: mpsc::UnboundedReceiver<DriverEvent>,
   state: Arc<watch::Sender<StatusSnapshot>>,
   epoch: u64,
   logger: Logger,
) {
   while let Some(event) = events.recv().await {
      let mut note = None;
      state.send_if_modified(|snapshot| {
         if snapshot.epoch != epoch {
            return false;
         }
         note = Some(status::apply(snapshot, &event));
         true
      });

      match note {
         Some(note) => logger.emit(note.level, note.message),
         None => debug!(?event, "Ignoring event from a released client"),
      }
   }
}
