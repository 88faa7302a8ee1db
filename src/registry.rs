//! Registry of named connection handles

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use indexmap::map::Entry;
use parking_lot::RwLock;
use tracing::debug;

use crate::driver::Driver;
use crate::handle::ConnectionHandle;
use crate::logging::Logger;
use crate::params::ClientInit;
use crate::scope::ClientScope;

/// Identifier of the registry's default client
pub const DEFAULT_CLIENT_ID: &str = "";

/// Maps client identifiers to independently configured handles
///
/// A handle registered under an identifier stays there for the lifetime of
/// the registry: later attempts to register or configure the same identifier
/// log a warning and return the original handle. Registries are independent
/// of each other, so tests can build isolated ones.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use mongo_conn_mgr::{ClientInit, ClientRegistry, MemoryDriver};
///
/// let registry = ClientRegistry::new(MemoryDriver::new());
/// let orders = registry.get_or_create("orders", Some(ClientInit::new("mongodb://a:27017", "orders")));
/// let again = registry.get_or_create("orders", None);
/// assert!(Arc::ptr_eq(&orders, &again));
/// ```
pub struct ClientRegistry<D: Driver> {
   driver: Arc<D>,
   logger: Logger,
   clients: RwLock<IndexMap<String, Arc<ConnectionHandle<D>>>>,
}

impl<D: Driver> ClientRegistry<D> {
   /// Registry with its own logger
   pub fn new(driver: D) -> Self {
      Self::with_logger(driver, Logger::new())
   }

   /// Registry whose handles all log through `logger`
   pub fn with_logger(driver: D, logger: Logger) -> Self {
      Self {
         driver: Arc::new(driver),
         logger,
         clients: RwLock::new(IndexMap::new()),
      }
   }

   pub fn driver(&self) -> &Arc<D> {
      &self.driver
   }

   pub fn logger(&self) -> &Logger {
      &self.logger
   }

   /// Build a handle sharing this registry's driver and logger without
   /// registering it
   pub fn create_handle(&self, init: Option<ClientInit>) -> ConnectionHandle<D> {
      let driver = Arc::clone(&self.driver);
      let logger = self.logger.clone();
      match init {
         Some(init) => ConnectionHandle::with_init(driver, logger, init),
         None => ConnectionHandle::new(driver, logger),
      }
   }

   /// Register `handle` under `id` unless the identifier is taken
   ///
   /// Returns the handle registered under `id` afterwards, which is the
   /// original one when the identifier was already taken.
   pub fn add(
      &self,
      id: impl Into<String>,
      handle: Arc<ConnectionHandle<D>>,
   ) -> Arc<ConnectionHandle<D>> {
      let mut clients = self.clients.write();
      match clients.entry(id.into()) {
         Entry::Occupied(existing) => {
            self
               .logger
               .warn(format!("A client with ID '{}' already exists.", existing.key()));
            Arc::clone(existing.get())
         }
         Entry::Vacant(slot) => {
            debug!(client_id = %slot.key(), "Registered client");
            Arc::clone(slot.insert(handle))
         }
      }
   }

   pub fn get(&self, id: &str) -> Option<Arc<ConnectionHandle<D>>> {
      self.clients.read().get(id).cloned()
   }

   /// The handle registered under `id`, creating and registering one first
   /// if there is none
   ///
   /// When `id` is already registered, `init` is not applied; passing one
   /// logs a warning because the first configuration wins.
   pub fn get_or_create(&self, id: &str, init: Option<ClientInit>) -> Arc<ConnectionHandle<D>> {
      let mut clients = self.clients.write();

      if let Some(existing) = clients.get(id) {
         if init.is_some() {
            self.logger.warn(format!(
               "A client with ID '{id}' already exists; keeping its original configuration."
            ));
         }
         return Arc::clone(existing);
      }

      let handle = Arc::new(self.create_handle(init));
      clients.insert(id.to_string(), Arc::clone(&handle));
      debug!(client_id = %id, "Created client");
      handle
   }

   /// The client registered under [`DEFAULT_CLIENT_ID`]
   pub fn default_client(&self) -> Arc<ConnectionHandle<D>> {
      self.get_or_create(DEFAULT_CLIENT_ID, None)
   }

   /// Resolve (or create) a client and bind accessors to it
   pub fn use_client(&self, id: &str, init: Option<ClientInit>) -> ClientScope<D> {
      ClientScope::new(id, self.get_or_create(id, init))
   }

   pub fn contains(&self, id: &str) -> bool {
      self.clients.read().contains_key(id)
   }

   /// Registered identifiers in registration order
   pub fn ids(&self) -> Vec<String> {
      self.clients.read().keys().cloned().collect()
   }

   pub fn len(&self) -> usize {
      self.clients.read().len()
   }

   pub fn is_empty(&self) -> bool {
      self.clients.read().is_empty()
   }

   /// Disconnect every handle that owns a client
   ///
   /// Handles stay registered and can connect again.
   pub async fn disconnect_all(&self) {
      let handles: Vec<_> = self.clients.read().values().cloned().collect();
      for handle in handles {
         handle.disconnect_if_connected().await;
      }
   }
}

impl<D: Driver> fmt::Debug for ClientRegistry<D> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("ClientRegistry")
         .field("ids", &self.ids())
         .finish_non_exhaustive()
   }
}
