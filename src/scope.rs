//! Accessors bound to one registry entry

use std::sync::Arc;

use crate::Result;
use crate::driver::Driver;
use crate::handle::{Connection, ConnectionHandle};

/// A resolved client with its accessors, as returned by
/// [`ClientRegistry::use_client`](crate::ClientRegistry::use_client)
pub struct ClientScope<D: Driver> {
   id: String,
   handle: Arc<ConnectionHandle<D>>,
}

impl<D: Driver> ClientScope<D> {
   pub(crate) fn new(id: &str, handle: Arc<ConnectionHandle<D>>) -> Self {
      Self {
         id: id.to_string(),
         handle,
      }
   }

   pub fn id(&self) -> &str {
      &self.id
   }

   pub fn handle(&self) -> &Arc<ConnectionHandle<D>> {
      &self.handle
   }

   pub fn into_handle(self) -> Arc<ConnectionHandle<D>> {
      self.handle
   }

   pub async fn connect(&self) -> Result<Connection<D>> {
      self.handle.connect().await
   }

   pub async fn database(&self) -> Result<Arc<D::Database>> {
      self.handle.database().await
   }

   pub async fn collection(&self, name: &str) -> Result<D::Collection> {
      self.handle.collection(name).await
   }

   pub async fn disconnect(&self) {
      self.handle.disconnect().await
   }
}

impl<D: Driver> Clone for ClientScope<D> {
   fn clone(&self) -> Self {
      Self {
         id: self.id.clone(),
         handle: Arc::clone(&self.handle),
      }
   }
}
