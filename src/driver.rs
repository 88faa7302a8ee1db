//! The seam between connection handles and a concrete database driver

use std::fmt;
use std::future::Future;

use tokio::sync::mpsc;

use crate::Result;
use crate::config::ClientConfig;
use crate::error::Error;

/// Lifecycle notification pushed by a driver client
#[derive(Debug, Clone)]
pub enum DriverEvent {
   ConnectionReady,
   Close,
   Error(Error),
   Reconnect,
   ReconnectFailed,
   Timeout,
   HeartbeatFailed(Error),
   HeartbeatSucceeded,
   ServerClosed,
   ServerOpening,
}

/// Sending half of a client's lifecycle event stream
///
/// Handed to the driver when a client is created. Events emitted after the
/// owning handle let go of the client are discarded.
#[derive(Clone)]
pub struct EventSink {
   tx: mpsc::UnboundedSender<DriverEvent>,
}

impl EventSink {
   pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<DriverEvent>) {
      let (tx, rx) = mpsc::unbounded_channel();
      (Self { tx }, rx)
   }

   /// Push an event; returns `false` once nobody is listening
   pub fn emit(&self, event: DriverEvent) -> bool {
      self.tx.send(event).is_ok()
   }

   pub fn is_closed(&self) -> bool {
      self.tx.is_closed()
   }
}

impl fmt::Debug for EventSink {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("EventSink")
         .field("closed", &self.is_closed())
         .finish()
   }
}

/// A document database driver
///
/// A handle owns the clients it creates through this trait. `create_client`
/// must not perform I/O beyond what building the client requires; the
/// connection is opened by `connect`.
pub trait Driver: Send + Sync + 'static {
   type Client: fmt::Debug + Send + Sync + 'static;
   type Database: fmt::Debug + Send + Sync + 'static;
   type Collection;

   /// Build a client for `uri` that reports its lifecycle through `events`
   fn create_client(
      &self,
      uri: &str,
      config: &ClientConfig,
      events: EventSink,
   ) -> impl Future<Output = Result<Self::Client>> + Send;

   /// Open the client's connection
   fn connect(&self, client: &Self::Client) -> impl Future<Output = Result<()>> + Send;

   /// Close the client's connection
   fn close(&self, client: &Self::Client) -> impl Future<Output = Result<()>> + Send;

   fn database(&self, client: &Self::Client, name: &str) -> Self::Database;

   fn collection(&self, database: &Self::Database, name: &str) -> Self::Collection;
}
