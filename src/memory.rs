//! In-process driver with scriptable failures and events
//!
//! Nothing is sent over the network. The driver counts what it is asked to do
//! and lets the caller inject lifecycle events and failures, which makes it the
//! fake event source for exercising handles and registries.

use std::future::{Future, ready};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::Result;
use crate::config::ClientConfig;
use crate::driver::{Driver, DriverEvent, EventSink};
use crate::error::Error;

/// Client created by [`MemoryDriver`]
#[derive(Debug)]
pub struct MemoryClient {
   /// Sequence number of the client within its driver, starting at 1
   pub id: usize,
   pub uri: String,
   pub config: ClientConfig,
   open: Arc<AtomicBool>,
}

impl MemoryClient {
   pub fn is_open(&self) -> bool {
      self.open.load(Ordering::SeqCst)
   }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDatabase {
   pub client_id: usize,
   pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryCollection {
   pub database: String,
   pub name: String,
}

#[derive(Default)]
struct MemoryInner {
   created: AtomicUsize,
   opens: AtomicUsize,
   closes: AtomicUsize,
   connect_delay: Mutex<Duration>,
   fail_create: Mutex<Option<String>>,
   fail_connect: Mutex<Option<String>>,
   fail_close: Mutex<Option<String>>,
   last_uri: Mutex<Option<String>>,
   last_config: Mutex<Option<ClientConfig>>,
   sinks: Mutex<Vec<EventSink>>,
}

/// Driver that keeps everything in memory; clones share their counters
#[derive(Clone, Default)]
pub struct MemoryDriver {
   inner: Arc<MemoryInner>,
}

impl MemoryDriver {
   pub fn new() -> Self {
      Self::default()
   }

   /// Make every `connect` take `delay` before it completes
   pub fn with_connect_delay(self, delay: Duration) -> Self {
      *self.inner.connect_delay.lock() = delay;
      self
   }

   /// Number of clients created so far
   pub fn created_clients(&self) -> usize {
      self.inner.created.load(Ordering::SeqCst)
   }

   /// Number of successful connects so far
   pub fn opens(&self) -> usize {
      self.inner.opens.load(Ordering::SeqCst)
   }

   /// Number of successful closes so far
   pub fn closes(&self) -> usize {
      self.inner.closes.load(Ordering::SeqCst)
   }

   /// Fail the next client creation with `message`
   pub fn fail_next_create(&self, message: impl Into<String>) {
      *self.inner.fail_create.lock() = Some(message.into());
   }

   /// Fail the next connect with `message`
   pub fn fail_next_connect(&self, message: impl Into<String>) {
      *self.inner.fail_connect.lock() = Some(message.into());
   }

   /// Fail the next close with `message`
   pub fn fail_next_close(&self, message: impl Into<String>) {
      *self.inner.fail_close.lock() = Some(message.into());
   }

   /// Connection string of the most recently created client
   pub fn last_uri(&self) -> Option<String> {
      self.inner.last_uri.lock().clone()
   }

   /// Options of the most recently created client
   pub fn last_config(&self) -> Option<ClientConfig> {
      self.inner.last_config.lock().clone()
   }

   /// Event sink of the most recently created client
   pub fn latest_sink(&self) -> Option<EventSink> {
      self.inner.sinks.lock().last().cloned()
   }

   /// Push `event` as if the most recently created client emitted it
   ///
   /// Returns `false` when there is no client or nobody listens to it anymore.
   pub fn emit(&self, event: DriverEvent) -> bool {
      self
         .latest_sink()
         .is_some_and(|sink| sink.emit(event))
   }
}

impl Driver for MemoryDriver {
   type Client = MemoryClient;
   type Database = MemoryDatabase;
   type Collection = MemoryCollection;

   fn create_client(
      &self,
      uri: &str,
      config: &ClientConfig,
      events: EventSink,
   ) -> impl Future<Output = Result<MemoryClient>> + Send {
      let failure = self.inner.fail_create.lock().take();
      let result = match failure {
         Some(message) => Err(Error::driver(message)),
         None => {
            let id = self.inner.created.fetch_add(1, Ordering::SeqCst) + 1;
            *self.inner.last_uri.lock() = Some(uri.to_string());
            *self.inner.last_config.lock() = Some(config.clone());
            self.inner.sinks.lock().push(events);
            Ok(MemoryClient {
               id,
               uri: uri.to_string(),
               config: config.clone(),
               open: Arc::new(AtomicBool::new(false)),
            })
         }
      };
      ready(result)
   }

   fn connect(&self, client: &MemoryClient) -> impl Future<Output = Result<()>> + Send {
      let inner = Arc::clone(&self.inner);
      let open = Arc::clone(&client.open);
      async move {
         let delay = *inner.connect_delay.lock();
         if !delay.is_zero() {
            tokio::time::sleep(delay).await;
         }

         let failure = inner.fail_connect.lock().take();
         if let Some(message) = failure {
            return Err(Error::driver(message));
         }

         inner.opens.fetch_add(1, Ordering::SeqCst);
         open.store(true, Ordering::SeqCst);
         Ok(())
      }
   }

   fn close(&self, client: &MemoryClient) -> impl Future<Output = Result<()>> + Send {
      let failure = self.inner.fail_close.lock().take();
      let result = match failure {
         Some(message) => Err(Error::driver(message)),
         None => {
            self.inner.closes.fetch_add(1, Ordering::SeqCst);
            client.open.store(false, Ordering::SeqCst);
            Ok(())
         }
      };
      ready(result)
   }

   fn database(&self, client: &MemoryClient, name: &str) -> MemoryDatabase {
      MemoryDatabase {
         client_id: client.id,
         name: name.to_string(),
      }
   }

   fn collection(&self, database: &MemoryDatabase, name: &str) -> MemoryCollection {
      MemoryCollection {
         database: database.name.clone(),
         name: name.to_string(),
      }
   }
}
