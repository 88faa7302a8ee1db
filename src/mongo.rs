//! Driver implementation over the official `mongodb` crate

use std::future::Future;
use std::time::Duration;

use mongodb::bson::{Document, doc};
use mongodb::event::EventHandler;
use mongodb::event::cmap::{CmapEvent, ConnectionCheckoutFailedReason};
use mongodb::event::sdam::SdamEvent;
use mongodb::options::{ClientOptions, ServerApi};
use mongodb::{Client, Collection, Database};
use tracing::trace;

use crate::Result;
use crate::config::{ClientConfig, ServerApiVersion};
use crate::driver::{Driver, DriverEvent, EventSink};
use crate::error::Error;

/// [`Driver`] backed by [`mongodb::Client`]
///
/// The official client opens connections lazily, so `connect` pings the
/// `admin` database to prove the deployment is reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoDriver;

impl MongoDriver {
   pub fn new() -> Self {
      Self
   }
}

fn apply_config(options: &mut ClientOptions, config: &ClientConfig) {
   if let Some(api) = &config.server_api {
      let version = match api.version {
         ServerApiVersion::V1 => mongodb::options::ServerApiVersion::V1,
      };
      options.server_api = Some(
         ServerApi::builder()
            .version(version)
            .strict(api.strict)
            .deprecation_errors(api.deprecation_errors)
            .build(),
      );
   }
   if let Some(name) = &config.app_name {
      options.app_name = Some(name.clone());
   }
   if let Some(secs) = config.connect_timeout_secs {
      options.connect_timeout = Some(Duration::from_secs(secs));
   }
   if let Some(secs) = config.server_selection_timeout_secs {
      options.server_selection_timeout = Some(Duration::from_secs(secs));
   }
   if let Some(size) = config.max_pool_size {
      options.max_pool_size = Some(size);
   }
   if let Some(size) = config.min_pool_size {
      options.min_pool_size = Some(size);
   }
}

fn sdam_event(event: SdamEvent) -> Option<DriverEvent> {
   match event {
      SdamEvent::ServerOpening(_) => Some(DriverEvent::ServerOpening),
      SdamEvent::ServerClosed(_) => Some(DriverEvent::ServerClosed),
      SdamEvent::TopologyClosed(_) => Some(DriverEvent::Close),
      SdamEvent::ServerHeartbeatSucceeded(_) => Some(DriverEvent::HeartbeatSucceeded),
      SdamEvent::ServerHeartbeatFailed(failed) => {
         Some(DriverEvent::HeartbeatFailed(Error::driver(failed.failure)))
      }
      _ => None,
   }
}

fn cmap_event(event: CmapEvent) -> Option<DriverEvent> {
   match event {
      CmapEvent::ConnectionReady(_) => Some(DriverEvent::ConnectionReady),
      CmapEvent::ConnectionCheckoutFailed(failed) => match failed.reason {
         ConnectionCheckoutFailedReason::Timeout => Some(DriverEvent::Timeout),
         _ => Some(DriverEvent::Error(Error::driver(
            "failed to check out a pooled connection",
         ))),
      },
      _ => None,
   }
}

impl Driver for MongoDriver {
   type Client = Client;
   type Database = Database;
   type Collection = Collection<Document>;

   fn create_client(
      &self,
      uri: &str,
      config: &ClientConfig,
      events: EventSink,
   ) -> impl Future<Output = Result<Client>> + Send {
      let uri = uri.to_string();
      let config = config.clone();
      async move {
         let mut options = ClientOptions::parse(&uri).await.map_err(Error::driver)?;
         apply_config(&mut options, &config);

         let sdam_sink = events.clone();
         options.sdam_event_handler = Some(EventHandler::callback(move |event: SdamEvent| {
            if let Some(event) = sdam_event(event) {
               sdam_sink.emit(event);
            }
         }));
         options.cmap_event_handler = Some(EventHandler::callback(move |event: CmapEvent| {
            if let Some(event) = cmap_event(event) {
               events.emit(event);
            }
         }));

         trace!("Creating MongoDB client");
         Client::with_options(options).map_err(Error::driver)
      }
   }

   fn connect(&self, client: &Client) -> impl Future<Output = Result<()>> + Send {
      let admin = client.database("admin");
      async move {
         admin
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(Error::driver)?;
         Ok(())
      }
   }

   fn close(&self, client: &Client) -> impl Future<Output = Result<()>> + Send {
      let client = client.clone();
      async move {
         client.shutdown().await;
         Ok(())
      }
   }

   fn database(&self, client: &Client, name: &str) -> Database {
      client.database(name)
   }

   fn collection(&self, database: &Database, name: &str) -> Collection<Document> {
      database.collection(name)
   }
}
