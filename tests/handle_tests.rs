use mongo_conn_mgr::{
   ClientConfig, ConnectionHandle, ConnectionSpec, ConnectionStatus, DriverEvent, Error, FullParameters, LogLevel,
   Logger, MemoryDriver, build_connection_string,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

fn handle_with(driver: &MemoryDriver) -> Arc<ConnectionHandle<MemoryDriver>> {
   let handle = ConnectionHandle::new(Arc::new(driver.clone()), Logger::new());
   handle.configure("mongodb://localhost:27017", "app", None);
   Arc::new(handle)
}

async fn wait_for_status(handle: &ConnectionHandle<MemoryDriver>, status: ConnectionStatus) {
   let mut rx = handle.watch_status();
   tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| s.status == status))
      .await
      .expect("timed out waiting for status")
      .expect("status channel closed");
}

#[tokio::test]
async fn test_sequential_connects_share_one_client() {
   let driver = MemoryDriver::new();
   let handle = handle_with(&driver);

   let first = handle.connect().await.unwrap();
   let second = handle.connect().await.unwrap();

   assert!(Arc::ptr_eq(&first.client, &second.client));
   assert!(Arc::ptr_eq(&first.database, &second.database));
   assert_eq!(driver.created_clients(), 1);
   assert_eq!(driver.opens(), 1);
   assert_eq!(handle.status(), ConnectionStatus::Ready);
   assert!(first.client.is_open());
}

#[tokio::test]
async fn test_concurrent_connects_open_once() {
   let driver = MemoryDriver::new().with_connect_delay(Duration::from_millis(20));
   let handle = handle_with(&driver);

   let connections =
      futures::future::join_all((0..16).map(|_| handle.connect())).await;

   let connections: Vec<_> = connections.into_iter().map(Result::unwrap).collect();
   let first = &connections[0];
   for connection in &connections {
      assert!(Arc::ptr_eq(&first.client, &connection.client));
      assert!(Arc::ptr_eq(&first.database, &connection.database));
   }
   assert_eq!(driver.created_clients(), 1);
   assert_eq!(driver.opens(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_connects_across_tasks() {
   let driver = MemoryDriver::new().with_connect_delay(Duration::from_millis(10));
   let handle = handle_with(&driver);
   let barrier = Arc::new(tokio::sync::Barrier::new(8));

   let tasks: Vec<_> = (0..8)
      .map(|_| {
         let (handle, barrier) = (Arc::clone(&handle), Arc::clone(&barrier));
         tokio::spawn(async move {
            barrier.wait().await;
            handle.connect().await.unwrap()
         })
      })
      .collect();

   let mut clients = Vec::new();
   for task in tasks {
      clients.push(task.await.unwrap().client);
   }

   assert!(clients.iter().all(|client| Arc::ptr_eq(client, &clients[0])));
   assert_eq!(driver.opens(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cached_state_visible_while_others_connect() {
   let driver = MemoryDriver::new();
   let handle = handle_with(&driver);
   let connection = handle.connect().await.unwrap();

   let done = Arc::new(AtomicBool::new(false));
   let callers: Vec<_> = (0..3)
      .map(|_| {
         let (handle, done) = (Arc::clone(&handle), Arc::clone(&done));
         tokio::spawn(async move {
            while !done.load(Ordering::Relaxed) {
               handle.connect().await.unwrap();
               tokio::task::yield_now().await;
            }
         })
      })
      .collect();

   let misses = (0..50_000)
      .filter(|_| {
         !handle.is_connected()
            || !handle
               .cached_database()
               .is_some_and(|database| Arc::ptr_eq(&database, &connection.database))
      })
      .count();

   done.store(true, Ordering::Relaxed);
   for caller in callers {
      caller.await.unwrap();
   }

   assert_eq!(misses, 0);
   assert_eq!(driver.opens(), 1);
}

#[tokio::test]
async fn test_dropped_connect_keeps_pending_client() {
   let driver = MemoryDriver::new().with_connect_delay(Duration::from_millis(200));
   let handle = handle_with(&driver);

   let attempt = tokio::time::timeout(Duration::from_millis(20), handle.connect()).await;
   assert!(attempt.is_err());

   assert_eq!(handle.status(), ConnectionStatus::Disconnected);
   assert!(handle.has_client().await);
   assert!(!handle.is_connected());

   // The next connect opens the client created by the dropped one
   let connection = handle.connect().await.unwrap();
   assert_eq!(connection.client.id, 1);
   assert_eq!(driver.created_clients(), 1);
   assert_eq!(driver.opens(), 1);
   assert_eq!(handle.status(), ConnectionStatus::Ready);
}

#[tokio::test]
async fn test_disconnect_then_reconnect_opens_new_client() {
   let driver = MemoryDriver::new();
   let handle = handle_with(&driver);

   let before = handle.connect().await.unwrap();
   handle.disconnect().await;

   assert_eq!(handle.status(), ConnectionStatus::Disconnected);
   assert!(!handle.is_connected());
   assert!(!before.client.is_open());
   assert_eq!(driver.closes(), 1);

   let after = handle.connect().await.unwrap();
   assert!(!Arc::ptr_eq(&before.client, &after.client));
   assert_eq!(driver.created_clients(), 2);
   assert_eq!(driver.opens(), 2);
   assert_eq!(handle.status(), ConnectionStatus::Ready);
}

#[tokio::test]
async fn test_disconnect_without_client_only_warns() {
   let driver = MemoryDriver::new();
   let handle = handle_with(&driver);

   handle.disconnect().await;

   assert_eq!(handle.status(), ConnectionStatus::Disconnected);
   assert!(handle.last_error().is_none());
   assert_eq!(driver.closes(), 0);

   let warnings = handle.logger().records_at(LogLevel::Warn);
   assert_eq!(warnings.len(), 1);
   assert_eq!(warnings[0].message, "No MongoDB client to disconnect");
}

#[tokio::test]
async fn test_disconnect_without_client_keeps_error_status() {
   let driver = MemoryDriver::new();
   let handle = handle_with(&driver);

   driver.fail_next_create("bad uri");
   assert!(handle.connect().await.is_err());
   handle.disconnect().await;

   assert_eq!(handle.status(), ConnectionStatus::Error);
}

#[tokio::test]
async fn test_connect_failure_is_returned_and_recorded() {
   let driver = MemoryDriver::new();
   let handle = handle_with(&driver);

   driver.fail_next_connect("connection refused");
   let err = handle.connect().await.unwrap_err();

   assert!(matches!(err, Error::Driver(_)));
   assert_eq!(handle.status(), ConnectionStatus::Error);
   assert_eq!(
      handle.last_error().map(|e| e.to_string()),
      Some("Driver error: connection refused".to_string())
   );
   assert!(handle.has_client().await);
   assert!(handle.cached_database().is_none());

   // The client that failed to open is reused on retry
   let connection = handle.connect().await.unwrap();
   assert_eq!(connection.client.id, 1);
   assert_eq!(driver.created_clients(), 1);
   assert_eq!(driver.opens(), 1);
   assert_eq!(handle.status(), ConnectionStatus::Ready);
}

#[tokio::test]
async fn test_create_failure_leaves_no_client() {
   let driver = MemoryDriver::new();
   let handle = handle_with(&driver);

   driver.fail_next_create("invalid connection string");
   assert!(handle.connect().await.is_err());
   assert!(!handle.has_client().await);
   assert_eq!(driver.created_clients(), 0);

   handle.connect().await.unwrap();
   assert_eq!(driver.created_clients(), 1);
}

#[tokio::test]
async fn test_close_failure_keeps_client() {
   let driver = MemoryDriver::new();
   let handle = handle_with(&driver);
   let connection = handle.connect().await.unwrap();

   driver.fail_next_close("close interrupted");
   handle.disconnect().await;

   assert_eq!(handle.status(), ConnectionStatus::Error);
   assert!(handle.last_error().is_some());
   assert!(handle.is_connected());
   assert_eq!(handle.logger().records_at(LogLevel::Error).len(), 1);

   // Still the same pair, no new open
   let again = handle.connect().await.unwrap();
   assert!(Arc::ptr_eq(&connection.client, &again.client));
   assert_eq!(driver.opens(), 1);

   handle.disconnect().await;
   assert_eq!(handle.status(), ConnectionStatus::Disconnected);
   assert!(!handle.has_client().await);
}

#[tokio::test]
async fn test_lifecycle_events_drive_status() {
   let driver = MemoryDriver::new();
   let handle = handle_with(&driver);
   let connection = handle.connect().await.unwrap();

   assert!(driver.emit(DriverEvent::Timeout));
   wait_for_status(&handle, ConnectionStatus::TimedOut).await;

   assert!(driver.emit(DriverEvent::HeartbeatFailed(Error::driver("no reply"))));
   wait_for_status(&handle, ConnectionStatus::HeartbeatFailed).await;
   assert_eq!(
      handle.last_error().map(|e| e.to_string()),
      Some("Driver error: no reply".to_string())
   );

   assert!(driver.emit(DriverEvent::Reconnect));
   wait_for_status(&handle, ConnectionStatus::Ready).await;

   assert!(driver.emit(DriverEvent::ServerClosed));
   wait_for_status(&handle, ConnectionStatus::Closed).await;

   // Status transitions never replace the client or database
   let again = handle.connect().await.unwrap();
   assert!(Arc::ptr_eq(&connection.database, &again.database));
   assert_eq!(driver.opens(), 1);

   let errors = handle.logger().records_at(LogLevel::Error);
   assert!(
      errors
         .iter()
         .any(|r| r.message == "MongoDB server heartbeat failed: Driver error: no reply")
   );
}

#[tokio::test]
async fn test_database_and_collection_connect_lazily() {
   let driver = MemoryDriver::new();
   let handle = handle_with(&driver);

   let users = handle.collection("users").await.unwrap();
   assert_eq!(users.database, "app");
   assert_eq!(users.name, "users");
   assert_eq!(driver.opens(), 1);

   let database = handle.database().await.unwrap();
   assert_eq!(database.name, "app");
   assert_eq!(driver.opens(), 1);
}

#[tokio::test]
async fn test_full_parameters_are_resolved_at_configure_time() {
   let driver = MemoryDriver::new();
   let handle = ConnectionHandle::new(Arc::new(driver.clone()), Logger::new());

   let params = FullParameters {
      port: Some(27017),
      default_auth_db: Some("d".into()),
      auth_source: Some("admin".into()),
      ..FullParameters::new("mongodb://", "u", "p", "h")
   };
   handle.configure(params.clone(), "reports", None);

   assert_eq!(handle.uri(), "mongodb://u:p@h:27017/d?authSource=admin");
   assert_eq!(handle.uri(), build_connection_string(&params));

   handle.connect().await.unwrap();
   assert_eq!(driver.last_uri().as_deref(), Some("mongodb://u:p@h:27017/d?authSource=admin"));
}

#[tokio::test]
async fn test_client_options_apply_to_next_client() {
   let driver = MemoryDriver::new();
   let handle = handle_with(&driver);
   let custom = ClientConfig {
      app_name: Some("reports".into()),
      max_pool_size: Some(5),
      ..Default::default()
   };

   handle.set_config(Some(custom.clone()));
   handle.connect().await.unwrap();
   assert_eq!(driver.last_config(), Some(custom));

   handle.set_config(None);
   assert_eq!(handle.config(), ClientConfig::default());
}

#[tokio::test]
async fn test_logging_options_filter_handle_messages() {
   let driver = MemoryDriver::new();
   let handle = ConnectionHandle::new(Arc::new(driver.clone()), Logger::new());
   let spec: ConnectionSpec = serde_json::from_value(serde_json::json!({
      "uri": "mongodb://localhost:27017",
      "logLevels": ["warn"]
   }))
   .unwrap();
   handle.configure(spec, "app", None);

   handle.connect().await.unwrap();
   handle.disconnect().await;
   handle.disconnect().await;

   let records = handle.logger().records();
   assert_eq!(records.len(), 1);
   assert_eq!(records[0].level, LogLevel::Warn);
}
