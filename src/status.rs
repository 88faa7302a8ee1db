//! Connection status and the transition function fed by driver events

use std::fmt;

use serde::Serialize;

use crate::driver::DriverEvent;
use crate::error::Error;
use crate::logging::LogLevel;

/// Observable status of a connection handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConnectionStatus {
   Disconnected,
   Connecting,
   Ready,
   Closed,
   Error,
   ReconnectFailed,
   HeartbeatFailed,
   TimedOut,
}

impl fmt::Display for ConnectionStatus {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let label = match self {
         ConnectionStatus::Disconnected => "disconnected",
         ConnectionStatus::Connecting => "connecting",
         ConnectionStatus::Ready => "ready",
         ConnectionStatus::Closed => "closed",
         ConnectionStatus::Error => "error",
         ConnectionStatus::ReconnectFailed => "reconnect failed",
         ConnectionStatus::HeartbeatFailed => "heartbeat failed",
         ConnectionStatus::TimedOut => "timed out",
      };
      f.write_str(label)
   }
}

/// Status together with the most recent recorded failure
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
   pub status: ConnectionStatus,
   pub last_error: Option<Error>,
   /// Bumped whenever the handle starts or drops a client; events from an
   /// older client are ignored
   pub(crate) epoch: u64,
}

impl StatusSnapshot {
   pub(crate) fn new() -> Self {
      Self {
         status: ConnectionStatus::Disconnected,
         last_error: None,
         epoch: 0,
      }
   }
}

/// What a transition asks the handle to log
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Note {
   pub level: LogLevel,
   pub message: String,
}

/// Apply one driver event to the snapshot
pub(crate) fn apply(snapshot: &mut StatusSnapshot, event: &DriverEvent) -> Note {
   let (status, level, message) = match event {
      DriverEvent::ConnectionReady => (ConnectionStatus::Ready, LogLevel::Log, "connection is ready"),
      DriverEvent::Close => (ConnectionStatus::Closed, LogLevel::Log, "connection closed"),
      DriverEvent::Error(_) => (ConnectionStatus::Error, LogLevel::Error, "connection error"),
      DriverEvent::Reconnect => (ConnectionStatus::Ready, LogLevel::Log, "reconnected"),
      DriverEvent::ReconnectFailed => (
         ConnectionStatus::ReconnectFailed,
         LogLevel::Error,
         "reconnection failed",
      ),
      DriverEvent::Timeout => (ConnectionStatus::TimedOut, LogLevel::Error, "connection timed out"),
      DriverEvent::HeartbeatFailed(_) => (
         ConnectionStatus::HeartbeatFailed,
         LogLevel::Error,
         "server heartbeat failed",
      ),
      DriverEvent::HeartbeatSucceeded => (
         ConnectionStatus::Ready,
         LogLevel::Log,
         "server heartbeat succeeded",
      ),
      DriverEvent::ServerClosed => (ConnectionStatus::Closed, LogLevel::Log, "server closed"),
      DriverEvent::ServerOpening => (ConnectionStatus::Connecting, LogLevel::Log, "server opening"),
   };

   snapshot.status = status;

   let message = match event {
      DriverEvent::Error(err) | DriverEvent::HeartbeatFailed(err) => {
         snapshot.last_error = Some(err.clone());
         format!("MongoDB {message}: {err}")
      }
      _ => format!("MongoDB {message}"),
   };

   Note { level, message }
}
