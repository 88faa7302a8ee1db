//! Switchable, level-filtered logger shared by the handles of a registry
//!
//! Messages are forwarded to `tracing` and kept in a bounded history so that
//! callers (and tests) can inspect what was reported.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Number of records kept by [`Logger::records`]
pub const LOG_HISTORY_CAPACITY: usize = 256;

/// Severity of a logger message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
   Debug,
   Info,
   Log,
   Warn,
   Error,
}

impl LogLevel {
   pub const ALL: [LogLevel; 5] = [
      LogLevel::Debug,
      LogLevel::Info,
      LogLevel::Log,
      LogLevel::Warn,
      LogLevel::Error,
   ];

   fn bit(self) -> u8 {
      1 << (self as u8)
   }
}

impl fmt::Display for LogLevel {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let name = match self {
         LogLevel::Debug => "debug",
         LogLevel::Info => "info",
         LogLevel::Log => "log",
         LogLevel::Warn => "warn",
         LogLevel::Error => "error",
      };
      f.write_str(name)
   }
}

/// A message that passed the logger's switch and level filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
   pub level: LogLevel,
   pub message: String,
}

struct LoggerInner {
   enabled: AtomicBool,
   levels: AtomicU8,
   history: Mutex<VecDeque<LogRecord>>,
}

/// Logger handle; clones share switch, level filter and history
#[derive(Clone)]
pub struct Logger {
   inner: Arc<LoggerInner>,
}

impl Logger {
   /// Enabled logger emitting every level
   pub fn new() -> Self {
      Self {
         inner: Arc::new(LoggerInner {
            enabled: AtomicBool::new(true),
            levels: AtomicU8::new(all_levels()),
            history: Mutex::new(VecDeque::new()),
         }),
      }
   }

   pub fn toggle_logging(&self, enabled: bool) {
      self.inner.enabled.store(enabled, Ordering::SeqCst);
   }

   pub fn is_enabled(&self) -> bool {
      self.inner.enabled.load(Ordering::SeqCst)
   }

   /// Restrict emitted levels; `None` emits all levels
   pub fn set_levels(&self, levels: Option<&[LogLevel]>) {
      let mask = match levels {
         Some(levels) => levels.iter().fold(0, |mask, level| mask | level.bit()),
         None => all_levels(),
      };
      self.inner.levels.store(mask, Ordering::SeqCst);
   }

   pub fn is_level_enabled(&self, level: LogLevel) -> bool {
      self.is_enabled() && self.inner.levels.load(Ordering::SeqCst) & level.bit() != 0
   }

   pub fn debug(&self, message: impl Into<String>) {
      self.emit(LogLevel::Debug, message);
   }

   pub fn info(&self, message: impl Into<String>) {
      self.emit(LogLevel::Info, message);
   }

   pub fn log(&self, message: impl Into<String>) {
      self.emit(LogLevel::Log, message);
   }

   pub fn warn(&self, message: impl Into<String>) {
      self.emit(LogLevel::Warn, message);
   }

   pub fn error(&self, message: impl Into<String>) {
      self.emit(LogLevel::Error, message);
   }

   /// Emit `message` at `level` if the switch and level filter allow it
   pub fn emit(&self, level: LogLevel, message: impl Into<String>) {
      if !self.is_level_enabled(level) {
         return;
      }

      let message = message.into();
      match level {
         LogLevel::Debug => debug!("{}", message),
         LogLevel::Info | LogLevel::Log => info!("{}", message),
         LogLevel::Warn => warn!("{}", message),
         LogLevel::Error => error!("{}", message),
      }

      let mut history = self.inner.history.lock();
      if history.len() == LOG_HISTORY_CAPACITY {
         history.pop_front();
      }
      history.push_back(LogRecord { level, message });
   }

   /// Emitted messages, oldest first
   pub fn records(&self) -> Vec<LogRecord> {
      self.inner.history.lock().iter().cloned().collect()
   }

   /// Emitted messages of one level, oldest first
   pub fn records_at(&self, level: LogLevel) -> Vec<LogRecord> {
      self
         .inner
         .history
         .lock()
         .iter()
         .filter(|record| record.level == level)
         .cloned()
         .collect()
   }

   pub fn clear_records(&self) {
      self.inner.history.lock().clear();
   }
}

impl Default for Logger {
   fn default() -> Self {
      Self::new()
   }
}

impl fmt::Debug for Logger {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("Logger")
         .field("enabled", &self.is_enabled())
         .field("levels", &self.inner.levels.load(Ordering::SeqCst))
         .finish_non_exhaustive()
   }
}

fn all_levels() -> u8 {
   LogLevel::ALL.iter().fold(0, |mask, level| mask | level.bit())
}
