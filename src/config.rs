//! Configuration for opening a connection

use std::ffi::c_int;

use serde::{Deserialize, Serialize};
use sqlite_backend::OpenFlagBits;

use crate::error::ErrorMode;

/// Configuration for [`Connection::open`](crate::Connection::open)
///
/// # Examples
///
/// ```
/// use sqlite_driver::{ConnectionConfig, ErrorMode, OpenFlags};
///
/// // Use defaults
/// let config = ConnectionConfig::default();
///
/// // WAL journal with a longer busy timeout
/// let config = ConnectionConfig::new().with_pragmas("journal_mode=WAL&busy_timeout=5000");
///
/// // Read-only, fail fast
/// let config = ConnectionConfig {
///     flags: OpenFlags::read_only(),
///     error_mode: ErrorMode::Panic,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
   /// Open mode. URI filenames and extended result codes are always enabled
   /// on top of these.
   ///
   /// Default: read-write, create if missing, no mutex
   pub flags: OpenFlags,

   /// URL-encoded pragma string, e.g. `journal_mode=WAL&synchronous=NORMAL`
   ///
   /// `busy_timeout` is always applied first and defaults to `1000` when not
   /// given.
   ///
   /// Default: `None`
   pub pragmas: Option<String>,

   /// Whether failures are returned or escalated to a panic
   ///
   /// Default: [`ErrorMode::Return`]
   pub error_mode: ErrorMode,
}

impl ConnectionConfig {
   pub fn new() -> Self {
      Self::default()
   }

   pub fn with_flags(mut self, flags: OpenFlags) -> Self {
      self.flags = flags;
      self
   }

   /// Sets the URL-encoded pragma string.
   pub fn with_pragmas(mut self, pragmas: impl Into<String>) -> Self {
      self.pragmas = Some(pragmas.into());
      self
   }

   pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
      self.error_mode = mode;
      self
   }
}

/// Open-mode switches, translated to backend flag bits at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenFlags {
   pub read_only: bool,
   pub read_write: bool,
   /// Create the database file if it does not exist. Requires `read_write`.
   pub create: bool,
   /// Open as a purely in-memory database.
   pub memory: bool,
   /// Multi-thread mode: the caller serializes access per connection.
   pub no_mutex: bool,
   /// Serialized mode: the engine locks around every call.
   pub full_mutex: bool,
}

impl Default for OpenFlags {
   fn default() -> Self {
      Self {
         read_only: false,
         read_write: true,
         create: true,
         memory: false,
         no_mutex: true,
         full_mutex: false,
      }
   }
}

impl OpenFlags {
   /// Read-only access to an existing database.
   pub fn read_only() -> Self {
      Self {
         read_only: true,
         read_write: false,
         create: false,
         ..Self::default()
      }
   }

   /// The default flags plus the in-memory bit.
   pub fn memory() -> Self {
      Self {
         memory: true,
         ..Self::default()
      }
   }

   /// Serialized threading mode instead of multi-thread mode.
   pub fn with_full_mutex(mut self) -> Self {
      self.no_mutex = false;
      self.full_mutex = true;
      self
   }

   /// Combines these switches into the backend's open flag word.
   pub(crate) fn compose(&self, bits: &OpenFlagBits) -> c_int {
      let switches = [
         (self.read_only, bits.read_only),
         (self.read_write, bits.read_write),
         (self.create, bits.create),
         (self.memory, bits.memory),
         (self.no_mutex, bits.no_mutex),
         (self.full_mutex, bits.full_mutex),
      ];

      switches
         .into_iter()
         .filter(|(enabled, _)| *enabled)
         .fold(bits.uri | bits.extended_result_codes, |flags, (_, bit)| {
            flags | bit
         })
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   const BITS: OpenFlagBits = OpenFlagBits {
      read_only: 0x1,
      read_write: 0x2,
      create: 0x4,
      uri: 0x40,
      memory: 0x80,
      no_mutex: 0x8000,
      full_mutex: 0x10000,
      extended_result_codes: 0x0200_0000,
   };

   #[test]
   fn test_default_flags_compose() {
      let flags = OpenFlags::default().compose(&BITS);
      assert_eq!(flags, 0x2 | 0x4 | 0x8000 | 0x40 | 0x0200_0000);
   }

   #[test]
   fn test_read_only_flags_compose() {
      let flags = OpenFlags::read_only().compose(&BITS);
      assert_eq!(flags, 0x1 | 0x8000 | 0x40 | 0x0200_0000);
   }

   #[test]
   fn test_memory_and_full_mutex_compose() {
      let flags = OpenFlags::memory().with_full_mutex().compose(&BITS);
      assert_eq!(flags & BITS.memory, BITS.memory);
      assert_eq!(flags & BITS.full_mutex, BITS.full_mutex);
      assert_eq!(flags & BITS.no_mutex, 0);
   }

   #[test]
   fn test_uri_and_extended_codes_always_set() {
      let none = OpenFlags {
         read_only: false,
         read_write: false,
         create: false,
         memory: false,
         no_mutex: false,
         full_mutex: false,
      };
      assert_eq!(none.compose(&BITS), BITS.uri | BITS.extended_result_codes);
   }

   #[test]
   fn test_config_deserializes_with_defaults() {
      let config: ConnectionConfig =
         serde_json::from_str(r#"{ "pragmas": "journal_mode=WAL", "error_mode": "panic" }"#)
            .unwrap();
      assert_eq!(config.pragmas.as_deref(), Some("journal_mode=WAL"));
      assert_eq!(config.error_mode, ErrorMode::Panic);
      assert_eq!(config.flags, OpenFlags::default());
   }

   #[test]
   fn test_partial_flags_deserialize() {
      let config: ConnectionConfig =
         serde_json::from_str(r#"{ "flags": { "memory": true } }"#).unwrap();
      assert!(config.flags.memory);
      assert!(config.flags.read_write);
      assert!(config.flags.create);
   }
}
