//! Error type for sqlite-driver

use std::ffi::c_int;

use serde::{Deserialize, Serialize};

/// A failed driver operation.
///
/// Pairs the engine status code with a message. The message comes from the
/// live connection when one exists, otherwise from the engine's static
/// description of the code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("sqlite3: {message} [{code}]")]
pub struct Error {
   code: c_int,
   message: String,
}

impl Error {
   pub fn new(code: c_int, message: impl Into<String>) -> Self {
      Self {
         code,
         message: message.into(),
      }
   }

   /// Status code as reported by the backend, possibly an extended code.
   pub fn code(&self) -> c_int {
      self.code
   }

   /// Primary result code (the low byte of an extended code).
   pub fn primary_code(&self) -> c_int {
      self.code & 0xff
   }

   pub fn message(&self) -> &str {
      &self.message
   }
}

/// How a connection and its statements surface failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
   /// Return every failure as an [`Error`].
   #[default]
   Return,

   /// Panic with the rendered [`Error`] instead of returning it.
   Panic,
}

impl ErrorMode {
   /// Passes `err` through, or panics when fail-fast behavior was requested.
   pub(crate) fn apply(self, err: Error) -> Error {
      match self {
         ErrorMode::Return => err,
         ErrorMode::Panic => panic!("{err}"),
      }
   }
}
