//! Error types for sqlite-backend-dynamic

use thiserror::Error;

/// Errors that may occur while loading a SQLite shared library
#[derive(Error, Debug)]
pub enum LoadError {
   /// The library path contains an interior NUL byte
   #[error("Invalid library path '{0}'")]
   InvalidPath(String),

   /// The dynamic loader could not open the library
   #[error("Failed to load '{path}': {reason}")]
   Open { path: String, reason: String },

   /// The library was opened but does not export a required function
   #[error("Symbol '{symbol}' not found in '{path}': {reason}")]
   MissingSymbol {
      path: String,
      symbol: String,
      reason: String,
   },

   /// None of the default library names could be loaded
   #[error("No SQLite shared library found (tried: {tried})")]
   NotFound { tried: String },
}
