//! # sqlite-driver
//!
//! A minimal, backend-agnostic SQLite driver: open a database, prepare
//! statements, bind typed parameters, and step through rows, with every
//! engine status translated into one [`Error`] type.
//!
//! ## Core Types
//!
//! - **[`Connection`]**: owns one open database handle
//! - **[`Statement`]**: owns one prepared statement, borrows its connection
//! - **[`ResultSet`]**: row cursor that borrows its statement
//! - **[`ConnectionConfig`]**: open flags, pragmas, and error mode
//! - **[`Error`]**: `(code, message)` pair rendered as `sqlite3: <message> [<code>]`
//!
//! ## Backends
//!
//! The driver talks to SQLite only through the [`Backend`] trait, so the
//! native binding can be swapped without touching driver logic:
//!
//! - `linked` feature (default): [`LinkedBackend`], SQLite linked at build time
//! - `dynamic` feature: `DynamicBackend`, SQLite loaded from a shared library at run time
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use sqlite_driver::{Connection, ConnectionConfig, LinkedBackend};
//!
//! fn main() -> sqlite_driver::Result<()> {
//!     let config = ConnectionConfig::new().with_pragmas("journal_mode=WAL&foreign_keys=1");
//!     let mut conn = Connection::open("file:app.db?mode=rwc", Arc::new(LinkedBackend), Some(config))?;
//!
//!     conn.exec("CREATE TABLE IF NOT EXISTS users (name TEXT NOT NULL, age INTEGER)")?;
//!
//!     {
//!         let mut insert = conn.prepare("INSERT INTO users (name, age) VALUES (?, ?)")?;
//!         for (name, age) in [("Alice", 30), ("Bob", 25)] {
//!             insert.bind_text(1, name)?;
//!             insert.bind_int(2, age)?;
//!             insert.exec()?;
//!         }
//!
//!         let mut select = conn.prepare("SELECT name, age FROM users")?;
//!         let mut rows = select.query();
//!         while rows.next()? {
//!             println!("{} is {}", rows.get_text(0), rows.get_int64(1));
//!         }
//!     }
//!
//!     // Statements borrow the connection, so they are gone before close
//!     conn.close()
//! }
//! ```
//!
//! ## Design Principles
//!
//! - Handles are owned by exactly one wrapper and released exactly once
//! - Borrowing makes use-after-close a compile error
//! - `busy_timeout` is always the first pragma applied
//! - Errors are returned by default; [`ErrorMode::Panic`] opts into fail-fast

mod config;
mod connection;
mod error;
mod pragma;
mod result_set;
mod statement;

// Re-export public types
pub use config::{ConnectionConfig, OpenFlags};
pub use connection::Connection;
pub use error::{Error, ErrorMode};
pub use result_set::{ColumnType, ResultSet};
pub use statement::{Statement, StatementState};

// Re-export the backend contract and the bundled implementations
pub use sqlite_backend::{self as backend, Backend};
#[cfg(all(feature = "dynamic", unix))]
pub use sqlite_backend_dynamic::{DynamicBackend, LoadError};
#[cfg(feature = "linked")]
pub use sqlite_backend_linked::LinkedBackend;

/// A type alias for Results with our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
