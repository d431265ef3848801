//! # sqlite-backend
//!
//! The capability contract a native SQLite binding must provide to be driven by
//! `sqlite-driver`.
//!
//! The contract is a pure capability surface: every foreign primitive the
//! driver needs, every constant it compares against, and the two helpers that
//! move strings across the boundary. There is no algorithmic logic here, so any
//! conforming implementation can be swapped in without changing driver
//! behavior.
//!
//! ## Core Types
//!
//! - **[`Backend`]**: the trait implemented by each binding
//! - **[`RawDb`] / [`RawStmt`]**: opaque, non-owning handle tokens
//! - **[`ResultCodes`] / [`TypeCodes`] / [`OpenFlagBits`]**: backend-defined constants
//!
//! ## Safety
//!
//! Every method that takes a [`RawDb`] or [`RawStmt`] is `unsafe`. Callers
//! guarantee the handle is live (not yet closed or finalized) and was produced
//! by the same backend instance family. Ownership of handles lives in the
//! driver, never here.

mod constants;
mod handle;
pub mod marshal;

pub use constants::{OpenFlagBits, ResultCodes, TypeCodes};
pub use handle::{RawDb, RawStmt};

use std::ffi::{CStr, CString, NulError, c_char, c_int};
use std::fmt;

/// Every foreign operation the driver performs.
///
/// Implementations must provide exact-width integer and double-precision
/// float semantics matching SQLite's C column types.
pub trait Backend: fmt::Debug + Send + Sync {
   /// Short identifier used in logs.
   fn name(&self) -> &'static str;

   /// Version string of the engine behind this backend.
   fn version(&self) -> String;

   fn result_codes(&self) -> ResultCodes;

   fn type_codes(&self) -> TypeCodes;

   fn open_flags(&self) -> OpenFlagBits;

   /// Opens a database.
   ///
   /// The engine may allocate a handle even when the returned status is not
   /// `ok`; that handle is returned so the caller can release it.
   ///
   /// # Safety
   ///
   /// `flags` must be a valid combination of [`OpenFlagBits`].
   unsafe fn open_v2(
      &self,
      filename: &CStr,
      flags: c_int,
      vfs: Option<&CStr>,
   ) -> (c_int, Option<RawDb>);

   /// Closes a database handle.
   ///
   /// # Safety
   ///
   /// `db` must be live. It is invalid after this call regardless of status.
   unsafe fn close_v2(&self, db: RawDb) -> c_int;

   /// Runs zero or more `;`-separated statements without parameters.
   ///
   /// # Safety
   ///
   /// `db` must be live.
   unsafe fn exec(&self, db: RawDb, sql: &CStr) -> c_int;

   /// Toggles extended result codes for `db`.
   ///
   /// # Safety
   ///
   /// `db` must be live.
   unsafe fn extended_result_codes(&self, db: RawDb, on: bool) -> c_int;

   /// Rows modified by the most recent INSERT, UPDATE or DELETE.
   ///
   /// # Safety
   ///
   /// `db` must be live.
   unsafe fn changes(&self, db: RawDb) -> i64;

   /// # Safety
   ///
   /// `db` must be live.
   unsafe fn last_insert_rowid(&self, db: RawDb) -> i64;

   /// Message describing the most recent failure on `db`.
   ///
   /// # Safety
   ///
   /// `db` must be live.
   unsafe fn errmsg(&self, db: RawDb) -> String;

   /// Static description of a status code.
   fn errstr(&self, rc: c_int) -> String;

   /// Compiles the first statement in `sql`.
   ///
   /// A successful status with no handle means the text held no statement.
   ///
   /// # Safety
   ///
   /// `db` must be live.
   unsafe fn prepare_v2(&self, db: RawDb, sql: &CStr) -> (c_int, Option<RawStmt>);

   /// # Safety
   ///
   /// `stmt` must be live.
   unsafe fn bind_parameter_count(&self, stmt: RawStmt) -> c_int;

   /// # Safety
   ///
   /// `stmt` must be live.
   unsafe fn bind_int64(&self, stmt: RawStmt, index: c_int, value: i64) -> c_int;

   /// # Safety
   ///
   /// `stmt` must be live.
   unsafe fn bind_double(&self, stmt: RawStmt, index: c_int, value: f64) -> c_int;

   /// Binds text. The engine copies `value` before returning.
   ///
   /// # Safety
   ///
   /// `stmt` must be live.
   unsafe fn bind_text(&self, stmt: RawStmt, index: c_int, value: &str) -> c_int;

   /// Binds a blob. The engine copies `value` before returning.
   ///
   /// # Safety
   ///
   /// `stmt` must be live.
   unsafe fn bind_blob(&self, stmt: RawStmt, index: c_int, value: &[u8]) -> c_int;

   /// # Safety
   ///
   /// `stmt` must be live.
   unsafe fn bind_null(&self, stmt: RawStmt, index: c_int) -> c_int;

   /// # Safety
   ///
   /// `stmt` must be live.
   unsafe fn step(&self, stmt: RawStmt) -> c_int;

   /// # Safety
   ///
   /// `stmt` must be live.
   unsafe fn reset(&self, stmt: RawStmt) -> c_int;

   /// Releases a statement handle.
   ///
   /// # Safety
   ///
   /// `stmt` must be live. It is invalid after this call regardless of status.
   unsafe fn finalize(&self, stmt: RawStmt) -> c_int;

   /// # Safety
   ///
   /// `stmt` must be live.
   unsafe fn column_count(&self, stmt: RawStmt) -> c_int;

   /// # Safety
   ///
   /// `stmt` must be live.
   unsafe fn column_name(&self, stmt: RawStmt, i: c_int) -> Option<String>;

   /// Declared type of a result column, if it maps to a table column.
   ///
   /// # Safety
   ///
   /// `stmt` must be live.
   unsafe fn column_decltype(&self, stmt: RawStmt, i: c_int) -> Option<String>;

   /// Dynamic storage class of column `i` in the current row.
   ///
   /// # Safety
   ///
   /// `stmt` must be live and positioned on a row.
   unsafe fn column_type(&self, stmt: RawStmt, i: c_int) -> c_int;

   /// # Safety
   ///
   /// `stmt` must be live and positioned on a row.
   unsafe fn column_int64(&self, stmt: RawStmt, i: c_int) -> i64;

   /// # Safety
   ///
   /// `stmt` must be live and positioned on a row.
   unsafe fn column_double(&self, stmt: RawStmt, i: c_int) -> f64;

   /// # Safety
   ///
   /// `stmt` must be live and positioned on a row.
   unsafe fn column_text(&self, stmt: RawStmt, i: c_int) -> String;

   /// # Safety
   ///
   /// `stmt` must be live and positioned on a row.
   unsafe fn column_blob(&self, stmt: RawStmt, i: c_int) -> Vec<u8>;

   /// # Safety
   ///
   /// `stmt` must be live and positioned on a row.
   unsafe fn column_bytes(&self, stmt: RawStmt, i: c_int) -> c_int;

   /// Converts an outbound string into a NUL-terminated foreign buffer.
   fn to_foreign(&self, s: &str) -> Result<CString, NulError> {
      marshal::to_foreign(s)
   }

   /// Copies a NUL-terminated foreign string into an owned `String`.
   ///
   /// # Safety
   ///
   /// See [`marshal::from_foreign`].
   unsafe fn from_foreign(&self, ptr: *const c_char) -> Option<String> {
      // SAFETY: forwarded caller guarantee.
      unsafe { marshal::from_foreign(ptr) }
   }
}
