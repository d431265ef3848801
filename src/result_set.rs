//! Row cursor over a statement's results

use std::ffi::c_int;

use sqlite_backend::{RawStmt, TypeCodes};
use tracing::trace;

use crate::Result;
use crate::statement::{Statement, StatementState, Step, to_c_index};

/// Dynamic storage class of a value in the current row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
   Integer,
   Float,
   Text,
   Blob,
   Null,
}

impl ColumnType {
   fn from_code(code: c_int, types: &TypeCodes) -> Self {
      match code {
         c if c == types.integer => ColumnType::Integer,
         c if c == types.float => ColumnType::Float,
         c if c == types.text => ColumnType::Text,
         c if c == types.blob => ColumnType::Blob,
         _ => ColumnType::Null,
      }
   }
}

/// A cursor over the rows a [`Statement`] produces.
///
/// Only one result set can exist per statement at a time. Closing or
/// dropping it resets the statement, which stays prepared and can be
/// rebound and queried again.
///
/// Column indexes are 0-based. Value accessors return the type's zero value
/// for NULL columns and when no row is current.
///
/// # Example
///
/// ```no_run
/// # fn example(conn: &sqlite_driver::Connection) -> sqlite_driver::Result<()> {
/// let mut stmt = conn.prepare("SELECT id, name, age FROM users WHERE name = ?")?;
/// stmt.bind_text(1, "Alice")?;
///
/// let mut rows = stmt.query();
/// while rows.next()? {
///    println!("{} {} {}", rows.get_int64(0), rows.get_text(1), rows.get_int64(2));
/// }
/// rows.close()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ResultSet<'stmt, 'conn> {
   statement: &'stmt mut Statement<'conn>,
   /// Set once next() has returned false or an error
   finished: bool,
   closed: bool,
}

impl<'stmt, 'conn> ResultSet<'stmt, 'conn> {
   pub(crate) fn new(statement: &'stmt mut Statement<'conn>) -> Self {
      Self {
         statement,
         finished: false,
         closed: false,
      }
   }

   /// Advances to the next row.
   ///
   /// Returns `Ok(true)` when a row is available, `Ok(false)` once the rows
   /// are exhausted. After `false` or an error every further call returns
   /// `Ok(false)` without touching the engine.
   pub fn next(&mut self) -> Result<bool> {
      if self.finished {
         return Ok(false);
      }
      let stmt = match self.statement.handle() {
         Ok(stmt) => stmt,
         Err(e) => {
            self.finished = true;
            return Err(e);
         }
      };

      match self.statement.step_raw(stmt) {
         Ok(Step::Row) => Ok(true),
         Ok(Step::Done) => {
            self.finished = true;
            Ok(false)
         }
         Err(rc) => {
            self.finished = true;
            let conn = self.statement.connection();
            Err(conn.raise(conn.error_for(rc)))
         }
      }
   }

   /// Number of columns in the result.
   pub fn column_count(&self) -> usize {
      let Some(stmt) = self.live_handle() else {
         return 0;
      };
      // SAFETY: stmt is live.
      let count = unsafe { self.statement.connection().backend().column_count(stmt) };
      usize::try_from(count).unwrap_or(0)
   }

   pub fn column_name(&self, i: usize) -> Option<String> {
      let stmt = self.live_handle()?;
      // SAFETY: stmt is live; the engine returns null for an out-of-range index.
      unsafe { self.statement.connection().backend().column_name(stmt, to_c_index(i)) }
   }

   /// Declared type of the column in its table, e.g. `INTEGER` or `TEXT`.
   ///
   /// `None` for expressions.
   pub fn column_decl_type(&self, i: usize) -> Option<String> {
      let stmt = self.live_handle()?;
      // SAFETY: stmt is live.
      unsafe { self.statement.connection().backend().column_decltype(stmt, to_c_index(i)) }
   }

   /// Storage class of column `i` in the current row.
   pub fn column_type(&self, i: usize) -> ColumnType {
      let Some(stmt) = self.row_handle() else {
         return ColumnType::Null;
      };
      let backend = self.statement.connection().backend();
      // SAFETY: stmt is live and on a row.
      let code = unsafe { backend.column_type(stmt, to_c_index(i)) };
      ColumnType::from_code(code, &backend.type_codes())
   }

   pub fn is_null(&self, i: usize) -> bool {
      self.column_type(i) == ColumnType::Null
   }

   pub fn get_int64(&self, i: usize) -> i64 {
      match self.value_handle(i) {
         // SAFETY: stmt is live, on a row, and the column is not NULL.
         Some(stmt) => unsafe {
            self.statement.connection().backend().column_int64(stmt, to_c_index(i))
         },
         None => 0,
      }
   }

   pub fn get_float64(&self, i: usize) -> f64 {
      match self.value_handle(i) {
         // SAFETY: stmt is live, on a row, and the column is not NULL.
         Some(stmt) => unsafe {
            self.statement.connection().backend().column_double(stmt, to_c_index(i))
         },
         None => 0.0,
      }
   }

   pub fn get_text(&self, i: usize) -> String {
      match self.value_handle(i) {
         // SAFETY: stmt is live, on a row, and the column is not NULL.
         Some(stmt) => unsafe {
            self.statement.connection().backend().column_text(stmt, to_c_index(i))
         },
         None => String::new(),
      }
   }

   pub fn get_blob(&self, i: usize) -> Vec<u8> {
      match self.value_handle(i) {
         // SAFETY: stmt is live, on a row, and the column is not NULL.
         Some(stmt) => unsafe {
            self.statement.connection().backend().column_blob(stmt, to_c_index(i))
         },
         None => Vec::new(),
      }
   }

   /// Resets the statement so it can be reused, and ends this result set.
   pub fn close(mut self) -> Result<()> {
      self.closed = true;
      self.statement.reset()
   }

   fn live_handle(&self) -> Option<RawStmt> {
      self.statement.raw_handle()
   }

   /// Handle for metadata that is only defined while a row is current.
   fn row_handle(&self) -> Option<RawStmt> {
      if self.finished || self.statement.state() != StatementState::Row {
         return None;
      }
      self.live_handle()
   }

   /// Handle for a typed read, or `None` when the value must not be read
   /// through a typed accessor (no row, or NULL storage).
   fn value_handle(&self, i: usize) -> Option<RawStmt> {
      let stmt = self.row_handle()?;
      let backend = self.statement.connection().backend();
      // SAFETY: stmt is live and on a row.
      let code = unsafe { backend.column_type(stmt, to_c_index(i)) };
      (code != backend.type_codes().null).then_some(stmt)
   }
}

impl Drop for ResultSet<'_, '_> {
   fn drop(&mut self) {
      if self.closed {
         return;
      }
      if let Some(stmt) = self.live_handle() {
         trace!("Result set dropped without close, resetting statement");
         self.statement.reset_quietly(stmt);
      }
   }
}
