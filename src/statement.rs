//! Prepared statements and their execution state machine

use std::ffi::c_int;

use sqlite_backend::RawStmt;
use tracing::{error, trace};

use crate::Result;
use crate::connection::Connection;
use crate::result_set::ResultSet;

/// Where a [`Statement`] is in its lifecycle.
///
/// ```text
/// Ready ──step──▶ Row ──step──▶ … ──▶ Done | Failed
///   ▲                                     │
///   └──────────────── reset ◀─────────────┘
///
/// any state ──close──▶ Finalized
/// ```
///
/// Rebinding parameters after the first step is only valid once the statement
/// is back in `Ready`; the engine reports a misuse error otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
   /// Compiled or reset; parameters may be bound.
   Ready,
   /// The last step produced a row.
   Row,
   /// The last step ran the statement to completion.
   Done,
   /// The last step failed.
   Failed,
   /// The handle has been released.
   Finalized,
}

/// Outcome of a successful step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
   Row,
   Done,
}

/// A compiled SQL statement with zero or more `?` parameters.
///
/// A statement exclusively owns its handle and borrows the [`Connection`]
/// that prepared it. It can be executed any number of times: bind, run
/// ([`exec`](Self::exec) or [`query`](Self::query)), and bind again.
///
/// Parameter indexes are 1-based.
#[derive(Debug)]
pub struct Statement<'conn> {
   conn: &'conn Connection,

   /// `None` once finalized
   stmt: Option<RawStmt>,

   state: StatementState,
}

impl<'conn> Statement<'conn> {
   pub(crate) fn new(conn: &'conn Connection, stmt: RawStmt) -> Self {
      Self {
         conn,
         stmt: Some(stmt),
         state: StatementState::Ready,
      }
   }

   pub fn state(&self) -> StatementState {
      self.state
   }

   /// Number of parameters the statement expects.
   pub fn parameter_count(&self) -> Result<usize> {
      let stmt = self.handle()?;
      // SAFETY: stmt is live.
      let count = unsafe { self.conn.backend().bind_parameter_count(stmt) };
      Ok(usize::try_from(count).unwrap_or(0))
   }

   pub fn bind_int(&mut self, index: usize, value: i64) -> Result<()> {
      let stmt = self.handle()?;
      // SAFETY: stmt is live.
      let rc = unsafe { self.conn.backend().bind_int64(stmt, to_c_index(index), value) };
      self.conn.check(rc)
   }

   pub fn bind_float(&mut self, index: usize, value: f64) -> Result<()> {
      let stmt = self.handle()?;
      // SAFETY: stmt is live.
      let rc = unsafe { self.conn.backend().bind_double(stmt, to_c_index(index), value) };
      self.conn.check(rc)
   }

   /// Binds text. The engine keeps its own copy of `value`.
   pub fn bind_text(&mut self, index: usize, value: &str) -> Result<()> {
      let stmt = self.handle()?;
      // SAFETY: stmt is live.
      let rc = unsafe { self.conn.backend().bind_text(stmt, to_c_index(index), value) };
      self.conn.check(rc)
   }

   /// Binds a blob. The engine keeps its own copy of `value`.
   pub fn bind_blob(&mut self, index: usize, value: &[u8]) -> Result<()> {
      let stmt = self.handle()?;
      // SAFETY: stmt is live.
      let rc = unsafe { self.conn.backend().bind_blob(stmt, to_c_index(index), value) };
      self.conn.check(rc)
   }

   pub fn bind_null(&mut self, index: usize) -> Result<()> {
      let stmt = self.handle()?;
      // SAFETY: stmt is live.
      let rc = unsafe { self.conn.backend().bind_null(stmt, to_c_index(index)) };
      self.conn.check(rc)
   }

   /// Runs the statement to completion, discarding any rows.
   ///
   /// Use for DDL and INSERT/UPDATE/DELETE. The statement is reset afterwards
   /// on success and on failure, so it can be rebound and run again.
   pub fn exec(&mut self) -> Result<()> {
      let stmt = self.handle()?;

      loop {
         match self.step_raw(stmt) {
            Ok(Step::Row) => continue,
            Ok(Step::Done) => break,
            Err(rc) => {
               // Capture the message first, then restore the statement to Ready
               let err = self.conn.error_for(rc);
               self.reset_quietly(stmt);
               return Err(self.conn.raise(err));
            }
         }
      }

      self.reset()
   }

   /// Rewinds the statement to `Ready`. Bound parameters are kept.
   ///
   /// After a failed step the failure has already been returned, so the
   /// reset itself succeeds.
   pub fn reset(&mut self) -> Result<()> {
      let stmt = self.handle()?;
      if self.state == StatementState::Failed {
         self.reset_quietly(stmt);
         return Ok(());
      }
      // SAFETY: stmt is live.
      let rc = unsafe { self.conn.backend().reset(stmt) };
      self.state = StatementState::Ready;
      self.conn.check(rc)
   }

   /// Wraps the statement as a row cursor. Nothing is stepped until
   /// [`ResultSet::next`] is called.
   pub fn query(&mut self) -> ResultSet<'_, 'conn> {
      ResultSet::new(self)
   }

   /// Releases the statement handle.
   ///
   /// Calling `close` again does nothing and returns `Ok(())`.
   pub fn close(&mut self) -> Result<()> {
      let Some(stmt) = self.stmt.take() else {
         return Ok(());
      };
      self.state = StatementState::Finalized;
      trace!("Finalizing statement");
      // SAFETY: stmt was live and has been taken out of self.
      let rc = unsafe { self.conn.backend().finalize(stmt) };
      self.conn.check(rc)
   }

   pub(crate) fn connection(&self) -> &'conn Connection {
      self.conn
   }

   /// The live handle, without raising an error when finalized.
   pub(crate) fn raw_handle(&self) -> Option<RawStmt> {
      self.stmt
   }

   pub(crate) fn handle(&self) -> Result<RawStmt> {
      self
         .stmt
         .ok_or_else(|| self.conn.misuse("statement has been finalized"))
   }

   /// Advances one step, recording the transition.
   ///
   /// Returns the raw status on failure so the caller decides when the error
   /// mode applies.
   pub(crate) fn step_raw(&mut self, stmt: RawStmt) -> std::result::Result<Step, c_int> {
      let codes = self.conn.codes();
      // SAFETY: stmt is live.
      let rc = unsafe { self.conn.backend().step(stmt) };

      if rc == codes.row {
         self.state = StatementState::Row;
         Ok(Step::Row)
      } else if rc == codes.done {
         self.state = StatementState::Done;
         Ok(Step::Done)
      } else {
         self.state = StatementState::Failed;
         Err(rc)
      }
   }

   /// Resets on an error path where the reset status is not reported.
   pub(crate) fn reset_quietly(&mut self, stmt: RawStmt) {
      // SAFETY: stmt is live. After a failed step, reset repeats the step's
      // error code, which has already been reported.
      unsafe { self.conn.backend().reset(stmt) };
      self.state = StatementState::Ready;
   }
}

impl Drop for Statement<'_> {
   fn drop(&mut self) {
      if let Some(stmt) = self.stmt.take() {
         // SAFETY: stmt is live and finalized exactly once here.
         let rc = unsafe { self.conn.backend().finalize(stmt) };
         if rc != self.conn.codes().ok {
            error!(code = rc, "Failed to finalize statement on drop");
         }
      }
   }
}

/// Out-of-range indexes are left for the engine to reject.
pub(crate) fn to_c_index(index: usize) -> c_int {
   c_int::try_from(index).unwrap_or(c_int::MAX)
}
