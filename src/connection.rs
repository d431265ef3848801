//! An open database handle

use std::ffi::{CString, c_int};
use std::sync::Arc;

use sqlite_backend::{Backend, RawDb, ResultCodes};
use tracing::{debug, error, trace};

use crate::Result;
use crate::config::ConnectionConfig;
use crate::error::{Error, ErrorMode};
use crate::pragma::{BUSY_TIMEOUT, Pragmas, pragma_statement};
use crate::statement::Statement;

/// A single open SQLite database.
///
/// The connection exclusively owns its database handle and releases it
/// exactly once, either through [`close`](Self::close) or on drop.
/// [`Statement`]s borrow the connection, so it cannot be closed while any
/// statement is still alive.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use sqlite_driver::{Connection, LinkedBackend};
///
/// # fn example() -> sqlite_driver::Result<()> {
/// let mut conn = Connection::open("file:app.db?mode=rwc", Arc::new(LinkedBackend), None)?;
/// conn.exec("CREATE TABLE IF NOT EXISTS users (name TEXT NOT NULL, age INTEGER)")?;
///
/// {
///    let mut stmt = conn.prepare("INSERT INTO users (name, age) VALUES (?, ?)")?;
///    stmt.bind_text(1, "Alice")?;
///    stmt.bind_int(2, 30)?;
///    stmt.exec()?;
///    stmt.close()?;
/// }
///
/// // The statement's borrow has ended, so the connection can close
/// conn.close()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Connection {
   /// `None` once closed
   db: Option<RawDb>,

   backend: Arc<dyn Backend>,

   /// Constant table cached from the backend at open
   codes: ResultCodes,

   error_mode: ErrorMode,

   uri: String,
}

// SAFETY: the handle is opened in multi-thread or serialized mode, so it may
// move between threads as long as it is not used from two at once. The
// connection is not Sync and every use goes through &self or &mut self.
unsafe impl Send for Connection {}

impl Connection {
   /// Opens the database at `uri` through `backend`.
   ///
   /// `uri` follows SQLite's filename rules with URI parsing enabled, e.g.
   /// `file:data.db?mode=rwc` or `:memory:`. Pass `None` for `config` to use
   /// the defaults (read-write, create, no mutex, 1000 ms busy timeout).
   ///
   /// After the handle is open, `busy_timeout` is applied before any other
   /// pragma. If a pragma fails the connection is closed and the error
   /// returned.
   pub fn open(
      uri: &str,
      backend: Arc<dyn Backend>,
      config: Option<ConnectionConfig>,
   ) -> Result<Self> {
      let config = config.unwrap_or_default();
      let codes = backend.result_codes();
      let error_mode = config.error_mode;
      let misuse = |message: String| error_mode.apply(Error::new(codes.misuse, message));

      // Parse before opening so a bad string cannot strand a handle
      let mut pragmas = match config.pragmas.as_deref() {
         Some(raw) => Pragmas::parse(raw).map_err(|e| misuse(e.to_string()))?,
         None => Pragmas::default(),
      };

      let c_uri = backend
         .to_foreign(uri)
         .map_err(|_| misuse(format!("database uri contains a NUL byte: {uri:?}")))?;
      let flags = config.flags.compose(&backend.open_flags());

      debug!(uri, backend = backend.name(), flags, "Opening SQLite connection");

      // SAFETY: c_uri is NUL-terminated and flags come from the backend's own bits.
      let (rc, db) = unsafe { backend.open_v2(&c_uri, flags, None) };
      if rc != codes.ok {
         // The engine may hand back a handle even on failure
         if let Some(db) = db {
            // SAFETY: db was just produced by open_v2 and is released once here.
            unsafe { backend.close_v2(db) };
         }
         return Err(error_mode.apply(Error::new(rc, backend.errstr(rc))));
      }
      let Some(db) = db else {
         return Err(misuse("open succeeded without a database handle".to_string()));
      };

      let conn = Self {
         db: Some(db),
         backend,
         codes,
         error_mode,
         uri: uri.to_string(),
      };

      // SAFETY: db is live.
      let rc = unsafe { conn.backend.extended_result_codes(db, true) };
      conn.check(rc)?;

      let busy_timeout = pragmas.take_busy_timeout();
      conn.apply_pragma(BUSY_TIMEOUT, &busy_timeout)?;
      for (key, value) in pragmas.iter() {
         conn.apply_pragma(key, value)?;
      }

      Ok(conn)
   }

   fn apply_pragma(&self, key: &str, value: &str) -> Result<()> {
      trace!(pragma = key, value, "Applying pragma");
      self.exec(&pragma_statement(key, value))
   }

   /// Executes one or more `;`-separated statements without parameters.
   ///
   /// Intended for DDL and pragmas. Rows produced by the SQL are discarded.
   pub fn exec(&self, sql: &str) -> Result<()> {
      let db = self.handle()?;
      let c_sql = self.to_foreign(sql)?;
      // SAFETY: db is live and c_sql is NUL-terminated.
      let rc = unsafe { self.backend.exec(db, &c_sql) };
      self.check(rc)
   }

   /// Compiles the first statement in `sql` into a reusable [`Statement`].
   ///
   /// Any text after the first statement is ignored.
   pub fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
      let db = self.handle()?;
      let c_sql = self.to_foreign(sql)?;

      trace!(sql, "Preparing statement");

      // SAFETY: db is live and c_sql is NUL-terminated.
      let (rc, stmt) = unsafe { self.backend.prepare_v2(db, &c_sql) };
      self.check(rc)?;

      match stmt {
         Some(stmt) => Ok(Statement::new(self, stmt)),
         None => Err(self.misuse("SQL text contains no statement")),
      }
   }

   /// Closes the database handle.
   ///
   /// Calling `close` on an already closed connection does nothing and
   /// returns `Ok(())`.
   pub fn close(&mut self) -> Result<()> {
      let Some(db) = self.db.take() else {
         return Ok(());
      };

      debug!(uri = %self.uri, "Closing SQLite connection");

      // SAFETY: db was live and has been taken out of self, so it is
      // released exactly once.
      let rc = unsafe { self.backend.close_v2(db) };
      self.check(rc)
   }

   /// Whether [`close`](Self::close) has already run.
   pub fn is_closed(&self) -> bool {
      self.db.is_none()
   }

   /// Rows changed by the most recent INSERT, UPDATE or DELETE.
   pub fn changes(&self) -> Result<i64> {
      let db = self.handle()?;
      // SAFETY: db is live.
      Ok(unsafe { self.backend.changes(db) })
   }

   /// Rowid of the most recent successful INSERT.
   pub fn last_insert_rowid(&self) -> Result<i64> {
      let db = self.handle()?;
      // SAFETY: db is live.
      Ok(unsafe { self.backend.last_insert_rowid(db) })
   }

   pub fn uri(&self) -> &str {
      &self.uri
   }

   pub fn backend(&self) -> &dyn Backend {
      self.backend.as_ref()
   }

   pub(crate) fn codes(&self) -> ResultCodes {
      self.codes
   }

   fn handle(&self) -> Result<RawDb> {
      self.db.ok_or_else(|| self.misuse("database connection is closed"))
   }

   pub(crate) fn to_foreign(&self, s: &str) -> Result<CString> {
      self
         .backend
         .to_foreign(s)
         .map_err(|_| self.misuse("SQL text contains a NUL byte"))
   }

   /// `Ok(())` for the backend's ok code, otherwise the translated error.
   pub(crate) fn check(&self, rc: c_int) -> Result<()> {
      if rc == self.codes.ok {
         Ok(())
      } else {
         Err(self.raise(self.error_for(rc)))
      }
   }

   /// Builds the error for `rc` without applying the error mode.
   ///
   /// Prefers the connection's own message, which carries more context than
   /// the static description used once the handle is gone.
   pub(crate) fn error_for(&self, rc: c_int) -> Error {
      let message = match self.db {
         // SAFETY: db is live while it is stored in self.
         Some(db) => unsafe { self.backend.errmsg(db) },
         None => self.backend.errstr(rc),
      };
      Error::new(rc, message)
   }

   /// Applies the connection's error mode to `err`.
   pub(crate) fn raise(&self, err: Error) -> Error {
      debug!(code = err.code(), message = err.message(), "SQLite call failed");
      self.error_mode.apply(err)
   }

   pub(crate) fn misuse(&self, message: &str) -> Error {
      self.raise(Error::new(self.codes.misuse, message))
   }
}

impl Drop for Connection {
   fn drop(&mut self) {
      if let Some(db) = self.db.take() {
         // SAFETY: db is live and released exactly once here.
         let rc = unsafe { self.backend.close_v2(db) };
         if rc != self.codes.ok {
            error!(
               uri = %self.uri,
               code = rc,
               "Failed to close SQLite connection on drop: {}",
               self.backend.errstr(rc)
            );
         }
      }
   }
}
