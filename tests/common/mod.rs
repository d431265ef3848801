//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::ffi::{CStr, c_int};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use sqlite_backend::{Backend, OpenFlagBits, RawDb, RawStmt, ResultCodes, TypeCodes};
use sqlite_backend_linked::LinkedBackend;
use sqlite_driver::{Connection, ConnectionConfig};
use tempfile::TempDir;

pub fn init_tracing() {
   let _ = tracing_subscriber::fmt()
      .with_test_writer()
      .with_max_level(tracing::Level::TRACE)
      .try_init();
}

/// Wraps the linked backend and records every foreign call by name.
#[derive(Debug, Default)]
pub struct RecordingBackend {
   inner: LinkedBackend,
   calls: Mutex<Vec<&'static str>>,
   exec_sql: Mutex<Vec<String>>,
}

impl RecordingBackend {
   pub fn new() -> Arc<Self> {
      Arc::new(Self::default())
   }

   fn record(&self, call: &'static str) {
      self.calls.lock().push(call);
   }

   /// How many times `call` has crossed the boundary.
   pub fn count(&self, call: &str) -> usize {
      self.calls.lock().iter().filter(|c| **c == call).count()
   }

   /// Total number of foreign calls so far.
   pub fn total(&self) -> usize {
      self.calls.lock().len()
   }

   /// SQL passed to `exec`, in call order.
   pub fn executed(&self) -> Vec<String> {
      self.exec_sql.lock().clone()
   }
}

impl Backend for RecordingBackend {
   fn name(&self) -> &'static str {
      "recording"
   }

   fn version(&self) -> String {
      self.inner.version()
   }

   fn result_codes(&self) -> ResultCodes {
      self.inner.result_codes()
   }

   fn type_codes(&self) -> TypeCodes {
      self.inner.type_codes()
   }

   fn open_flags(&self) -> OpenFlagBits {
      self.inner.open_flags()
   }

   unsafe fn open_v2(
      &self,
      filename: &CStr,
      flags: c_int,
      vfs: Option<&CStr>,
   ) -> (c_int, Option<RawDb>) {
      self.record("open_v2");
      unsafe { self.inner.open_v2(filename, flags, vfs) }
   }

   unsafe fn close_v2(&self, db: RawDb) -> c_int {
      self.record("close_v2");
      unsafe { self.inner.close_v2(db) }
   }

   unsafe fn exec(&self, db: RawDb, sql: &CStr) -> c_int {
      self.record("exec");
      self.exec_sql.lock().push(sql.to_string_lossy().into_owned());
      unsafe { self.inner.exec(db, sql) }
   }

   unsafe fn extended_result_codes(&self, db: RawDb, on: bool) -> c_int {
      self.record("extended_result_codes");
      unsafe { self.inner.extended_result_codes(db, on) }
   }

   unsafe fn changes(&self, db: RawDb) -> i64 {
      self.record("changes");
      unsafe { self.inner.changes(db) }
   }

   unsafe fn last_insert_rowid(&self, db: RawDb) -> i64 {
      self.record("last_insert_rowid");
      unsafe { self.inner.last_insert_rowid(db) }
   }

   unsafe fn errmsg(&self, db: RawDb) -> String {
      self.record("errmsg");
      unsafe { self.inner.errmsg(db) }
   }

   fn errstr(&self, rc: c_int) -> String {
      self.record("errstr");
      self.inner.errstr(rc)
   }

   unsafe fn prepare_v2(&self, db: RawDb, sql: &CStr) -> (c_int, Option<RawStmt>) {
      self.record("prepare_v2");
      unsafe { self.inner.prepare_v2(db, sql) }
   }

   unsafe fn bind_parameter_count(&self, stmt: RawStmt) -> c_int {
      self.record("bind_parameter_count");
      unsafe { self.inner.bind_parameter_count(stmt) }
   }

   unsafe fn bind_int64(&self, stmt: RawStmt, index: c_int, value: i64) -> c_int {
      self.record("bind_int64");
      unsafe { self.inner.bind_int64(stmt, index, value) }
   }

   unsafe fn bind_double(&self, stmt: RawStmt, index: c_int, value: f64) -> c_int {
      self.record("bind_double");
      unsafe { self.inner.bind_double(stmt, index, value) }
   }

   unsafe fn bind_text(&self, stmt: RawStmt, index: c_int, value: &str) -> c_int {
      self.record("bind_text");
      unsafe { self.inner.bind_text(stmt, index, value) }
   }

   unsafe fn bind_blob(&self, stmt: RawStmt, index: c_int, value: &[u8]) -> c_int {
      self.record("bind_blob");
      unsafe { self.inner.bind_blob(stmt, index, value) }
   }

   unsafe fn bind_null(&self, stmt: RawStmt, index: c_int) -> c_int {
      self.record("bind_null");
      unsafe { self.inner.bind_null(stmt, index) }
   }

   unsafe fn step(&self, stmt: RawStmt) -> c_int {
      self.record("step");
      unsafe { self.inner.step(stmt) }
   }

   unsafe fn reset(&self, stmt: RawStmt) -> c_int {
      self.record("reset");
      unsafe { self.inner.reset(stmt) }
   }

   unsafe fn finalize(&self, stmt: RawStmt) -> c_int {
      self.record("finalize");
      unsafe { self.inner.finalize(stmt) }
   }

   unsafe fn column_count(&self, stmt: RawStmt) -> c_int {
      self.record("column_count");
      unsafe { self.inner.column_count(stmt) }
   }

   unsafe fn column_name(&self, stmt: RawStmt, i: c_int) -> Option<String> {
      self.record("column_name");
      unsafe { self.inner.column_name(stmt, i) }
   }

   unsafe fn column_decltype(&self, stmt: RawStmt, i: c_int) -> Option<String> {
      self.record("column_decltype");
      unsafe { self.inner.column_decltype(stmt, i) }
   }

   unsafe fn column_type(&self, stmt: RawStmt, i: c_int) -> c_int {
      self.record("column_type");
      unsafe { self.inner.column_type(stmt, i) }
   }

   unsafe fn column_int64(&self, stmt: RawStmt, i: c_int) -> i64 {
      self.record("column_int64");
      unsafe { self.inner.column_int64(stmt, i) }
   }

   unsafe fn column_double(&self, stmt: RawStmt, i: c_int) -> f64 {
      self.record("column_double");
      unsafe { self.inner.column_double(stmt, i) }
   }

   unsafe fn column_text(&self, stmt: RawStmt, i: c_int) -> String {
      self.record("column_text");
      unsafe { self.inner.column_text(stmt, i) }
   }

   unsafe fn column_blob(&self, stmt: RawStmt, i: c_int) -> Vec<u8> {
      self.record("column_blob");
      unsafe { self.inner.column_blob(stmt, i) }
   }

   unsafe fn column_bytes(&self, stmt: RawStmt, i: c_int) -> c_int {
      self.record("column_bytes");
      unsafe { self.inner.column_bytes(stmt, i) }
   }
}

/// A temporary directory plus a `file:` URI for a database inside it.
pub struct TestDb {
   pub dir: TempDir,
   pub path: PathBuf,
}

impl TestDb {
   pub fn new(name: &str) -> Self {
      let dir = TempDir::new().unwrap();
      let path = dir.path().join(name);
      Self { dir, path }
   }

   pub fn uri(&self) -> String {
      format!("file:{}?mode=rwc", self.path.display())
   }
}

pub fn open_memory() -> Connection {
   init_tracing();
   Connection::open(":memory:", Arc::new(LinkedBackend), None).unwrap()
}

pub fn open_with(backend: Arc<dyn Backend>, config: Option<ConnectionConfig>) -> Connection {
   init_tracing();
   Connection::open(":memory:", backend, config).unwrap()
}

/// Creates the `users` table used across the tests.
pub fn create_users(conn: &Connection) {
   conn
      .exec(
         r#"
         DROP TABLE IF EXISTS users;
         CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            age INTEGER
         );
         "#,
      )
      .unwrap();
}

pub fn insert_user(conn: &Connection, name: &str, age: i64) {
   let mut stmt = conn
      .prepare("INSERT INTO users (name, age) VALUES (?, ?);")
      .unwrap();
   stmt.bind_text(1, name).unwrap();
   stmt.bind_int(2, age).unwrap();
   stmt.exec().unwrap();
   stmt.close().unwrap();
}
