//! [`Backend`] implementation over SQLite linked at build time.
//!
//! Calls go straight to the `libsqlite3-sys` bindings. With the default
//! `bundled` feature SQLite is compiled from source; without it the system
//! library is linked.

use std::ffi::{CStr, c_char, c_int};
use std::ptr;

use libsqlite3_sys::{
   SQLITE_BLOB, SQLITE_DONE, SQLITE_FLOAT, SQLITE_INTEGER, SQLITE_MISUSE, SQLITE_NULL, SQLITE_OK,
   SQLITE_OPEN_CREATE, SQLITE_OPEN_EXRESCODE, SQLITE_OPEN_FULLMUTEX, SQLITE_OPEN_MEMORY,
   SQLITE_OPEN_NOMUTEX, SQLITE_OPEN_READONLY, SQLITE_OPEN_READWRITE, SQLITE_OPEN_URI,
   SQLITE_ROW, SQLITE_TEXT, SQLITE_TOOBIG, SQLITE_TRANSIENT, sqlite3,
   sqlite3_bind_blob, sqlite3_bind_double, sqlite3_bind_int64, sqlite3_bind_null,
   sqlite3_bind_parameter_count, sqlite3_bind_text, sqlite3_changes,
   sqlite3_column_blob, sqlite3_column_bytes, sqlite3_column_count, sqlite3_column_decltype,
   sqlite3_column_double, sqlite3_column_int64, sqlite3_column_name, sqlite3_column_text,
   sqlite3_column_type, sqlite3_errmsg, sqlite3_errstr, sqlite3_exec,
   sqlite3_extended_result_codes, sqlite3_finalize, sqlite3_last_insert_rowid,
   sqlite3_libversion, sqlite3_open_v2, sqlite3_prepare_v2, sqlite3_reset, sqlite3_step,
   sqlite3_stmt,
};
use sqlite_backend::marshal::bytes_from_foreign;
use sqlite_backend::{Backend, OpenFlagBits, RawDb, RawStmt, ResultCodes, TypeCodes};

// libsqlite3-sys leaves this out of its generated bindings, but every SQLite
// since 3.7.14 exports it, including the bundled build.
unsafe extern "C" {
   fn sqlite3_close_v2(db: *mut sqlite3) -> c_int;
}

const RESULT_CODES: ResultCodes = ResultCodes {
   ok: SQLITE_OK,
   row: SQLITE_ROW,
   done: SQLITE_DONE,
   misuse: SQLITE_MISUSE,
};

const TYPE_CODES: TypeCodes = TypeCodes {
   integer: SQLITE_INTEGER,
   float: SQLITE_FLOAT,
   text: SQLITE_TEXT,
   blob: SQLITE_BLOB,
   null: SQLITE_NULL,
};

const OPEN_FLAGS: OpenFlagBits = OpenFlagBits {
   read_only: SQLITE_OPEN_READONLY,
   read_write: SQLITE_OPEN_READWRITE,
   create: SQLITE_OPEN_CREATE,
   memory: SQLITE_OPEN_MEMORY,
   no_mutex: SQLITE_OPEN_NOMUTEX,
   full_mutex: SQLITE_OPEN_FULLMUTEX,
   uri: SQLITE_OPEN_URI,
   extended_result_codes: SQLITE_OPEN_EXRESCODE,
};

/// Backend calling the SQLite library linked into this binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkedBackend;

impl LinkedBackend {
   pub fn new() -> Self {
      Self
   }
}

fn db_ptr(db: RawDb) -> *mut sqlite3 {
   db.as_ptr::<sqlite3>()
}

fn stmt_ptr(stmt: RawStmt) -> *mut sqlite3_stmt {
   stmt.as_ptr::<sqlite3_stmt>()
}

impl Backend for LinkedBackend {
   fn name(&self) -> &'static str {
      "linked"
   }

   fn version(&self) -> String {
      // SAFETY: sqlite3_libversion returns a pointer to a static string.
      unsafe { self.from_foreign(sqlite3_libversion()) }.unwrap_or_default()
   }

   fn result_codes(&self) -> ResultCodes {
      RESULT_CODES
   }

   fn type_codes(&self) -> TypeCodes {
      TYPE_CODES
   }

   fn open_flags(&self) -> OpenFlagBits {
      OPEN_FLAGS
   }

   unsafe fn open_v2(
      &self,
      filename: &CStr,
      flags: c_int,
      vfs: Option<&CStr>,
   ) -> (c_int, Option<RawDb>) {
      let mut db: *mut sqlite3 = ptr::null_mut();
      let vfs = vfs.map_or(ptr::null(), CStr::as_ptr);
      // SAFETY: filename and vfs are NUL-terminated, db is a valid out-pointer.
      let rc = unsafe { sqlite3_open_v2(filename.as_ptr(), &mut db, flags, vfs) };
      (rc, RawDb::from_ptr(db))
   }

   unsafe fn close_v2(&self, db: RawDb) -> c_int {
      // SAFETY: db is live (guaranteed by caller).
      unsafe { sqlite3_close_v2(db_ptr(db)) }
   }

   unsafe fn exec(&self, db: RawDb, sql: &CStr) -> c_int {
      // SAFETY: db is live and sql is NUL-terminated. No callback, and the
      // error message is read later through sqlite3_errmsg.
      unsafe { sqlite3_exec(db_ptr(db), sql.as_ptr(), None, ptr::null_mut(), ptr::null_mut()) }
   }

   unsafe fn extended_result_codes(&self, db: RawDb, on: bool) -> c_int {
      // SAFETY: db is live.
      unsafe { sqlite3_extended_result_codes(db_ptr(db), c_int::from(on)) }
   }

   unsafe fn changes(&self, db: RawDb) -> i64 {
      // SAFETY: db is live.
      i64::from(unsafe { sqlite3_changes(db_ptr(db)) })
   }

   unsafe fn last_insert_rowid(&self, db: RawDb) -> i64 {
      // SAFETY: db is live.
      unsafe { sqlite3_last_insert_rowid(db_ptr(db)) }
   }

   unsafe fn errmsg(&self, db: RawDb) -> String {
      // SAFETY: db is live; the message stays valid until the next call on db.
      unsafe { self.from_foreign(sqlite3_errmsg(db_ptr(db))) }.unwrap_or_default()
   }

   fn errstr(&self, rc: c_int) -> String {
      // SAFETY: sqlite3_errstr accepts any code and returns a static string.
      unsafe { self.from_foreign(sqlite3_errstr(rc)) }.unwrap_or_default()
   }

   unsafe fn prepare_v2(&self, db: RawDb, sql: &CStr) -> (c_int, Option<RawStmt>) {
      let mut stmt: *mut sqlite3_stmt = ptr::null_mut();
      // SAFETY: db is live, sql is NUL-terminated (nByte = -1), stmt is a valid
      // out-pointer and the tail pointer is not requested.
      let rc =
         unsafe { sqlite3_prepare_v2(db_ptr(db), sql.as_ptr(), -1, &mut stmt, ptr::null_mut()) };
      (rc, RawStmt::from_ptr(stmt))
   }

   unsafe fn bind_parameter_count(&self, stmt: RawStmt) -> c_int {
      // SAFETY: stmt is live.
      unsafe { sqlite3_bind_parameter_count(stmt_ptr(stmt)) }
   }

   unsafe fn bind_int64(&self, stmt: RawStmt, index: c_int, value: i64) -> c_int {
      // SAFETY: stmt is live.
      unsafe { sqlite3_bind_int64(stmt_ptr(stmt), index, value) }
   }

   unsafe fn bind_double(&self, stmt: RawStmt, index: c_int, value: f64) -> c_int {
      // SAFETY: stmt is live.
      unsafe { sqlite3_bind_double(stmt_ptr(stmt), index, value) }
   }

   unsafe fn bind_text(&self, stmt: RawStmt, index: c_int, value: &str) -> c_int {
      let Ok(len) = c_int::try_from(value.len()) else {
         return SQLITE_TOOBIG;
      };
      // SAFETY: stmt is live; value is valid for len bytes and SQLITE_TRANSIENT
      // makes SQLite copy it before returning.
      unsafe {
         sqlite3_bind_text(
            stmt_ptr(stmt),
            index,
            value.as_ptr().cast::<c_char>(),
            len,
            SQLITE_TRANSIENT(),
         )
      }
   }

   unsafe fn bind_blob(&self, stmt: RawStmt, index: c_int, value: &[u8]) -> c_int {
      let Ok(len) = c_int::try_from(value.len()) else {
         return SQLITE_TOOBIG;
      };
      // SAFETY: as bind_text. An empty slice still has a non-null pointer, so
      // a zero-length blob is bound rather than NULL.
      unsafe {
         sqlite3_bind_blob(stmt_ptr(stmt), index, value.as_ptr().cast(), len, SQLITE_TRANSIENT())
      }
   }

   unsafe fn bind_null(&self, stmt: RawStmt, index: c_int) -> c_int {
      // SAFETY: stmt is live.
      unsafe { sqlite3_bind_null(stmt_ptr(stmt), index) }
   }

   unsafe fn step(&self, stmt: RawStmt) -> c_int {
      // SAFETY: stmt is live.
      unsafe { sqlite3_step(stmt_ptr(stmt)) }
   }

   unsafe fn reset(&self, stmt: RawStmt) -> c_int {
      // SAFETY: stmt is live.
      unsafe { sqlite3_reset(stmt_ptr(stmt)) }
   }

   unsafe fn finalize(&self, stmt: RawStmt) -> c_int {
      // SAFETY: stmt is live.
      unsafe { sqlite3_finalize(stmt_ptr(stmt)) }
   }

   unsafe fn column_count(&self, stmt: RawStmt) -> c_int {
      // SAFETY: stmt is live.
      unsafe { sqlite3_column_count(stmt_ptr(stmt)) }
   }

   unsafe fn column_name(&self, stmt: RawStmt, i: c_int) -> Option<String> {
      // SAFETY: stmt is live; SQLite returns null for an out-of-range index.
      unsafe { self.from_foreign(sqlite3_column_name(stmt_ptr(stmt), i)) }
   }

   unsafe fn column_decltype(&self, stmt: RawStmt, i: c_int) -> Option<String> {
      // SAFETY: stmt is live; null for expressions and out-of-range indexes.
      unsafe { self.from_foreign(sqlite3_column_decltype(stmt_ptr(stmt), i)) }
   }

   unsafe fn column_type(&self, stmt: RawStmt, i: c_int) -> c_int {
      // SAFETY: stmt is live and on a row.
      unsafe { sqlite3_column_type(stmt_ptr(stmt), i) }
   }

   unsafe fn column_int64(&self, stmt: RawStmt, i: c_int) -> i64 {
      // SAFETY: stmt is live and on a row.
      unsafe { sqlite3_column_int64(stmt_ptr(stmt), i) }
   }

   unsafe fn column_double(&self, stmt: RawStmt, i: c_int) -> f64 {
      // SAFETY: stmt is live and on a row.
      unsafe { sqlite3_column_double(stmt_ptr(stmt), i) }
   }

   unsafe fn column_text(&self, stmt: RawStmt, i: c_int) -> String {
      let stmt = stmt_ptr(stmt);
      // SAFETY: stmt is live and on a row. The text pointer must be fetched
      // before the byte count, and both stay valid until the next step/reset.
      unsafe {
         let text = sqlite3_column_text(stmt, i);
         let len = usize::try_from(sqlite3_column_bytes(stmt, i)).unwrap_or(0);
         String::from_utf8_lossy(&bytes_from_foreign(text, len)).into_owned()
      }
   }

   unsafe fn column_blob(&self, stmt: RawStmt, i: c_int) -> Vec<u8> {
      let stmt = stmt_ptr(stmt);
      // SAFETY: same ordering rule as column_text.
      unsafe {
         let blob = sqlite3_column_blob(stmt, i);
         let len = usize::try_from(sqlite3_column_bytes(stmt, i)).unwrap_or(0);
         bytes_from_foreign(blob.cast::<u8>(), len)
      }
   }

   unsafe fn column_bytes(&self, stmt: RawStmt, i: c_int) -> c_int {
      // SAFETY: stmt is live and on a row.
      unsafe { sqlite3_column_bytes(stmt_ptr(stmt), i) }
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use libsqlite3_sys::{SQLITE_CANTOPEN, SQLITE_RANGE};
   use std::ffi::CString;

   fn open_memory(backend: &LinkedBackend) -> RawDb {
      let flags = OPEN_FLAGS.read_write | OPEN_FLAGS.create | OPEN_FLAGS.uri;
      let name = CString::new(":memory:").unwrap();
      let (rc, db) = unsafe { backend.open_v2(&name, flags, None) };
      assert_eq!(rc, SQLITE_OK);
      db.unwrap()
   }

   #[test]
   fn test_version_is_reported() {
      assert!(LinkedBackend.version().starts_with('3'));
   }

   #[test]
   fn test_errstr_for_known_code() {
      assert_eq!(LinkedBackend.errstr(SQLITE_MISUSE), "bad parameter or other API misuse");
   }

   #[test]
   fn test_prepare_step_and_read_columns() {
      let backend = LinkedBackend::new();
      let db = open_memory(&backend);
      let sql = CString::new("SELECT 42 AS answer, 'hi', NULL, 1.5").unwrap();

      unsafe {
         let (rc, stmt) = backend.prepare_v2(db, &sql);
         assert_eq!(rc, SQLITE_OK);
         let stmt = stmt.unwrap();

         assert_eq!(backend.column_count(stmt), 4);
         assert_eq!(backend.column_name(stmt, 0).as_deref(), Some("answer"));
         assert_eq!(backend.step(stmt), SQLITE_ROW);
         assert_eq!(backend.column_int64(stmt, 0), 42);
         assert_eq!(backend.column_text(stmt, 1), "hi");
         assert_eq!(backend.column_type(stmt, 2), SQLITE_NULL);
         assert_eq!(backend.column_double(stmt, 3), 1.5);
         assert_eq!(backend.step(stmt), SQLITE_DONE);
         assert_eq!(backend.finalize(stmt), SQLITE_OK);
         assert_eq!(backend.close_v2(db), SQLITE_OK);
      }
   }

   #[test]
   fn test_bind_out_of_range_is_reported_by_engine() {
      let backend = LinkedBackend::new();
      let db = open_memory(&backend);
      let sql = CString::new("SELECT ?").unwrap();

      unsafe {
         let (_, stmt) = backend.prepare_v2(db, &sql);
         let stmt = stmt.unwrap();
         assert_eq!(backend.bind_parameter_count(stmt), 1);
         assert_eq!(backend.bind_int64(stmt, 2, 7), SQLITE_RANGE);
         assert_eq!(backend.finalize(stmt), SQLITE_OK);
         assert_eq!(backend.close_v2(db), SQLITE_OK);
      }
   }

   #[test]
   fn test_prepare_of_blank_text_yields_no_handle() {
      let backend = LinkedBackend::new();
      let db = open_memory(&backend);
      let sql = CString::new("  -- nothing here").unwrap();

      unsafe {
         let (rc, stmt) = backend.prepare_v2(db, &sql);
         assert_eq!(rc, SQLITE_OK);
         assert!(stmt.is_none());
         assert_eq!(backend.close_v2(db), SQLITE_OK);
      }
   }

   #[test]
   fn test_close_v2_releases_handle_from_failed_open() {
      let backend = LinkedBackend::new();
      let dir = tempfile::TempDir::new().unwrap();
      let path = dir.path().join("missing").join("x.db");
      let name = CString::new(path.to_str().unwrap()).unwrap();
      let flags = OPEN_FLAGS.read_write | OPEN_FLAGS.create;

      unsafe {
         let (rc, db) = backend.open_v2(&name, flags, None);
         assert_eq!(rc & 0xff, SQLITE_CANTOPEN);
         let db = db.expect("SQLite allocates a handle even when the open fails");
         assert_eq!(backend.close_v2(db), SQLITE_OK);
      }
   }
}
