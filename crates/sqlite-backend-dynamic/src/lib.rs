//! [`Backend`] implementation over a SQLite shared library loaded at run time.
//!
//! Nothing is linked at build time. [`DynamicBackend::load`] opens the system
//! library through `dlopen`, resolves every `sqlite3_*` function the contract
//! needs, and fails up front if any is missing. The library stays loaded for
//! as long as the backend (and every connection holding it) is alive.
//!
//! Unix only.
//!
//! ```no_run
//! use sqlite_backend::Backend;
//! use sqlite_backend_dynamic::DynamicBackend;
//!
//! # fn example() -> Result<(), sqlite_backend_dynamic::LoadError> {
//! let backend = DynamicBackend::load()?;
//! println!("loaded SQLite {}", backend.version());
//! # Ok(())
//! # }
//! ```

#![cfg(unix)]

mod error;
mod library;

pub use error::LoadError;

use std::ffi::{CStr, c_char, c_int, c_void};
use std::fmt;
use std::ptr;

use sqlite_backend::marshal::bytes_from_foreign;
use sqlite_backend::{Backend, OpenFlagBits, RawDb, RawStmt, ResultCodes, TypeCodes};
use tracing::debug;

use crate::library::{Library, Symbols};

// Values from sqlite3.h. They are part of SQLite's stable ABI.
const RESULT_CODES: ResultCodes = ResultCodes {
   ok: 0,
   row: 100,
   done: 101,
   misuse: 21,
};

const TYPE_CODES: TypeCodes = TypeCodes {
   integer: 1,
   float: 2,
   text: 3,
   blob: 4,
   null: 5,
};

const OPEN_FLAGS: OpenFlagBits = OpenFlagBits {
   read_only: 0x0000_0001,
   read_write: 0x0000_0002,
   create: 0x0000_0004,
   uri: 0x0000_0040,
   memory: 0x0000_0080,
   no_mutex: 0x0000_8000,
   full_mutex: 0x0001_0000,
   extended_result_codes: 0x0200_0000,
};

const SQLITE_TOOBIG: c_int = 18;

/// `SQLITE_TRANSIENT`: the engine copies bound data before returning.
const TRANSIENT: isize = -1;

#[cfg(target_os = "macos")]
const DEFAULT_LIBRARY_NAMES: &[&str] = &["libsqlite3.dylib", "/usr/lib/libsqlite3.dylib"];

#[cfg(not(target_os = "macos"))]
const DEFAULT_LIBRARY_NAMES: &[&str] = &["libsqlite3.so.0", "libsqlite3.so"];

/// Backend calling a SQLite shared library opened at run time.
pub struct DynamicBackend {
   symbols: Symbols,
   library: Library,
}

impl fmt::Debug for DynamicBackend {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("DynamicBackend")
         .field("library", &self.library.path())
         .finish_non_exhaustive()
   }
}

impl DynamicBackend {
   /// Loads the first SQLite library found under the platform's default names.
   pub fn load() -> Result<Self, LoadError> {
      for name in DEFAULT_LIBRARY_NAMES {
         match Self::load_from(name) {
            Ok(backend) => return Ok(backend),
            Err(e) => debug!(library = *name, error = %e, "SQLite library candidate rejected"),
         }
      }
      Err(LoadError::NotFound {
         tried: DEFAULT_LIBRARY_NAMES.join(", "),
      })
   }

   /// Loads SQLite from an explicit library name or path.
   pub fn load_from(path: &str) -> Result<Self, LoadError> {
      let library = Library::open(path)?;
      // SAFETY: the table is stored next to the library it was resolved from
      // and both are dropped together.
      let symbols = unsafe { Symbols::resolve(&library)? };
      let backend = Self { symbols, library };
      debug!(library = path, version = %backend.version(), "Loaded SQLite shared library");
      Ok(backend)
   }

   /// Path or name the library was loaded from.
   pub fn library_path(&self) -> &str {
      self.library.path()
   }
}

fn db_ptr(db: RawDb) -> *mut c_void {
   db.as_ptr::<c_void>()
}

fn stmt_ptr(stmt: RawStmt) -> *mut c_void {
   stmt.as_ptr::<c_void>()
}

impl Backend for DynamicBackend {
   fn name(&self) -> &'static str {
      "dynamic"
   }

   fn version(&self) -> String {
      // SAFETY: sqlite3_libversion returns a pointer to a static string.
      unsafe { self.from_foreign((self.symbols.libversion)()) }.unwrap_or_default()
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
      let mut db: *mut c_void = ptr::null_mut();
      let vfs = vfs.map_or(ptr::null(), CStr::as_ptr);
      // SAFETY: filename and vfs are NUL-terminated, db is a valid out-pointer.
      let rc = unsafe { (self.symbols.open_v2)(filename.as_ptr(), &mut db, flags, vfs) };
      (rc, RawDb::from_ptr(db))
   }

   unsafe fn close_v2(&self, db: RawDb) -> c_int {
      // SAFETY: db is live.
      unsafe { (self.symbols.close_v2)(db_ptr(db)) }
   }

   unsafe fn exec(&self, db: RawDb, sql: &CStr) -> c_int {
      // SAFETY: db is live, sql is NUL-terminated, no callback or message out-pointer.
      unsafe {
         (self.symbols.exec)(
            db_ptr(db),
            sql.as_ptr(),
            ptr::null_mut(),
            ptr::null_mut(),
            ptr::null_mut(),
         )
      }
   }

   unsafe fn extended_result_codes(&self, db: RawDb, on: bool) -> c_int {
      // SAFETY: db is live.
      unsafe { (self.symbols.extended_result_codes)(db_ptr(db), c_int::from(on)) }
   }

   unsafe fn changes(&self, db: RawDb) -> i64 {
      // SAFETY: db is live.
      i64::from(unsafe { (self.symbols.changes)(db_ptr(db)) })
   }

   unsafe fn last_insert_rowid(&self, db: RawDb) -> i64 {
      // SAFETY: db is live.
      unsafe { (self.symbols.last_insert_rowid)(db_ptr(db)) }
   }

   unsafe fn errmsg(&self, db: RawDb) -> String {
      // SAFETY: db is live.
      unsafe { self.from_foreign((self.symbols.errmsg)(db_ptr(db))) }.unwrap_or_default()
   }

   fn errstr(&self, rc: c_int) -> String {
      // SAFETY: sqlite3_errstr accepts any code and returns a static string.
      unsafe { self.from_foreign((self.symbols.errstr)(rc)) }.unwrap_or_default()
   }

   unsafe fn prepare_v2(&self, db: RawDb, sql: &CStr) -> (c_int, Option<RawStmt>) {
      let mut stmt: *mut c_void = ptr::null_mut();
      // SAFETY: db is live, sql is NUL-terminated, stmt is a valid out-pointer.
      let rc = unsafe {
         (self.symbols.prepare_v2)(db_ptr(db), sql.as_ptr(), -1, &mut stmt, ptr::null_mut())
      };
      (rc, RawStmt::from_ptr(stmt))
   }

   unsafe fn bind_parameter_count(&self, stmt: RawStmt) -> c_int {
      // SAFETY: stmt is live.
      unsafe { (self.symbols.bind_parameter_count)(stmt_ptr(stmt)) }
   }

   unsafe fn bind_int64(&self, stmt: RawStmt, index: c_int, value: i64) -> c_int {
      // SAFETY: stmt is live.
      unsafe { (self.symbols.bind_int64)(stmt_ptr(stmt), index, value) }
   }

   unsafe fn bind_double(&self, stmt: RawStmt, index: c_int, value: f64) -> c_int {
      // SAFETY: stmt is live.
      unsafe { (self.symbols.bind_double)(stmt_ptr(stmt), index, value) }
   }

   unsafe fn bind_text(&self, stmt: RawStmt, index: c_int, value: &str) -> c_int {
      let Ok(len) = c_int::try_from(value.len()) else {
         return SQLITE_TOOBIG;
      };
      // SAFETY: stmt is live; value is valid for len bytes and copied by SQLite.
      unsafe {
         (self.symbols.bind_text)(
            stmt_ptr(stmt),
            index,
            value.as_ptr().cast::<c_char>(),
            len,
            TRANSIENT,
         )
      }
   }

   unsafe fn bind_blob(&self, stmt: RawStmt, index: c_int, value: &[u8]) -> c_int {
      let Ok(len) = c_int::try_from(value.len()) else {
         return SQLITE_TOOBIG;
      };
      // SAFETY: stmt is live; value is valid for len bytes and copied by SQLite.
      unsafe {
         (self.symbols.bind_blob)(
            stmt_ptr(stmt),
            index,
            value.as_ptr().cast::<c_void>(),
            len,
            TRANSIENT,
         )
      }
   }

   unsafe fn bind_null(&self, stmt: RawStmt, index: c_int) -> c_int {
      // SAFETY: stmt is live.
      unsafe { (self.symbols.bind_null)(stmt_ptr(stmt), index) }
   }

   unsafe fn step(&self, stmt: RawStmt) -> c_int {
      // SAFETY: stmt is live.
      unsafe { (self.symbols.step)(stmt_ptr(stmt)) }
   }

   unsafe fn reset(&self, stmt: RawStmt) -> c_int {
      // SAFETY: stmt is live.
      unsafe { (self.symbols.reset)(stmt_ptr(stmt)) }
   }

   unsafe fn finalize(&self, stmt: RawStmt) -> c_int {
      // SAFETY: stmt is live.
      unsafe { (self.symbols.finalize)(stmt_ptr(stmt)) }
   }

   unsafe fn column_count(&self, stmt: RawStmt) -> c_int {
      // SAFETY: stmt is live.
      unsafe { (self.symbols.column_count)(stmt_ptr(stmt)) }
   }

   unsafe fn column_name(&self, stmt: RawStmt, i: c_int) -> Option<String> {
      // SAFETY: stmt is live.
      unsafe { self.from_foreign((self.symbols.column_name)(stmt_ptr(stmt), i)) }
   }

   unsafe fn column_decltype(&self, stmt: RawStmt, i: c_int) -> Option<String> {
      // SAFETY: stmt is live.
      unsafe { self.from_foreign((self.symbols.column_decltype)(stmt_ptr(stmt), i)) }
   }

   unsafe fn column_type(&self, stmt: RawStmt, i: c_int) -> c_int {
      // SAFETY: stmt is live and on a row.
      unsafe { (self.symbols.column_type)(stmt_ptr(stmt), i) }
   }

   unsafe fn column_int64(&self, stmt: RawStmt, i: c_int) -> i64 {
      // SAFETY: stmt is live and on a row.
      unsafe { (self.symbols.column_int64)(stmt_ptr(stmt), i) }
   }

   unsafe fn column_double(&self, stmt: RawStmt, i: c_int) -> f64 {
      // SAFETY: stmt is live and on a row.
      unsafe { (self.symbols.column_double)(stmt_ptr(stmt), i) }
   }

   unsafe fn column_text(&self, stmt: RawStmt, i: c_int) -> String {
      let stmt = stmt_ptr(stmt);
      // SAFETY: stmt is live and on a row; text is fetched before its length.
      unsafe {
         let text = (self.symbols.column_text)(stmt, i);
         let len = usize::try_from((self.symbols.column_bytes)(stmt, i)).unwrap_or(0);
         String::from_utf8_lossy(&bytes_from_foreign(text, len)).into_owned()
      }
   }

   unsafe fn column_blob(&self, stmt: RawStmt, i: c_int) -> Vec<u8> {
      let stmt = stmt_ptr(stmt);
      // SAFETY: stmt is live and on a row; blob is fetched before its length.
      unsafe {
         let blob = (self.symbols.column_blob)(stmt, i);
         let len = usize::try_from((self.symbols.column_bytes)(stmt, i)).unwrap_or(0);
         bytes_from_foreign(blob.cast::<u8>(), len)
      }
   }

   unsafe fn column_bytes(&self, stmt: RawStmt, i: c_int) -> c_int {
      // SAFETY: stmt is live and on a row.
      unsafe { (self.symbols.column_bytes)(stmt_ptr(stmt), i) }
   }
}
