//! Shared library handle and the resolved SQLite symbol table.

use std::ffi::{CString, c_char, c_int, c_void};
use std::ptr::NonNull;

use sqlite_backend::marshal::from_foreign;

use crate::error::LoadError;

/// An open `dlopen` handle, closed on drop.
pub(crate) struct Library {
   handle: NonNull<c_void>,
   path: String,
}

// SAFETY: a dlopen handle is a process-wide token; dlsym and dlclose may be
// called on it from any thread.
unsafe impl Send for Library {}
unsafe impl Sync for Library {}

impl Library {
   pub(crate) fn open(path: &str) -> Result<Self, LoadError> {
      let c_path = CString::new(path).map_err(|_| LoadError::InvalidPath(path.to_string()))?;

      // SAFETY: c_path is NUL-terminated. RTLD_LOCAL keeps the loaded symbols
      // from clashing with a SQLite that may be linked into the process.
      let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };

      NonNull::new(handle)
         .map(|handle| Self {
            handle,
            path: path.to_string(),
         })
         .ok_or_else(|| LoadError::Open {
            path: path.to_string(),
            reason: last_dl_error(),
         })
   }

   pub(crate) fn path(&self) -> &str {
      &self.path
   }

   fn symbol(&self, name: &str) -> Result<*mut c_void, LoadError> {
      let missing = |reason: String| LoadError::MissingSymbol {
         path: self.path.clone(),
         symbol: name.to_string(),
         reason,
      };
      let c_name = CString::new(name).map_err(|_| missing("invalid symbol name".to_string()))?;

      // SAFETY: handle is a live dlopen handle and c_name is NUL-terminated.
      let address = unsafe { libc::dlsym(self.handle.as_ptr(), c_name.as_ptr()) };
      if address.is_null() {
         return Err(missing(last_dl_error()));
      }
      Ok(address)
   }
}

impl Drop for Library {
   fn drop(&mut self) {
      // SAFETY: handle came from dlopen and is closed exactly once here.
      unsafe {
         libc::dlclose(self.handle.as_ptr());
      }
   }
}

fn last_dl_error() -> String {
   // SAFETY: dlerror returns null or a NUL-terminated message owned by the loader.
   unsafe { from_foreign(libc::dlerror()) }.unwrap_or_else(|| "unknown loader error".to_string())
}

macro_rules! symbols {
   ($($field:ident: fn($($arg:ty),*) -> $ret:ty;)+) => {
      /// Function pointers resolved from the loaded library, one per
      /// `sqlite3_<name>` export.
      pub(crate) struct Symbols {
         $(pub(crate) $field: unsafe extern "C" fn($($arg),*) -> $ret,)+
      }

      impl Symbols {
         /// # Safety
         ///
         /// `library` must be a SQLite build and must stay loaded for as long
         /// as the returned table is used.
         pub(crate) unsafe fn resolve(library: &Library) -> Result<Self, LoadError> {
            Ok(Self {
               $($field: {
                  let address = library.symbol(concat!("sqlite3_", stringify!($field)))?;
                  // SAFETY: the export has the C signature declared in this table.
                  unsafe {
                     std::mem::transmute::<*mut c_void, unsafe extern "C" fn($($arg),*) -> $ret>(
                        address,
                     )
                  }
               },)+
            })
         }
      }
   };
}

// Database and statement handles cross as `*mut c_void`. Destructor arguments
// are pointer-sized integers so the transient marker (-1) can be passed as is.
symbols! {
   libversion: fn() -> *const c_char;
   open_v2: fn(*const c_char, *mut *mut c_void, c_int, *const c_char) -> c_int;
   close_v2: fn(*mut c_void) -> c_int;
   exec: fn(*mut c_void, *const c_char, *mut c_void, *mut c_void, *mut *mut c_char) -> c_int;
   extended_result_codes: fn(*mut c_void, c_int) -> c_int;
   changes: fn(*mut c_void) -> c_int;
   last_insert_rowid: fn(*mut c_void) -> i64;
   errmsg: fn(*mut c_void) -> *const c_char;
   errstr: fn(c_int) -> *const c_char;
   prepare_v2: fn(*mut c_void, *const c_char, c_int, *mut *mut c_void, *mut *const c_char) -> c_int;
   bind_parameter_count: fn(*mut c_void) -> c_int;
   bind_int64: fn(*mut c_void, c_int, i64) -> c_int;
   bind_double: fn(*mut c_void, c_int, f64) -> c_int;
   bind_text: fn(*mut c_void, c_int, *const c_char, c_int, isize) -> c_int;
   bind_blob: fn(*mut c_void, c_int, *const c_void, c_int, isize) -> c_int;
   bind_null: fn(*mut c_void, c_int) -> c_int;
   step: fn(*mut c_void) -> c_int;
   reset: fn(*mut c_void) -> c_int;
   finalize: fn(*mut c_void) -> c_int;
   column_count: fn(*mut c_void) -> c_int;
   column_name: fn(*mut c_void, c_int) -> *const c_char;
   column_decltype: fn(*mut c_void, c_int) -> *const c_char;
   column_type: fn(*mut c_void, c_int) -> c_int;
   column_int64: fn(*mut c_void, c_int) -> i64;
   column_double: fn(*mut c_void, c_int) -> f64;
   column_text: fn(*mut c_void, c_int) -> *const u8;
   column_blob: fn(*mut c_void, c_int) -> *const c_void;
   column_bytes: fn(*mut c_void, c_int) -> c_int;
}
