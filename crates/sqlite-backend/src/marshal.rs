//! String marshaling across the foreign boundary.

use std::ffi::{CStr, CString, NulError, c_char};

/// Converts a Rust string into a NUL-terminated buffer for the engine.
///
/// Fails when `s` contains an interior NUL byte, which the engine would
/// silently treat as the end of the string.
pub fn to_foreign(s: &str) -> Result<CString, NulError> {
   CString::new(s)
}

/// Copies a NUL-terminated foreign string into an owned `String`.
///
/// Returns `None` for a null pointer. Invalid UTF-8 is replaced lossily.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated buffer that stays valid
/// for the duration of this call.
pub unsafe fn from_foreign(ptr: *const c_char) -> Option<String> {
   if ptr.is_null() {
      return None;
   }
   // SAFETY: ptr is non-null and NUL-terminated (guaranteed by caller).
   let cstr = unsafe { CStr::from_ptr(ptr) };
   Some(cstr.to_string_lossy().into_owned())
}

/// Copies `len` foreign bytes into an owned vector.
///
/// # Safety
///
/// `ptr` must be null or valid for reads of `len` bytes.
pub unsafe fn bytes_from_foreign(ptr: *const u8, len: usize) -> Vec<u8> {
   if ptr.is_null() || len == 0 {
      return Vec::new();
   }
   // SAFETY: ptr is non-null and len bytes are readable (guaranteed by caller).
   unsafe { std::slice::from_raw_parts(ptr, len) }.to_vec()
}
