//! Opaque tokens for foreign SQLite resources.

use std::ffi::c_void;
use std::ptr::NonNull;

/// Token identifying an open database inside a backend.
///
/// A `RawDb` carries no ownership. The driver keeps it inside an owning
/// wrapper that releases it exactly once; backends only cast it back to their
/// native pointer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawDb(NonNull<c_void>);

/// Token identifying one compiled statement inside a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawStmt(NonNull<c_void>);

macro_rules! impl_raw_handle {
   ($name:ident) => {
      impl $name {
         /// Wraps a native pointer, returning `None` for null.
         pub fn from_ptr<T>(ptr: *mut T) -> Option<Self> {
            NonNull::new(ptr.cast::<c_void>()).map(Self)
         }

         /// Returns the native pointer this token was created from.
         pub fn as_ptr<T>(self) -> *mut T {
            self.0.as_ptr().cast::<T>()
         }
      }
   };
}

impl_raw_handle!(RawDb);
impl_raw_handle!(RawStmt);
