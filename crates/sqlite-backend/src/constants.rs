//! Backend-defined constant tables.
//!
//! The driver never compares a status code against a literal. Each backend
//! publishes the numeric encoding of the codes and flags it understands.

use std::ffi::c_int;

/// Status codes returned by foreign calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultCodes {
   /// Call succeeded.
   pub ok: c_int,
   /// `step` produced a row.
   pub row: c_int,
   /// `step` finished executing.
   pub done: c_int,
   /// Library used incorrectly. Also reported for driver-side misuse.
   pub misuse: c_int,
}

/// Dynamic storage classes reported by `column_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeCodes {
   pub integer: c_int,
   pub float: c_int,
   pub text: c_int,
   pub blob: c_int,
   pub null: c_int,
}

/// Flag bits accepted by `open_v2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlagBits {
   pub read_only: c_int,
   pub read_write: c_int,
   pub create: c_int,
   pub memory: c_int,
   pub no_mutex: c_int,
   pub full_mutex: c_int,
   pub uri: c_int,
   pub extended_result_codes: c_int,
}
