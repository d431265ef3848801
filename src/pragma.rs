//! URL-encoded pragma strings applied when a connection opens.

use indexmap::IndexMap;
use thiserror::Error;

/// Pragma applied before every other one, so lock waits are already in
/// effect while WAL recovery runs.
pub(crate) const BUSY_TIMEOUT: &str = "busy_timeout";

/// Milliseconds used when the caller does not set `busy_timeout`.
pub(crate) const DEFAULT_BUSY_TIMEOUT: &str = "1000";

#[derive(Error, Debug, PartialEq, Eq)]
pub(crate) enum PragmaError {
   #[error("malformed pragma string: invalid semicolon separator")]
   Semicolon,

   #[error("malformed pragma string: {0}")]
   Encoding(String),

   #[error("invalid pragma name '{0}'")]
   InvalidName(String),
}

/// Ordered `key -> value` pairs parsed from `a=1&b=2`.
///
/// Caller order is kept; the first occurrence of a repeated key wins.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Pragmas {
   entries: IndexMap<String, String>,
}

impl Pragmas {
   pub(crate) fn parse(input: &str) -> Result<Self, PragmaError> {
      let mut entries = IndexMap::new();

      for segment in input.split('&').filter(|s| !s.is_empty()) {
         if segment.contains(';') {
            return Err(PragmaError::Semicolon);
         }
         let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
         let key = decode_component(key)?;
         let value = decode_component(value)?;

         if !is_pragma_name(&key) {
            return Err(PragmaError::InvalidName(key));
         }
         entries.entry(key).or_insert(value);
      }

      Ok(Self { entries })
   }

   /// Removes and returns the busy timeout, falling back to the default when
   /// the key is absent or has no value.
   pub(crate) fn take_busy_timeout(&mut self) -> String {
      self
         .entries
         .shift_remove(BUSY_TIMEOUT)
         .filter(|value| !value.is_empty())
         .unwrap_or_else(|| DEFAULT_BUSY_TIMEOUT.to_string())
   }

   pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
      self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
   }

   #[cfg(test)]
   fn len(&self) -> usize {
      self.entries.len()
   }
}

/// Renders the statement that applies one pragma. A key without a value
/// renders as a bare `PRAGMA key`.
pub(crate) fn pragma_statement(key: &str, value: &str) -> String {
   if value.is_empty() {
      format!("PRAGMA {key}")
   } else {
      format!("PRAGMA {key}={value}")
   }
}

/// Form decoding: `+` is a space, then percent escapes.
fn decode_component(raw: &str) -> Result<String, PragmaError> {
   let spaced = raw.replace('+', " ");
   let decoded = urlencoding::decode(&spaced).map_err(|e| PragmaError::Encoding(e.to_string()))?;
   if decoded.contains(';') {
      return Err(PragmaError::Semicolon);
   }
   Ok(decoded.into_owned())
}

/// An identifier, optionally qualified by a schema name (`aux.journal_mode`).
fn is_pragma_name(name: &str) -> bool {
   let is_identifier = |part: &str| {
      let mut chars = part.chars();
      matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
         && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
   };

   match name.split_once('.') {
      Some((schema, pragma)) => is_identifier(schema) && is_identifier(pragma),
      None => is_identifier(name),
   }
}
