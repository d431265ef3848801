#![cfg(unix)]

mod common;

use std::sync::Arc;

use common::{TestDb, init_tracing};
use sqlite_backend_dynamic::DynamicBackend;
use sqlite_driver::{Connection, ConnectionConfig};

/// The system library, or `None` when the host has no SQLite installed.
fn load_backend() -> Option<Arc<DynamicBackend>> {
   init_tracing();
   match DynamicBackend::load() {
      Ok(backend) => Some(Arc::new(backend)),
      Err(e) => {
         eprintln!("skipping: {e}");
         None
      }
   }
}

#[test]
fn test_connection_round_trip_through_dynamic_backend() {
   let Some(backend) = load_backend() else {
      return;
   };
   let db = TestDb::new("dynamic.db");
   let config = ConnectionConfig::new().with_pragmas("journal_mode=WAL&busy_timeout=2500");

   let mut conn = Connection::open(&db.uri(), backend, Some(config)).unwrap();
   assert_eq!(conn.backend().name(), "dynamic");

   conn
      .exec("CREATE TABLE users (name TEXT NOT NULL, age INTEGER, avatar BLOB)")
      .unwrap();

   {
      let mut insert = conn
         .prepare("INSERT INTO users (name, age, avatar) VALUES (?, ?, ?)")
         .unwrap();
      insert.bind_text(1, "Alice").unwrap();
      insert.bind_int(2, 30).unwrap();
      insert.bind_blob(3, &[1, 2, 3]).unwrap();
      insert.exec().unwrap();

      insert.bind_text(1, "Bob").unwrap();
      insert.bind_null(2).unwrap();
      insert.bind_null(3).unwrap();
      insert.exec().unwrap();
   }
   assert_eq!(conn.last_insert_rowid().unwrap(), 2);

   {
      let mut select = conn
         .prepare("SELECT name, age, avatar FROM users ORDER BY rowid")
         .unwrap();
      let mut rows = select.query();

      assert!(rows.next().unwrap());
      assert_eq!(rows.get_text(0), "Alice");
      assert_eq!(rows.get_int64(1), 30);
      assert_eq!(rows.get_blob(2), vec![1, 2, 3]);

      assert!(rows.next().unwrap());
      assert_eq!(rows.get_text(0), "Bob");
      assert!(rows.is_null(1));
      assert_eq!(rows.get_int64(1), 0);

      assert!(!rows.next().unwrap());
      assert!(!rows.next().unwrap());
   }

   {
      let mut pragma = conn.prepare("PRAGMA busy_timeout").unwrap();
      let mut rows = pragma.query();
      assert!(rows.next().unwrap());
      assert_eq!(rows.get_int64(0), 2500);
   }

   conn.close().unwrap();
   conn.close().unwrap();
}

#[test]
fn test_dynamic_backend_errors_match_linked_format() {
   let Some(backend) = load_backend() else {
      return;
   };
   let conn = Connection::open(":memory:", backend, None).unwrap();

   let err = conn.prepare("SELECT * FROM missing_table").unwrap_err();
   assert_eq!(err.code(), 1);
   assert!(err.to_string().starts_with("sqlite3: no such table: missing_table"));

   let err = conn.prepare("   ").unwrap_err();
   assert_eq!(err.code(), 21);
}
