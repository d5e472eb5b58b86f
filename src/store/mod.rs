// Keytable — Store Module
//
// Named private-key storage over a single SQLite table. The table must be
// created by the operator before the store is opened:
//
//   CREATE TABLE keys (name TEXT NOT NULL PRIMARY KEY, data BLOB);

mod db;
mod error;
mod options;
mod repository;

pub use db::ConnectionPool;
pub use error::KeystoreError;
pub use options::{KeystoreOptions, TableName, DEFAULT_TABLE};
pub use repository::{Keystore, SqlKeystore};
