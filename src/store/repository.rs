// Keytable — Key Store Repository
//
// Maps the five keystore operations onto single SQL statements against a
// `(name TEXT PRIMARY KEY, data BLOB)` table. Key material is serialized by a
// `KeyCodec` and never logged.
//
// Key design decision: `put()` is one plain INSERT. Uniqueness is enforced by
// the table's primary key, so concurrent puts of the same new name produce
// exactly one winner and the rest fail with `AlreadyExists`.

use rusqlite::types::ValueRef;
use rusqlite::{ffi, params, OptionalExtension};
use zeroize::Zeroizing;

use crate::codec::{CodecError, EnvelopeCodec, KeyCodec};

use super::db::ConnectionPool;
use super::options::{KeystoreOptions, TableName};
use super::KeystoreError;

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Named private-key storage.
pub trait Keystore {
    type Key;

    /// Whether a key with this name exists.
    fn has(&self, name: &str) -> Result<bool, KeystoreError>;

    /// Store a new key. Fails with `AlreadyExists` rather than overwrite.
    fn put(&self, name: &str, key: &Self::Key) -> Result<(), KeystoreError>;

    /// Fetch and decode a key. Fails with `NotFound` if absent.
    fn get(&self, name: &str) -> Result<Self::Key, KeystoreError>;

    /// Remove a key. Removing an absent key is not an error.
    fn delete(&self, name: &str) -> Result<(), KeystoreError>;

    /// Names of all stored keys, in no particular order.
    fn list(&self) -> Result<Vec<String>, KeystoreError>;
}

// ─── SQL Implementation ─────────────────────────────────────────────────────

/// SQL text for one table, built once at construction.
struct Statements {
    exists: String,
    insert: String,
    select: String,
    delete: String,
    names: String,
}

impl Statements {
    fn for_table(table: &TableName) -> Self {
        Self {
            exists: format!("SELECT EXISTS(SELECT 1 FROM {} WHERE name = ?1)", table),
            insert: format!("INSERT INTO {} (name, data) VALUES (?1, ?2)", table),
            select: format!("SELECT data FROM {} WHERE name = ?1", table),
            delete: format!("DELETE FROM {} WHERE name = ?1", table),
            names: format!("SELECT name FROM {}", table),
        }
    }
}

/// Keystore backed by a pooled SQLite database.
pub struct SqlKeystore<C: KeyCodec = EnvelopeCodec> {
    pool: ConnectionPool,
    table: TableName,
    codec: C,
    sql: Statements,
}

impl SqlKeystore<EnvelopeCodec> {
    /// Connect to an existing database using the default key envelope codec.
    pub fn open(descriptor: &str, options: KeystoreOptions) -> Result<Self, KeystoreError> {
        Self::with_codec(descriptor, options, EnvelopeCodec)
    }
}

impl<C: KeyCodec> SqlKeystore<C> {
    /// Connect to an existing database with a caller-supplied codec.
    /// The table is expected to exist already.
    pub fn with_codec(
        descriptor: &str,
        options: KeystoreOptions,
        codec: C,
    ) -> Result<Self, KeystoreError> {
        let pool = ConnectionPool::open(descriptor, &options)?;
        let sql = Statements::for_table(&options.table);

        tracing::debug!(table = %options.table, "Keystore ready");

        Ok(Self {
            pool,
            table: options.table,
            codec,
            sql,
        })
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Release every pooled connection.
    pub fn close(self) -> Result<(), KeystoreError> {
        self.pool.close()
    }
}

fn validate_name(name: &str) -> Result<(), KeystoreError> {
    if name.is_empty() {
        return Err(KeystoreError::InvalidArgument(
            "key name must be at least one character".to_string(),
        ));
    }
    Ok(())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}

impl<C: KeyCodec> Keystore for SqlKeystore<C> {
    type Key = C::Key;

    fn has(&self, name: &str) -> Result<bool, KeystoreError> {
        let conn = self.pool.get()?;
        match conn.query_row(&self.sql.exists, params![name], |row| row.get::<_, bool>(0)) {
            Ok(exists) => Ok(exists),
            // EXISTS always yields a row; kept so a driver surprise still
            // reads as "absent" instead of an opaque failure
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(KeystoreError::NotFound(name.to_string()))
            }
            Err(e) => Err(KeystoreError::Query(e)),
        }
    }

    fn put(&self, name: &str, key: &Self::Key) -> Result<(), KeystoreError> {
        validate_name(name)?;
        let data = self.codec.marshal(key).map_err(KeystoreError::Serialization)?;

        let conn = self.pool.get()?;
        match conn.execute(&self.sql.insert, params![name, &data[..]]) {
            Ok(_) => {
                tracing::info!(table = %self.table, name = %name, "Key stored");
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!(table = %self.table, name = %name, "Key already exists");
                Err(KeystoreError::AlreadyExists(name.to_string()))
            }
            Err(e) => Err(KeystoreError::Query(e)),
        }
    }

    fn get(&self, name: &str) -> Result<Self::Key, KeystoreError> {
        let stored = {
            let conn = self.pool.get()?;
            conn.query_row(&self.sql.select, params![name], |row| {
                Ok(match row.get_ref(0)? {
                    ValueRef::Blob(bytes) | ValueRef::Text(bytes) => {
                        Some(Zeroizing::new(bytes.to_vec()))
                    }
                    ValueRef::Null => None,
                    other => {
                        return Err(rusqlite::Error::InvalidColumnType(
                            0,
                            "data".to_string(),
                            other.data_type(),
                        ))
                    }
                })
            })
            .optional()?
        };

        let data = match stored {
            None => return Err(KeystoreError::NotFound(name.to_string())),
            Some(None) => return Err(KeystoreError::Deserialization(CodecError::Empty)),
            Some(Some(data)) => data,
        };

        tracing::debug!(table = %self.table, name = %name, "Key loaded");
        self.codec
            .unmarshal(&data)
            .map_err(KeystoreError::Deserialization)
    }

    fn delete(&self, name: &str) -> Result<(), KeystoreError> {
        let conn = self.pool.get()?;
        let affected = conn.execute(&self.sql.delete, params![name])?;

        if affected > 0 {
            tracing::info!(table = %self.table, name = %name, "Key deleted");
        } else {
            tracing::debug!(table = %self.table, name = %name, "Delete of absent key ignored");
        }

        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, KeystoreError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare_cached(&self.sql.names)?;
        let mut rows = stmt.query([])?;

        let mut names = Vec::new();
        while let Some(row) = rows.next()? {
            // One undecodable row must not hide the rest
            match row.get::<_, String>(0) {
                Ok(name) => names.push(name),
                Err(e) => {
                    tracing::warn!(table = %self.table, error = %e, "Skipping key row with unreadable name");
                }
            }
        }

        Ok(names)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
