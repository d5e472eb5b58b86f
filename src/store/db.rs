// Keytable — SQLite Connection Pool
//
// A fixed set of live connections shared by every keystore operation. The
// database file must already exist; the pool never creates it, and never
// creates or migrates tables.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use rusqlite::{Connection, OpenFlags};

use super::{KeystoreError, KeystoreOptions};

/// Optional scheme prefix accepted on connection strings.
const SQLITE_SCHEME: &str = "sqlite://";

/// Pooled SQLite connections.
pub struct ConnectionPool {
    connections: Vec<Mutex<Connection>>,
    cursor: AtomicUsize,
    target: String,
}

impl ConnectionPool {
    /// Open `options.pool_size` connections to the database named by
    /// `descriptor` (a file path or a `file:` URI, optionally prefixed with
    /// `sqlite://`).
    pub fn open(descriptor: &str, options: &KeystoreOptions) -> Result<Self, KeystoreError> {
        options.validate()?;
        let target = parse_descriptor(descriptor)?;

        let mut connections = Vec::with_capacity(options.pool_size);
        for _ in 0..options.pool_size {
            connections.push(Mutex::new(open_connection(&target, options)?));
        }

        tracing::info!(
            database = %target,
            pool_size = options.pool_size,
            "Connection pool opened"
        );

        Ok(Self {
            connections,
            cursor: AtomicUsize::new(0),
            target,
        })
    }

    /// Check out a connection, preferring an idle one. Blocks when every
    /// connection is busy.
    pub fn get(&self) -> Result<MutexGuard<'_, Connection>, KeystoreError> {
        let len = self.connections.len();
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % len;

        for offset in 0..len {
            match self.connections[(start + offset) % len].try_lock() {
                Ok(guard) => return Ok(guard),
                // Statements run in autocommit mode, so a holder that
                // panicked cannot have left a transaction open.
                Err(TryLockError::Poisoned(poisoned)) => return Ok(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => continue,
            }
        }

        tracing::debug!(pool_size = len, "All pooled connections busy, waiting");
        Ok(self.connections[start]
            .lock()
            .unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of connections in the pool.
    pub fn size(&self) -> usize {
        self.connections.len()
    }

    /// Database path or URI the pool is connected to.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Close every connection. All connections are closed even if one fails;
    /// the first failure is returned.
    pub fn close(self) -> Result<(), KeystoreError> {
        let mut first_err = None;
        for slot in self.connections {
            let conn = slot.into_inner().unwrap_or_else(PoisonError::into_inner);
            if let Err((_, e)) = conn.close() {
                tracing::warn!(database = %self.target, error = %e, "Failed to close connection");
                if first_err.is_none() {
                    first_err = Some(KeystoreError::Connection(e.to_string()));
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => {
                tracing::info!(database = %self.target, "Connection pool closed");
                Ok(())
            }
        }
    }
}

fn parse_descriptor(descriptor: &str) -> Result<String, KeystoreError> {
    let target = descriptor.strip_prefix(SQLITE_SCHEME).unwrap_or(descriptor);

    if target.is_empty() {
        return Err(KeystoreError::Connection(
            "connection string is empty".to_string(),
        ));
    }
    if is_memory_target(target) && !has_query_param(target, "cache", "shared") {
        return Err(KeystoreError::Connection(
            "a private in-memory database cannot be shared by a pool; \
             use a file path or a shared-cache `file:` URI"
                .to_string(),
        ));
    }

    Ok(target.to_string())
}

/// Whether `target` names an in-memory database (`:memory:`,
/// `file::memory:` or a `file:` URI with `mode=memory`).
fn is_memory_target(target: &str) -> bool {
    target == ":memory:"
        || target.starts_with("file::memory:")
        || (target.starts_with("file:") && has_query_param(target, "mode", "memory"))
}

fn has_query_param(target: &str, key: &str, value: &str) -> bool {
    let Some((_, query)) = target.split_once('?') else {
        return false;
    };
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .any(|(k, v)| k == key && v == value)
}

fn open_connection(target: &str, options: &KeystoreOptions) -> Result<Connection, KeystoreError> {
    let connection_err = |e: rusqlite::Error| KeystoreError::Connection(format!("{}: {}", target, e));

    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let conn = Connection::open_with_flags(target, flags).map_err(connection_err)?;

    conn.busy_timeout(options.busy_timeout())
        .map_err(connection_err)?;

    if !is_memory_target(target) {
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .map_err(connection_err)?;
    }

    // Verify the connection is usable before handing it to callers
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        .map_err(connection_err)?;

    Ok(conn)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
