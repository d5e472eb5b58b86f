// Keytable — Keystore options
//
// The table name is interpolated into SQL text (identifiers cannot be bound
// as parameters), so it is validated against a strict identifier allowlist
// before any statement is built.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::KeystoreError;

/// Table used when no other name is configured.
pub const DEFAULT_TABLE: &str = "keys";

const DEFAULT_POOL_SIZE: usize = 4;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Longest accepted identifier segment.
const MAX_IDENTIFIER_LEN: usize = 64;

/// A validated table identifier, optionally schema-qualified (`schema.table`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    pub fn new(name: impl Into<String>) -> Result<Self, KeystoreError> {
        let name = name.into();
        let segments: Vec<&str> = name.split('.').collect();
        if segments.len() > 2 || !segments.iter().all(|s| is_identifier(s)) {
            return Err(KeystoreError::InvalidArgument(format!(
                "table name '{}' is not a valid identifier",
                name
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    let starts_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    starts_ok
        && segment.len() <= MAX_IDENTIFIER_LEN
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Default for TableName {
    fn default() -> Self {
        Self(DEFAULT_TABLE.to_string())
    }
}

impl TryFrom<String> for TableName {
    type Error = KeystoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TableName> for String {
    fn from(value: TableName) -> Self {
        value.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Construction-time configuration for a keystore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeystoreOptions {
    /// Table holding the `(name, data)` rows.
    pub table: TableName,
    /// Number of pooled connections.
    pub pool_size: usize,
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout_ms: u64,
}

impl Default for KeystoreOptions {
    fn default() -> Self {
        Self {
            table: TableName::default(),
            pool_size: DEFAULT_POOL_SIZE,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl KeystoreOptions {
    /// Set the table name. An empty name leaves the current one in place.
    pub fn with_table(mut self, table: &str) -> Result<Self, KeystoreError> {
        if !table.is_empty() {
            self.table = TableName::new(table)?;
        }
        Ok(self)
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Reject settings the pool cannot be built with.
    pub fn validate(&self) -> Result<(), KeystoreError> {
        if self.pool_size == 0 {
            return Err(KeystoreError::InvalidArgument(
                "pool_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = KeystoreOptions::default();
        assert_eq!(opts.table.as_str(), "keys");
        assert_eq!(opts.pool_size, 4);
        assert_eq!(opts.busy_timeout(), Duration::from_secs(5));
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_empty_table_keeps_default() {
        let opts = KeystoreOptions::default().with_table("").unwrap();
        assert_eq!(opts.table.as_str(), DEFAULT_TABLE);
    }

    #[test]
    fn test_custom_table_is_applied() {
        let opts = KeystoreOptions::default().with_table("node_keys").unwrap();
        assert_eq!(opts.table.to_string(), "node_keys");
    }

    #[test]
    fn test_schema_qualified_table_is_accepted() {
        assert!(TableName::new("main.keys").is_ok());
        assert!(TableName::new("_private._keys2").is_ok());
    }

    #[test]
    fn test_invalid_table_names_are_rejected() {
        let bad = [
            "",
            "1keys",
            "keys; DROP TABLE keys",
            "keys--",
            "a.b.c",
            "main.",
            ".keys",
            "ключи",
            "\"keys\"",
        ];
        for name in bad {
            let result = TableName::new(name);
            assert!(
                matches!(result, Err(KeystoreError::InvalidArgument(_))),
                "'{}' should be rejected",
                name
            );
        }

        let too_long = "k".repeat(MAX_IDENTIFIER_LEN + 1);
        assert!(TableName::new(too_long).is_err());
    }

    #[test]
    fn test_with_table_propagates_validation_error() {
        let result = KeystoreOptions::default().with_table("bad name");
        assert!(matches!(result, Err(KeystoreError::InvalidArgument(_))));
    }

    #[test]
    fn test_zero_pool_size_is_invalid() {
        let opts = KeystoreOptions::default().with_pool_size(0);
        assert!(matches!(
            opts.validate(),
            Err(KeystoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_deserialize_partial_options() {
        let opts: KeystoreOptions = serde_json::from_str(r#"{"table": "peer_keys"}"#).unwrap();
        assert_eq!(opts.table.as_str(), "peer_keys");
        assert_eq!(opts.pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(opts.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
    }

    #[test]
    fn test_deserialize_rejects_invalid_table() {
        let result: Result<KeystoreOptions, _> =
            serde_json::from_str(r#"{"table": "keys where 1=1"}"#);
        assert!(result.is_err(), "Invalid identifiers must not deserialize");
    }

    #[test]
    fn test_busy_timeout_builder() {
        let opts = KeystoreOptions::default().with_busy_timeout(Duration::from_millis(250));
        assert_eq!(opts.busy_timeout_ms, 250);
    }
}
