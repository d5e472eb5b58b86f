// Keytable — CLI Command Handlers
//
// Each function handles one CLI subcommand against an open keystore and
// writes its report to `out`. Secret key material is only ever printed by
// `export`, which exists to move keys between stores.

use std::io::Write;
use std::path::PathBuf;

use crate::codec::{EnvelopeCodec, KeyCodec, KeyType, PrivateKey};
use crate::error::KeytableError;
use crate::store::{Keystore, KeystoreError, KeystoreOptions, SqlKeystore};

use super::{Cli, Commands};

/// Default directory for Keytable data files.
fn data_dir() -> PathBuf {
    let base = dirs_next::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("keytable")
}

/// Path to the default database file.
fn default_db_path() -> PathBuf {
    data_dir().join("keys.db")
}

/// Execute the parsed CLI command.
pub fn execute(cli: Cli) -> Result<(), KeytableError> {
    let store = open_store(&cli)?;
    let mut out = std::io::stdout().lock();

    let result = match cli.command {
        Commands::Generate { name, kind } => cmd_generate(&store, &name, kind, &mut out),
        Commands::Import { name, hex } => cmd_import(&store, &name, &hex, &mut out),
        Commands::Get { name } => cmd_get(&store, &name, &mut out),
        Commands::Export { name } => cmd_export(&store, &name, &mut out),
        Commands::Has { name } => cmd_has(&store, &name, &mut out),
        Commands::Delete { name } => cmd_delete(&store, &name, &mut out),
        Commands::List { json } => cmd_list(&store, json, &mut out),
    };

    finish(result, store.close())
}

/// Combine a command's outcome with the store's close outcome. The command's
/// own error wins; a close failure is only reported when the command succeeded.
fn finish(
    result: Result<(), KeytableError>,
    closed: Result<(), KeystoreError>,
) -> Result<(), KeytableError> {
    match (result, closed) {
        (Ok(()), Err(close_err)) => Err(close_err.into()),
        (Err(e), Err(close_err)) => {
            tracing::warn!(error = %close_err, "Failed to close keystore after command error");
            Err(e)
        }
        (result, Ok(())) => result,
    }
}

// ─── Generate / Import ───────────────────────────────────────────────────────

fn cmd_generate(
    store: &SqlKeystore,
    name: &str,
    kind: KeyType,
    out: &mut impl Write,
) -> Result<(), KeytableError> {
    let key = PrivateKey::generate(kind);
    store.put(name, &key)?;

    writeln!(out, "✓ Key stored")?;
    writeln!(out, "  Name:       {}", name)?;
    writeln!(out, "  Type:       {}", key.key_type())?;
    writeln!(out, "  Public key: {}", key.public_key_hex())?;
    Ok(())
}

fn cmd_import(
    store: &SqlKeystore,
    name: &str,
    envelope_hex: &str,
    out: &mut impl Write,
) -> Result<(), KeytableError> {
    let bytes = zeroize::Zeroizing::new(
        hex::decode(envelope_hex.trim())
            .map_err(|e| KeytableError::Other(format!("Invalid hex: {}", e)))?,
    );
    let key = EnvelopeCodec.unmarshal(&bytes)?;
    store.put(name, &key)?;

    writeln!(out, "✓ Key imported")?;
    writeln!(out, "  Name:       {}", name)?;
    writeln!(out, "  Type:       {}", key.key_type())?;
    writeln!(out, "  Public key: {}", key.public_key_hex())?;
    Ok(())
}

// ─── Get / Export ────────────────────────────────────────────────────────────

fn cmd_get(store: &SqlKeystore, name: &str, out: &mut impl Write) -> Result<(), KeytableError> {
    let key = store.get(name)?;

    writeln!(out, "Key details:\n")?;
    writeln!(out, "  Name:       {}", name)?;
    writeln!(out, "  Type:       {}", key.key_type())?;
    writeln!(out, "  Public key: {}", key.public_key_hex())?;
    writeln!(out, "  Secret:     [REDACTED]")?;
    Ok(())
}

fn cmd_export(store: &SqlKeystore, name: &str, out: &mut impl Write) -> Result<(), KeytableError> {
    let key = store.get(name)?;
    let bytes = store.codec().marshal(&key)?;

    let encoded = zeroize::Zeroizing::new(hex::encode(&bytes[..]));
    writeln!(out, "{}", encoded.as_str())?;
    Ok(())
}

// ─── Has / Delete / List ─────────────────────────────────────────────────────

fn cmd_has(store: &SqlKeystore, name: &str, out: &mut impl Write) -> Result<(), KeytableError> {
    writeln!(out, "{}", store.has(name)?)?;
    Ok(())
}

fn cmd_delete(store: &SqlKeystore, name: &str, out: &mut impl Write) -> Result<(), KeytableError> {
    store.delete(name)?;
    writeln!(out, "✓ Key {} deleted", name)?;
    Ok(())
}

fn cmd_list(store: &SqlKeystore, json: bool, out: &mut impl Write) -> Result<(), KeytableError> {
    let mut names = store.list()?;
    names.sort();

    if json {
        let rendered = serde_json::to_string(&names)
            .map_err(|e| KeytableError::Other(format!("Failed to render JSON: {}", e)))?;
        writeln!(out, "{}", rendered)?;
        return Ok(());
    }

    if names.is_empty() {
        writeln!(out, "No keys stored yet.")?;
        writeln!(out, "Add one with: keytable generate <name>")?;
        return Ok(());
    }

    writeln!(out, "Stored keys ({}):\n", names.len())?;
    for name in &names {
        writeln!(out, "  {}", name)?;
    }
    Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Open the keystore named by the CLI flags.
fn open_store(cli: &Cli) -> Result<SqlKeystore, KeytableError> {
    let path = cli.db.clone().unwrap_or_else(default_db_path);
    let options = KeystoreOptions::default()
        .with_table(&cli.table)?
        .with_pool_size(cli.pool_size);

    let store = SqlKeystore::open(&path.to_string_lossy(), options)?;
    Ok(store)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use tempfile::TempDir;

    use super::*;

    fn setup_store() -> (TempDir, SqlKeystore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE keys (name TEXT NOT NULL PRIMARY KEY, data BLOB)")
            .unwrap();

        let store = SqlKeystore::open(&path.to_string_lossy(), KeystoreOptions::default()).unwrap();
        (dir, store)
    }

    fn run(f: impl FnOnce(&mut Vec<u8>) -> Result<(), KeytableError>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_generate_stores_key() {
        let (_dir, store) = setup_store();

        let output = run(|out| cmd_generate(&store, "node", KeyType::Secp256k1, out));
        assert!(output.contains("secp256k1"));

        let key = store.get("node").unwrap();
        assert_eq!(key.key_type(), KeyType::Secp256k1);
        assert!(output.contains(&key.public_key_hex()));
    }

    #[test]
    fn test_get_never_prints_secret() {
        let (_dir, store) = setup_store();
        let key = PrivateKey::generate_ed25519();
        store.put("node", &key).unwrap();

        let output = run(|out| cmd_get(&store, "node", out));
        let secret_hex = hex::encode(&key.secret_bytes()[..32]);

        assert!(output.contains("[REDACTED]"));
        assert!(output.contains(&key.public_key_hex()));
        assert!(!output.contains(&secret_hex), "Get must never print the secret");
    }

    #[test]
    fn test_export_then_import_moves_key() {
        let (_dir, store) = setup_store();
        let key = PrivateKey::generate_ed25519();
        store.put("original", &key).unwrap();

        let exported = run(|out| cmd_export(&store, "original", out));
        run(|out| cmd_import(&store, "copy", exported.trim(), out));

        assert_eq!(store.get("copy").unwrap(), key);
    }

    #[test]
    fn test_import_rejects_bad_hex() {
        let (_dir, store) = setup_store();
        let mut out = Vec::new();

        let err = cmd_import(&store, "bad", "not-hex", &mut out).unwrap_err();
        assert!(matches!(err, KeytableError::Other(_)));
        assert!(!store.has("bad").unwrap());
    }

    #[test]
    fn test_import_rejects_bad_envelope() {
        let (_dir, store) = setup_store();
        let mut out = Vec::new();

        let err = cmd_import(&store, "bad", "0803", &mut out).unwrap_err();
        assert!(matches!(err, KeytableError::Codec(_)));
    }

    #[test]
    fn test_generate_existing_name_fails() {
        let (_dir, store) = setup_store();
        run(|out| cmd_generate(&store, "dup", KeyType::Ed25519, out));

        let mut out = Vec::new();
        let err = cmd_generate(&store, "dup", KeyType::Ed25519, &mut out).unwrap_err();
        assert!(matches!(
            err,
            KeytableError::Store(KeystoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_has_and_delete() {
        let (_dir, store) = setup_store();
        store.put("k", &PrivateKey::generate_ed25519()).unwrap();

        assert_eq!(run(|out| cmd_has(&store, "k", out)).trim(), "true");
        run(|out| cmd_delete(&store, "k", out));
        assert_eq!(run(|out| cmd_has(&store, "k", out)).trim(), "false");
    }

    #[test]
    fn test_finish_keeps_command_error_over_close_error() {
        let result = finish(
            Err(KeytableError::Other("command failed".to_string())),
            Err(KeystoreError::Connection("close failed".to_string())),
        );
        assert!(matches!(result, Err(KeytableError::Other(ref m)) if m == "command failed"));
    }

    #[test]
    fn test_finish_reports_close_error_after_success() {
        let result = finish(Ok(()), Err(KeystoreError::Connection("close failed".to_string())));
        assert!(matches!(
            result,
            Err(KeytableError::Store(KeystoreError::Connection(_)))
        ));

        assert!(finish(Ok(()), Ok(())).is_ok());
        assert!(matches!(
            finish(Err(KeytableError::Other("x".to_string())), Ok(())),
            Err(KeytableError::Other(_))
        ));
    }

    #[test]
    fn test_list_plain_and_json() {
        let (_dir, store) = setup_store();
        assert!(run(|out| cmd_list(&store, false, out)).contains("No keys stored yet."));

        store.put("b", &PrivateKey::generate_ed25519()).unwrap();
        store.put("a", &PrivateKey::generate_ed25519()).unwrap();

        let plain = run(|out| cmd_list(&store, false, out));
        assert!(plain.contains("Stored keys (2)"));

        let json = run(|out| cmd_list(&store, true, out));
        let names: Vec<String> = serde_json::from_str(json.trim()).unwrap();
        assert_eq!(names, vec!["a", "b"]);
    }
}
