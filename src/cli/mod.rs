// Keytable — CLI Module
//
// Command-line interface using clap derive macros.
// Subcommands: generate, import, get, export, has, delete, list.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::codec::KeyType;

pub use commands::execute;

/// Keytable — named private keys in a SQLite table.
#[derive(Parser, Debug)]
#[command(name = "keytable")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Database file or `file:` URI. The database and its table must already exist.
    #[arg(long, global = true, env = "KEYTABLE_DB")]
    pub db: Option<PathBuf>,

    /// Table holding the keys.
    #[arg(long, global = true, env = "KEYTABLE_TABLE", default_value = "keys")]
    pub table: String,

    /// Number of pooled database connections.
    #[arg(long, global = true, default_value = "1")]
    pub pool_size: usize,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a new private key and store it under a name.
    Generate {
        /// Name to store the key under.
        name: String,

        /// Key algorithm: "ed25519" or "secp256k1".
        #[arg(long, default_value = "ed25519")]
        kind: KeyType,
    },

    /// Store an existing key given as a hex-encoded key envelope.
    Import {
        /// Name to store the key under.
        name: String,

        /// Hex-encoded key envelope (as printed by `export`).
        #[arg(long)]
        hex: String,
    },

    /// Show the type and public key of a stored key (never the secret).
    Get {
        /// Name of the key.
        name: String,
    },

    /// Print the hex-encoded key envelope of a stored key.
    Export {
        /// Name of the key.
        name: String,
    },

    /// Check whether a key exists.
    Has {
        /// Name of the key.
        name: String,
    },

    /// Delete a key. Deleting a missing key is not an error.
    Delete {
        /// Name of the key.
        name: String,
    },

    /// List the names of all stored keys.
    List {
        /// Print the names as a JSON array.
        #[arg(long, default_value = "false")]
        json: bool,
    },
}
