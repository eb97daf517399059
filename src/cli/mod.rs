//! CLI module for keygate
//!
//! - `serve`: run the HTTP server
//! - `hash-password`: print an Argon2 hash
//! - `user add`, `key add`, `key list`: edit the data file directly

pub mod hash_password;
pub mod key;
pub mod serve;
pub mod user;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Keygate - per-key admission control and usage accounting
#[derive(Parser)]
#[command(name = "keygate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Extra configuration file layered over config/default and config/local
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve,

    /// Hash a password for use in the data file
    HashPassword(hash_password::HashPasswordArgs),

    /// Manage users in the data file
    #[command(subcommand)]
    User(user::UserCommand),

    /// Manage API keys in the data file
    #[command(subcommand)]
    Key(key::KeyCommand),
}

/// Read one line from stdin when a secret was not passed as an argument
pub(crate) fn read_secret(prompt: &str) -> anyhow::Result<String> {
    eprint!("{prompt}: ");
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;

    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
