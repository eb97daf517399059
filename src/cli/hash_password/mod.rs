//! Hash-password command

use clap::Args;

use crate::config::AppConfig;
use crate::infrastructure::user::{Argon2Hasher, PasswordHasher};

#[derive(Debug, Args)]
pub struct HashPasswordArgs {
    /// Password to hash; read from stdin when omitted
    pub password: Option<String>,
}

/// Print a hash at the configured cost, ready to paste into a data file
pub fn run(config: &AppConfig, args: HashPasswordArgs) -> anyhow::Result<()> {
    let password = match args.password {
        Some(password) => password,
        None => super::read_secret("Password")?,
    };

    let hasher = Argon2Hasher::from_config(&config.password)?;
    println!("{}", hasher.hash(&password)?);
    Ok(())
}
