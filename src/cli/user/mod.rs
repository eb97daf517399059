//! User commands operating on the data file

use clap::{Args, Subcommand};
use tracing::info;

use crate::config::AppConfig;
use crate::domain::{User, UserRole};

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create a user
    Add(UserAddArgs),
}

#[derive(Debug, Args)]
pub struct UserAddArgs {
    #[arg(long)]
    pub username: String,

    /// Read from stdin when omitted
    #[arg(long)]
    pub password: Option<String>,

    /// `owner` or `user`
    #[arg(long, default_value = "user")]
    pub role: UserRole,
}

pub fn run(config: &AppConfig, command: UserCommand) -> anyhow::Result<()> {
    match command {
        UserCommand::Add(args) => add(config, args),
    }
}

fn add(config: &AppConfig, args: UserAddArgs) -> anyhow::Result<()> {
    let password = match args.password {
        Some(password) => password,
        None => super::read_secret("Password")?,
    };

    let store = crate::create_store(config)?;
    let hash = store.hash_password(&password)?;
    let user = store.upsert_user(User::new(args.username, hash, args.role))?;
    store.save()?;

    info!(user_id = %user.id(), "User added");
    println!("{}\t{}\t{}", user.id(), user.username(), user.role());

    Ok(())
}
