use clap::Parser;
use keygate::cli::{self, Cli, Command};
use keygate::config::AppConfig;
use keygate::infrastructure::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    init_logging(&config.logging);

    match cli.command {
        Command::Serve => cli::serve::run(&config).await,
        Command::HashPassword(args) => cli::hash_password::run(&config, args),
        Command::User(command) => cli::user::run(&config, command),
        Command::Key(command) => cli::key::run(&config, command),
    }
}
