//! API key commands operating on the data file

use anyhow::Context;
use clap::{Args, Subcommand};
use tracing::info;

use crate::config::AppConfig;
use crate::domain::ApiKey;
use crate::infrastructure::api_key::generate_credential;
use crate::infrastructure::store::RecordStore;

#[derive(Debug, Subcommand)]
pub enum KeyCommand {
    /// Create an API key and print its credential
    Add(KeyAddArgs),

    /// List API keys with usage
    List,
}

#[derive(Debug, Args)]
pub struct KeyAddArgs {
    #[arg(long, default_value = "")]
    pub label: String,

    /// Owning user, by username or id
    #[arg(long)]
    pub user: Option<String>,

    /// Lifetime request quota, 0 for unlimited
    #[arg(long, default_value_t = 0)]
    pub total_limit: u64,

    /// Maximum simultaneous requests, 0 for unlimited
    #[arg(long, default_value_t = 0)]
    pub concurrency_limit: u32,

    /// Accept the credential from the query string and X-Goog-Api-Key
    #[arg(long)]
    pub compat: bool,

    /// Create the key disabled
    #[arg(long)]
    pub disabled: bool,

    /// Explicit credential; generated when omitted
    #[arg(long)]
    pub key: Option<String>,
}

pub fn run(config: &AppConfig, command: KeyCommand) -> anyhow::Result<()> {
    let store = crate::create_store(config)?;

    match command {
        KeyCommand::Add(args) => add(&store, args),
        KeyCommand::List => {
            print!("{}", render_table(&store));
            Ok(())
        }
    }
}

fn add(store: &RecordStore, args: KeyAddArgs) -> anyhow::Result<()> {
    let user_id = match args.user.as_deref() {
        Some(user) => {
            let found = store
                .find_user_by_username(user)
                .or_else(|| store.find_user_by_id(user))
                .with_context(|| format!("no user named or identified by '{user}'"))?;
            found.id().to_string()
        }
        None => String::new(),
    };

    let credential = args.key.unwrap_or_else(generate_credential);
    let key = store.upsert_api_key(
        ApiKey::new(credential, args.label)
            .with_user_id(user_id)
            .with_total_limit(args.total_limit)
            .with_concurrency_limit(args.concurrency_limit)
            .with_compatibility_mode(args.compat)
            .with_enabled(!args.disabled),
    )?;
    store.save()?;

    info!(key_id = %key.id(), "API key added");
    println!("{}", key.key());

    Ok(())
}

fn render_table(store: &RecordStore) -> String {
    let mut out = String::from("ID\tLABEL\tUSER\tENABLED\tUSED\tLIMIT\tCONCURRENCY\tCOMPAT\n");

    for key in store.list_api_keys() {
        let user = store
            .find_user_by_id(key.user_id())
            .map(|u| u.username().to_string())
            .unwrap_or_else(|| "-".to_string());
        let limit = key
            .has_total_limit()
            .then(|| key.total_limit().to_string())
            .unwrap_or_else(|| "unlimited".to_string());
        let concurrency = key
            .has_concurrency_limit()
            .then(|| key.concurrency_limit().to_string())
            .unwrap_or_else(|| "unlimited".to_string());

        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
            key.id(),
            key.label(),
            user,
            key.is_enabled(),
            key.used_count(),
            limit,
            concurrency,
            key.compatibility_mode(),
        ));
    }

    out
}
