//! ppsctl - operator command line for Pleasant Password Server vaults.
//!
//! Reads the folder tree, searches, and creates, updates or deletes folders
//! and credentials. Every command prints its result as JSON on stdout.

mod config;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ppsync_core::{CredentialSpec, FolderSpec, ReadOutcome, Session, Tag};

use config::{Config, Overrides};

#[derive(Parser)]
#[command(name = "ppsctl")]
#[command(version, about = "Reconcile Pleasant Password Server folders and credentials")]
struct Cli {
    /// Vault URL (falls back to the config file, then PPS_SERVER_URL)
    #[arg(long, global = true)]
    server_url: Option<String>,

    /// Vault user (falls back to the config file, then PPS_USERNAME)
    #[arg(long, global = true)]
    vault_user: Option<String>,

    /// Vault password (insecure, prefer PPS_PASSWORD)
    #[arg(long, global = true)]
    vault_password: Option<String>,

    /// One-time password code
    #[arg(long, global = true)]
    otp: Option<String>,

    /// One-time password provider
    #[arg(long, global = true)]
    otp_provider: Option<String>,

    /// Skip TLS certificate validation
    #[arg(long, global = true, overrides_with = "no_insecure")]
    insecure: bool,

    /// Validate TLS certificates even if the config file says otherwise
    #[arg(long, global = true, overrides_with = "insecure")]
    no_insecure: bool,

    /// Config file (default: <config dir>/ppsctl/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the root folder id
    Root,

    /// Print a folder with all descendants (default: the root folder)
    Tree {
        folder_id: Option<String>,
    },

    /// Search credentials and folders
    Search {
        query: String,
    },

    /// Manage folders
    #[command(subcommand)]
    Folder(FolderCommand),

    /// Manage credentials
    #[command(subcommand)]
    Credential(CredentialCommand),
}

#[derive(Subcommand)]
enum FolderCommand {
    /// Print a folder, or null if it no longer exists
    Get { id: String },
    Create(FolderArgs),
    /// Overwrite a folder with the given fields
    Update {
        id: String,
        #[command(flatten)]
        fields: FolderArgs,
    },
    /// Delete a folder and everything below it
    Delete { id: String },
}

#[derive(Subcommand)]
enum CredentialCommand {
    /// Print a credential including its password
    Get { id: String },
    Create(CredentialArgs),
    /// Overwrite a credential with the given fields
    Update {
        id: String,
        #[command(flatten)]
        fields: CredentialArgs,
    },
    Delete { id: String },
}

#[derive(Args)]
struct FolderArgs {
    #[arg(long)]
    name: String,
    /// Parent folder (default: the root folder)
    #[arg(long)]
    parent_id: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args)]
struct CredentialArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    folder_id: String,
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    password: Option<String>,
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    notes: Option<String>,
    #[arg(long)]
    expires: Option<String>,
    /// Tag name; repeat for several
    #[arg(long = "tag")]
    tags: Vec<String>,
}

impl From<FolderArgs> for FolderSpec {
    fn from(args: FolderArgs) -> Self {
        Self {
            name: args.name,
            parent_id: args.parent_id,
            notes: args.notes,
        }
    }
}

impl From<CredentialArgs> for CredentialSpec {
    fn from(args: CredentialArgs) -> Self {
        Self {
            name: args.name,
            folder_id: args.folder_id,
            username: args.username,
            password: args.password,
            url: args.url,
            notes: args.notes,
            expires: args.expires,
            tags: args.tags.into_iter().map(Tag::new).collect(),
        }
    }
}

impl Cli {
    /// Certificate policy from the command line; the last of the two flags wins.
    fn allow_insecure(&self) -> Option<bool> {
        match (self.insecure, self.no_insecure) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing();

    let config = Config::load(cli.config.as_deref())?;
    let session_config = config.session_config(Overrides {
        allow_insecure: cli.allow_insecure(),
        server_url: cli.server_url,
        username: cli.vault_user,
        password: cli.vault_password,
        otp: cli.otp,
        otp_provider: cli.otp_provider,
    });

    let session = Session::establish(&session_config)
        .await
        .context("Failed to open vault session")?;
    info!(
        server = %session.base_url(),
        token_minutes_left = ?session.time_until_expiry().map(|left| left.num_minutes()),
        "Connected"
    );

    run(&session, cli.command).await
}

async fn run(session: &Session, command: Commands) -> Result<()> {
    let vault = session.vault()?;

    match command {
        Commands::Root => {
            let id = vault.root_id().await.context("Failed to resolve root folder")?;
            print_json(&serde_json::json!({ "id": id }))
        }
        Commands::Tree { folder_id } => {
            let tree = match folder_id {
                Some(id) => vault.folder_tree(&id).await,
                None => vault.folder_tree_root().await,
            }
            .context("Failed to read folder tree")?;
            print_json(&tree)
        }
        Commands::Search { query } => {
            let results = vault.search(&query).await.context("Search failed")?;
            print_json(&results)
        }
        Commands::Folder(command) => {
            let folders = vault.folders();
            match command {
                FolderCommand::Get { id } => {
                    let outcome = folders.read(&id).await.context("Failed to read folder")?;
                    match outcome {
                        ReadOutcome::Found(folder) => print_json(&folder),
                        ReadOutcome::NotFound => print_json(&serde_json::Value::Null),
                    }
                }
                FolderCommand::Create(fields) => {
                    let folder = folders
                        .create(&fields.into())
                        .await
                        .context("Failed to create folder")?;
                    print_json(&folder)
                }
                FolderCommand::Update { id, fields } => {
                    let folder = folders
                        .update(&id, &fields.into())
                        .await
                        .context("Failed to update folder")?;
                    print_json(&folder)
                }
                FolderCommand::Delete { id } => {
                    folders.delete(&id).await.context("Failed to delete folder")?;
                    print_json(&serde_json::json!({ "deleted": id }))
                }
            }
        }
        Commands::Credential(command) => {
            let credentials = vault.credentials();
            match command {
                CredentialCommand::Get { id } => {
                    let credential = vault
                        .credential(&id)
                        .await
                        .with_context(|| format!("Failed to read credential {}", id))?;
                    print_json(&credential)
                }
                CredentialCommand::Create(fields) => {
                    let credential = credentials
                        .create(&fields.into())
                        .await
                        .context("Failed to create credential")?;
                    print_json(&credential)
                }
                CredentialCommand::Update { id, fields } => {
                    let credential = credentials
                        .update(&id, &fields.into())
                        .await
                        .context("Failed to update credential")?;
                    print_json(&credential)
                }
                CredentialCommand::Delete { id } => {
                    credentials
                        .delete(&id)
                        .await
                        .context("Failed to delete credential")?;
                    print_json(&serde_json::json!({ "deleted": id }))
                }
            }
        }
    }
}
