//! CLI for provisioning and inspecting a lock settings store
//!
//! Runs every command as the trusted system caller. Credential hashes are
//! passed hex-encoded.

use anyhow::Context;
use clap::{Parser, Subcommand};
use locksettings_store::{
    CallerContext, InMemoryLegacySettings, JsonLegacySettings, LegacySettingsSource,
    LockSettingsService, MigrationOutcome, MockRecognizer, StoreConfig, UserId,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "locksettings-ctl")]
#[command(about = "Lock settings store administration", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory, overrides the config file
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a setting
    Get {
        /// Setting key
        key: String,

        /// User id
        #[arg(short, long, default_value = "0")]
        user: UserId,
    },

    /// Write a string setting
    Set {
        /// Setting key
        key: String,

        /// Value
        value: String,

        /// User id
        #[arg(short, long, default_value = "0")]
        user: UserId,
    },

    /// Store a pattern hash (empty clears it)
    SetPattern {
        /// Hex-encoded hash
        hash: String,

        /// User id
        #[arg(short, long, default_value = "0")]
        user: UserId,
    },

    /// Check a pattern hash
    CheckPattern {
        /// Hex-encoded hash
        hash: String,

        /// User id
        #[arg(short, long, default_value = "0")]
        user: UserId,
    },

    /// Store a password hash (empty clears it)
    SetPassword {
        /// Hex-encoded hash
        hash: String,

        /// User id
        #[arg(short, long, default_value = "0")]
        user: UserId,
    },

    /// Check a password hash
    CheckPassword {
        /// Hex-encoded hash
        hash: String,

        /// User id
        #[arg(short, long, default_value = "0")]
        user: UserId,
    },

    /// Show which credentials a user has
    Status {
        /// User id
        #[arg(short, long, default_value = "0")]
        user: UserId,
    },

    /// Delete all credentials and settings of a user
    RemoveUser {
        /// User id
        user: UserId,
    },

    /// Import legacy global settings
    Migrate {
        /// JSON export of the legacy settings; none imports nothing
        #[arg(short, long)]
        legacy: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let service = open_service(cli.config, cli.data_dir)?;
    let sys = CallerContext::system();

    match cli.command {
        Commands::Get { key, user } => match service.get_string(&sys, &key, None, user)? {
            Some(value) => println!("{}", value),
            None => warn!("{} is not set for user {}", key, user),
        },
        Commands::Set { key, value, user } => {
            service.set_string(&sys, &key, &value, user)?;
            info!("Set {} for user {}", key, user);
        }
        Commands::SetPattern { hash, user } => {
            service.set_lock_pattern(&sys, &decode_hash(&hash)?, user)?;
            info!("Pattern stored for user {}", user);
        }
        Commands::CheckPattern { hash, user } => {
            let matched = service.check_pattern(&sys, &decode_hash(&hash)?, user)?;
            report_match("Pattern", matched)?;
        }
        Commands::SetPassword { hash, user } => {
            service.set_lock_password(&sys, &decode_hash(&hash)?, user)?;
            info!("Password stored for user {}", user);
        }
        Commands::CheckPassword { hash, user } => {
            let matched = service.check_password(&sys, &decode_hash(&hash)?, user)?;
            report_match("Password", matched)?;
        }
        Commands::Status { user } => {
            println!("user:         {}", user);
            println!("pattern size: {}", service.get_lock_pattern_size(&sys, user)?);
            println!("password:     {}", service.have_password(&sys, user)?);
            println!("pattern:      {}", service.have_pattern(&sys, user)?);
            println!("gesture:      {}", service.have_gesture(&sys, user)?);
        }
        Commands::RemoveUser { user } => {
            service.remove_user(&sys, user)?;
            info!("Removed user {}", user);
        }
        Commands::Migrate { legacy } => {
            let source: Box<dyn LegacySettingsSource> = match legacy {
                Some(path) => Box::new(
                    JsonLegacySettings::load(&path)
                        .with_context(|| format!("reading {}", path.display()))?,
                ),
                None => Box::new(InMemoryLegacySettings::new()),
            };
            match service.system_ready(&sys, source.as_ref())? {
                MigrationOutcome::AlreadyMigrated => info!("Legacy settings already migrated"),
                MigrationOutcome::Migrated { copied } => {
                    info!("Migrated {} legacy settings", copied)
                }
                MigrationOutcome::Failed => anyhow::bail!("legacy settings migration failed"),
            }
        }
    }

    Ok(())
}

fn open_service(config: Option<PathBuf>, data_dir: Option<PathBuf>) -> anyhow::Result<LockSettingsService> {
    let mut config = match config {
        Some(path) => StoreConfig::load(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }

    info!("Data directory: {}", config.data_dir.display());
    Ok(LockSettingsService::open(&config, Arc::new(MockRecognizer))?)
}

fn decode_hash(hash: &str) -> anyhow::Result<Vec<u8>> {
    hex::decode(hash).with_context(|| format!("invalid hex hash {:?}", hash))
}

fn report_match(what: &str, matched: bool) -> anyhow::Result<()> {
    if matched {
        println!("{} matches", what);
        Ok(())
    } else {
        anyhow::bail!("{} does not match", what)
    }
}
