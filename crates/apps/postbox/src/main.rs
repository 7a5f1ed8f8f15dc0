//! Postbox - command-line access to the local mail store
//!
//! This is the main entry point for the Postbox CLI.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{debug, error};
use mailstore::{DatabaseConfig, SqliteMailStore};

mod commands;

#[derive(Parser)]
#[command(name = "postbox", version, about = "Manage the local Postbox mail store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database config file (defaults to ~/.config/postbox/database.json)
    #[arg(long, global = true, value_name = "FILE", env = "POSTBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage directories
    Dirs {
        #[command(subcommand)]
        action: DirCommand,
    },
    /// Read and file stored mail
    Mail {
        #[command(subcommand)]
        action: MailCommand,
    },
    /// Inspect or write the database configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the config file location and the configuration in effect
    Show,
    /// Write database.json with the given location
    Init {
        /// Directory holding the database file
        #[arg(long)]
        data_dir: PathBuf,
        /// Schema name; the database file is <data_dir>/<schema>.sqlite3
        #[arg(long, default_value = mailstore::config::DEFAULT_SCHEMA)]
        schema: String,
    },
}

#[derive(Subcommand)]
enum DirCommand {
    /// List all directories
    List,
    /// Create a directory
    Create { name: String },
    /// Rename a directory
    Rename { old_name: String, new_name: String },
    /// Delete an empty directory
    Delete { name: String },
}

#[derive(Subcommand)]
enum MailCommand {
    /// List stored emails
    List {
        /// Only emails filed under this directory
        #[arg(short, long, conflicts_with_all = ["start", "count"])]
        dir: Option<String>,
        /// Number of emails to skip
        #[arg(long, requires = "count")]
        start: Option<i64>,
        /// Maximum number of emails to list
        #[arg(long)]
        count: Option<i64>,
    },
    /// Show one email in full
    Show { id: i64 },
    /// Move an email to another directory
    Move { id: i64, directory: String },
    /// Delete an email
    Delete { id: i64 },
    /// Import emails from a JSON file (one email or an array)
    Import { path: PathBuf },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let json = cli.json;
    let config_file = cli.config.as_deref();

    match cli.command {
        Commands::Config { action } => match action {
            ConfigCommand::Show => {
                let db_config = load_config(config_file)?;
                commands::show_config(&db_config, config_file, json)
            }
            ConfigCommand::Init { data_dir, schema } => {
                commands::init_config(&DatabaseConfig::new(data_dir, schema), config_file, json)
            }
        },
        Commands::Dirs { action } => {
            let store = open_store(config_file)?;
            match action {
                DirCommand::List => commands::list_dirs(&store, json),
                DirCommand::Create { name } => commands::create_dir(&store, &name, json),
                DirCommand::Rename { old_name, new_name } => {
                    commands::rename_dir(&store, &old_name, &new_name, json)
                }
                DirCommand::Delete { name } => commands::delete_dir(&store, &name, json),
            }
        }
        Commands::Mail { action } => {
            let store = open_store(config_file)?;
            match action {
                MailCommand::List { dir, start, count } => {
                    commands::list_mail(&store, dir.as_deref(), start, count, json)
                }
                MailCommand::Show { id } => commands::show_mail(&store, id, json),
                MailCommand::Move { id, directory } => {
                    commands::move_mail(&store, id, &directory, json)
                }
                MailCommand::Delete { id } => commands::delete_mail(&store, id, json),
                MailCommand::Import { path } => commands::import_mail(&store, &path, json),
            }
        }
    }
}

fn open_store(config_file: Option<&Path>) -> anyhow::Result<SqliteMailStore> {
    let db_config = load_config(config_file)?;
    debug!("Using database {}", db_config.database_path().display());
    SqliteMailStore::open(&db_config).context("Failed to open mail store")
}

fn load_config(path: Option<&Path>) -> anyhow::Result<DatabaseConfig> {
    match path {
        Some(path) => DatabaseConfig::from_file(path),
        None => DatabaseConfig::load(),
    }
}
