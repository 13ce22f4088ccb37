//! SkillStore CLI
//!
//! Command-line tools for SkillStore data directories.
//!
//! # Commands
//!
//! - `init` - Create missing dataset files and take the daily backup
//! - `inspect` - Display dataset sizes and schema metadata
//! - `validate` - Check ids and references between datasets
//! - `backup` - Create, list and restore backups
//! - `export` / `import` - Move a whole store through one JSON file
//! - `migrate` - Bring datasets to their declared schema versions
//! - `journal` - Dump a dataset's journal
//! - `verify` - Check every journal chain against its dataset

mod commands;

use clap::{Parser, Subcommand};
use skillstore_core::{Config, Store};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// SkillStore command-line data tools.
#[derive(Parser)]
#[command(name = "skillstore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the data directory (overrides SKILLSTORE_DATA_DIR)
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create missing dataset files and metadata
    Init,

    /// Display dataset sizes and schema metadata
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Validate ids and references; exits non-zero on errors
    Validate {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Manage backups
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },

    /// Export the whole store to a JSON file
    Export {
        /// Output file
        file: PathBuf,
    },

    /// Replace the store with the contents of an export file
    Import {
        /// Export file to import
        file: PathBuf,

        /// Correlation id recorded in the journal
        #[arg(short, long)]
        correlation_id: Option<String>,
    },

    /// Schema migrations
    Migrate {
        #[command(subcommand)]
        command: MigrateCommands,
    },

    /// Dump a dataset's journal
    Journal {
        /// Dataset name (e.g. users, learningPlans)
        dataset: String,

        /// Show only the last N entries
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check every journal chain against its dataset
    Verify,

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Create a backup
    Create {
        /// Label appended to the backup directory name
        #[arg(short, long)]
        label: Option<String>,
    },

    /// List backups, oldest first
    List,

    /// Restore the store from a backup directory
    Restore {
        /// Backup directory
        dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Show the steps a run would apply
    Status,

    /// Apply pending steps
    Run {
        /// Show what would be done without writing
        #[arg(short, long)]
        dry_run: bool,
    },
}

fn open_store(path: Option<PathBuf>) -> Result<Store, Box<dyn std::error::Error>> {
    let mut config = Config::from_env()?;
    if let Some(path) = path {
        config.data_dir = path;
    }
    Ok(Store::open(config))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::Version = cli.command {
        println!("SkillStore CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("SkillStore Core v{}", skillstore_core::VERSION);
        return Ok(());
    }

    let store = open_store(cli.path)?;

    match cli.command {
        Commands::Init => commands::init::run(&store)?,
        Commands::Inspect { format } => commands::inspect::run(&store, format.parse()?)?,
        Commands::Validate { format } => commands::validate::run(&store, format.parse()?)?,
        Commands::Backup { command } => match command {
            BackupCommands::Create { label } => commands::backup::create(&store, label.as_deref())?,
            BackupCommands::List => commands::backup::list(&store)?,
            BackupCommands::Restore { dir } => commands::backup::restore(&store, &dir)?,
        },
        Commands::Export { file } => commands::transfer::export(&store, &file)?,
        Commands::Import {
            file,
            correlation_id,
        } => commands::transfer::import(&store, &file, correlation_id)?,
        Commands::Migrate { command } => match command {
            MigrateCommands::Status => commands::migrate::status(&store)?,
            MigrateCommands::Run { dry_run } => commands::migrate::run(&store, dry_run)?,
        },
        Commands::Journal {
            dataset,
            limit,
            format,
        } => commands::journal::run(&store, &dataset, limit, format.parse()?)?,
        Commands::Verify => commands::verify::run(&store)?,
        Commands::Version => {}
    }

    Ok(())
}
