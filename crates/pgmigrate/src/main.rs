//! pgmigrate CLI
//!
//! Command-line tool for managing PostgreSQL migrations.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use pgmigrate::prelude::*;
use pgmigrate::scaffold;

/// Timestamp-ordered SQL migrations for PostgreSQL.
#[derive(Parser)]
#[command(name = "pgmigrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project directory holding pgmigrate.json and scripts/.
    #[arg(short, long, env = "PGMIGRATE_DIR", default_value = ".", global = true)]
    dir: PathBuf,

    /// Database URL, overriding the connection settings in pgmigrate.json.
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create pgmigrate.json and the scripts directories in an empty directory.
    Init {
        /// Directory to initialize (the project directory if not specified).
        path: Option<PathBuf>,
    },

    /// Create a new migration script.
    New {
        /// Migration description.
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,
    },

    /// Create a new function script.
    Function {
        /// Function description.
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,
    },

    /// Run every function script.
    RunFunctions {
        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Apply pending migrations.
    Up {
        /// Number of migrations to apply (all if 0 or not specified).
        #[arg(default_value_t = 0)]
        count: usize,

        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Revert applied migrations, newest first.
    Down {
        /// Number of migrations to revert (none if 0 or not specified).
        #[arg(default_value_t = 0)]
        count: usize,

        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Show migration status.
    Status,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { path } => {
            let root = scaffold::init_project(path.unwrap_or(cli.dir))?;
            info!("Initialized migrations at {}", root.display());
        }

        Commands::New { description } => {
            let timestamp = chrono::Utc::now().timestamp();
            scaffold::new_migration(&cli.dir, &description.join(" "), timestamp)?;
        }

        Commands::Function { description } => {
            let timestamp = chrono::Utc::now().timestamp();
            scaffold::new_function(&cli.dir, &description.join(" "), timestamp)?;
        }

        command => {
            let config = Config::from_project(&cli.dir, cli.database_url)?;

            let dry_run = matches!(
                command,
                Commands::Up { dry_run: true, .. }
                    | Commands::Down { dry_run: true, .. }
                    | Commands::RunFunctions { dry_run: true }
            );
            if dry_run {
                info!("Dry run mode - SQL will be printed but not executed.");
            }

            let mut executor = MigrationExecutor::connect(&config, ScriptStore::new(&cli.dir))
                .await?
                .dry_run(dry_run);

            let outcome = run(&mut executor, command).await;
            executor.close().await?;
            outcome?;
        }
    }

    Ok(())
}

async fn run(executor: &mut MigrationExecutor, command: Commands) -> Result<()> {
    match command {
        Commands::Up { count, .. } => {
            executor.up(count).await?;
        }

        Commands::Down { count, .. } => {
            executor.down(count).await?;
        }

        Commands::RunFunctions { .. } => {
            executor.run_functions().await?;
        }

        Commands::Status => {
            let status = executor.status().await?;
            if status.is_empty() {
                info!("No migrations found in {}", executor.store().scripts_dir().display());
            }
            for row in &status {
                println!("{}", row);
            }
        }

        Commands::Init { .. } | Commands::New { .. } | Commands::Function { .. } => {}
    }
    Ok(())
}
