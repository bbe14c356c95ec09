//! # docsift CLI
//!
//! ## Usage
//!
//! ```bash
//! docsift --config ./config/docsift.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docsift init` | Create the SQLite database and run schema migrations |
//! | `docsift search "<query>"` | Search documents |
//! | `docsift suggest "<partial>"` | Autocomplete file names |
//! | `docsift get <id>` | Print one document record |
//! | `docsift list` | List documents, newest first |
//! | `docsift delete <id>` | Delete a document and its blobs |
//! | `docsift upload <paths>` | Upload files or directories |
//! | `docsift import <file>` | Import extracted records from JSON |
//! | `docsift serve` | Start the HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docsift::progress::ProgressMode;
use docsift::{config, get, import, migrate, search, server, upload};

/// docsift: search uploaded documents with snippets and highlighting.
#[derive(Parser)]
#[command(name = "docsift", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docsift.toml")]
    config: PathBuf,

    /// Log debug output to stderr. `RUST_LOG` takes precedence.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Search documents.
    Search {
        query: String,

        /// contains, starts-with, or ends-with.
        #[arg(long, default_value = "contains")]
        mode: String,

        /// all, content, file-name, or author.
        #[arg(long, default_value = "all")]
        field: String,

        /// Maximum number of results.
        #[arg(long)]
        limit: Option<usize>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Suggest file names containing a partial query.
    Suggest {
        partial: String,

        #[arg(long)]
        json: bool,
    },

    /// Print a document record as JSON.
    Get { id: String },

    /// List documents, newest upload first.
    List {
        #[arg(long)]
        json: bool,
    },

    /// Delete a document and its stored blobs.
    Delete { id: String },

    /// Upload files or directories.
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Progress output on stderr. Defaults to human on a TTY, off otherwise.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Import extracted document records from a JSON array.
    Import { file: PathBuf },

    /// Start the HTTP server.
    Serve,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "docsift=debug,docsift_core=debug"
    } else {
        "docsift=info,docsift_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Search {
            query,
            mode,
            field,
            limit,
            json,
        } => {
            search::run_search(&cfg, &query, &mode, &field, limit, json).await?;
        }
        Commands::Suggest { partial, json } => {
            search::run_suggest(&cfg, &partial, json).await?;
        }
        Commands::Get { id } => {
            get::run_get(&cfg, &id).await?;
        }
        Commands::List { json } => {
            get::run_list(&cfg, json).await?;
        }
        Commands::Delete { id } => {
            get::run_delete(&cfg, &id).await?;
        }
        Commands::Upload { paths, progress } => {
            upload::run_upload(&cfg, &paths, progress).await?;
        }
        Commands::Import { file } => {
            import::run_import(&cfg, &file).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
