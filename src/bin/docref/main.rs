//! docref CLI tool
//!
//! Imports docblock parser exports into a SQLite reference store.
//!
//! ## Commands
//!
//! - `import <path> --user <login>`: import one JSON export, or every `*.json` export found under a
//!   directory, as a single run
//!
//! Re-running an import is safe: unchanged items are left alone, changed ones are updated in place,
//! and terms are reused.

use clap::{Parser, Subcommand};
use docref::{
    config::ImporterConfig,
    entity::ParsedTree,
    import::{ImportOptions, Importer},
    properties::Actor,
    store::SqliteStore,
    DocrefError,
};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "docref")]
#[command(author, version, about = "Import parsed documentation into a reference store", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a parser JSON export (or a directory of them)
    Import {
        /// JSON export file, or a directory searched recursively for `*.json`
        path: PathBuf,

        /// Login the import is attributed to
        #[arg(long)]
        user: String,

        /// Never pause between batches
        #[arg(long)]
        quick: bool,

        /// Also import entities tagged `@internal`
        #[arg(long)]
        import_internal: bool,

        /// Configuration file path
        #[arg(short, long, default_value = "docref.toml")]
        config: PathBuf,

        /// SQLite database (default: `DOCREF_DB`, then the config's `store.database`)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Import {
            path,
            user,
            quick,
            import_internal,
            config,
            db,
        } => {
            let config = ImporterConfig::load(&config)?;
            let mut options = ImportOptions::from(&config);
            options.skip_throttle |= quick;
            options.import_internal |= import_internal;
            let db_path = db
                .or_else(|| std::env::var_os("DOCREF_DB").map(PathBuf::from))
                .unwrap_or_else(|| config.store.database.clone());

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;

            let result = runtime.block_on(async {
                let tree = load_tree(&path)?;
                println!("Importing {} files from {}", tree.len(), path.display());
                let store = SqliteStore::open(&db_path).await?.with_actor(Actor::new(user));
                Importer::new(store, config).import(&tree, options).await
            });

            match result {
                Ok(report) => {
                    println!("{report}");
                    if report.pauses > 0 {
                        println!("Paused {} times between batches", report.pauses);
                    }
                    for warning in &report.warnings {
                        println!("Warning: {warning}");
                    }
                    if report.has_errors() {
                        eprintln!("Errors:");
                        for error in &report.errors {
                            eprintln!("  {error}");
                        }
                    }
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

/// Read one export, or merge every `*.json` export under a directory in path order.
fn load_tree(path: &Path) -> Result<ParsedTree, DocrefError> {
    if !path.is_dir() {
        return ParsedTree::from_json(&std::fs::read_to_string(path)?);
    }

    let mut exports: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    exports.sort();
    if exports.is_empty() {
        return Err(DocrefError::ParseInput(format!(
            "no JSON exports found under {}",
            path.display()
        )));
    }

    let mut tree = ParsedTree::default();
    for export in exports {
        tracing::debug!("Reading export {:?}", export);
        tree.extend(ParsedTree::from_json(&std::fs::read_to_string(&export)?)?);
    }
    Ok(tree)
}
