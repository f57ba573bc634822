use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kindex::config::{Config, LoggingConfig};
use kindex::indexer::IndexScope;

mod cli;

use cli::OutputFormat;

#[derive(Parser)]
#[command(name = "kindex")]
#[command(author = "Intent Project Team")]
#[command(version = "0.1.0")]
#[command(about = "Incremental structural index for Kotlin/Java Gradle projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project directory
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the index from the project tree
    Index {
        /// Part of the index to rebuild: all, files, modules, symbols
        #[arg(short, long, default_value = "all")]
        scope: String,

        /// Drop the existing index first
        #[arg(short, long)]
        rebuild: bool,
    },

    /// Re-index files changed since the last run
    Update,

    /// Show index statistics
    Stats {
        /// Break counts down by kind
        #[arg(long)]
        detailed: bool,
    },

    /// Search files, symbols and modules at once
    Search {
        query: String,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Find files by name or path
    File {
        query: String,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Use the full-text index
        #[arg(long)]
        fts: bool,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Find symbols by name
    Symbol {
        query: String,

        /// Restrict to one kind: class, interface, object, enum, function, property
        #[arg(short = 't', long = "type")]
        kind: Option<String>,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Use the full-text index
        #[arg(long)]
        fts: bool,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Find classes, interfaces, objects and enums by name
    Class {
        name: String,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the symbols declared in a file
    Outline {
        path: String,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Find modules by name
    Module {
        query: String,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Modules a module depends on
    Deps {
        module: String,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Modules depending on a module
    Dependents {
        module: String,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Usages of a class-like symbol
    Usages {
        symbol: String,

        #[arg(short, long, default_value_t = 100)]
        limit: usize,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Types declaring a supertype
    Implementations {
        name: String,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Supertypes and direct subtypes of a type
    Hierarchy {
        name: String,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Find Android resources by name
    Resource {
        query: String,

        /// Restrict to one type: drawable, string, color, dimen, style, layout, id, mipmap
        #[arg(short = 't', long = "type")]
        kind: Option<String>,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Usages of a resource given as @type/name or R.type.name
    ResourceUsages {
        reference: String,

        #[arg(short, long, default_value_t = 100)]
        limit: usize,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Resources that nothing refers to
    UnusedResources {
        /// Only resources defined in this module
        #[arg(short, long)]
        module: Option<String>,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show modules as a tree
    Tree {
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

fn init_logging(debug: bool, verbose: bool, logging: &LoggingConfig) {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_project_dir(&cli.project);
    init_logging(cli.debug, cli.verbose, &config.logging);

    info!("kindex v0.1.0 starting for {}", cli.project.display());
    let project = cli.project;

    match cli.command {
        Commands::Index { scope, rebuild } => {
            cli::index::index_project(&project, IndexScope::from_str(&scope)?, rebuild)?;
        }

        Commands::Update => {
            cli::index::update_project(&project)?;
        }

        Commands::Stats { detailed } => {
            cli::stats::show_stats(&project, detailed)?;
        }

        Commands::Search { query, limit, format } => {
            cli::query::search(&project, &query, limit, format)?;
        }

        Commands::File {
            query,
            limit,
            fts,
            format,
        } => {
            cli::query::find_files(&project, &query, limit, fts, format)?;
        }

        Commands::Symbol {
            query,
            kind,
            limit,
            fts,
            format,
        } => {
            cli::query::find_symbols(&project, &query, kind.as_deref(), limit, fts, format)?;
        }

        Commands::Class { name, limit, format } => {
            cli::query::find_classes(&project, &name, limit, format)?;
        }

        Commands::Outline { path, format } => {
            cli::query::outline(&project, &path, format)?;
        }

        Commands::Module { query, limit, format } => {
            cli::query::find_modules(&project, &query, limit, format)?;
        }

        Commands::Deps { module, format } => {
            cli::query::dependencies(&project, &module, format)?;
        }

        Commands::Dependents { module, format } => {
            cli::query::dependents(&project, &module, format)?;
        }

        Commands::Usages {
            symbol,
            limit,
            format,
        } => {
            cli::query::usages(&project, &symbol, limit, format)?;
        }

        Commands::Implementations { name, format } => {
            cli::query::implementations(&project, &name, format)?;
        }

        Commands::Hierarchy { name, format } => {
            cli::query::hierarchy(&project, &name, format)?;
        }

        Commands::Resource {
            query,
            kind,
            limit,
            format,
        } => {
            cli::query::find_resources(&project, &query, kind.as_deref(), limit, format)?;
        }

        Commands::ResourceUsages {
            reference,
            limit,
            format,
        } => {
            cli::query::resource_usages(&project, &reference, limit, format)?;
        }

        Commands::UnusedResources { module, format } => {
            cli::query::unused_resources(&project, module.as_deref(), format)?;
        }

        Commands::Tree { format } => {
            cli::query::module_tree(&project, format)?;
        }
    }

    Ok(())
}
