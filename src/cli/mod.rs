// CLI command implementations

pub mod index;
pub mod query;
pub mod stats;

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use kindex::config::Config;
use kindex::index::db::IndexDatabase;
use kindex::query::engine::QueryEngine;

/// How lookup results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Open the project's index for reading
pub fn open_engine(project: &Path) -> Result<QueryEngine> {
    let config = Config::from_project_dir(project);
    let root = config.project_root(project);
    let db_path = config.database_path(&root);
    if !db_path.exists() {
        anyhow::bail!(
            "No index at {}; run `kindex index` first",
            db_path.display()
        );
    }
    Ok(QueryEngine::new(IndexDatabase::new(db_path)?, root))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
