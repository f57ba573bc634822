//! Incremental structural index for multi-module Kotlin/Java (Gradle) trees.
//!
//! Files, Gradle modules with their one-hop dependency graph, declared
//! symbols with nesting and supertypes, and lexical usages are stored in a
//! SQLite database and queried without re-scanning the tree.

pub mod config;
pub mod index;
pub mod indexer;
pub mod query;

pub use config::Config;
pub use index::db::{IndexDatabase, IndexStats};
pub use indexer::{IndexScope, Indexer, RunStats};
pub use query::engine::QueryEngine;
