use anyhow::Result;
use std::path::Path;

use kindex::index::db::IndexDatabase;

use super::open_engine;

pub fn show_stats(project: &Path, detailed: bool) -> Result<()> {
    let engine = open_engine(project)?;
    let db = engine.db();
    let stats = db.get_stats()?;

    println!("kindex statistics");
    println!("Database: {}", db.path().display());

    println!("\nIndex:");
    println!("  Files: {}", stats.files);
    println!("  Modules: {}", stats.modules);
    println!("  Module dependencies: {}", stats.dependencies);
    println!("  Symbols: {}", stats.symbols);
    println!("  Inheritance edges: {}", stats.inheritance);
    println!("  References: {}", stats.references);
    println!("  Layout usages: {}", stats.xml_usages);
    println!("  Resources: {}", stats.resources);
    println!("  Resource usages: {}", stats.resource_usages);
    println!(
        "  Last indexed: {}",
        stats.last_indexed.as_deref().unwrap_or("never")
    );
    println!("  Index size: {:.2} MB", get_db_size(db.path())?);

    if detailed {
        print_breakdown("Symbols by kind", &count_by(db, "symbols", "type")?);
        print_breakdown("Files by extension", &count_by(db, "files", "extension")?);
        print_breakdown("Modules by type", &count_by(db, "modules", "type")?);
        print_breakdown("References by context", &count_by(db, "symbol_references", "context")?);
        print_breakdown("Resources by type", &count_by(db, "resources", "type")?);
    }

    Ok(())
}

fn print_breakdown(title: &str, rows: &[(String, usize)]) {
    if rows.is_empty() {
        return;
    }
    println!("\n{}:", title);
    for (key, count) in rows {
        println!("  {}: {}", key, count);
    }
}

fn get_db_size(db_path: &Path) -> Result<f64> {
    let metadata = std::fs::metadata(db_path)?;
    let size_bytes = metadata.len() as f64;
    Ok(size_bytes / (1024.0 * 1024.0))
}

/// Row counts grouped by one column; table and column are fixed names
fn count_by(db: &IndexDatabase, table: &str, column: &str) -> Result<Vec<(String, usize)>> {
    let conn = db.get_conn()?;

    let mut stmt = conn.prepare(&format!(
        "SELECT COALESCE({column}, ''), COUNT(*) AS count FROM {table}
         GROUP BY 1 ORDER BY count DESC"
    ))?;

    let rows = stmt.query_map([], |row| {
        let key: String = row.get(0)?;
        let count: usize = row.get(1)?;
        Ok((key, count))
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }

    Ok(results)
}
