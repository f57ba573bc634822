use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use kindex::indexer::{IndexScope, Indexer, RunStats};

fn progress_bar() -> Result<ProgressBar> {
    let bar = ProgressBar::new(0);
    bar.set_style(ProgressStyle::with_template(
        "{spinner:.green} {msg:<24} [{bar:40.cyan/blue}] {pos}/{len}",
    )?);
    bar.enable_steady_tick(Duration::from_millis(120));
    Ok(bar)
}

pub fn index_project(project: &Path, scope: IndexScope, rebuild: bool) -> Result<()> {
    let indexer = Indexer::open(project)?.with_progress(progress_bar()?);

    println!("kindex v0.1.0");
    println!(
        "Project: {} ({})",
        indexer.config().project.name,
        indexer.root().display()
    );
    println!("Database: {}", indexer.db().path().display());
    println!("Scope: {}", scope.as_str());
    println!("Rebuild: {}", rebuild);

    if rebuild {
        indexer.db().clear()?;
    }

    let stats = indexer.full(scope)?;
    print_run(&stats, false);
    Ok(())
}

pub fn update_project(project: &Path) -> Result<()> {
    let indexer = Indexer::open(project)?.with_progress(progress_bar()?);

    println!("kindex v0.1.0");
    println!("Project: {}", indexer.root().display());

    let stats = indexer.incremental()?;
    print_run(&stats, true);
    Ok(())
}

fn print_run(stats: &RunStats, incremental: bool) {
    println!("\nIndexing complete in {:.2}s", stats.elapsed_seconds);
    println!("  Files: {} added, {} updated, {} removed", stats.added, stats.updated, stats.removed);
    if incremental {
        println!("  Skipped (unchanged): {}", stats.skipped);
    } else {
        println!("  Modules: {} ({} dependencies)", stats.modules, stats.dependencies);
    }
    println!(
        "  Symbols: {} ({} inheritance edges)",
        stats.symbols, stats.inheritance
    );
    println!("  References: {}", stats.references);
    println!(
        "  Android: {} layout usages, {} resources, {} resource usages",
        stats.xml_usages, stats.resources, stats.resource_usages
    );
    if stats.errors > 0 {
        println!("  Errors: {} (see log)", stats.errors);
    }
}
