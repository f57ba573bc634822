// Indexing pipeline: file scan, module graph, symbols, Android resources,
// references

pub mod android;
pub mod fallback;
pub mod inheritance;
pub mod modules;
pub mod parser;
pub mod references;
pub mod scanner;

use anyhow::Result;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::index::db::{timestamp, IndexDatabase, META_LAST_INDEXED};
use crate::index::{ExtractError, ExtractedSymbol, File};
use modules::ModuleGraphBuilder;
use parser::ExtractorSet;
use references::ReferenceScanner;
use scanner::FileScanner;

/// Which part of the index a full run rebuilds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexScope {
    #[default]
    All,
    Files,
    Modules,
    Symbols,
}

impl IndexScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexScope::All => "all",
            IndexScope::Files => "files",
            IndexScope::Modules => "modules",
            IndexScope::Symbols => "symbols",
        }
    }

    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "all" => Ok(IndexScope::All),
            "files" => Ok(IndexScope::Files),
            "modules" => Ok(IndexScope::Modules),
            "symbols" => Ok(IndexScope::Symbols),
            _ => anyhow::bail!("Unknown index scope: {}", s),
        }
    }

    fn scans_files(&self) -> bool {
        matches!(self, IndexScope::All | IndexScope::Files)
    }

    fn builds_modules(&self) -> bool {
        matches!(self, IndexScope::All | IndexScope::Modules)
    }

    fn extracts_symbols(&self) -> bool {
        matches!(self, IndexScope::All | IndexScope::Symbols)
    }
}

/// Counters for one indexing run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    /// Files whose derived data an incremental run left untouched
    pub skipped: usize,
    pub errors: usize,
    pub symbols: usize,
    pub inheritance: usize,
    pub references: usize,
    pub xml_usages: usize,
    pub resources: usize,
    pub resource_usages: usize,
    pub modules: usize,
    pub dependencies: usize,
    pub elapsed_seconds: f64,
}

/// Coordinates the passes over one project tree and its index
pub struct Indexer {
    db: IndexDatabase,
    config: Config,
    root: PathBuf,
    extractors: ExtractorSet,
    progress: ProgressBar,
}

impl Indexer {
    pub fn new(root: impl Into<PathBuf>, db: IndexDatabase, config: Config) -> Self {
        let extractors = ExtractorSet::new(config.indexing.use_grammar);
        Self {
            db,
            config,
            root: root.into(),
            extractors,
            progress: ProgressBar::hidden(),
        }
    }

    /// Load `.kindex.toml` from `project_dir` and open the configured database
    pub fn open(project_dir: &Path) -> Result<Self> {
        let config = Config::from_project_dir(project_dir);
        let root = config.project_root(project_dir);
        let db = IndexDatabase::new(config.database_path(&root))?;
        Ok(Self::new(root, db, config))
    }

    /// Report phase progress on `progress` instead of a hidden bar
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn db(&self) -> &IndexDatabase {
        &self.db
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Rebuild the index from the tree. Files no longer on disk are removed.
    pub fn full(&self, scope: IndexScope) -> Result<RunStats> {
        let started = Instant::now();
        let mut stats = RunStats::default();
        info!("Full index ({}) of {}", scope.as_str(), self.root.display());

        if scope.scans_files() {
            self.scan_files(true, &mut stats)?;
        }

        if scope.builds_modules() {
            self.progress.set_position(0);
            let builder = ModuleGraphBuilder::new(&self.root, &self.config.indexing);
            let (modules, dependencies) = builder.index(&self.db, &self.progress)?;
            stats.modules = modules;
            stats.dependencies = dependencies;
        }

        if scope.extracts_symbols() {
            let files = self.db.get_source_files(&self.config.indexing.source_extensions)?;
            let processed = self.extract_symbols(&files, &mut stats)?;
            let android = self.android_files()?;
            self.index_android(&android, &mut stats)?;
            self.resolve_references(&processed, &mut stats)?;
        }

        self.finish(scope != IndexScope::Modules, started, &mut stats)?;
        Ok(stats)
    }

    /// Re-process only files changed since they were last indexed.
    ///
    /// New and modified files are picked up; deletions wait for a full run.
    pub fn incremental(&self) -> Result<RunStats> {
        let started = Instant::now();
        let mut stats = RunStats::default();
        info!("Incremental index of {}", self.root.display());

        self.scan_files(false, &mut stats)?;

        let sources = self.db.get_source_files(&self.config.indexing.source_extensions)?;
        let changed = self.changed_files(sources, &mut stats);
        let android = self.android_files()?;
        let changed_android = self.changed_files(android, &mut stats);
        info!(
            "{} source and {} Android files changed, {} skipped",
            changed.len(),
            changed_android.len(),
            stats.skipped
        );

        let processed = self.extract_symbols(&changed, &mut stats)?;
        self.index_android(&changed_android, &mut stats)?;
        // References may point at symbols and resources in unchanged files,
        // so the known names come from the whole store
        self.resolve_references(&processed, &mut stats)?;

        self.finish(true, started, &mut stats)?;
        Ok(stats)
    }

    /// Re-index one file now, regardless of its stored timestamps
    pub fn index_file(&self, path: &Path) -> Result<RunStats> {
        let started = Instant::now();
        let mut stats = RunStats::default();

        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        let mut scanner = FileScanner::new(&self.root, &self.config.indexing);
        if !path.is_file() || !scanner.is_indexable(&path) {
            anyhow::bail!("Not an indexable file: {}", path.display());
        }
        let record = scanner.record(&path)?;
        let rel = record.path.clone();
        let existed = self.db.get_file_by_path(&rel)?.is_some();
        self.db.upsert_files(std::slice::from_ref(&record))?;
        if existed {
            stats.updated = 1;
        } else {
            stats.added = 1;
        }

        if let Some(file) = self.db.get_file_by_path(&rel)? {
            if self.config.is_source_file(&file.name) {
                let processed = self.extract_symbols(std::slice::from_ref(&file), &mut stats)?;
                self.resolve_references(&processed, &mut stats)?;
            } else if self.is_android_file(&file) {
                self.index_android(std::slice::from_ref(&file), &mut stats)?;
            }
        }

        self.finish(true, started, &mut stats)?;
        Ok(stats)
    }

    fn scan_files(&self, reconcile_removals: bool, stats: &mut RunStats) -> Result<()> {
        self.progress.set_position(0);
        let mut scanner = FileScanner::new(&self.root, &self.config.indexing);
        let scan = scanner.sync(&self.db, reconcile_removals, &self.progress)?;
        stats.added += scan.added;
        stats.updated += scan.updated;
        stats.removed += scan.removed;
        stats.errors += scan.errors;
        Ok(())
    }

    fn changed_files(&self, files: Vec<File>, stats: &mut RunStats) -> Vec<File> {
        let mut changed = Vec::new();
        for file in files {
            match self.needs_reindex(&file) {
                Some(true) => changed.push(file),
                Some(false) => stats.skipped += 1,
                None => {
                    debug!("{} vanished since the scan; skipping", file.path);
                    stats.skipped += 1;
                }
            }
        }
        changed
    }

    /// XML files and anything below a `res/` directory, other than sources
    fn is_android_file(&self, file: &File) -> bool {
        !self.config.is_source_file(&file.name)
            && (file.extension == ".xml" || android::resource_dir(&file.path).is_some())
    }

    fn android_files(&self) -> Result<Vec<File>> {
        let files = self.db.get_source_files(&self.config.indexing.extensions)?;
        Ok(files.into_iter().filter(|f| self.is_android_file(f)).collect())
    }

    /// Layout usages and resource definitions of `files`, then their `@type/name`
    /// references against every resource in the store
    fn index_android(&self, files: &[File], stats: &mut RunStats) -> Result<()> {
        self.progress.set_position(0);
        self.progress.set_length(files.len() as u64);
        self.progress.set_message("indexing resources");

        let mut xml_files = Vec::new();
        for file in files {
            self.progress.inc(1);

            let content = if file.extension == ".xml" {
                match read_source(&self.root.join(&file.path)) {
                    Ok(content) => Some(content),
                    Err(e) => {
                        warn!("Failed to read {}: {}", file.path, e);
                        stats.errors += 1;
                        continue;
                    }
                }
            } else {
                None
            };

            let usages = match content.as_deref() {
                Some(content) if android::is_layout_xml(&file.path) => android::scan_layout(content),
                _ => Vec::new(),
            };
            let definitions = android::resource_definitions(&file.path, content.as_deref());
            let (usage_count, definition_count) =
                self.db.replace_file_android(file.id, &usages, &definitions)?;
            stats.xml_usages += usage_count;
            stats.resources += definition_count;

            if content.is_some() {
                xml_files.push(file);
            }
        }

        let known = self.db.known_resources()?;
        for file in xml_files {
            let content = match read_source(&self.root.join(&file.path)) {
                Ok(content) => content,
                Err(e) => {
                    warn!("Failed to scan resource references in {}: {}", file.path, e);
                    stats.errors += 1;
                    continue;
                }
            };
            let refs = android::scan_xml_resources(&content, &known);
            stats.resource_usages += self.db.replace_file_resource_usages(file.id, &refs)?;
        }

        info!(
            "Recorded {} layout usages and {} resource definitions",
            stats.xml_usages, stats.resources
        );
        Ok(())
    }

    /// `Some(true)` when the file's derived data is out of date, `None` when
    /// the file is gone from disk
    fn needs_reindex(&self, file: &File) -> Option<bool> {
        let metadata = std::fs::metadata(self.root.join(&file.path)).ok()?;
        let Some(indexed_at) = file.indexed_at else {
            return Some(true);
        };
        let mtime = metadata.modified().ok().and_then(|m| timestamp(m).ok())?;
        Some(mtime > indexed_at && mtime != file.modified_at)
    }

    /// Symbol and inheritance pass; returns the files whose derived data was
    /// replaced
    fn extract_symbols(&self, files: &[File], stats: &mut RunStats) -> Result<Vec<File>> {
        self.progress.set_position(0);
        self.progress.set_length(files.len() as u64);
        self.progress.set_message("extracting symbols");

        let mut processed = Vec::with_capacity(files.len());
        for file in files {
            self.progress.inc(1);

            let symbols = match self.extract(file) {
                Ok(Some(symbols)) => symbols,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Failed to extract symbols from {}: {}", file.path, e);
                    stats.errors += 1;
                    continue;
                }
            };

            let (count, edges) = self.db.replace_file_symbols(file.id, &symbols)?;
            debug!("{}: {} symbols, {} supertypes", file.path, count, edges);
            stats.symbols += count;
            stats.inheritance += edges;
            processed.push(file.clone());
        }

        info!(
            "Extracted {} symbols and {} inheritance edges from {} files",
            stats.symbols,
            stats.inheritance,
            processed.len()
        );
        Ok(processed)
    }

    /// `None` when no extractor handles the file's language
    fn extract(&self, file: &File) -> Result<Option<Vec<ExtractedSymbol>>, ExtractError> {
        let path = self.root.join(&file.path);
        let Some(extractor) = self.extractors.for_path(&path) else {
            return Ok(None);
        };
        let content = read_source(&path)?;
        extractor.extract(&content).map(Some)
    }

    /// Reference pass over `files` against the stored class-like names and
    /// resource definitions
    fn resolve_references(&self, files: &[File], stats: &mut RunStats) -> Result<()> {
        let known = self.db.known_symbol_names()?;
        let scanner = ReferenceScanner::new(&known);
        let known_resources = self.db.known_resources()?;
        debug!(
            "Known snapshot holds {} symbol names and {} resources",
            known.len(),
            known_resources.len()
        );

        self.progress.set_position(0);
        self.progress.set_length(files.len() as u64);
        self.progress.set_message("resolving references");

        for file in files {
            self.progress.inc(1);

            let content = match read_source(&self.root.join(&file.path)) {
                Ok(content) => content,
                Err(e) => {
                    warn!("Failed to scan references in {}: {}", file.path, e);
                    stats.errors += 1;
                    continue;
                }
            };
            let refs = scanner.scan(&content);
            stats.references += self.db.replace_file_references(file.id, &refs)?;
            let resources = android::scan_code_resources(&content, &known_resources);
            stats.resource_usages += self.db.replace_file_resource_usages(file.id, &resources)?;
        }

        info!(
            "Recorded {} references and {} resource usages",
            stats.references, stats.resource_usages
        );
        Ok(())
    }

    fn finish(&self, rebuild_full_text: bool, started: Instant, stats: &mut RunStats) -> Result<()> {
        if rebuild_full_text {
            self.db.rebuild_full_text()?;
        }
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        self.db.set_meta(META_LAST_INDEXED, &stamp)?;
        self.progress.finish_and_clear();

        stats.elapsed_seconds = (started.elapsed().as_secs_f64() * 100.0).round() / 100.0;
        info!(
            "Indexed in {:.2}s: {} added, {} updated, {} removed, {} errors",
            stats.elapsed_seconds, stats.added, stats.updated, stats.removed, stats.errors
        );
        Ok(())
    }
}

fn read_source(path: &Path) -> Result<String, ExtractError> {
    std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn indexer(dir: &Path) -> Indexer {
        let root = dir.join("project");
        fs::create_dir_all(&root).unwrap();
        let db = IndexDatabase::new(dir.join("index.db")).unwrap();
        Indexer::new(root, db, Config::default())
    }

    #[test]
    fn test_scope_names() {
        for scope in [IndexScope::All, IndexScope::Files, IndexScope::Modules, IndexScope::Symbols] {
            assert_eq!(IndexScope::from_str(scope.as_str()).unwrap(), scope);
        }
        assert!(IndexScope::from_str("everything").is_err());
    }

    #[test]
    fn test_files_scope_leaves_symbols_alone() {
        let dir = tempdir().unwrap();
        let indexer = indexer(dir.path());
        write(indexer.root(), "core/Model.kt", "class Model");

        let stats = indexer.full(IndexScope::Files).unwrap();
        assert_eq!(stats.added, 1);
        assert_eq!(stats.symbols, 0);
        assert_eq!(indexer.db().get_stats().unwrap().symbols, 0);
        assert!(indexer.db().get_meta(META_LAST_INDEXED).unwrap().is_some());
    }

    #[test]
    fn test_unreadable_source_is_counted_not_fatal() {
        let dir = tempdir().unwrap();
        let indexer = indexer(dir.path());
        write(indexer.root(), "core/Good.kt", "class Good");
        write(indexer.root(), "core/Bad.kt", "class Bad");

        indexer.full(IndexScope::Files).unwrap();
        fs::write(indexer.root().join("core/Bad.kt"), [0xff, 0xfe, 0x00]).unwrap();

        let stats = indexer.full(IndexScope::Symbols).unwrap();
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.symbols, 1);
    }

    #[test]
    fn test_index_file_picks_up_new_file() {
        let dir = tempdir().unwrap();
        let indexer = indexer(dir.path());
        write(indexer.root(), "core/Base.kt", "open class Base");
        indexer.full(IndexScope::All).unwrap();

        write(indexer.root(), "core/Child.kt", "class Child : Base()");
        let stats = indexer.index_file(Path::new("core/Child.kt")).unwrap();
        assert_eq!((stats.added, stats.symbols, stats.inheritance), (1, 1, 1));
        assert_eq!(indexer.db().implementations("Base").unwrap().len(), 1);

        assert!(indexer.index_file(Path::new("core/Missing.kt")).is_err());
    }

    #[test]
    fn test_layout_and_resources_are_indexed() {
        let dir = tempdir().unwrap();
        let indexer = indexer(dir.path());
        write(
            indexer.root(),
            "app/src/main/res/layout/main.xml",
            "<LinearLayout>\n    <com.shop.ui.PriceView\n        android:id=\"@+id/price\"\n        android:text=\"@string/price_label\" />\n</LinearLayout>\n",
        );
        write(
            indexer.root(),
            "app/src/main/res/values/strings.xml",
            "<resources>\n    <string name=\"price_label\">Price</string>\n    <string name=\"unused\">Unused</string>\n</resources>\n",
        );
        write(
            indexer.root(),
            "app/src/main/kotlin/com/shop/ui/PriceView.kt",
            "package com.shop.ui\n\nclass PriceView {\n    val label = R.string.price_label\n}\n",
        );

        let stats = indexer.full(IndexScope::All).unwrap();
        assert_eq!((stats.xml_usages, stats.resources, stats.resource_usages), (1, 3, 2));
        assert_eq!(stats.errors, 0);

        let usages = indexer.db().xml_usages("PriceView", 10).unwrap();
        assert_eq!(usages.len(), 1);
        assert_eq!(usages[0].element_id.as_deref(), Some("price"));

        let unused: Vec<String> = indexer
            .db()
            .unused_resources(None)
            .unwrap()
            .into_iter()
            .map(|r| format!("{}/{}", r.kind.as_str(), r.name))
            .collect();
        assert_eq!(unused, vec!["layout/main", "string/unused"]);
    }

    #[test]
    fn test_unreadable_layout_is_counted_once() {
        let dir = tempdir().unwrap();
        let indexer = indexer(dir.path());
        write(indexer.root(), "app/src/main/res/layout/broken.xml", "<FrameLayout />");
        indexer.full(IndexScope::Files).unwrap();
        fs::write(indexer.root().join("app/src/main/res/layout/broken.xml"), [0xff, 0xfe, 0x00]).unwrap();

        let stats = indexer.full(IndexScope::Symbols).unwrap();
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.resources, 0);
    }
}
