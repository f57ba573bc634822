// Project tree walk and file-table synchronisation

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::IndexingConfig;
use crate::index::db::{timestamp, IndexDatabase};
use crate::index::FileRecord;

/// Source-layout directory names dropped from module names
const LAYOUT_DIRS: &[&str] = &["src", "main", "kotlin", "java", "res", "test", "androidTest"];

/// Layout names dropped from the path-prefix fallback
const FALLBACK_LAYOUT_DIRS: &[&str] = &["src", "main", "kotlin", "java"];

/// Path segments used when no descriptor encloses a file
const FALLBACK_DEPTH: usize = 3;

/// Module name of files with no usable path prefix
pub const ROOT_MODULE: &str = "root";

/// Outcome of one scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanStats {
    pub total: usize,
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub errors: usize,
}

/// Walks the project tree and keeps the file table in step with it
pub struct FileScanner {
    root: PathBuf,
    config: IndexingConfig,
    /// Directory -> holds a build descriptor
    descriptor_dirs: HashMap<PathBuf, bool>,
}

impl FileScanner {
    pub fn new(root: impl Into<PathBuf>, config: &IndexingConfig) -> Self {
        Self {
            root: root.into(),
            config: config.clone(),
            descriptor_dirs: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Indexable files under the root, in file-name order per directory.
    /// Ignored directories are pruned wherever they appear below the root.
    pub fn walk(&self) -> Vec<PathBuf> {
        let ignore_dirs = &self.config.ignore_dirs;

        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !ignore_dirs.iter().any(|d| entry.file_name() == d.as_str())
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| self.is_indexable(entry.path()))
            .map(|entry| entry.into_path())
            .collect()
    }

    /// Whether the file's extension is in the indexable set
    pub fn is_indexable(&self, path: &Path) -> bool {
        extension_of(path)
            .map(|ext| self.config.extensions.iter().any(|e| *e == ext))
            .unwrap_or(false)
    }

    /// Project-relative path with `/` separators
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }

    /// Dotted module name of a project-relative file path.
    ///
    /// The deepest enclosing directory holding a build descriptor wins; its
    /// path, minus source-layout segments, is the module name. Files outside
    /// any module fall back to the leading path segments.
    pub fn detect_module(&mut self, rel_path: &str) -> String {
        let parts: Vec<&str> = rel_path.split('/').filter(|p| !p.is_empty()).collect();
        let mut module_parts: Vec<&str> = Vec::new();

        let mut current = self.root.clone();
        for (i, part) in parts.iter().enumerate().take(parts.len().saturating_sub(1)) {
            current.push(part);
            if self.has_descriptor(&current) {
                module_parts = parts[..=i]
                    .iter()
                    .copied()
                    .filter(|p| !LAYOUT_DIRS.contains(p))
                    .collect();
            }
        }

        if !module_parts.is_empty() {
            return module_parts.join(".");
        }

        let significant: Vec<&str> = parts
            .iter()
            .take(FALLBACK_DEPTH)
            .copied()
            .filter(|p| !FALLBACK_LAYOUT_DIRS.contains(p))
            .collect();
        if significant.is_empty() {
            ROOT_MODULE.to_string()
        } else {
            significant.join(".")
        }
    }

    fn has_descriptor(&mut self, dir: &Path) -> bool {
        if let Some(&known) = self.descriptor_dirs.get(dir) {
            return known;
        }
        let found = self
            .config
            .descriptor_names
            .iter()
            .any(|name| dir.join(name).is_file());
        self.descriptor_dirs.insert(dir.to_path_buf(), found);
        found
    }

    /// File row for one on-disk file
    pub fn record(&mut self, path: &Path) -> Result<FileRecord> {
        let rel = self
            .relative_path(path)
            .with_context(|| format!("{} is outside {}", path.display(), self.root.display()))?;
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Failed to stat {}", path.display()))?;
        let modified = metadata
            .modified()
            .with_context(|| format!("No modification time for {}", path.display()))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let module = self.detect_module(&rel);

        Ok(FileRecord {
            path: rel,
            name,
            extension: extension_of(path).unwrap_or_default(),
            module: Some(module),
            modified_at: timestamp(modified)?,
        })
    }

    /// Bring the file table in line with the tree.
    ///
    /// A file whose stored `modified_at` equals its current mtime is left
    /// alone. With `reconcile_removals`, rows for files no longer on disk are
    /// deleted in batches of `delete_batch_size`.
    pub fn sync(
        &mut self,
        db: &IndexDatabase,
        reconcile_removals: bool,
        progress: &ProgressBar,
    ) -> Result<ScanStats> {
        let mut stats = ScanStats::default();
        let stored = db.get_file_mtimes()?;
        let mut found: HashSet<String> = HashSet::new();
        let mut pending = Vec::new();

        let paths = self.walk();
        progress.set_length(paths.len() as u64);
        progress.set_message("scanning files");

        for path in &paths {
            progress.inc(1);
            stats.total += 1;

            let record = match self.record(path) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Failed to scan {}: {:#}", path.display(), e);
                    stats.errors += 1;
                    continue;
                }
            };
            found.insert(record.path.clone());

            match stored.get(&record.path) {
                Some(&mtime) if mtime == record.modified_at => {
                    stats.unchanged += 1;
                    continue;
                }
                Some(_) => stats.updated += 1,
                None => stats.added += 1,
            }
            debug!("Scanned {} ({:?})", record.path, record.module);
            pending.push(record);
        }

        db.upsert_files(&pending)?;

        if reconcile_removals {
            let mut removed: Vec<String> = stored
                .keys()
                .filter(|path| !found.contains(*path))
                .cloned()
                .collect();
            removed.sort();
            // Unreadable files are still on disk; keep their rows
            removed.retain(|path| !self.root.join(path).exists());
            stats.removed = db.delete_files_by_paths(&removed, self.config.delete_batch_size)?;
        }

        info!(
            "Scanned {} files: {} added, {} updated, {} removed, {} unchanged",
            stats.total, stats.added, stats.updated, stats.removed, stats.unchanged
        );
        Ok(stats)
    }
}

/// Last extension of a file name with its leading dot (`.kts`)
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn scanner(root: &Path) -> FileScanner {
        FileScanner::new(root, &IndexingConfig::default())
    }

    fn relative(scanner: &FileScanner, paths: &[PathBuf]) -> Vec<String> {
        paths.iter().filter_map(|p| scanner.relative_path(p)).collect()
    }

    #[test]
    fn test_walk_prunes_ignored_dirs() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "app/src/main/kotlin/App.kt", "class App");
        write(root, "app/build/generated/Gen.kt", "class Gen");
        write(root, ".gradle/cache.properties", "");
        write(root, "core/.idea/workspace.xml", "");
        write(root, "core/build.gradle.kts", "");
        write(root, "README.md", "");

        let scanner = scanner(root);
        let found = relative(&scanner, &scanner.walk());
        assert_eq!(found, vec!["app/src/main/kotlin/App.kt", "core/build.gradle.kts"]);
    }

    #[test]
    fn test_detect_module_uses_deepest_descriptor() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "build.gradle.kts", "");
        write(root, "features/payments/api/build.gradle.kts", "");
        write(root, "features/payments/api/src/main/kotlin/Pay.kt", "");
        write(root, "libs/legacy/build.gradle", "");
        write(root, "libs/legacy/src/test/java/LegacyTest.java", "");

        let mut scanner = scanner(root);
        assert_eq!(
            scanner.detect_module("features/payments/api/src/main/kotlin/Pay.kt"),
            "features.payments.api"
        );
        assert_eq!(
            scanner.detect_module("libs/legacy/src/test/java/LegacyTest.java"),
            "libs.legacy"
        );
    }

    #[test]
    fn test_detect_module_fallback() {
        let dir = tempdir().unwrap();
        let mut scanner = scanner(dir.path());

        assert_eq!(scanner.detect_module("tools/scripts/gen/Run.kt"), "tools.scripts.gen");
        assert_eq!(scanner.detect_module("src/main/kotlin/Top.kt"), ROOT_MODULE);
        assert_eq!(scanner.detect_module("gradle.properties"), "gradle.properties");
    }

    #[test]
    fn test_sync_counts_and_skips_unchanged() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("project");
        write(&root, "app/build.gradle.kts", "");
        write(&root, "app/src/main/kotlin/A.kt", "class A");
        write(&root, "app/src/main/kotlin/B.kt", "class B");
        let db = IndexDatabase::new(dir.path().join("index.db")).unwrap();
        let progress = ProgressBar::hidden();

        let mut scanner = scanner(&root);
        let first = scanner.sync(&db, true, &progress).unwrap();
        assert_eq!((first.total, first.added, first.updated), (3, 3, 0));

        let stored = db.get_file_by_path("app/src/main/kotlin/A.kt").unwrap().unwrap();
        assert_eq!(stored.module.as_deref(), Some("app"));
        assert_eq!(stored.extension, ".kt");

        let second = scanner.sync(&db, true, &progress).unwrap();
        assert_eq!(second.unchanged, 3);
        assert_eq!((second.added, second.updated, second.removed), (0, 0, 0));
    }

    #[test]
    fn test_sync_reconciles_removals_only_when_asked() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("project");
        write(&root, "core/Gone.kt", "class Gone");
        write(&root, "core/Kept.kt", "class Kept");
        let db = IndexDatabase::new(dir.path().join("index.db")).unwrap();
        let progress = ProgressBar::hidden();

        let mut scanner = scanner(&root);
        scanner.sync(&db, true, &progress).unwrap();
        fs::remove_file(root.join("core/Gone.kt")).unwrap();

        let partial = scanner.sync(&db, false, &progress).unwrap();
        assert_eq!(partial.removed, 0);
        assert!(db.get_file_by_path("core/Gone.kt").unwrap().is_some());

        let full = scanner.sync(&db, true, &progress).unwrap();
        assert_eq!(full.removed, 1);
        assert!(db.get_file_by_path("core/Gone.kt").unwrap().is_none());
        assert!(db.get_file_by_path("core/Kept.kt").unwrap().is_some());
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("a/build.gradle.kts")).as_deref(), Some(".kts"));
        assert_eq!(extension_of(Path::new("Makefile")), None);
    }

    proptest! {
        #[test]
        fn module_name_never_has_layout_segments(
            parts in proptest::collection::vec("(src|main|kotlin|java|core|api|app)", 1..6)
        ) {
            let dir = tempdir().unwrap();
            let mut scanner = scanner(dir.path());
            let rel = format!("{}/File.kt", parts.join("/"));

            let module = scanner.detect_module(&rel);
            prop_assert!(!module.is_empty());
            prop_assert!(module
                .split('.')
                .all(|p| !FALLBACK_LAYOUT_DIRS.contains(&p)));
        }
    }
}
