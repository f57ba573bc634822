// Gradle module discovery and the one-hop dependency graph

use anyhow::Result;
use indicatif::ProgressBar;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::IndexingConfig;
use crate::index::db::IndexDatabase;
use crate::index::{DeclaredDependency, DependencyKind, ModuleRecord, ModuleType};

/// `modules { ... }` block closed by a brace on its own line
static MODULES_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)modules\s*\{([\s\S]*?)\n\s*\}").expect("valid regex"));

static BLOCK_DEPENDENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(api|implementation|testImplementation)\s*\(\s*projects\.([a-zA-Z0-9_.]+)\s*\)")
        .expect("valid regex")
});

static PROJECT_DEPENDENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)(api|implementation|testImplementation|androidTestImplementation)\s*\(\s*projects\.([a-zA-Z0-9_.]+)\s*\)",
    )
    .expect("valid regex")
});

/// Top-level directories that never hold product modules
const NON_MODULE_ROOTS: &[&str] = &[".gradle", "buildSrc", "gradle"];

/// Builds module records from the build descriptors under a root
pub struct ModuleGraphBuilder {
    root: PathBuf,
    config: IndexingConfig,
}

impl ModuleGraphBuilder {
    pub fn new(root: impl Into<PathBuf>, config: &IndexingConfig) -> Self {
        Self {
            root: root.into(),
            config: config.clone(),
        }
    }

    /// Build descriptors outside build caches, build output and build tooling
    pub fn descriptors(&self) -> Vec<PathBuf> {
        let ignore_dirs = &self.config.ignore_dirs;

        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                !name.contains("buildSrc") && !ignore_dirs.iter().any(|d| name == d.as_str())
            })
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                self.config
                    .descriptor_names
                    .iter()
                    .any(|name| entry.file_name() == name.as_str())
            })
            .map(|entry| entry.into_path())
            .collect()
    }

    /// Dotted module name of a descriptor's directory
    pub fn module_name(&self, module_dir: &Path) -> Option<String> {
        let parts = self.relative_parts(module_dir)?;

        match parts.first() {
            None => None,
            Some(first) if NON_MODULE_ROOTS.contains(&first.as_str()) => None,
            Some(_) => Some(parts.join(".")),
        }
    }

    /// Project-relative path of a module directory, `/`-separated like file paths
    pub fn module_path(&self, module_dir: &Path) -> Option<String> {
        self.relative_parts(module_dir).map(|parts| parts.join("/"))
    }

    fn relative_parts(&self, dir: &Path) -> Option<Vec<String>> {
        let rel = dir.strip_prefix(&self.root).ok()?;
        Some(
            rel.components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect(),
        )
    }

    /// Module records for the whole tree, one per module name
    pub fn build(&self, progress: &ProgressBar) -> Vec<ModuleRecord> {
        let descriptors = self.descriptors();
        progress.set_length(descriptors.len() as u64);
        progress.set_message("reading build descriptors");

        let mut modules: Vec<ModuleRecord> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();

        for descriptor in &descriptors {
            progress.inc(1);

            let Some(module_dir) = descriptor.parent() else {
                continue;
            };
            let (Some(name), Some(path)) = (self.module_name(module_dir), self.module_path(module_dir))
            else {
                continue;
            };

            let content = match std::fs::read_to_string(descriptor) {
                Ok(content) => Some(content),
                Err(e) => {
                    warn!("Failed to read {}: {}", descriptor.display(), e);
                    None
                }
            };
            let module_type = classify_module(&name, content.as_deref());
            let dependencies = content
                .as_deref()
                .map(parse_dependencies)
                .unwrap_or_default();
            debug!(
                "Module {} ({}) with {} dependencies",
                name,
                module_type.as_str(),
                dependencies.len()
            );

            // build.gradle and build.gradle.kts side by side describe one module
            if let Some(&index) = by_name.get(&name) {
                let existing = &mut modules[index];
                for dep in dependencies {
                    if !existing.dependencies.contains(&dep) {
                        existing.dependencies.push(dep);
                    }
                }
                continue;
            }

            by_name.insert(name.clone(), modules.len());
            modules.push(ModuleRecord {
                name,
                path,
                module_type,
                dependencies,
            });
        }

        modules
    }

    /// Rebuild the module tables; returns (modules, dependency edges)
    pub fn index(&self, db: &IndexDatabase, progress: &ProgressBar) -> Result<(usize, usize)> {
        let modules = self.build(progress);
        let (count, edges) = db.replace_modules(&modules)?;
        info!("Indexed {} modules with {} dependency edges", count, edges);
        Ok((count, edges))
    }
}

/// Naming convention first, then the Android plugin applied, else `module`
pub fn classify_module(name: &str, content: Option<&str>) -> ModuleType {
    let lower = name.to_lowercase();

    if lower.ends_with(".api") {
        return ModuleType::Api;
    }
    if lower.ends_with(".impl") {
        return ModuleType::Impl;
    }
    if lower.ends_with(".stub") {
        return ModuleType::Stub;
    }
    if lower.starts_with("apps.") {
        return ModuleType::App;
    }
    if lower.starts_with("libs.") || lower.starts_with("internallibs.") {
        return ModuleType::Lib;
    }

    match content {
        Some(text) if text.contains("com.android.application") => ModuleType::App,
        Some(text) if text.contains("com.android.library") => ModuleType::Lib,
        _ => ModuleType::Module,
    }
}

/// `projects.*` dependencies, from the `modules { }` block first and then
/// anywhere in the file; first occurrence of each (name, kind) wins
pub fn parse_dependencies(content: &str) -> Vec<DeclaredDependency> {
    let mut deps = Vec::new();
    let mut seen = HashSet::new();

    let mut push = |kind: &str, name: &str| {
        let Ok(kind) = DependencyKind::from_str(kind) else {
            return;
        };
        let dep = DeclaredDependency {
            name: normalize_dependency_name(name),
            kind,
        };
        if seen.insert(dep.clone()) {
            deps.push(dep);
        }
    };

    if let Some(block) = MODULES_BLOCK.captures(content).and_then(|c| c.get(1)) {
        for caps in BLOCK_DEPENDENCY.captures_iter(block.as_str()) {
            push(&caps[1], &caps[2]);
        }
    }
    for caps in PROJECT_DEPENDENCY.captures_iter(content) {
        push(&caps[1], &caps[2]);
    }

    deps
}

/// Gradle type-safe accessor path to module name. Accessors keep their
/// camelCase segments, so this is currently the identity.
pub fn normalize_dependency_name(name: &str) -> String {
    name.to_string()
}
