// Configuration management for kindex

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the per-project configuration file
pub const CONFIG_FILE: &str = ".kindex.toml";

/// Default database file name, relative to the project root
pub const DEFAULT_DB_FILE: &str = ".kindex.db";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub indexing: IndexingConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
    pub root: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    /// Directory names pruned from the walk wherever they appear
    pub ignore_dirs: Vec<String>,
    /// Extensions recorded in the file table
    pub extensions: Vec<String>,
    /// Extensions that get symbol and reference passes
    pub source_extensions: Vec<String>,
    /// Build descriptor file names that mark a module
    pub descriptor_names: Vec<String>,
    pub delete_batch_size: usize,
    /// Use the tree-sitter grammars; when false the regex extractor is used
    pub use_grammar: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "unnamed-project".to_string(),
            root: ".".to_string(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        Self {
            ignore_dirs: strings(&[
                "build",
                ".gradle",
                ".idea",
                ".git",
                "node_modules",
                "__pycache__",
                ".pytest_cache",
                "venv",
                ".venv",
            ]),
            extensions: strings(&[".kt", ".java", ".xml", ".gradle", ".kts", ".properties"]),
            source_extensions: strings(&[".kt", ".java"]),
            descriptor_names: strings(&["build.gradle.kts", "build.gradle"]),
            delete_batch_size: 500,
            use_grammar: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from project directory
    /// Looks for .kindex.toml in the project root
    pub fn from_project_dir<P: AsRef<Path>>(project_dir: P) -> Self {
        let config_path = project_dir.as_ref().join(CONFIG_FILE);

        if !config_path.exists() {
            tracing::debug!("No {} in {}", CONFIG_FILE, project_dir.as_ref().display());
            return Self::default();
        }

        match Self::from_file(&config_path) {
            Ok(config) => {
                tracing::info!("Loaded configuration from {}", config_path.display());
                config
            }
            Err(e) => {
                tracing::warn!("Could not load config from {}: {}", config_path.display(), e);
                tracing::info!("Using default configuration");
                Self::default()
            }
        }
    }

    /// Root of the tree to index, resolved against the directory holding the config
    pub fn project_root(&self, project_dir: &Path) -> PathBuf {
        let root = Path::new(&self.project.root);
        if root.is_absolute() {
            root.to_path_buf()
        } else {
            project_dir.join(root)
        }
    }

    /// Database location; defaults to `<root>/.kindex.db`
    pub fn database_path(&self, project_root: &Path) -> PathBuf {
        match &self.database.path {
            Some(path) if Path::new(path).is_absolute() => PathBuf::from(path),
            Some(path) => project_root.join(path),
            None => project_root.join(DEFAULT_DB_FILE),
        }
    }

    /// Whether a file name carries a source extension
    pub fn is_source_file(&self, file_name: &str) -> bool {
        self.indexing
            .source_extensions
            .iter()
            .any(|ext| file_name.ends_with(ext.as_str()))
    }

    /// Validate configuration values
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.project.name.is_empty() {
            return Err(anyhow::anyhow!("Project name cannot be empty"));
        }

        if self.indexing.extensions.is_empty() {
            return Err(anyhow::anyhow!("At least one indexable extension is required"));
        }
        if self.indexing.source_extensions.is_empty() {
            return Err(anyhow::anyhow!("At least one source extension is required"));
        }
        for ext in self
            .indexing
            .extensions
            .iter()
            .chain(&self.indexing.source_extensions)
        {
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(anyhow::anyhow!("Extension must start with a dot: {}", ext));
            }
        }
        if self.indexing.descriptor_names.is_empty() {
            return Err(anyhow::anyhow!("At least one build descriptor name is required"));
        }
        if self.indexing.delete_batch_size == 0 {
            return Err(anyhow::anyhow!("Delete batch size must be greater than 0"));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!("Invalid log level: {}", self.logging.level));
        }
        let valid_formats = ["compact", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!("Invalid log format: {}", self.logging.format));
        }

        Ok(())
    }
}
