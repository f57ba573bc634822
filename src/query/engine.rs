// Query execution engine

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::index::db::IndexDatabase;
use crate::index::{File, Module, Symbol, SymbolReference, XmlUsage};

/// Files, symbols and modules matching one query
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub files: Vec<File>,
    pub symbols: Vec<Symbol>,
    pub modules: Vec<Module>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.symbols.is_empty() && self.modules.is_empty()
    }
}

/// Code references and layout usages of one class
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassUsages {
    pub references: Vec<SymbolReference>,
    pub layouts: Vec<XmlUsage>,
}

impl ClassUsages {
    pub fn is_empty(&self) -> bool {
        self.references.is_empty() && self.layouts.is_empty()
    }
}

/// One segment of the dotted module namespace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleTreeNode {
    pub name: String,
    /// Set when a module is registered at exactly this path
    pub module: Option<Module>,
    pub children: Vec<ModuleTreeNode>,
}

#[derive(Default)]
struct TreeBuilder {
    module: Option<Module>,
    children: BTreeMap<String, TreeBuilder>,
}

impl TreeBuilder {
    fn insert(&mut self, segments: &[&str], module: Module) {
        match segments.split_first() {
            None => self.module = Some(module),
            Some((first, rest)) => self
                .children
                .entry(first.to_string())
                .or_default()
                .insert(rest, module),
        }
    }

    fn into_nodes(self) -> Vec<ModuleTreeNode> {
        nodes(self.children)
    }
}

fn nodes(children: BTreeMap<String, TreeBuilder>) -> Vec<ModuleTreeNode> {
    children
        .into_iter()
        .map(|(name, child)| ModuleTreeNode {
            name,
            module: child.module,
            children: nodes(child.children),
        })
        .collect()
}

/// Read-side queries composed from store primitives
pub struct QueryEngine {
    db: IndexDatabase,
    root: PathBuf,
}

impl QueryEngine {
    pub fn new(db: IndexDatabase, root: impl Into<PathBuf>) -> Self {
        Self {
            db,
            root: root.into(),
        }
    }

    pub fn db(&self) -> &IndexDatabase {
        &self.db
    }

    /// Search files, symbols and modules at once
    pub fn search_all(&self, query: &str, limit: usize) -> Result<SearchResults> {
        Ok(SearchResults {
            files: self.db.search_files(query, limit)?,
            symbols: self.db.search_symbols(query, None, limit)?,
            modules: self.db.search_modules(query, limit)?,
        })
    }

    /// Classes, interfaces, objects and enums whose name contains `name`
    pub fn find_classes(&self, name: &str, limit: usize) -> Result<Vec<Symbol>> {
        let mut classes: Vec<Symbol> = self
            .db
            .search_symbols(name, None, limit.saturating_mul(5))?
            .into_iter()
            .filter(|s| s.kind.is_class_like())
            .collect();
        classes.truncate(limit);
        Ok(classes)
    }

    /// Where a class is used, in code and in layout XML
    pub fn class_usages(&self, name: &str, limit: usize) -> Result<ClassUsages> {
        Ok(ClassUsages {
            references: self.db.references(name, limit)?,
            layouts: self.db.xml_usages(name, limit)?,
        })
    }

    /// Registered modules arranged by their dotted names
    pub fn module_tree(&self) -> Result<Vec<ModuleTreeNode>> {
        let mut tree = TreeBuilder::default();
        for module in self.db.list_modules()? {
            let name = module.name.clone();
            let segments: Vec<&str> = name.split('.').collect();
            tree.insert(&segments, module);
        }
        Ok(tree.into_nodes())
    }

    /// Outline of a file given relative to the project root or as an
    /// absolute path inside it
    pub fn outline(&self, path: &str) -> Result<Vec<Symbol>> {
        let rel = self.relative(Path::new(path));
        self.db.file_outline(&rel)
    }

    fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        let parts: Vec<String> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        parts.join("/")
    }
}
