use anyhow::{Context, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use super::schema::{drop_schema, init_schema};
use super::{
    ClassHierarchy, DependencyKind, ExtractedSymbol, File, FileRecord, FoundReference,
    FoundResource, FoundResourceUsage, FoundXmlUsage, InheritanceEdge, InheritanceKind, Inheritor,
    Module, ModuleDependency, ModuleRecord, ModuleType, Resource, ResourceKind, ResourceOrigin,
    ResourceUsage, Symbol, SymbolKind, SymbolReference, UsageContext, Visibility, XmlUsage,
    XmlUsageKind,
};

/// Type alias for connection pool
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// Key of the run timestamp in `index_meta`
pub const META_LAST_INDEXED: &str = "last_indexed";

const SYMBOL_COLUMNS: &str = "s.id, s.name, s.type, s.file_id, s.start_line, s.end_line,
    s.signature, s.parent_symbol_id, s.visibility, f.path, f.module";

const RESOURCE_COLUMNS: &str = "r.id, r.type, r.name, r.file_id, f.path, f.module, r.line";

const FILE_COLUMNS: &str = "f.id, f.path, f.name, f.extension, f.module, f.modified_at, f.indexed_at";

/// Database connection manager
#[derive(Clone)]
pub struct IndexDatabase {
    pool: ConnectionPool,
    db_path: PathBuf,
}

impl IndexDatabase {
    /// Create or open a database
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        info!("Opening database at: {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let manager = SqliteConnectionManager::file(&db_path).with_init(|conn| {
            conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
        });

        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .context("Failed to create connection pool")?;

        {
            let conn = pool.get().context("Failed to get connection")?;
            init_schema(&conn).context("Failed to initialize schema")?;
        }

        Ok(Self { pool, db_path })
    }

    /// Location of the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool.get().context("Failed to get connection from pool")
    }

    // === Files ===

    /// Insert or refresh file rows keyed by path. Refreshed rows lose their
    /// `indexed_at` stamp until their derived data is rebuilt.
    pub fn upsert_files(&self, files: &[FileRecord]) -> Result<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO files (path, name, extension, module, modified_at, indexed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, NULL)
                 ON CONFLICT(path) DO UPDATE SET
                     name = excluded.name,
                     extension = excluded.extension,
                     module = excluded.module,
                     modified_at = excluded.modified_at,
                     indexed_at = NULL",
            )?;
            for file in files {
                stmt.execute(params![
                    file.path,
                    file.name,
                    file.extension,
                    file.module,
                    file.modified_at,
                ])?;
            }
        }
        tx.commit()?;

        debug!("Upserted {} file rows", files.len());
        Ok(files.len())
    }

    /// Get file by project-relative path
    pub fn get_file_by_path(&self, path: &str) -> Result<Option<File>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM files f WHERE f.path = ?1", FILE_COLUMNS);
        let file = conn.query_row(&sql, [path], row_to_file).optional()?;
        Ok(file)
    }

    /// Stored modification time of every file, keyed by path
    pub fn get_file_mtimes(&self) -> Result<HashMap<String, f64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT path, modified_at FROM files")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        Ok(rows)
    }

    /// Delete files by path in bounded batches. Derived symbols, inheritance
    /// edges, references and Android rows go with them.
    pub fn delete_files_by_paths(&self, paths: &[String], batch_size: usize) -> Result<usize> {
        if paths.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let mut deleted = 0;

        for batch in paths.chunks(batch_size.max(1)) {
            let placeholders = vec!["?"; batch.len()].join(",");
            let ids = format!("SELECT id FROM files WHERE path IN ({})", placeholders);

            tx.execute(
                &format!(
                    "DELETE FROM inheritance WHERE symbol_id IN
                     (SELECT id FROM symbols WHERE file_id IN ({}))",
                    ids
                ),
                params_from_iter(batch.iter()),
            )?;
            tx.execute(
                &format!("DELETE FROM symbol_references WHERE file_id IN ({})", ids),
                params_from_iter(batch.iter()),
            )?;
            tx.execute(
                &format!("DELETE FROM symbols WHERE file_id IN ({})", ids),
                params_from_iter(batch.iter()),
            )?;
            for table in ["xml_usages", "resources", "resource_usages"] {
                tx.execute(
                    &format!("DELETE FROM {} WHERE file_id IN ({})", table, ids),
                    params_from_iter(batch.iter()),
                )?;
            }
            deleted += tx.execute(
                &format!("DELETE FROM files WHERE path IN ({})", placeholders),
                params_from_iter(batch.iter()),
            )?;
        }

        tx.commit()?;

        debug!("Deleted {} file rows", deleted);
        Ok(deleted)
    }

    /// Files whose extension is in `extensions`, ordered by path
    pub fn get_source_files(&self, extensions: &[String]) -> Result<Vec<File>> {
        if extensions.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let placeholders = vec!["?"; extensions.len()].join(",");
        let sql = format!(
            "SELECT {} FROM files f WHERE f.extension IN ({}) ORDER BY f.path",
            FILE_COLUMNS, placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let files = stmt
            .query_map(params_from_iter(extensions.iter()), row_to_file)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(files)
    }

    /// Substring search on file name or path; exact name first, then prefix,
    /// then shortest path
    pub fn search_files(&self, query: &str, limit: usize) -> Result<Vec<File>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM files f
             WHERE f.name LIKE ?1 OR f.path LIKE ?1
             ORDER BY
                 CASE WHEN f.name = ?2 THEN 0
                      WHEN f.name LIKE ?3 THEN 1
                      ELSE 2 END,
                 length(f.path)
             LIMIT ?4",
            FILE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let files = stmt
            .query_map(
                params![format!("%{}%", query), query, format!("{}%", query), limit as i64],
                row_to_file,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(files)
    }

    /// Ranked prefix search through the file full-text shadow
    pub fn search_files_fts(&self, query: &str, limit: usize) -> Result<Vec<File>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM files f
             JOIN files_fts ON files_fts.rowid = f.id
             WHERE files_fts MATCH ?1
             ORDER BY rank
             LIMIT ?2",
            FILE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let files = stmt
            .query_map(params![fts_phrase(query), limit as i64], row_to_file)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(files)
    }

    // === Modules ===

    /// Replace the whole module graph. Every module is registered before any
    /// dependency edge is written; duplicate edges collapse.
    pub fn replace_modules(&self, modules: &[ModuleRecord]) -> Result<(usize, usize)> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM module_deps", [])?;
        tx.execute("DELETE FROM modules", [])?;

        let mut ids: HashMap<&str, i64> = HashMap::new();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO modules (name, path, type) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name) DO UPDATE SET path = excluded.path, type = excluded.type
                 RETURNING id",
            )?;
            for module in modules {
                let id: i64 = stmt.query_row(
                    params![module.name, module.path, module.module_type.as_str()],
                    |row| row.get(0),
                )?;
                ids.insert(module.name.as_str(), id);
            }
        }

        let mut edges = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO module_deps (module_id, dep_module_name, dep_type)
                 VALUES (?1, ?2, ?3)",
            )?;
            for module in modules {
                let Some(&module_id) = ids.get(module.name.as_str()) else {
                    continue;
                };
                for dep in &module.dependencies {
                    edges += stmt.execute(params![module_id, dep.name, dep.kind.as_str()])?;
                }
            }
        }

        tx.commit()?;

        debug!("Stored {} modules with {} dependency edges", ids.len(), edges);
        Ok((ids.len(), edges))
    }

    /// Get module by dotted name
    pub fn get_module_by_name(&self, name: &str) -> Result<Option<Module>> {
        let conn = self.get_conn()?;
        let module = conn
            .query_row(
                "SELECT id, name, path, type FROM modules WHERE name = ?1",
                [name],
                row_to_module,
            )
            .optional()?;
        Ok(module)
    }

    /// Substring search on module name, shortest names first
    pub fn search_modules(&self, query: &str, limit: usize) -> Result<Vec<Module>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, path, type FROM modules
             WHERE name LIKE ?1
             ORDER BY length(name), name
             LIMIT ?2",
        )?;
        let modules = stmt
            .query_map(params![format!("%{}%", query), limit as i64], row_to_module)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(modules)
    }

    /// All modules ordered by name
    pub fn list_modules(&self) -> Result<Vec<Module>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT id, name, path, type FROM modules ORDER BY name")?;
        let modules = stmt
            .query_map([], row_to_module)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(modules)
    }

    /// Modules that `module_name` depends on directly
    pub fn module_dependencies(&self, module_name: &str) -> Result<Vec<ModuleDependency>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT md.dep_module_name, md.dep_type
             FROM module_deps md
             JOIN modules m ON md.module_id = m.id
             WHERE m.name = ?1
             ORDER BY md.dep_type, md.dep_module_name",
        )?;
        let deps = stmt
            .query_map([module_name], row_to_dependency)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(deps)
    }

    /// Modules whose declared dependency name contains `module_name`
    pub fn module_dependents(&self, module_name: &str) -> Result<Vec<ModuleDependency>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT m.name, md.dep_type
             FROM module_deps md
             JOIN modules m ON md.module_id = m.id
             WHERE md.dep_module_name LIKE ?1
             ORDER BY m.name, md.dep_type",
        )?;
        let deps = stmt
            .query_map([format!("%{}%", module_name)], row_to_dependency)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(deps)
    }

    // === Symbols ===

    /// Replace every symbol and inheritance edge owned by a file, then stamp
    /// the file as indexed. Runs as one transaction.
    pub fn replace_file_symbols(
        &self,
        file_id: i64,
        symbols: &[ExtractedSymbol],
    ) -> Result<(usize, usize)> {
        let indexed_at = now()?;
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM inheritance WHERE symbol_id IN
             (SELECT id FROM symbols WHERE file_id = ?1)",
            [file_id],
        )?;
        tx.execute("DELETE FROM symbol_references WHERE file_id = ?1", [file_id])?;
        tx.execute("DELETE FROM symbols WHERE file_id = ?1", [file_id])?;

        let mut ids: Vec<i64> = Vec::with_capacity(symbols.len());
        let mut edges = 0;
        {
            let mut insert_symbol = tx.prepare(
                "INSERT INTO symbols
                     (name, type, file_id, start_line, end_line, signature, parent_symbol_id, visibility)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            let mut insert_edge = tx.prepare(
                "INSERT OR IGNORE INTO inheritance (symbol_id, parent_name, inheritance_type)
                 VALUES (?1, ?2, ?3)",
            )?;

            for symbol in symbols {
                // Parents precede children, so the parent row already exists
                let parent_id = symbol.parent.and_then(|index| ids.get(index).copied());
                insert_symbol.execute(params![
                    symbol.name,
                    symbol.kind.as_str(),
                    file_id,
                    symbol.start_line,
                    symbol.end_line,
                    symbol.signature,
                    parent_id,
                    symbol.visibility.map(|v| v.as_str()),
                ])?;
                let symbol_id = tx.last_insert_rowid();
                ids.push(symbol_id);

                for edge in &symbol.supertypes {
                    edges += insert_edge.execute(params![
                        symbol_id,
                        edge.parent_name,
                        edge.kind.as_str()
                    ])?;
                }
            }
        }

        tx.execute(
            "UPDATE files SET indexed_at = ?1 WHERE id = ?2",
            params![indexed_at, file_id],
        )?;
        tx.commit()?;

        Ok((ids.len(), edges))
    }

    /// Replace the references found in a file
    pub fn replace_file_references(&self, file_id: i64, refs: &[FoundReference]) -> Result<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM symbol_references WHERE file_id = ?1", [file_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO symbol_references (symbol_name, file_id, line, context)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for r in refs {
                stmt.execute(params![r.symbol_name, file_id, r.line, r.context.as_str()])?;
            }
        }
        tx.commit()?;

        Ok(refs.len())
    }

    /// Distinct names of every persisted class-like symbol
    pub fn known_symbol_names(&self) -> Result<HashSet<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT name FROM symbols
             WHERE type IN ('class', 'interface', 'object', 'enum')",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        Ok(names)
    }

    /// Substring search on symbol name, optionally restricted to one kind
    pub fn search_symbols(
        &self,
        query: &str,
        kind: Option<SymbolKind>,
        limit: usize,
    ) -> Result<Vec<Symbol>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM symbols s
             JOIN files f ON s.file_id = f.id
             WHERE s.name LIKE ?1 AND (?2 IS NULL OR s.type = ?2)
             ORDER BY
                 CASE WHEN s.name = ?3 THEN 0
                      WHEN s.name LIKE ?4 THEN 1
                      ELSE 2 END,
                 length(s.name)
             LIMIT ?5",
            SYMBOL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let symbols = stmt
            .query_map(
                params![
                    format!("%{}%", query),
                    kind.map(|k| k.as_str()),
                    query,
                    format!("{}%", query),
                    limit as i64
                ],
                row_to_symbol,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(symbols)
    }

    /// Ranked prefix search through the symbol full-text shadow
    pub fn search_symbols_fts(
        &self,
        query: &str,
        kind: Option<SymbolKind>,
        limit: usize,
    ) -> Result<Vec<Symbol>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM symbols s
             JOIN files f ON s.file_id = f.id
             JOIN symbols_fts ON symbols_fts.rowid = s.id
             WHERE symbols_fts MATCH ?1 AND (?2 IS NULL OR s.type = ?2)
             ORDER BY rank
             LIMIT ?3",
            SYMBOL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let symbols = stmt
            .query_map(
                params![fts_phrase(query), kind.map(|k| k.as_str()), limit as i64],
                row_to_symbol,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(symbols)
    }

    /// Symbols declared in the file at `path`, ordered by line
    pub fn file_outline(&self, path: &str) -> Result<Vec<Symbol>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM symbols s
             JOIN files f ON s.file_id = f.id
             WHERE f.path = ?1
             ORDER BY s.start_line, s.id",
            SYMBOL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let symbols = stmt
            .query_map([path], row_to_symbol)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(symbols)
    }

    // === Inheritance ===

    /// Declared supertypes of one symbol
    pub fn symbol_parents(&self, symbol_id: i64) -> Result<Vec<InheritanceEdge>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT parent_name, inheritance_type FROM inheritance
             WHERE symbol_id = ?1
             ORDER BY id",
        )?;
        let edges = stmt
            .query_map([symbol_id], |row| {
                let kind: String = row.get(1)?;
                Ok(InheritanceEdge {
                    parent_name: row.get(0)?,
                    kind: parse_column(1, &kind, InheritanceKind::from_str)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    /// Symbols declaring `parent_name` as a supertype, either exactly or as
    /// the last segment of a qualified name
    pub fn implementations(&self, parent_name: &str) -> Result<Vec<Inheritor>> {
        self.inheritors(
            "i.parent_name = ?1 OR i.parent_name LIKE '%.' || ?1",
            parent_name,
        )
    }

    /// A class-like symbol with its declared parents and its direct children.
    /// One level in each direction.
    pub fn class_hierarchy(&self, name: &str) -> Result<Option<ClassHierarchy>> {
        let symbol = {
            let conn = self.get_conn()?;
            let sql = format!(
                "SELECT {} FROM symbols s
                 JOIN files f ON s.file_id = f.id
                 WHERE s.name = ?1 AND s.type IN ('class', 'interface', 'object', 'enum')
                 ORDER BY s.id
                 LIMIT 1",
                SYMBOL_COLUMNS
            );
            conn.query_row(&sql, [name], row_to_symbol).optional()?
        };

        let Some(symbol) = symbol else {
            return Ok(None);
        };

        let parents = self.symbol_parents(symbol.id)?;
        let children = self.inheritors("i.parent_name = ?1", name)?;

        Ok(Some(ClassHierarchy {
            symbol,
            parents,
            children,
        }))
    }

    fn inheritors(&self, condition: &str, parent_name: &str) -> Result<Vec<Inheritor>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {}, i.inheritance_type
             FROM inheritance i
             JOIN symbols s ON i.symbol_id = s.id
             JOIN files f ON s.file_id = f.id
             WHERE {}
             ORDER BY s.name, f.path",
            SYMBOL_COLUMNS, condition
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([parent_name], |row| {
                let kind: String = row.get(11)?;
                Ok(Inheritor {
                    symbol: row_to_symbol(row)?,
                    kind: parse_column(11, &kind, InheritanceKind::from_str)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // === References ===

    /// Usages of an exact symbol name, ordered by file and line
    pub fn references(&self, symbol_name: &str, limit: usize) -> Result<Vec<SymbolReference>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT r.symbol_name, r.file_id, f.path, f.module, r.line, r.context
             FROM symbol_references r
             JOIN files f ON r.file_id = f.id
             WHERE r.symbol_name = ?1
             ORDER BY f.path, r.line
             LIMIT ?2",
        )?;
        let refs = stmt
            .query_map(params![symbol_name, limit as i64], |row| {
                let context: String = row.get(5)?;
                Ok(SymbolReference {
                    symbol_name: row.get(0)?,
                    file_id: row.get(1)?,
                    file_path: row.get(2)?,
                    module: row.get(3)?,
                    line: row.get(4)?,
                    context: parse_column(5, &context, UsageContext::from_str)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(refs)
    }

    // === Android ===

    /// Replace the layout usages and resource definitions owned by a file,
    /// then stamp the file as indexed
    pub fn replace_file_android(
        &self,
        file_id: i64,
        usages: &[FoundXmlUsage],
        resources: &[FoundResource],
    ) -> Result<(usize, usize)> {
        let indexed_at = now()?;
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM xml_usages WHERE file_id = ?1", [file_id])?;
        tx.execute("DELETE FROM resources WHERE file_id = ?1", [file_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO xml_usages (file_id, line, class_name, usage_type, element_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for usage in usages {
                stmt.execute(params![
                    file_id,
                    usage.line,
                    usage.class_name,
                    usage.kind.as_str(),
                    usage.element_id,
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO resources (file_id, type, name, line) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for resource in resources {
                stmt.execute(params![file_id, resource.kind.as_str(), resource.name, resource.line])?;
            }
        }

        tx.execute(
            "UPDATE files SET indexed_at = ?1 WHERE id = ?2",
            params![indexed_at, file_id],
        )?;
        tx.commit()?;

        Ok((usages.len(), resources.len()))
    }

    /// Replace the resource references found in a file
    pub fn replace_file_resource_usages(
        &self,
        file_id: i64,
        usages: &[FoundResourceUsage],
    ) -> Result<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM resource_usages WHERE file_id = ?1", [file_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO resource_usages (file_id, resource_type, resource_name, line, origin)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for usage in usages {
                stmt.execute(params![
                    file_id,
                    usage.kind.as_str(),
                    usage.name,
                    usage.line,
                    usage.origin.as_str(),
                ])?;
            }
        }
        tx.commit()?;

        Ok(usages.len())
    }

    /// Distinct (type, name) of every defined resource
    pub fn known_resources(&self) -> Result<HashSet<(ResourceKind, String)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT DISTINCT type, name FROM resources")?;
        let known = stmt
            .query_map([], |row| {
                let kind: String = row.get(0)?;
                Ok((parse_column(0, &kind, ResourceKind::from_str)?, row.get(1)?))
            })?
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        Ok(known)
    }

    /// Layout usages of a class, by fully qualified name or by simple name
    pub fn xml_usages(&self, class_name: &str, limit: usize) -> Result<Vec<XmlUsage>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT x.class_name, x.file_id, f.path, f.module, x.line, x.usage_type, x.element_id
             FROM xml_usages x
             JOIN files f ON x.file_id = f.id
             WHERE x.class_name = ?1
                OR (length(x.class_name) > length(?1)
                    AND substr(x.class_name, -length(?1) - 1) = '.' || ?1)
             ORDER BY f.path, x.line
             LIMIT ?2",
        )?;
        let usages = stmt
            .query_map(params![class_name, limit as i64], |row| {
                let kind: String = row.get(5)?;
                Ok(XmlUsage {
                    class_name: row.get(0)?,
                    file_id: row.get(1)?,
                    file_path: row.get(2)?,
                    module: row.get(3)?,
                    line: row.get(4)?,
                    kind: parse_column(5, &kind, XmlUsageKind::from_str)?,
                    element_id: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(usages)
    }

    /// Substring search on resource name, shortest names first
    pub fn search_resources(
        &self,
        query: &str,
        kind: Option<ResourceKind>,
        limit: usize,
    ) -> Result<Vec<Resource>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM resources r
             JOIN files f ON r.file_id = f.id
             WHERE r.name LIKE ?1 AND (?2 IS NULL OR r.type = ?2)
             ORDER BY length(r.name), r.name, f.path
             LIMIT ?3",
            RESOURCE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let resources = stmt
            .query_map(
                params![format!("%{}%", query), kind.map(|k| k.as_str()), limit as i64],
                row_to_resource,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(resources)
    }

    /// References to one resource, ordered by file and line
    pub fn resource_usages(
        &self,
        kind: ResourceKind,
        name: &str,
        limit: usize,
    ) -> Result<Vec<ResourceUsage>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT u.resource_type, u.resource_name, u.file_id, f.path, f.module, u.line, u.origin
             FROM resource_usages u
             JOIN files f ON u.file_id = f.id
             WHERE u.resource_type = ?1 AND u.resource_name = ?2
             ORDER BY f.path, u.line
             LIMIT ?3",
        )?;
        let usages = stmt
            .query_map(params![kind.as_str(), name, limit as i64], |row| {
                let kind: String = row.get(0)?;
                let origin: String = row.get(6)?;
                Ok(ResourceUsage {
                    kind: parse_column(0, &kind, ResourceKind::from_str)?,
                    name: row.get(1)?,
                    file_id: row.get(2)?,
                    file_path: row.get(3)?,
                    module: row.get(4)?,
                    line: row.get(5)?,
                    origin: parse_column(6, &origin, ResourceOrigin::from_str)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(usages)
    }

    /// Defined resources nothing refers to, optionally within one module
    pub fn unused_resources(&self, module: Option<&str>) -> Result<Vec<Resource>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM resources r
             JOIN files f ON r.file_id = f.id
             WHERE (?1 IS NULL OR f.module = ?1)
               AND NOT EXISTS (
                   SELECT 1 FROM resource_usages u
                   WHERE u.resource_type = r.type AND u.resource_name = r.name
               )
             ORDER BY r.type, r.name, f.path",
            RESOURCE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let resources = stmt
            .query_map(params![module], row_to_resource)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(resources)
    }

    // === Full text ===

    /// Clear and repopulate both full-text shadows from the base tables
    pub fn rebuild_full_text(&self) -> Result<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM files_fts", [])?;
        tx.execute(
            "INSERT INTO files_fts (rowid, name, path, module)
             SELECT id, name, path, COALESCE(module, '') FROM files",
            [],
        )?;
        tx.execute("DELETE FROM symbols_fts", [])?;
        tx.execute(
            "INSERT INTO symbols_fts (rowid, name, signature)
             SELECT id, name, COALESCE(signature, '') FROM symbols",
            [],
        )?;

        tx.commit()?;

        debug!("Rebuilt full-text shadows");
        Ok(())
    }

    // === Meta ===

    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO index_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row("SELECT value FROM index_meta WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Get index statistics
    pub fn get_stats(&self) -> Result<IndexStats> {
        let conn = self.get_conn()?;
        let count = |table: &str| -> Result<usize> {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?;
            Ok(n as usize)
        };

        Ok(IndexStats {
            files: count("files")?,
            modules: count("modules")?,
            symbols: count("symbols")?,
            dependencies: count("module_deps")?,
            inheritance: count("inheritance")?,
            references: count("symbol_references")?,
            xml_usages: count("xml_usages")?,
            resources: count("resources")?,
            resource_usages: count("resource_usages")?,
            last_indexed: self.get_meta(META_LAST_INDEXED)?,
        })
    }

    /// Drop and recreate every table
    pub fn clear(&self) -> Result<()> {
        let conn = self.get_conn()?;
        drop_schema(&conn)?;
        init_schema(&conn)?;
        Ok(())
    }
}

/// Index statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub files: usize,
    pub modules: usize,
    pub symbols: usize,
    pub dependencies: usize,
    pub inheritance: usize,
    pub references: usize,
    pub xml_usages: usize,
    pub resources: usize,
    pub resource_usages: usize,
    pub last_indexed: Option<String>,
}

/// Quote a user query as an FTS5 prefix phrase
fn fts_phrase(query: &str) -> String {
    format!("\"{}\"*", query.replace('"', "\"\""))
}

fn parse_column<T>(
    idx: usize,
    value: &str,
    parse: impl Fn(&str) -> anyhow::Result<T>,
) -> rusqlite::Result<T> {
    parse(value).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

/// Convert database row to File
fn row_to_file(row: &Row) -> rusqlite::Result<File> {
    Ok(File {
        id: row.get(0)?,
        path: row.get(1)?,
        name: row.get(2)?,
        extension: row.get(3)?,
        module: row.get(4)?,
        modified_at: row.get(5)?,
        indexed_at: row.get(6)?,
    })
}

/// Convert database row to Module
fn row_to_module(row: &Row) -> rusqlite::Result<Module> {
    let type_str: String = row.get(3)?;

    Ok(Module {
        id: row.get(0)?,
        name: row.get(1)?,
        path: row.get(2)?,
        module_type: parse_column(3, &type_str, ModuleType::from_str)?,
    })
}

fn row_to_dependency(row: &Row) -> rusqlite::Result<ModuleDependency> {
    let type_str: String = row.get(1)?;

    Ok(ModuleDependency {
        module_name: row.get(0)?,
        dep_type: parse_column(1, &type_str, DependencyKind::from_str)?,
    })
}

fn row_to_resource(row: &Row) -> rusqlite::Result<Resource> {
    let kind: String = row.get(1)?;

    Ok(Resource {
        id: row.get(0)?,
        kind: parse_column(1, &kind, ResourceKind::from_str)?,
        name: row.get(2)?,
        file_id: row.get(3)?,
        file_path: row.get(4)?,
        module: row.get(5)?,
        line: row.get(6)?,
    })
}

/// Convert database row to Symbol
fn row_to_symbol(row: &Row) -> rusqlite::Result<Symbol> {
    let kind_str: String = row.get(2)?;
    let visibility: Option<String> = row.get(8)?;

    Ok(Symbol {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: parse_column(2, &kind_str, SymbolKind::from_str)?,
        file_id: row.get(3)?,
        start_line: row.get(4)?,
        end_line: row.get(5)?,
        signature: row.get(6)?,
        parent_symbol_id: row.get(7)?,
        visibility: visibility.as_deref().and_then(Visibility::from_str),
        file_path: row.get(9)?,
        module: row.get(10)?,
    })
}

/// Seconds since the UNIX epoch, with sub-second precision
pub fn timestamp(time: SystemTime) -> Result<f64> {
    let elapsed = time
        .duration_since(UNIX_EPOCH)
        .context("Timestamp is before the UNIX epoch")?;
    Ok(elapsed.as_secs_f64())
}

/// Get current timestamp in seconds
pub fn now() -> Result<f64> {
    timestamp(SystemTime::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DeclaredDependency;
    use tempfile::tempdir;

    fn open() -> (tempfile::TempDir, IndexDatabase) {
        let dir = tempdir().unwrap();
        let db = IndexDatabase::new(dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn record(path: &str, mtime: f64) -> FileRecord {
        let name = path.rsplit('/').next().unwrap().to_string();
        let extension = name
            .rfind('.')
            .map(|i| name[i..].to_string())
            .unwrap_or_default();
        FileRecord {
            path: path.to_string(),
            name,
            extension,
            module: Some("core.api".to_string()),
            modified_at: mtime,
        }
    }

    fn symbol(kind: SymbolKind, name: &str, line: u32, parent: Option<usize>) -> ExtractedSymbol {
        ExtractedSymbol {
            kind,
            name: name.to_string(),
            start_line: line,
            end_line: line + 2,
            signature: None,
            visibility: None,
            parent,
            supertypes: Vec::new(),
        }
    }

    fn file_id(db: &IndexDatabase, path: &str) -> i64 {
        db.get_file_by_path(path).unwrap().unwrap().id
    }

    #[test]
    fn test_create_database() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("test.db");

        let db = IndexDatabase::new(&db_path).unwrap();
        assert!(db_path.exists());
        assert_eq!(db.path(), db_path.as_path());
    }

    #[test]
    fn test_upsert_files_is_idempotent() {
        let (_dir, db) = open();
        let files = vec![record("core/api/A.kt", 1.5), record("core/api/B.java", 2.5)];

        db.upsert_files(&files).unwrap();
        db.upsert_files(&files).unwrap();

        assert_eq!(db.get_stats().unwrap().files, 2);
        let stored = db.get_file_by_path("core/api/B.java").unwrap().unwrap();
        assert_eq!(stored.extension, ".java");
        assert_eq!(stored.modified_at, 2.5);
        assert_eq!(stored.indexed_at, None);
    }

    #[test]
    fn test_replace_file_symbols_leaves_no_stale_rows() {
        let (_dir, db) = open();
        db.upsert_files(&[record("a/Foo.kt", 1.0)]).unwrap();
        let id = file_id(&db, "a/Foo.kt");

        let mut class = symbol(SymbolKind::Class, "Foo", 1, None);
        class.supertypes.push(InheritanceEdge {
            parent_name: "Base".to_string(),
            kind: InheritanceKind::Extends,
        });
        let symbols = vec![class, symbol(SymbolKind::Function, "bar", 2, Some(0))];

        assert_eq!(db.replace_file_symbols(id, &symbols).unwrap(), (2, 1));
        assert_eq!(db.replace_file_symbols(id, &symbols).unwrap(), (2, 1));

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.symbols, 2);
        assert_eq!(stats.inheritance, 1);

        let outline = db.file_outline("a/Foo.kt").unwrap();
        assert_eq!(outline[0].parent_symbol_id, None);
        assert_eq!(outline[1].parent_symbol_id, Some(outline[0].id));

        let file = db.get_file_by_path("a/Foo.kt").unwrap().unwrap();
        assert!(file.indexed_at.is_some());
    }

    #[test]
    fn test_rescan_clears_indexed_stamp() {
        let (_dir, db) = open();
        db.upsert_files(&[record("a/Foo.kt", 1.0)]).unwrap();
        let id = file_id(&db, "a/Foo.kt");
        db.replace_file_symbols(id, &[]).unwrap();

        db.upsert_files(&[record("a/Foo.kt", 2.0)]).unwrap();
        let file = db.get_file_by_path("a/Foo.kt").unwrap().unwrap();
        assert_eq!(file.id, id);
        assert_eq!(file.indexed_at, None);
    }

    #[test]
    fn test_delete_files_removes_derived_rows() {
        let (_dir, db) = open();
        let paths: Vec<String> = (0..1203).map(|i| format!("m/F{}.kt", i)).collect();
        let records: Vec<FileRecord> = paths.iter().map(|p| record(p, 1.0)).collect();
        db.upsert_files(&records).unwrap();

        let id = file_id(&db, "m/F7.kt");
        let mut class = symbol(SymbolKind::Class, "F7", 1, None);
        class.supertypes.push(InheritanceEdge {
            parent_name: "Base".to_string(),
            kind: InheritanceKind::Implements,
        });
        db.replace_file_symbols(id, &[class]).unwrap();
        db.replace_file_references(
            id,
            &[FoundReference {
                symbol_name: "F7".to_string(),
                line: 3,
                context: UsageContext::Call,
            }],
        )
        .unwrap();
        db.replace_file_android(
            id,
            &[layout_usage("com.m.F7View", 2, None)],
            &[resource(ResourceKind::Drawable, "f7", 1)],
        )
        .unwrap();
        db.replace_file_resource_usages(
            id,
            &[resource_ref(ResourceKind::Drawable, "f7", 5, ResourceOrigin::Code)],
        )
        .unwrap();

        let deleted = db.delete_files_by_paths(&paths, 500).unwrap();
        assert_eq!(deleted, 1203);

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.files, 0);
        assert_eq!(stats.symbols, 0);
        assert_eq!(stats.inheritance, 0);
        assert_eq!(stats.references, 0);
        assert_eq!((stats.xml_usages, stats.resources, stats.resource_usages), (0, 0, 0));
    }

    #[test]
    fn test_module_dependencies_deduplicate() {
        let (_dir, db) = open();
        let dep = DeclaredDependency {
            name: "core.model".to_string(),
            kind: DependencyKind::Api,
        };
        let modules = vec![
            ModuleRecord {
                name: "core.api".to_string(),
                path: "core/api".to_string(),
                module_type: ModuleType::Api,
                dependencies: vec![dep.clone(), dep.clone()],
            },
            ModuleRecord {
                name: "feature.impl".to_string(),
                path: "feature/impl".to_string(),
                module_type: ModuleType::Impl,
                dependencies: vec![DeclaredDependency {
                    name: "core.api".to_string(),
                    kind: DependencyKind::Implementation,
                }],
            },
        ];

        assert_eq!(db.replace_modules(&modules).unwrap(), (2, 2));
        assert_eq!(db.replace_modules(&modules).unwrap(), (2, 2));

        let deps = db.module_dependencies("core.api").unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].module_name, "core.model");

        let dependents = db.module_dependents("core.api").unwrap();
        assert_eq!(dependents.len(), 1);
        assert_eq!(dependents[0].module_name, "feature.impl");
        assert_eq!(dependents[0].dep_type, DependencyKind::Implementation);

        assert_eq!(
            db.get_module_by_name("feature.impl").unwrap().unwrap().module_type,
            ModuleType::Impl
        );
        assert_eq!(db.search_modules("api", 10).unwrap()[0].name, "core.api");
    }

    #[test]
    fn test_full_text_is_stale_until_rebuild() {
        let (_dir, db) = open();
        db.upsert_files(&[record("a/UserRepository.kt", 1.0)]).unwrap();
        let id = file_id(&db, "a/UserRepository.kt");
        db.replace_file_symbols(id, &[symbol(SymbolKind::Interface, "UserRepository", 1, None)])
            .unwrap();

        assert!(db.search_symbols_fts("UserRepo", None, 10).unwrap().is_empty());
        assert!(db.search_files_fts("UserRepo", 10).unwrap().is_empty());

        db.rebuild_full_text().unwrap();

        let found = db.search_symbols_fts("UserRepo", None, 10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file_path, "a/UserRepository.kt");
        assert_eq!(db.search_files_fts("UserRepo", 10).unwrap().len(), 1);

        // FTS syntax in the query is treated as text
        assert!(db.search_symbols_fts("\"AND(", None, 10).unwrap().is_empty());
    }

    #[test]
    fn test_search_symbols_ranking() {
        let (_dir, db) = open();
        db.upsert_files(&[record("a/Repo.kt", 1.0)]).unwrap();
        let id = file_id(&db, "a/Repo.kt");
        db.replace_file_symbols(
            id,
            &[
                symbol(SymbolKind::Class, "UserRepoImpl", 1, None),
                symbol(SymbolKind::Class, "Repo", 5, None),
                symbol(SymbolKind::Function, "fetchRepo", 9, None),
            ],
        )
        .unwrap();

        let names: Vec<String> = db
            .search_symbols("Repo", None, 10)
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Repo", "fetchRepo", "UserRepoImpl"]);

        let functions = db.search_symbols("Repo", Some(SymbolKind::Function), 10).unwrap();
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].module.as_deref(), Some("core.api"));
    }

    #[test]
    fn test_class_hierarchy_one_level() {
        let (_dir, db) = open();
        db.upsert_files(&[record("a/Shapes.java", 1.0)]).unwrap();
        let id = file_id(&db, "a/Shapes.java");

        let mut shape = symbol(SymbolKind::Class, "Shape", 1, None);
        shape.supertypes.push(InheritanceEdge {
            parent_name: "Drawable".to_string(),
            kind: InheritanceKind::Implements,
        });
        let mut circle = symbol(SymbolKind::Class, "Circle", 10, None);
        circle.supertypes.push(InheritanceEdge {
            parent_name: "Shape".to_string(),
            kind: InheritanceKind::Extends,
        });
        let mut square = symbol(SymbolKind::Class, "Square", 20, None);
        square.supertypes.push(InheritanceEdge {
            parent_name: "geo.Shape".to_string(),
            kind: InheritanceKind::Extends,
        });
        db.replace_file_symbols(id, &[shape, circle, square]).unwrap();

        let hierarchy = db.class_hierarchy("Shape").unwrap().unwrap();
        assert_eq!(hierarchy.symbol.name, "Shape");
        assert_eq!(hierarchy.parents.len(), 1);
        assert_eq!(hierarchy.parents[0].parent_name, "Drawable");
        assert_eq!(hierarchy.children.len(), 1);
        assert_eq!(hierarchy.children[0].symbol.name, "Circle");

        let implementations = db.implementations("Shape").unwrap();
        let names: Vec<&str> = implementations.iter().map(|i| i.symbol.name.as_str()).collect();
        assert_eq!(names, vec!["Circle", "Square"]);

        assert!(db.class_hierarchy("Missing").unwrap().is_none());
    }

    #[test]
    fn test_references_and_known_names() {
        let (_dir, db) = open();
        db.upsert_files(&[record("b/Use.kt", 1.0), record("a/Foo.kt", 1.0)]).unwrap();
        let foo = file_id(&db, "a/Foo.kt");
        let user = file_id(&db, "b/Use.kt");
        db.replace_file_symbols(
            foo,
            &[
                symbol(SymbolKind::Class, "Foo", 1, None),
                symbol(SymbolKind::Function, "helper", 4, Some(0)),
            ],
        )
        .unwrap();

        let known = db.known_symbol_names().unwrap();
        assert!(known.contains("Foo"));
        assert!(!known.contains("helper"));

        let found = |line| FoundReference {
            symbol_name: "Foo".to_string(),
            line,
            context: UsageContext::Instantiation,
        };
        db.replace_file_references(user, &[found(7), found(2)]).unwrap();
        db.replace_file_references(foo, &[found(9)]).unwrap();

        let refs = db.references("Foo", 100).unwrap();
        let order: Vec<(&str, u32)> = refs.iter().map(|r| (r.file_path.as_str(), r.line)).collect();
        assert_eq!(order, vec![("a/Foo.kt", 9), ("b/Use.kt", 2), ("b/Use.kt", 7)]);
        assert_eq!(db.references("Foo", 1).unwrap().len(), 1);
    }

    fn layout_usage(class_name: &str, line: u32, element_id: Option<&str>) -> FoundXmlUsage {
        FoundXmlUsage {
            class_name: class_name.to_string(),
            line,
            kind: XmlUsageKind::ViewTag,
            element_id: element_id.map(str::to_string),
        }
    }

    fn resource(kind: ResourceKind, name: &str, line: u32) -> FoundResource {
        FoundResource {
            kind,
            name: name.to_string(),
            line,
        }
    }

    fn resource_ref(kind: ResourceKind, name: &str, line: u32, origin: ResourceOrigin) -> FoundResourceUsage {
        FoundResourceUsage {
            kind,
            name: name.to_string(),
            line,
            origin,
        }
    }

    #[test]
    fn test_xml_usages_match_simple_and_qualified_names() {
        let (_dir, db) = open();
        db.upsert_files(&[record("app/res/layout/main.xml", 1.0)]).unwrap();
        let layout = file_id(&db, "app/res/layout/main.xml");

        db.replace_file_android(
            layout,
            &[
                layout_usage("com.shop.ui.ChartView", 4, Some("chart")),
                layout_usage("com.shop.ui.PieChartView", 9, None),
            ],
            &[resource(ResourceKind::Layout, "main", 1)],
        )
        .unwrap();

        let found = db.xml_usages("ChartView", 10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].element_id.as_deref(), Some("chart"));
        assert_eq!(found[0].file_path, "app/res/layout/main.xml");
        assert_eq!(db.xml_usages("com.shop.ui.PieChartView", 10).unwrap().len(), 1);
        assert!(db.xml_usages("View", 10).unwrap().is_empty());

        // Replacing drops the previous rows and stamps the file
        db.replace_file_android(layout, &[], &[]).unwrap();
        assert!(db.xml_usages("ChartView", 10).unwrap().is_empty());
        assert!(db.get_file_by_path("app/res/layout/main.xml").unwrap().unwrap().indexed_at.is_some());
    }

    #[test]
    fn test_resources_usages_and_unused() {
        let (_dir, db) = open();
        db.upsert_files(&[
            record("app/res/values/strings.xml", 1.0),
            record("app/Main.kt", 1.0),
        ])
        .unwrap();
        let values = file_id(&db, "app/res/values/strings.xml");
        let main = file_id(&db, "app/Main.kt");

        db.replace_file_android(
            values,
            &[],
            &[
                resource(ResourceKind::String, "app_name", 2),
                resource(ResourceKind::String, "app_name_short", 3),
                resource(ResourceKind::Color, "brand", 4),
            ],
        )
        .unwrap();

        let known = db.known_resources().unwrap();
        assert!(known.contains(&(ResourceKind::Color, "brand".to_string())));
        assert_eq!(known.len(), 3);

        db.replace_file_resource_usages(
            main,
            &[
                resource_ref(ResourceKind::String, "app_name", 12, ResourceOrigin::Code),
                resource_ref(ResourceKind::String, "app_name", 5, ResourceOrigin::Code),
            ],
        )
        .unwrap();

        let usages = db.resource_usages(ResourceKind::String, "app_name", 100).unwrap();
        let lines: Vec<u32> = usages.iter().map(|u| u.line).collect();
        assert_eq!(lines, vec![5, 12]);

        let names: Vec<String> = db
            .search_resources("app", None, 10)
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["app_name", "app_name_short"]);
        assert!(db.search_resources("app", Some(ResourceKind::Color), 10).unwrap().is_empty());

        let unused: Vec<String> = db
            .unused_resources(Some("core.api"))
            .unwrap()
            .into_iter()
            .map(|r| format!("{}/{}", r.kind.as_str(), r.name))
            .collect();
        assert_eq!(unused, vec!["color/brand", "string/app_name_short"]);
        assert!(db.unused_resources(Some("elsewhere")).unwrap().is_empty());

        let stats = db.get_stats().unwrap();
        assert_eq!((stats.resources, stats.resource_usages), (3, 2));
    }

    #[test]
    fn test_stats_and_meta() {
        let (_dir, db) = open();

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.files, 0);
        assert_eq!(stats.symbols, 0);
        assert_eq!(stats.last_indexed, None);

        db.set_meta(META_LAST_INDEXED, "2024-01-01 10:00:00").unwrap();
        db.set_meta(META_LAST_INDEXED, "2024-01-02 10:00:00").unwrap();
        assert_eq!(
            db.get_stats().unwrap().last_indexed.as_deref(),
            Some("2024-01-02 10:00:00")
        );
    }

    #[test]
    fn test_clear_empties_every_table() {
        let (_dir, db) = open();
        db.upsert_files(&[record("a/B.kt", 1.0)]).unwrap();
        db.set_meta(META_LAST_INDEXED, "2024-01-01 10:00:00").unwrap();
        db.rebuild_full_text().unwrap();

        db.clear().unwrap();

        let stats = db.get_stats().unwrap();
        assert_eq!((stats.files, stats.last_indexed), (0, None));
        assert!(db.search_files_fts("B", 10).unwrap().is_empty());
        db.upsert_files(&[record("a/C.kt", 2.0)]).unwrap();
    }

    #[test]
    fn test_source_files_filter_by_extension() {
        let (_dir, db) = open();
        db.upsert_files(&[
            record("a/B.kt", 1.0),
            record("a/A.java", 1.0),
            record("a/build.gradle.kts", 1.0),
            record("a/strings.xml", 1.0),
        ])
        .unwrap();

        let sources = db
            .get_source_files(&[".kt".to_string(), ".java".to_string()])
            .unwrap();
        let paths: Vec<&str> = sources.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a/A.java", "a/B.kt"]);
    }
}
