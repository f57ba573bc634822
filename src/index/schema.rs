use rusqlite::{Connection, Result};
use tracing::{debug, info};

/// SQLite schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    info!("Initializing kindex schema v{}", SCHEMA_VERSION);

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let current_version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    debug!("Current schema version: {}", current_version);

    if current_version < SCHEMA_VERSION {
        info!("Upgrading schema from v{} to v{}", current_version, SCHEMA_VERSION);
        apply_migrations(conn, current_version)?;
    }

    Ok(())
}

/// Apply migrations from current version to latest
fn apply_migrations(conn: &Connection, from_version: i32) -> Result<()> {
    for version in (from_version + 1)..=SCHEMA_VERSION {
        info!("Applying migration v{}", version);
        match version {
            1 => create_v1_schema(conn)?,
            2 => create_v2_schema(conn)?,
            _ => unreachable!("Unknown schema version: {}", version),
        }

        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}

/// Create v1 schema (initial schema)
fn create_v1_schema(conn: &Connection) -> Result<()> {
    info!("Creating v1 schema tables");

    // Files: one row per indexable file, keyed by project-relative path
    conn.execute(
        "CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            path TEXT UNIQUE NOT NULL,
            name TEXT NOT NULL,
            extension TEXT NOT NULL,
            module TEXT,
            modified_at REAL NOT NULL,
            indexed_at REAL
        )",
        [],
    )?;

    conn.execute("CREATE INDEX IF NOT EXISTS idx_files_name ON files(name)", [])?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_files_module ON files(module)", [])?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_files_extension ON files(extension)", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS modules (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            path TEXT NOT NULL,
            type TEXT NOT NULL
        )",
        [],
    )?;

    // Module dependency edges; the target is a name, not a foreign key
    conn.execute(
        "CREATE TABLE IF NOT EXISTS module_deps (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            module_id INTEGER NOT NULL,
            dep_module_name TEXT NOT NULL,
            dep_type TEXT NOT NULL,
            FOREIGN KEY (module_id) REFERENCES modules(id) ON DELETE CASCADE,
            UNIQUE(module_id, dep_module_name, dep_type)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_module_deps_module ON module_deps(module_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_module_deps_dep ON module_deps(dep_module_name)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS symbols (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            type TEXT NOT NULL,
            file_id INTEGER NOT NULL,
            start_line INTEGER NOT NULL,
            end_line INTEGER NOT NULL,
            signature TEXT,
            parent_symbol_id INTEGER,
            visibility TEXT,
            FOREIGN KEY (file_id) REFERENCES files(id) ON DELETE CASCADE,
            FOREIGN KEY (parent_symbol_id) REFERENCES symbols(id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute("CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name)", [])?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_symbols_type ON symbols(type)", [])?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_symbols_file ON symbols(file_id)", [])?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_symbols_parent ON symbols(parent_symbol_id)",
        [],
    )?;

    // Declared supertypes; parent_name is raw text
    conn.execute(
        "CREATE TABLE IF NOT EXISTS inheritance (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            symbol_id INTEGER NOT NULL,
            parent_name TEXT NOT NULL,
            inheritance_type TEXT NOT NULL,
            FOREIGN KEY (symbol_id) REFERENCES symbols(id) ON DELETE CASCADE,
            UNIQUE(symbol_id, parent_name)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_inheritance_symbol ON inheritance(symbol_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_inheritance_parent ON inheritance(parent_name)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS symbol_references (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            symbol_name TEXT NOT NULL,
            file_id INTEGER NOT NULL,
            line INTEGER NOT NULL,
            context TEXT NOT NULL,
            FOREIGN KEY (file_id) REFERENCES files(id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_refs_symbol ON symbol_references(symbol_name)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_refs_file ON symbol_references(file_id)",
        [],
    )?;

    // Full-text shadows. Not kept in sync by triggers: rebuilt wholesale
    // at the end of a run, rowid = base table id.
    conn.execute(
        "CREATE VIRTUAL TABLE IF NOT EXISTS files_fts USING fts5(name, path, module)",
        [],
    )?;
    conn.execute(
        "CREATE VIRTUAL TABLE IF NOT EXISTS symbols_fts USING fts5(name, signature)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS index_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    info!("v1 schema created successfully");

    Ok(())
}

/// v2: Android layout usages and resources, owned per file like symbols
fn create_v2_schema(conn: &Connection) -> Result<()> {
    info!("Creating v2 schema tables");

    // Classes named in layout, menu and navigation XML
    conn.execute(
        "CREATE TABLE IF NOT EXISTS xml_usages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_id INTEGER NOT NULL,
            line INTEGER NOT NULL,
            class_name TEXT NOT NULL,
            usage_type TEXT NOT NULL,
            element_id TEXT,
            FOREIGN KEY (file_id) REFERENCES files(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_xml_usages_class ON xml_usages(class_name)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_xml_usages_file ON xml_usages(file_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS resources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_id INTEGER NOT NULL,
            type TEXT NOT NULL,
            name TEXT NOT NULL,
            line INTEGER NOT NULL,
            FOREIGN KEY (file_id) REFERENCES files(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_resources_name ON resources(type, name)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_resources_file ON resources(file_id)",
        [],
    )?;

    // The target is (type, name) text, not a foreign key
    conn.execute(
        "CREATE TABLE IF NOT EXISTS resource_usages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_id INTEGER NOT NULL,
            resource_type TEXT NOT NULL,
            resource_name TEXT NOT NULL,
            line INTEGER NOT NULL,
            origin TEXT NOT NULL,
            FOREIGN KEY (file_id) REFERENCES files(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_resource_usages_target
         ON resource_usages(resource_type, resource_name)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_resource_usages_file ON resource_usages(file_id)",
        [],
    )?;

    Ok(())
}

/// Drop all tables (for testing/rebuilding)
pub fn drop_schema(conn: &Connection) -> Result<()> {
    info!("Dropping all schema tables");

    conn.execute("DROP TABLE IF EXISTS schema_version", [])?;
    conn.execute("DROP TABLE IF EXISTS index_meta", [])?;
    conn.execute("DROP TABLE IF EXISTS resource_usages", [])?;
    conn.execute("DROP TABLE IF EXISTS resources", [])?;
    conn.execute("DROP TABLE IF EXISTS xml_usages", [])?;
    conn.execute("DROP TABLE IF EXISTS symbols_fts", [])?;
    conn.execute("DROP TABLE IF EXISTS files_fts", [])?;
    conn.execute("DROP TABLE IF EXISTS symbol_references", [])?;
    conn.execute("DROP TABLE IF EXISTS inheritance", [])?;
    conn.execute("DROP TABLE IF EXISTS symbols", [])?;
    conn.execute("DROP TABLE IF EXISTS module_deps", [])?;
    conn.execute("DROP TABLE IF EXISTS modules", [])?;
    conn.execute("DROP TABLE IF EXISTS files", [])?;

    Ok(())
}
