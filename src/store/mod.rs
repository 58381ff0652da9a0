//! SQLite-backed graph cache.
//!
//! A [`SqliteStore`] owns one database file holding two metadata tables
//! (`fileinfo`, `graphinfo`) plus one `graph_N` table per imported KGTK
//! file. Imports happen on demand and are keyed by the file's real path;
//! a file whose size and modification time still match its `fileinfo`
//! record is considered fresh and is not re-imported.
//!
//! All literal-layer functions are registered as deterministic scalar
//! UDFs on the connection, so translated queries can call them directly.

mod import;

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;
use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Value, ValueRef};
use tracing::{debug, info};

use crate::base::quote_ident;
use crate::error::{KypherError, Result};
use crate::literal::{self, Scalar, UdfImpl};

/// Page cache budget configured at open time (4 GiB worth of pages).
const CACHE_SIZE: i64 = 1 << 32;

/// Plan output flavors of [`SqliteStore::explain`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplainMode {
    /// `EXPLAIN QUERY PLAN`
    Plan,
    /// `EXPLAIN` (full VM program)
    Full,
    /// The shell's `.expert` index advisor
    Expert,
}

impl std::str::FromStr for ExplainMode {
    type Err = KypherError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plan" => Ok(Self::Plan),
            "full" => Ok(Self::Full),
            "expert" => Ok(Self::Expert),
            other => Err(KypherError::input(format!("illegal explanation mode: {other}"))),
        }
    }
}

/// File-level import record: one row of `fileinfo`
#[derive(Debug, Clone, PartialEq)]
pub struct FileInfo {
    /// Real path of the file containing the data (primary key)
    pub file: String,
    pub size: i64,
    pub modtime: f64,
    /// Content hash; carried but currently neither computed nor checked
    pub md5sum: Option<String>,
    /// The graph table holding this file's data
    pub graph: String,
}

/// Graph-table record: one row of `graphinfo`
#[derive(Debug, Clone, PartialEq)]
pub struct GraphInfo {
    /// Name of the table representing this graph (primary key)
    pub name: String,
    /// Column names as they appear in the source header line
    pub header: Vec<String>,
    /// Total bytes used by this graph including its indexes
    pub size: i64,
    /// Last time this graph was accessed
    pub acctime: f64,
}

/// Handle returned by [`SqliteStore::ensure_graph`]
#[derive(Debug, Clone)]
pub struct GraphHandle {
    /// Real path of the backing file
    pub file: String,
    pub table: String,
    pub header: Vec<String>,
}

/// A suggested index parsed from `.expert` output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
}

/// SQL store implemented on an embedded SQLite database.
pub struct SqliteStore {
    dbfile: PathBuf,
    conn: Connection,
}

impl SqliteStore {
    /// Open the store at `dbfile`, creating an empty database with the
    /// metadata catalog when `create` is true.
    pub fn open(dbfile: impl Into<PathBuf>, create: bool) -> Result<Self> {
        let dbfile = dbfile.into();
        if !dbfile.exists() && !create {
            return Err(KypherError::input(format!(
                "sqlite DB file does not exist: {}",
                dbfile.display()
            )));
        }
        let conn = Connection::open(&dbfile)?;
        let store = Self { dbfile, conn };
        store.init_meta_tables()?;
        store.configure()?;
        store.register_user_functions()?;
        Ok(store)
    }

    fn init_meta_tables(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS fileinfo (
                 file TEXT PRIMARY KEY,
                 size INTEGER,
                 modtime FLOAT,
                 md5sum TEXT,
                 graph TEXT
             );
             CREATE TABLE IF NOT EXISTS graphinfo (
                 name TEXT PRIMARY KEY,
                 header TEXT,
                 size INTEGER,
                 acctime FLOAT
             );",
        )?;
        Ok(())
    }

    /// Configure various settings of the store.
    fn configure(&self) -> Result<()> {
        let page_size = self.pragma("page_size")?.unwrap_or(4096);
        if page_size > 0 {
            self.conn
                .pragma_update(None, "cache_size", CACHE_SIZE / page_size)?;
        }
        Ok(())
    }

    /// Evaluate a single-valued PRAGMA expression and return the result,
    /// if any.
    pub fn pragma(&self, name: &str) -> Result<Option<i64>> {
        use rusqlite::OptionalExtension;
        Ok(self
            .conn
            .query_row(&format!("PRAGMA {name}"), [], |row| row.get(0))
            .optional()?)
    }

    /// Register all literal-layer functions as deterministic scalar UDFs.
    fn register_user_functions(&self) -> Result<()> {
        for function in literal::registry().values() {
            let imp = function.imp;
            self.conn.create_scalar_function(
                function.name,
                function.arity as i32,
                FunctionFlags::SQLITE_DETERMINISTIC | FunctionFlags::SQLITE_UTF8,
                move |ctx| {
                    let result = match imp {
                        UdfImpl::Unary(f) => text_arg(ctx.get_raw(0)).and_then(f),
                        UdfImpl::Binary(f) => {
                            match (text_arg(ctx.get_raw(0)), text_arg(ctx.get_raw(1))) {
                                (Some(a), Some(b)) => f(a, b),
                                _ => None,
                            }
                        }
                    };
                    Ok(scalar_to_value(result))
                },
            )?;
        }
        Ok(())
    }

    /// The underlying connection, for translated-query execution.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Path of the backing database file.
    pub fn dbfile(&self) -> &Path {
        &self.dbfile
    }

    // =========================================================================
    // DB properties
    // =========================================================================

    /// Size in bytes of all currently allocated data pages. Smaller than
    /// the database file when deletions have freed pages.
    pub fn db_size(&self) -> Result<i64> {
        let page_count = self.pragma("page_count")?.unwrap_or(0);
        let freelist = self.pragma("freelist_count")?.unwrap_or(0);
        let page_size = self.pragma("page_size")?.unwrap_or(0);
        Ok((page_count - freelist) * page_size)
    }

    /// True if a table or index named `name` exists in the store.
    pub fn has_table(&self, name: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE name = ?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Column names of `table`, isomorphic to the source header line for
    /// graph tables.
    pub fn table_header(&self, table: &str) -> Result<Vec<String>> {
        let stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {} LIMIT 0", quote_ident(table)))?;
        Ok(stmt.column_names().into_iter().map(String::from).collect())
    }

    /// Number of rows in `table`.
    pub fn table_row_count(&self, table: &str) -> Result<i64> {
        Ok(self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?)
    }

    /// Number of graphs currently stored.
    pub fn number_of_graphs(&self) -> Result<i64> {
        self.table_row_count("graphinfo")
    }

    // =========================================================================
    // File information
    // =========================================================================

    /// The import record for `file` (a real path), if present.
    pub fn file_info(&self, file: &str) -> Result<Option<FileInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT file, size, modtime, md5sum, graph FROM fileinfo WHERE file = ?1",
        )?;
        let mut rows = stmt.query([file])?;
        match rows.next()? {
            Some(row) => Ok(Some(FileInfo {
                file: row.get(0)?,
                size: row.get(1)?,
                modtime: row.get(2)?,
                md5sum: row.get(3)?,
                graph: row.get(4)?,
            })),
            None => Ok(None),
        }
    }

    fn set_file_info(&self, file: &str, size: i64, modtime: f64, graph: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO fileinfo (file, size, modtime, md5sum, graph)
             VALUES (?1, ?2, ?3, NULL, ?4)",
            rusqlite::params![file, size, modtime, graph],
        )?;
        Ok(())
    }

    fn drop_file_info(&self, file: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM fileinfo WHERE file = ?1", [file])?;
        Ok(())
    }

    /// All files whose data is represented by `table`. Generally one.
    pub fn graph_files(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT file FROM fileinfo WHERE graph = ?1")?;
        let files = stmt
            .query_map([table], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(files)
    }

    // =========================================================================
    // Graph information
    // =========================================================================

    /// The record for the graph stored in `table`, if present.
    pub fn graph_info(&self, table: &str) -> Result<Option<GraphInfo>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, header, size, acctime FROM graphinfo WHERE name = ?1")?;
        let mut rows = stmt.query([table])?;
        match rows.next()? {
            Some(row) => {
                let header: String = row.get(1)?;
                Ok(Some(GraphInfo {
                    name: row.get(0)?,
                    header: header.split('\t').map(String::from).collect(),
                    size: row.get(2)?,
                    acctime: row.get(3)?,
                }))
            }
            None => Ok(None),
        }
    }

    fn set_graph_info(&self, table: &str, header: &[String], size: i64, acctime: f64) -> Result<()> {
        // header columns cannot contain tabs, so the header line format
        // doubles as the encoding
        self.conn.execute(
            "INSERT OR REPLACE INTO graphinfo (name, header, size, acctime)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![table, header.join("\t"), size, acctime],
        )?;
        Ok(())
    }

    fn drop_graph_info(&self, table: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM graphinfo WHERE name = ?1", [table])?;
        Ok(())
    }

    fn bump_access_time(&self, table: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE graphinfo SET acctime = ?1 WHERE name = ?2",
            rusqlite::params![now(), table],
        )?;
        Ok(())
    }

    // =========================================================================
    // Graph import
    // =========================================================================

    /// True if the graph for `file` has been imported and is up to date.
    /// When false, an obsolete graph table for the file may still exist
    /// and gets dropped before new data is imported.
    pub fn has_graph(&self, file: &Path) -> Result<bool> {
        let real = realpath(file)?;
        let meta = std::fs::metadata(file)?;
        if let Some(info) = self.file_info(&real)? {
            // the md5sum column is not checked for now
            return Ok(info.size == meta.len() as i64 && info.modtime == modtime_of(&meta));
        }
        Ok(false)
    }

    /// Make sure `file` is imported, returning its table handle and
    /// column schema. Fresh files are answered from the catalog alone.
    pub fn ensure_graph(&mut self, file: &Path) -> Result<GraphHandle> {
        let real = realpath(file)?;
        if self.has_graph(file)? {
            let info = self
                .file_info(&real)?
                .ok_or_else(|| KypherError::input(format!("no file info for: {real}")))?;
            let graph = self.graph_info(&info.graph)?.ok_or_else(|| {
                KypherError::input(format!("no graph info for table: {}", info.graph))
            })?;
            self.bump_access_time(&info.graph)?;
            return Ok(GraphHandle {
                file: real,
                table: graph.name,
                header: graph.header,
            });
        }
        if let Some(stale) = self.file_info(&real)? {
            // an earlier version of the file is in the store, delete its data
            self.drop_graph(&stale.graph)?;
        }
        let table = self.new_graph_table()?;
        let oldsize = self.db_size()?;
        let header = match import::import_via_shell(self, &table, file) {
            Ok(header) => header,
            Err(import::ImportError::Recoverable(reason)) => {
                // fall back on the reader-based import, which is more
                // flexible but about 2x slower
                debug!(reason, "falling back to reader-based import");
                import::import_via_reader(self, &table, file)?
            }
            Err(import::ImportError::Fatal(err)) => return Err(err),
        };
        let graphsize = self.db_size()? - oldsize;
        let meta = std::fs::metadata(file)?;
        self.set_file_info(&real, meta.len() as i64, modtime_of(&meta), &table)?;
        self.set_graph_info(&table, &header, graphsize, now())?;
        Ok(GraphHandle {
            file: real,
            table,
            header,
        })
    }

    /// A fresh `graph_N` table name with the smallest free N.
    fn new_graph_table(&self) -> Result<String> {
        let mut graphid = self.number_of_graphs()? + 1;
        // there might be gaps due to deletions
        loop {
            let table = format!("graph_{graphid}");
            if !self.has_table(&table)? {
                return Ok(table);
            }
            graphid += 1;
        }
    }

    /// Delete the graph `table` and all its associated info records.
    pub fn drop_graph(&mut self, table: &str) -> Result<()> {
        for file in self.graph_files(table)? {
            info!(table, file, "DROP graph data table");
            self.drop_file_info(&file)?;
        }
        self.drop_graph_info(table)?;
        if self.has_table(table)? {
            // dropping the table also drops its indexes
            self.conn
                .execute(&format!("DROP TABLE {}", quote_ident(table)), [])?;
        }
        Ok(())
    }

    // =========================================================================
    // Index management
    // =========================================================================

    /// The deterministic name of the index for `column` on `table`.
    pub fn index_name(table: &str, column: &str) -> String {
        format!("{table}_{column}_idx")
    }

    /// True if `table` has an index defined for `column`.
    pub fn has_index(&self, table: &str, column: &str) -> Result<bool> {
        // keying on the name alone is enough, given how names are constructed
        self.has_table(&Self::index_name(table, column))
    }

    /// Ensure an index for `table` on `column` exists, collecting
    /// statistics on creation and charging the size delta to the graph.
    pub fn ensure_index(&mut self, table: &str, column: &str, unique: bool) -> Result<()> {
        if self.has_index(table, column)? {
            return Ok(());
        }
        let index = Self::index_name(table, column);
        info!(table, column, "CREATE INDEX");
        let oldsize = self.db_size()?;
        let unique = if unique { "UNIQUE " } else { "" };
        self.conn.execute(
            &format!(
                "CREATE {unique}INDEX {} ON {} ({})",
                quote_ident(&index),
                quote_ident(table),
                quote_ident(column)
            ),
            [],
        )?;
        // analyzing only takes about 10% of creation time, so run it
        // unconditionally
        info!(table, column, "ANALYZE INDEX");
        self.conn
            .execute_batch(&format!("ANALYZE {}", quote_ident(&index)))?;
        let delta = self.db_size()? - oldsize;
        self.conn.execute(
            "UPDATE graphinfo SET size = size + ?1 WHERE name = ?2",
            rusqlite::params![delta, table],
        )?;
        Ok(())
    }

    // =========================================================================
    // Explanation
    // =========================================================================

    /// Execute a sequence of sqlite3 shell commands in a single
    /// invocation and return stdout. Shell dot-commands are not
    /// invokable from a connection, they have to go through the shell.
    fn shell(&self, commands: &[&str]) -> Result<String> {
        let mut cmd = Command::new("sqlite3");
        let (last, init) = commands
            .split_last()
            .ok_or_else(|| KypherError::input("no shell commands given"))?;
        for command in init {
            cmd.arg("-cmd").arg(command);
        }
        cmd.arg(&self.dbfile).arg(last);
        let output = cmd.output()?;
        if !output.status.success() {
            return Err(KypherError::execution(
                String::from_utf8_lossy(&output.stderr).trim(),
                *last,
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Produce a textual plan for `sql` via the engine's shell facility.
    pub fn explain(&self, sql: &str, mode: ExplainMode) -> Result<String> {
        match mode {
            ExplainMode::Plan => self.shell(&[&format!("EXPLAIN QUERY PLAN {sql}")]),
            ExplainMode::Full => self.shell(&[&format!("EXPLAIN {sql}")]),
            ExplainMode::Expert => self.shell(&[".expert", sql]),
        }
    }

    /// Parse the `.expert` advisor output for `sql` into index specs.
    pub fn suggest_indexes(&self, sql: &str) -> Result<Vec<IndexSpec>> {
        static INDEX_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(
                r"(?i)^\s*CREATE\s+INDEX\s+(?P<name>\S+)\s+ON\s+(?P<table>[^\s(]+)\s*\(\s*(?P<columns>[^)]+)\)",
            )
            .unwrap()
        });
        let explanation = self.explain(sql, ExplainMode::Expert)?;
        let mut indexes = Vec::new();
        for line in explanation.lines() {
            if let Some(caps) = INDEX_RE.captures(line) {
                indexes.push(IndexSpec {
                    name: caps["name"].to_string(),
                    table: caps["table"].to_string(),
                    columns: caps["columns"]
                        .split(',')
                        .map(|c| c.trim().to_string())
                        .collect(),
                });
            }
        }
        Ok(indexes)
    }
}

/// Resolve `file` to its real path.
fn realpath(file: &Path) -> Result<String> {
    let real = std::fs::canonicalize(file)
        .map_err(|e| KypherError::input(format!("cannot resolve input file {}: {e}", file.display())))?;
    Ok(real.to_string_lossy().into_owned())
}

fn modtime_of(meta: &std::fs::Metadata) -> f64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn text_arg<'a>(value: ValueRef<'a>) -> Option<&'a str> {
    match value {
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok(),
        _ => None,
    }
}

fn scalar_to_value(scalar: Option<Scalar>) -> Value {
    match scalar {
        None => Value::Null,
        Some(Scalar::Int(n)) => Value::Integer(n),
        Some(Scalar::Float(x)) => Value::Real(x),
        Some(Scalar::Text(s)) => Value::Text(s),
    }
}
