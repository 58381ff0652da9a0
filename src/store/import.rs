//! Graph data import.
//!
//! Two paths load a KGTK file into a fresh graph table:
//!
//! 1. [`import_via_shell`] pipes the (decompressed) data straight into
//!    the sqlite3 shell's `.import` command. Fastest, but requires the
//!    shell binary and single-character line endings.
//! 2. [`import_via_reader`] parses rows with the csv reader and inserts
//!    them through a prepared statement inside one transaction. About 2x
//!    slower, but tolerates every input.
//!
//! All recoverable shell-path failures are detected before the graph
//! table is created, so the fallback always starts from a clean slate.

use std::io::{BufRead, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use rusqlite::params_from_iter;
use tracing::info;

use super::SqliteStore;
use crate::base::quote_ident;
use crate::error::{KypherError, Result};
use crate::tabio;

/// Shell-path failure classification
pub(super) enum ImportError {
    /// The fallback path can handle this input
    Recoverable(String),
    /// Import failed for real; propagate
    Fatal(KypherError),
}

impl From<KypherError> for ImportError {
    fn from(err: KypherError) -> Self {
        Self::Fatal(err)
    }
}

/// `CREATE TABLE` statement for a graph table: every source column,
/// typed as generic text.
fn table_definition(table: &str, header: &[String]) -> String {
    let colspec = header
        .iter()
        .map(|col| format!("{} TEXT", quote_ident(col)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", quote_ident(table), colspec)
}

fn parse_header_line(line: &str) -> Vec<String> {
    line.split('\t').map(String::from).collect()
}

/// Import `file` into `table` through the sqlite3 shell's `.import`.
/// Returns the parsed header on success.
pub(super) fn import_via_shell(
    store: &mut SqliteStore,
    table: &str,
    file: &Path,
) -> std::result::Result<Vec<String>, ImportError> {
    // sqlite can derive a table definition from the header row, but it
    // does not cope with arbitrary column names and cannot skip the
    // header; so we read the header, create the table ourselves, and
    // feed it only the data rows
    let mut reader = tabio::open_to_read(file).map_err(KypherError::from)?;
    let mut header_line = String::new();
    reader
        .read_line(&mut header_line)
        .map_err(KypherError::from)?;
    if header_line.ends_with("\r\n") {
        // the shell import only handles single-character line endings;
        // importing anyway leaves \r in the last column's values
        return Err(ImportError::Recoverable(
            "cannot handle multi-character line endings".into(),
        ));
    }
    let header = parse_header_line(header_line.trim_end_matches('\n'));
    if header.iter().all(|c| c.is_empty()) {
        return Err(KypherError::input(format!(
            "empty or malformed header in {}",
            file.display()
        ))
        .into());
    }

    // probe for the shell before touching the database, so a missing
    // binary leaves no half-created table behind
    match Command::new("sqlite3")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(status) if status.success() => {}
        Ok(_) => return Err(ImportError::Recoverable("sqlite3 shell not usable".into())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ImportError::Recoverable("sqlite3 shell not found".into()));
        }
        Err(e) => return Err(ImportError::Fatal(e.into())),
    }

    store
        .conn
        .execute(&table_definition(table, &header), [])
        .map_err(KypherError::from)?;

    info!(table, file = %file.display(), "IMPORT graph directly into table");
    let mut child = Command::new("sqlite3")
        .arg("-cmd")
        .arg(".mode ascii")
        .arg("-cmd")
        .arg(".separator \"\\t\" \"\\n\"")
        .arg(&store.dbfile)
        .arg(format!(".import /dev/stdin {table}"))
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(KypherError::from)?;

    let mut feed = || -> std::io::Result<()> {
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::other("no stdin handle on child"))?;
        std::io::copy(&mut reader, &mut stdin)?;
        stdin.flush()
    };
    let feed_result = feed();

    let output = child.wait_with_output().map_err(KypherError::from)?;
    if let Err(e) = feed_result {
        // a vanished child surfaces as a broken pipe while feeding
        if e.kind() != std::io::ErrorKind::BrokenPipe {
            return Err(ImportError::Fatal(e.into()));
        }
    }
    if !output.status.success() {
        return Err(ImportError::Fatal(KypherError::import(format!(
            "shell import into {table} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ))));
    }
    Ok(header)
}

/// Import `file` into `table` row by row via the csv reader. Safe for
/// every input; runs inside one transaction so a failed import leaves
/// the catalog consistent.
pub(super) fn import_via_reader(
    store: &mut SqliteStore,
    table: &str,
    file: &Path,
) -> Result<Vec<String>> {
    info!(table, file = %file.display(), "IMPORT graph via reader into table");
    let reader = tabio::open_to_read(file)?;
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(false)
        .has_headers(true)
        .from_reader(reader);
    let header: Vec<String> = csv_reader
        .headers()
        .map_err(|e| KypherError::input(format!("malformed header in {}: {e}", file.display())))?
        .iter()
        .map(String::from)
        .collect();
    if header.is_empty() || header.iter().all(|c| c.is_empty()) {
        return Err(KypherError::input(format!(
            "empty or malformed header in {}",
            file.display()
        )));
    }

    let tx = store.conn.transaction()?;
    tx.execute(&table_definition(table, &header), [])?;
    {
        let placeholders = vec!["?"; header.len()].join(",");
        let mut insert = tx.prepare(&format!(
            "INSERT INTO {} VALUES ({placeholders})",
            quote_ident(table)
        ))?;
        for record in csv_reader.records() {
            let record = record.map_err(|e| {
                let line = e
                    .position()
                    .map(|p| p.line())
                    .unwrap_or_default();
                KypherError::input_at(file.display(), line, e)
            })?;
            insert.execute(params_from_iter(record.iter()))?;
        }
    }
    tx.commit()?;
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_definition_quotes_columns() {
        let header = vec!["node1".to_string(), "node1;salary".to_string()];
        assert_eq!(
            table_definition("graph_1", &header),
            "CREATE TABLE \"graph_1\" (\"node1\" TEXT, \"node1;salary\" TEXT)"
        );
    }

    #[test]
    fn test_reader_import_rejects_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.tsv");
        std::fs::write(&path, "node1\tlabel\tnode2\tid\nHans\tloves\n").unwrap();
        let mut store = SqliteStore::open(dir.path().join("db"), true).unwrap();
        let err = import_via_reader(&mut store, "graph_1", &path).unwrap_err();
        assert!(matches!(err, KypherError::Input { .. }));
        // the transaction was rolled back, so no table remains
        assert!(!store.has_table("graph_1").unwrap());
    }
}
