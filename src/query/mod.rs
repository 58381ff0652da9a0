//! Query driver.
//!
//! Orchestrates one Kypher query end to end: ensure every input file is
//! imported, parse the query text (or the individual clause strings),
//! translate it into SQL, ensure the planned indexes, then either stream
//! the result rows to an output sink or produce the engine's explanation
//! text.

use std::io::Write;
use std::path::PathBuf;

use rusqlite::params_from_iter;
use rusqlite::types::ValueRef;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{KypherError, Result};
use crate::parser::parse_query;
use crate::store::{ExplainMode, GraphHandle, SqliteStore};
use crate::syntax::Query;
use crate::tabio;
use crate::translate::{IndexMode, TranslatedQuery, translate};

/// Wrap a raw parameter value into a KGTK string unless it already is one.
pub fn dwim_to_string_para(value: &str) -> String {
    crate::literal::value::stringify(value)
}

/// Wrap a raw parameter value into a language-qualified string. A value
/// like `Otto@de` splits at the last `@`; a value that already has the
/// literal shape passes through.
pub fn dwim_to_lqstring_para(value: &str) -> Result<String> {
    if crate::literal::value::is_lqstring(value) {
        return Ok(value.to_string());
    }
    match value.rsplit_once('@') {
        Some((text, lang)) if !text.is_empty() && !lang.is_empty() => {
            Ok(format!("'{text}'@{lang}"))
        }
        _ => Err(KypherError::input(format!(
            "illegal language-qualified parameter value: {value}"
        ))),
    }
}

/// The complete input of one query invocation.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    /// Input files, in `--input` order; the first is the default graph
    pub inputs: Vec<PathBuf>,
    /// A complete query string; overrides the individual clauses
    pub query: Option<String>,
    /// MATCH pattern; the universal node pattern when not given
    pub match_clause: String,
    pub where_clause: Option<String>,
    /// RETURN list; `*` when not given
    pub return_clause: String,
    pub order_clause: Option<String>,
    pub skip_clause: Option<String>,
    pub limit_clause: Option<String>,
    /// Named parameters, already class-wrapped
    pub parameters: FxHashMap<String, String>,
    pub index_mode: IndexMode,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            query: None,
            match_clause: "()".to_string(),
            where_clause: None,
            return_clause: "*".to_string(),
            order_clause: None,
            skip_clause: None,
            limit_clause: None,
            parameters: FxHashMap::default(),
            index_mode: IndexMode::Auto,
        }
    }
}

impl QuerySpec {
    /// Combine the clause strings into a single query text, unless a
    /// complete `--query` string was supplied.
    pub fn query_text(&self) -> String {
        if let Some(query) = &self.query {
            return query.clone();
        }
        let mut text = format!("MATCH {}", self.match_clause);
        if let Some(where_clause) = &self.where_clause {
            text.push_str(&format!(" WHERE {where_clause}"));
        }
        text.push_str(&format!(" RETURN {}", self.return_clause));
        if let Some(order) = &self.order_clause {
            text.push_str(&format!(" ORDER BY {order}"));
        }
        if let Some(skip) = &self.skip_clause {
            text.push_str(&format!(" SKIP {skip}"));
        }
        if let Some(limit) = &self.limit_clause {
            text.push_str(&format!(" LIMIT {limit}"));
        }
        text
    }
}

/// One translated query bound to a store, ready to execute or explain.
pub struct KypherQuery<'s> {
    store: &'s mut SqliteStore,
    spec: QuerySpec,
    query: Query,
}

impl<'s> KypherQuery<'s> {
    /// Parse the query of `spec` against `store`. Inputs are not touched
    /// until execution.
    pub fn new(store: &'s mut SqliteStore, spec: QuerySpec) -> Result<Self> {
        if spec.inputs.is_empty() {
            return Err(KypherError::input(
                "at least one named input file needs to be supplied",
            ));
        }
        let text = spec.query_text();
        let query = parse_query(&text).map_err(|e| KypherError::Parse {
            message: e.render(&text),
        })?;
        Ok(Self { store, spec, query })
    }

    fn ensure_graphs(&mut self) -> Result<Vec<GraphHandle>> {
        self.spec
            .inputs
            .clone()
            .iter()
            .map(|input| self.store.ensure_graph(input))
            .collect()
    }

    fn translate(&mut self) -> Result<TranslatedQuery> {
        let graphs = self.ensure_graphs()?;
        let params: FxHashMap<String, String> = self.spec.parameters.clone();
        translate(&self.query, &graphs, &params, self.spec.index_mode)
    }

    fn ensure_indexes(&mut self, translated: &TranslatedQuery) -> Result<()> {
        for (table, column) in &translated.index_requests {
            self.store.ensure_index(table, column, false)?;
        }
        if self.spec.index_mode == IndexMode::Expert {
            // additionally ingest the engine's own suggestions
            for suggestion in self.store.suggest_indexes(&translated.sql)? {
                for column in &suggestion.columns {
                    self.store.ensure_index(&suggestion.table, column, false)?;
                }
            }
        }
        Ok(())
    }

    /// Produce the engine's plan text instead of executing. Imports still
    /// happen (the engine cannot explain queries over absent tables), but
    /// index creation is skipped.
    pub fn explain(&mut self, mode: ExplainMode) -> Result<String> {
        let translated = self.translate()?;
        debug!(sql = %translated.sql, "explaining translated query");
        self.store.explain(&translated.sql, mode)
    }

    /// Execute the query and stream tab-delimited rows into `out`.
    /// Returns the number of data rows written; a broken pipe on the
    /// output side terminates cleanly with the rows written so far.
    pub fn execute(&mut self, out: &mut dyn Write, no_header: bool) -> Result<u64> {
        let translated = self.translate()?;
        self.ensure_indexes(&translated)?;
        debug!(sql = %translated.sql, params = ?translated.params, "executing translated query");

        let conn = self.store.conn();
        let mut stmt = conn
            .prepare(&translated.sql)
            .map_err(|e| KypherError::execution(e, &translated.sql))?;
        let column_count = stmt.column_count();
        let mut rows = stmt
            .query(params_from_iter(translated.params.iter()))
            .map_err(|e| KypherError::execution(e, &translated.sql))?;

        if !no_header {
            match tabio::write_row(out, &translated.header) {
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => return Ok(0),
                other => other?,
            }
        }
        let mut count = 0u64;
        let mut fields: Vec<String> = vec![String::new(); column_count];
        while let Some(row) = rows
            .next()
            .map_err(|e| KypherError::execution(e, &translated.sql))?
        {
            for (i, field) in fields.iter_mut().enumerate() {
                *field = value_to_string(row.get_ref(i)?);
            }
            match tabio::write_row(out, &fields) {
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => return Ok(count),
                other => other?,
            }
            count += 1;
        }
        Ok(count)
    }
}

/// Render an engine value the way the engine's own shell would: NULL as
/// the empty field, floats always with a decimal point.
fn value_to_string(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(n) => n.to_string(),
        ValueRef::Real(x) => {
            if x.fract() == 0.0 && x.is_finite() && x.abs() < 1e15 {
                format!("{x:.1}")
            } else {
                x.to_string()
            }
        }
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// The default per-user cache location, resolved once at startup from
/// the environment and passed around as a plain path afterwards.
pub fn default_graph_cache() -> PathBuf {
    let user = std::env::var("USER").unwrap_or_default();
    std::env::temp_dir().join(format!("kgtk-graph-cache-{user}.sqlite3.db"))
}
