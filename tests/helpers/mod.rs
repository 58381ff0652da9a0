#![allow(dead_code)] // each test target uses a different helper subset

//! Common fixtures and helpers for the query engine tests.
//!
//! The graphs here are the standard example data: a small social graph
//! with language-qualified names, a works graph with extra qualified
//! columns, date-valued qualifiers, a property classification graph, and
//! one file per literal class.

use std::io::Write;
use std::path::{Path, PathBuf};

use kypher::query::{KypherQuery, QuerySpec};
use kypher::store::SqliteStore;
use kypher::translate::IndexMode;
use rustc_hash::FxHashMap;
use tempfile::TempDir;

pub const GRAPH_TSV: &str = "node1\tlabel\tnode2\tid\n\
    Hans\tloves\tMolly\te11\n\
    Otto\tloves\tSusi\te12\n\
    Joe\tfriend\tOtto\te13\n\
    Joe\tloves\tJoe\te14\n\
    Hans\tname\t'Hans'@de\te21\n\
    Otto\tname\t'Otto'@de\te22\n\
    Joe\tname\t\"Joe\"\te23\n\
    Molly\tname\t\"Molly\"\te24\n\
    Susi\tname\t\"Susi\"\te25\n";

pub const WORKS_TSV: &str = "node1\tlabel\tnode2\tid\tnode1;salary\tgraph\n\
    Hans\tworks\tACME\tw11\t10000\temploy\n\
    Otto\tworks\tKaiser\tw12\t8000\temploy\n\
    Joe\tworks\tKaiser\tw13\t20000\temploy\n\
    Molly\tworks\tRenal\tw14\t11000\temploy\n\
    Susi\tworks\tCakes\tw15\t9900\temploy\n";

pub const QUALS_TSV: &str = "node1\tlabel\tnode2\tid\n\
    w11\tstarts\t^1984-12-17T00:03:12Z/11\tm11\n\
    w12\tends\t^1987-11-08T04:56:34Z/10\tm12\n\
    w13\tstarts\t^1996-02-23T08:02:56Z/09\tm13\n\
    w14\tends\t^2001-04-09T06:16:27Z/08\tm14\n\
    w15\tstarts\t^2008-10-01T12:00:00Z/07\tm15\n";

pub const PROPS_TSV: &str = "node1\tlabel\tnode2\tid\n\
    starts\tmember\tset1\tp11\n\
    ends\tmember\tset1\tp12\n";

pub const LITERALS_TSV: &str = "node1\tlabel\tnode2\tid\n\
    sy1\tsymbol\tFooBar\tesy1\n\
    st1\tstring\t\"Franz Klammer\"\test1\n\
    st2\tstring\t\"KGTK\"\test2\n\
    lq1\tlqstring\t'hans'@de\telq1\n\
    lq2\tlqstring\t'otto'@de-bav\telq2\n\
    d6\tdate\t^2020-10-30T02:03:57+10:30/9\ted6\n\
    q1\tquantity\t0\teq1\n\
    q2\tquantity\t0.0\teq2\n\
    q3\tquantity\t+1234\teq3\n\
    q4\tquantity\t-12345.1234\teq4\n\
    q5\tquantity\t4567.12e-10\teq5\n\
    q6\tquantity\t100m\teq6\n\
    q7\tquantity\t+1.609344e03[-0.1,+0.2]m\teq7\n\
    q8\tquantity\t1.609344e03[-0.1,+0.2]Q11573\teq8\n\
    gl1\tgeoloc\t@-42.42/69.123\tegl1\n\
    gl2\tgeoloc\t@19.42/-69.123e-1\tegl2\n";

/// A parsed query result: header plus data rows
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryResult {
    /// Position of a header field, by exact name
    pub fn column(&self, name: &str) -> usize {
        self.header
            .iter()
            .position(|h| h == name)
            .unwrap_or_else(|| panic!("no column {name:?} in header {:?}", self.header))
    }

    /// All values of a named column, in row order
    pub fn values(&self, name: &str) -> Vec<&str> {
        let idx = self.column(name);
        self.rows.iter().map(|r| r[idx].as_str()).collect()
    }

    /// The row whose `key` column holds `value`
    pub fn row_by(&self, key: &str, value: &str) -> &Vec<String> {
        let idx = self.column(key);
        self.rows
            .iter()
            .find(|r| r[idx] == value)
            .unwrap_or_else(|| panic!("no row with {key}={value}"))
    }

    /// Field of `row_by(key, value)` under column `name`
    pub fn field<'a>(&'a self, key: &str, value: &str, name: &str) -> &'a str {
        &self.row_by(key, value)[self.column(name)]
    }
}

/// Scratch directory with the standard graphs and one cache database.
pub struct QueryFixture {
    pub dir: TempDir,
    pub db: PathBuf,
}

impl QueryFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("test.sqlite3.db");
        Self { dir, db }
    }

    /// Write a graph file into the fixture directory.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        let mut file = std::fs::File::create(&path).expect("create graph file");
        file.write_all(content.as_bytes()).expect("write graph file");
        path
    }

    pub fn graph(&self) -> PathBuf {
        self.write("graph.tsv", GRAPH_TSV)
    }

    pub fn works(&self) -> PathBuf {
        self.write("works.tsv", WORKS_TSV)
    }

    pub fn quals(&self) -> PathBuf {
        self.write("quals.tsv", QUALS_TSV)
    }

    pub fn props(&self) -> PathBuf {
        self.write("props.tsv", PROPS_TSV)
    }

    pub fn literals(&self) -> PathBuf {
        self.write("literals.tsv", LITERALS_TSV)
    }

    /// Run a query built by adjusting the default spec; panics on error.
    pub fn run<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        configure: impl FnOnce(QuerySpec) -> QuerySpec,
    ) -> QueryResult {
        self.try_run(inputs, configure).expect("query failed")
    }

    /// Run a query, returning the engine error if any.
    pub fn try_run<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        configure: impl FnOnce(QuerySpec) -> QuerySpec,
    ) -> kypher::Result<QueryResult> {
        let mut store = SqliteStore::open(&self.db, true)?;
        let spec = configure(QuerySpec {
            inputs: inputs.iter().map(|p| p.as_ref().to_path_buf()).collect(),
            ..QuerySpec::default()
        });
        let mut query = KypherQuery::new(&mut store, spec)?;
        let mut buf = Vec::new();
        query.execute(&mut buf, false)?;
        Ok(parse_output(&buf))
    }
}

/// Split tab-delimited output into header and rows. The fixture values
/// contain no escaped separators, so a plain split is enough.
pub fn parse_output(buf: &[u8]) -> QueryResult {
    let text = String::from_utf8_lossy(buf);
    let mut lines = text.lines();
    let header = lines
        .next()
        .map(|l| l.split('\t').map(String::from).collect())
        .unwrap_or_default();
    let rows = lines
        .map(|l| l.split('\t').map(String::from).collect())
        .collect();
    QueryResult { header, rows }
}

/// Spec builder helpers used all over the test suites
pub fn with_match(pattern: &str) -> impl FnOnce(QuerySpec) -> QuerySpec + '_ {
    move |spec| QuerySpec {
        match_clause: pattern.to_string(),
        ..spec
    }
}

pub fn spec_parameters(pairs: &[(&str, &str)]) -> FxHashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Index modes exercised by the transparency law (expert needs the
/// sqlite3 shell, so it is tested separately)
pub fn all_offline_index_modes() -> Vec<IndexMode> {
    vec![
        IndexMode::Auto,
        IndexMode::Quad,
        IndexMode::Triple,
        IndexMode::Node1Label,
        IndexMode::Node1,
        IndexMode::Label,
        IndexMode::Node2,
        IndexMode::None,
    ]
}
