//! Thin command-line driver for Kypher queries.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use rustc_hash::FxHashMap;
use tracing_subscriber::EnvFilter;

use kypher::query::{
    KypherQuery, QuerySpec, default_graph_cache, dwim_to_lqstring_para, dwim_to_string_para,
};
use kypher::store::{ExplainMode, SqliteStore};
use kypher::translate::IndexMode;
use kypher::{KypherError, Result};

/// Query one or more KGTK files with Kypher.
#[derive(Debug, Parser)]
#[command(name = "kypher", version, about = "Query one or more KGTK files with Kypher")]
struct Args {
    /// One or more named input files to query (may be compressed)
    #[arg(short = 'i', long = "input", value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Complete Kypher query combining all clauses; if supplied, the
    /// specialized clause arguments are ignored
    #[arg(long, value_name = "QUERY")]
    query: Option<String>,

    /// MATCH pattern of a Kypher query, defaults to the universal node
    /// pattern `()`
    #[arg(long = "match", value_name = "PATTERN", default_value = "()")]
    match_clause: String,

    /// WHERE clause of a Kypher query
    #[arg(long = "where", value_name = "CLAUSE")]
    where_clause: Option<String>,

    /// RETURN clause of a Kypher query (defaults to *)
    #[arg(long = "return", value_name = "CLAUSE", default_value = "*")]
    return_clause: String,

    /// ORDER BY clause of a Kypher query
    #[arg(long = "order-by", value_name = "CLAUSE")]
    order_clause: Option<String>,

    /// SKIP clause of a Kypher query
    #[arg(long, value_name = "CLAUSE")]
    skip: Option<String>,

    /// LIMIT clause of a Kypher query
    #[arg(long, value_name = "CLAUSE")]
    limit: Option<String>,

    /// Zero or more named value parameters to pass to the query
    #[arg(long = "para", value_name = "NAME=VAL")]
    regular_paras: Vec<String>,

    /// Zero or more named string parameters to pass to the query
    #[arg(long = "spara", value_name = "NAME=VAL")]
    string_paras: Vec<String>,

    /// Zero or more named LQ-string parameters to pass to the query
    #[arg(long = "lqpara", value_name = "NAME=VAL")]
    lqstring_paras: Vec<String>,

    /// Do not generate a header row with column names
    #[arg(long = "no-header")]
    no_header: bool,

    /// Control column index creation (auto, expert, quad, triple,
    /// node1+label, node1, label, node2, none)
    #[arg(long, value_name = "MODE", default_value = "auto")]
    index: IndexMode,

    /// Explain the query execution and indexing plan (plan, full,
    /// expert) instead of running it
    #[arg(long, value_name = "MODE")]
    explain: Option<ExplainMode>,

    /// Database cache where graphs are imported before they are queried
    /// (defaults to a per-user temporary file)
    #[arg(long = "graph-cache", value_name = "PATH")]
    graph_cache: Option<PathBuf>,

    /// Output file to write to; `-` (the default) goes to stdout.
    /// Extensions .gz, .bz2, .xz select stream compression
    #[arg(short = 'o', long = "out", value_name = "OUTPUT", default_value = "-")]
    output: String,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() {
    let args = Args::parse();
    let default_filter = if args.debug { "kypher=debug" } else { "kypher=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(()) => {}
        // a closed downstream pager is a clean exit
        Err(e) if e.is_broken_pipe() => {}
        Err(e) => {
            eprintln!("kypher: {e}");
            std::process::exit(1);
        }
    }
}

fn parse_parameters(args: &Args) -> Result<FxHashMap<String, String>> {
    let mut parameters = FxHashMap::default();
    for spec in &args.regular_paras {
        let (name, value) = split_para(spec)?;
        parameters.insert(name.to_string(), value.to_string());
    }
    for spec in &args.string_paras {
        let (name, value) = split_para(spec)?;
        parameters.insert(name.to_string(), dwim_to_string_para(value));
    }
    for spec in &args.lqstring_paras {
        let (name, value) = split_para(spec)?;
        parameters.insert(name.to_string(), dwim_to_lqstring_para(value)?);
    }
    Ok(parameters)
}

fn split_para(spec: &str) -> Result<(&str, &str)> {
    spec.split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| KypherError::input(format!("illegal parameter spec: {spec}")))
}

fn run(args: &Args) -> Result<()> {
    let cache = args.graph_cache.clone().unwrap_or_else(default_graph_cache);
    let create = !cache.exists();
    let mut store = SqliteStore::open(cache, create)?;

    let spec = QuerySpec {
        inputs: args.inputs.clone(),
        query: args.query.clone(),
        match_clause: args.match_clause.clone(),
        where_clause: args.where_clause.clone(),
        return_clause: args.return_clause.clone(),
        order_clause: args.order_clause.clone(),
        skip_clause: args.skip.clone(),
        limit_clause: args.limit.clone(),
        parameters: parse_parameters(args)?,
        index_mode: args.index,
    };
    let mut query = KypherQuery::new(&mut store, spec)?;

    let mut out: Box<dyn Write> = if args.output == "-" {
        Box::new(std::io::stdout().lock())
    } else {
        kypher::tabio::open_to_write(std::path::Path::new(&args.output))?
    };

    if let Some(mode) = args.explain {
        let plan = query.explain(mode)?;
        out.write_all(plan.as_bytes())?;
    } else {
        query.execute(&mut out, args.no_header)?;
    }
    out.flush()?;
    Ok(())
}
