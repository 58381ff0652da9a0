//! Translation of Kypher queries into a single SQL SELECT.
//!
//! Each relationship pattern becomes one occurrence of its graph's table
//! under a unique alias; node patterns do not introduce tables, they
//! constrain columns on their adjacent edges. Shared variables across
//! endpoints, chains, and clauses turn into equality joins; labels and
//! property maps into column constraints. WHERE/RETURN/ORDER BY
//! expressions are lowered term by term, and the result header is
//! computed alongside the select list.

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::base::quote_ident;
use crate::error::{KypherError, Result};
use crate::literal::{is_aggregate_function, is_user_function};
use crate::store::GraphHandle;
use crate::syntax::{
    BinaryOp, Direction, Expr, NodeHandle, Query, RelHandle, ReturnList, UnaryOp,
};

/// Canonical KGTK edge columns, in fixed expansion order.
pub const CANONICAL_COLUMNS: [&str; 4] = ["id", "node1", "label", "node2"];

/// Policy controlling which columns are indexed before execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexMode {
    /// Index join columns and label columns
    #[default]
    Auto,
    /// `auto` plus whatever the engine's index advisor suggests
    Expert,
    /// Index all four canonical columns
    Quad,
    /// Index `node1`, `label`, `node2`
    Triple,
    /// Index `node1` and `label`
    Node1Label,
    Node1,
    Label,
    Node2,
    None,
}

impl IndexMode {
    /// Canonical columns selected by the fixed modes; `None` for the
    /// policy-driven modes.
    fn canonical_columns(&self) -> Option<&'static [&'static str]> {
        match self {
            Self::Quad => Some(&["id", "node1", "label", "node2"]),
            Self::Triple => Some(&["node1", "label", "node2"]),
            Self::Node1Label => Some(&["node1", "label"]),
            Self::Node1 => Some(&["node1"]),
            Self::Label => Some(&["label"]),
            Self::Node2 => Some(&["node2"]),
            _ => None,
        }
    }
}

impl std::str::FromStr for IndexMode {
    type Err = KypherError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(Self::Auto),
            "expert" => Ok(Self::Expert),
            "quad" => Ok(Self::Quad),
            "triple" => Ok(Self::Triple),
            "node1+label" => Ok(Self::Node1Label),
            "node1" => Ok(Self::Node1),
            "label" => Ok(Self::Label),
            "node2" => Ok(Self::Node2),
            "none" => Ok(Self::None),
            other => Err(KypherError::input(format!("illegal index mode: {other}"))),
        }
    }
}

/// The product of translation: SQL text, bound parameters in placeholder
/// order, the output header, and the index requests to satisfy before
/// execution.
#[derive(Debug, Clone)]
pub struct TranslatedQuery {
    pub sql: String,
    pub params: Vec<String>,
    pub header: Vec<String>,
    /// `(table, column)` pairs to pass to `ensure_index`
    pub index_requests: Vec<(String, String)>,
}

/// Translate `query` against the resolved input `graphs` (in `--input`
/// order). `parameters` maps `$name` references to their final (already
/// class-wrapped) values.
pub fn translate(
    query: &Query,
    graphs: &[GraphHandle],
    parameters: &FxHashMap<String, String>,
    index_mode: IndexMode,
) -> Result<TranslatedQuery> {
    Translator::new(query, graphs, parameters, index_mode)?.run()
}

/// One table occurrence in the FROM clause
struct Occurrence {
    graph: usize,
    alias: String,
}

/// A fully resolved column: occurrence plus column name
#[derive(Clone, PartialEq, Eq)]
struct ColumnRef {
    occ: usize,
    column: SmolStr,
}

/// Everything known about one variable
#[derive(Default)]
struct VarBinding {
    /// All columns this variable binds to, in textual order
    refs: Vec<ColumnRef>,
    /// First occurrence where this variable named the relationship
    edge_occ: Option<usize>,
}

struct Translator<'a> {
    query: &'a Query,
    graphs: &'a [GraphHandle],
    parameters: &'a FxHashMap<String, String>,
    index_mode: IndexMode,
    occurrences: Vec<Occurrence>,
    bindings: IndexMap<SmolStr, VarBinding>,
    /// Constraints from labels, property literals, and joins
    constraints: Vec<String>,
    params: Vec<String>,
    index_requests: IndexSet<(String, String)>,
    /// RETURN aliases, consulted as a fallback when lowering ORDER BY
    aliases: IndexSet<SmolStr>,
}

impl<'a> Translator<'a> {
    fn new(
        query: &'a Query,
        graphs: &'a [GraphHandle],
        parameters: &'a FxHashMap<String, String>,
        index_mode: IndexMode,
    ) -> Result<Self> {
        if graphs.is_empty() {
            return Err(KypherError::semantic("at least one input graph is required"));
        }
        let mut translator = Self {
            query,
            graphs,
            parameters,
            index_mode,
            occurrences: Vec::new(),
            bindings: IndexMap::new(),
            constraints: Vec::new(),
            params: Vec::new(),
            index_requests: IndexSet::new(),
            aliases: IndexSet::new(),
        };
        translator.build_occurrences()?;
        translator.bind_joins();
        Ok(translator)
    }

    // =========================================================================
    // Pattern analysis
    // =========================================================================

    /// Resolve a graph qualifier against the input files: exact basename
    /// first, then basename prefix, then substring.
    fn resolve_graph(&self, qualifier: Option<&SmolStr>) -> Result<usize> {
        let Some(name) = qualifier else {
            return Ok(0);
        };
        let basenames: Vec<&str> = self
            .graphs
            .iter()
            .map(|g| {
                std::path::Path::new(g.file.as_str())
                    .file_name()
                    .and_then(|b| b.to_str())
                    .unwrap_or(g.file.as_str())
            })
            .collect();
        let stem = |base: &str| base.split('.').next().unwrap_or(base).to_string();
        if let Some(i) = basenames.iter().position(|b| stem(b) == name.as_str()) {
            return Ok(i);
        }
        if let Some(i) = basenames.iter().position(|b| b.starts_with(name.as_str())) {
            return Ok(i);
        }
        if let Some(i) = basenames.iter().position(|b| b.contains(name.as_str())) {
            return Ok(i);
        }
        Err(KypherError::semantic(format!(
            "no input graph matches qualifier: {name}"
        )))
    }

    fn handle(&self, occ: usize) -> &GraphHandle {
        &self.graphs[self.occurrences[occ].graph]
    }

    fn new_occurrence(&mut self, graph: usize) -> usize {
        let table = &self.graphs[graph].table;
        let graph_num = table
            .strip_prefix("graph_")
            .and_then(|n| n.parse::<usize>().ok());
        let nth = self
            .occurrences
            .iter()
            .filter(|o| o.graph == graph)
            .count()
            + 1;
        let alias = match graph_num {
            Some(num) => format!("g{num}_{nth}"),
            None => format!("t{}_{nth}", graph),
        };
        self.occurrences.push(Occurrence { graph, alias });
        self.occurrences.len() - 1
    }

    /// Walk every MATCH clause, creating table occurrences and collecting
    /// variable bindings, label constraints, and property constraints.
    fn build_occurrences(&mut self) -> Result<()> {
        let query = self.query;
        for clause in &query.matches {
            let graph = self.resolve_graph(clause.graph.as_ref())?;
            if clause.chain.is_node_only() {
                let occ = self.new_occurrence(graph);
                self.bind_node(clause.chain.start, occ, "id")?;
                continue;
            }
            let mut prev = clause.chain.start;
            for step in &clause.chain.steps {
                let occ = self.new_occurrence(graph);
                let rel = query.rel(step.rel);
                let (from, to) = match rel.direction {
                    Direction::Backward => (step.node, prev),
                    _ => (prev, step.node),
                };
                self.bind_rel(step.rel, occ)?;
                self.bind_node(from, occ, "node1")?;
                self.bind_node(to, occ, "node2")?;
                prev = step.node;
            }
        }
        Ok(())
    }

    /// Bind a node pattern to `column` of occurrence `occ`.
    fn bind_node(&mut self, handle: NodeHandle, occ: usize, column: &str) -> Result<()> {
        let node = self.query.node(handle);
        // anonymous nodes get an internal variable so that a shared join
        // point still joins its adjacent edges; the arena index keeps
        // distinct anonymous nodes distinct
        let var = node
            .variable
            .clone()
            .unwrap_or_else(|| SmolStr::from(format!("_anon_node_{}", handle.0)));
        self.bindings.entry(var).or_default().refs.push(ColumnRef {
            occ,
            column: SmolStr::from(column),
        });
        if !node.labels.is_empty() {
            self.add_label_constraint(occ, column, &node.labels);
        }
        for (key, value) in &node.properties {
            // node properties address endpoint-qualified columns, the
            // way KGTK extra columns are named (node1;salary)
            let column = SmolStr::from(format!("{column};{key}"));
            self.bind_property(occ, column, value)?;
        }
        Ok(())
    }

    /// Bind a relationship pattern to occurrence `occ`.
    fn bind_rel(&mut self, handle: RelHandle, occ: usize) -> Result<()> {
        let rel = self.query.rel(handle);
        if let Some(var) = &rel.variable {
            let binding = self.bindings.entry(var.clone()).or_default();
            binding.refs.push(ColumnRef {
                occ,
                column: SmolStr::from("id"),
            });
            binding.edge_occ.get_or_insert(occ);
        }
        if !rel.labels.is_empty() {
            self.add_label_constraint(occ, "label", &rel.labels);
        }
        for (key, value) in &rel.properties {
            self.bind_property(occ, key.clone(), value)?;
        }
        Ok(())
    }

    /// A property map entry either captures a fresh variable or
    /// constrains the column to a literal expression.
    fn bind_property(&mut self, occ: usize, column: SmolStr, value: &Expr) -> Result<()> {
        if let Expr::Variable(var) = value {
            self.bindings
                .entry(var.clone())
                .or_default()
                .refs
                .push(ColumnRef { occ, column });
            return Ok(());
        }
        let value_sql = self.lower_expr(value, false)?;
        let column_sql = self.column_sql(occ, &column);
        self.request_index(occ, &column);
        self.constraints.push(format!("{column_sql} = {value_sql}"));
        Ok(())
    }

    fn add_label_constraint(&mut self, occ: usize, column: &str, labels: &[SmolStr]) {
        let column_sql = self.column_sql(occ, column);
        self.request_index(occ, column);
        if let [label] = labels {
            self.constraints
                .push(format!("{column_sql} = {}", sql_string(label)));
        } else {
            let choices = labels
                .iter()
                .map(|l| sql_string(l))
                .collect::<Vec<_>>()
                .join(", ");
            self.constraints.push(format!("{column_sql} IN ({choices})"));
        }
    }

    /// Emit equality joins for every variable bound to multiple columns.
    /// Same-occurrence pairs cover reflexive edges like `(a)-[]->(a)`.
    fn bind_joins(&mut self) {
        let joins: Vec<(ColumnRef, ColumnRef)> = self
            .bindings
            .values()
            .flat_map(|binding| {
                binding
                    .refs
                    .windows(2)
                    .map(|pair| (pair[0].clone(), pair[1].clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        for (left, right) in joins {
            self.request_index(left.occ, &left.column);
            self.request_index(right.occ, &right.column);
            let constraint = format!(
                "{} = {}",
                self.column_sql(left.occ, &left.column),
                self.column_sql(right.occ, &right.column)
            );
            self.constraints.push(constraint);
        }
    }

    fn column_sql(&self, occ: usize, column: &str) -> String {
        format!("{}.{}", self.occurrences[occ].alias, quote_ident(column))
    }

    fn request_index(&mut self, occ: usize, column: &str) {
        let table = self.handle(occ).table.clone();
        self.index_requests.insert((table, column.to_string()));
    }

    // =========================================================================
    // Expression lowering
    // =========================================================================

    /// Lower an expression to SQL text. With `allow_alias`, a variable
    /// that is not bound in MATCH but names a RETURN alias resolves to
    /// the output column of that alias (ORDER BY only).
    fn lower_expr(&mut self, expr: &Expr, allow_alias: bool) -> Result<String> {
        match expr {
            Expr::Null => Ok("NULL".to_string()),
            Expr::Bool(true) => Ok("1".to_string()),
            Expr::Bool(false) => Ok("0".to_string()),
            Expr::Integer(n) => Ok(n.to_string()),
            Expr::Float(x) => Ok(x.to_string()),
            Expr::String(s) => Ok(sql_string(s)),
            Expr::Parameter(name) => {
                let value = self.parameters.get(name.as_str()).ok_or_else(|| {
                    KypherError::semantic(format!("undefined query parameter: ${name}"))
                })?;
                self.params.push(value.clone());
                Ok(format!("?{}", self.params.len()))
            }
            Expr::Variable(name) => self.lower_variable(name, allow_alias),
            Expr::Property { var, prop } => self.lower_property(var, prop),
            Expr::List(items) => {
                let lowered = items
                    .iter()
                    .map(|i| self.lower_expr(i, allow_alias))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("({})", lowered.join(", ")))
            }
            Expr::Unary { op, operand } => {
                let operand = self.lower_expr(operand, allow_alias)?;
                Ok(match op {
                    UnaryOp::Not => format!("(NOT {operand})"),
                    UnaryOp::Neg => format!("(- {operand})"),
                })
            }
            Expr::Binary { op, left, right } => {
                let left = self.lower_expr(left, allow_alias)?;
                let right = self.lower_expr(right, allow_alias)?;
                match op {
                    // no XOR in the engine's SQL; inequality over the
                    // boolean results is equivalent
                    BinaryOp::Xor => Ok(format!("(({left}) != ({right}))")),
                    _ => Ok(format!("({left} {} {right})", op.sql())),
                }
            }
            Expr::In { value, list } => {
                let value = self.lower_expr(value, allow_alias)?;
                let list = self.lower_expr(list, allow_alias)?;
                Ok(format!("({value} IN {list})"))
            }
            Expr::Regex { value, pattern } => {
                let value = self.lower_expr(value, allow_alias)?;
                let pattern = self.lower_expr(pattern, allow_alias)?;
                Ok(format!("KGTK_REGEX({value}, {pattern})"))
            }
            Expr::IsNull { value, negated } => {
                let value = self.lower_expr(value, allow_alias)?;
                if *negated {
                    Ok(format!("({value} IS NOT NULL)"))
                } else {
                    Ok(format!("({value} IS NULL)"))
                }
            }
            Expr::Call {
                function,
                distinct,
                args,
            } => self.lower_call(function, *distinct, args, allow_alias),
            Expr::Case {
                operand,
                branches,
                otherwise,
            } => {
                let mut sql = "CASE".to_string();
                if let Some(op) = operand {
                    sql.push(' ');
                    sql.push_str(&self.lower_expr(op, allow_alias)?);
                }
                for (when, then) in branches {
                    sql.push_str(" WHEN ");
                    sql.push_str(&self.lower_expr(when, allow_alias)?);
                    sql.push_str(" THEN ");
                    sql.push_str(&self.lower_expr(then, allow_alias)?);
                }
                if let Some(e) = otherwise {
                    sql.push_str(" ELSE ");
                    sql.push_str(&self.lower_expr(e, allow_alias)?);
                }
                sql.push_str(" END");
                Ok(sql)
            }
        }
    }

    fn lower_variable(&mut self, name: &SmolStr, allow_alias: bool) -> Result<String> {
        if name == "*" {
            return Ok("*".to_string());
        }
        if let Some(binding) = self.bindings.get(name) {
            let first = binding.refs[0].clone();
            return Ok(self.column_sql(first.occ, &first.column));
        }
        if allow_alias && self.aliases.contains(name) {
            // an unqualified quoted identifier resolves against the
            // output columns
            return Ok(quote_ident(name));
        }
        Err(KypherError::semantic(format!(
            "variable not bound in match clause: {name}"
        )))
    }

    fn lower_property(&mut self, var: &SmolStr, prop: &SmolStr) -> Result<String> {
        let binding = self.bindings.get(var).ok_or_else(|| {
            KypherError::semantic(format!("variable not bound in match clause: {var}"))
        })?;
        let first = binding.refs[0].clone();
        if is_user_function(prop) {
            // `var.kgtk_date_year` style: apply the literal accessor to
            // the variable's column
            let column = self.column_sql(first.occ, &first.column);
            return Ok(format!("{}({column})", prop.to_uppercase()));
        }
        // a column of the same row; undeclared names are still emitted
        // quoted so qualified KGTK columns remain reachable
        Ok(self.column_sql(first.occ, prop))
    }

    fn lower_call(
        &mut self,
        function: &SmolStr,
        distinct: bool,
        args: &[Expr],
        allow_alias: bool,
    ) -> Result<String> {
        // two-argument cast(x, type) becomes the SQL CAST form
        if function.eq_ignore_ascii_case("cast") && args.len() == 2 {
            if let Expr::Variable(type_name) = &args[1] {
                if type_name.chars().all(|c| c.is_ascii_alphabetic()) && !self.bindings.contains_key(type_name) {
                    let value = self.lower_expr(&args[0], allow_alias)?;
                    return Ok(format!("CAST({value} AS {type_name})"));
                }
            }
        }
        let lowered = args
            .iter()
            .map(|a| self.lower_expr(a, allow_alias))
            .collect::<Result<Vec<_>>>()?;
        let name = if is_aggregate_function(function) || is_user_function(function) {
            function.to_uppercase()
        } else {
            function.to_string()
        };
        let distinct = if distinct { "DISTINCT " } else { "" };
        Ok(format!("{name}({distinct}{})", lowered.join(", ")))
    }

    // =========================================================================
    // SELECT list and result header
    // =========================================================================

    /// Build the select list. Returns `(select_sql, headers, aggregate?)`
    /// per entry; headers may contribute several columns for expanded
    /// bare variables.
    fn build_select(&mut self) -> Result<Vec<(String, Vec<String>, bool)>> {
        let query = self.query;
        match &query.ret {
            ReturnList::Star => {
                // every pattern element in textual order, expanded to the
                // full column list of its table; this is what surfaces
                // extra columns like node1;salary in cross-graph joins
                let mut entries = Vec::new();
                for occ in 0..self.occurrences.len() {
                    let header = self.handle(occ).header.clone();
                    let cols = header
                        .iter()
                        .map(|c| self.column_sql(occ, c))
                        .collect::<Vec<_>>()
                        .join(", ");
                    entries.push((cols, header, false));
                }
                Ok(entries)
            }
            ReturnList::Items(items) => {
                for item in items {
                    if let Some(alias) = &item.alias {
                        self.aliases.insert(alias.clone());
                    }
                }
                let mut entries = Vec::new();
                for item in items {
                    let aggregate = item.expr.has_aggregate(&is_aggregate_function);
                    // a bare variable expands to its canonical column set
                    if item.alias.is_none() {
                        if let Expr::Variable(name) = &item.expr {
                            if let Some(expansion) = self.expand_bare_variable(name)? {
                                entries.push((expansion.0, expansion.1, false));
                                continue;
                            }
                        }
                    }
                    let sql = self.lower_expr(&item.expr, false)?;
                    let header = match &item.alias {
                        Some(alias) => alias.to_string(),
                        None => match &item.expr {
                            Expr::Property { prop, .. } if !is_user_function(prop) => {
                                prop.to_string()
                            }
                            Expr::Variable(name) => self
                                .bindings
                                .get(name)
                                .map(|b| b.refs[0].column.to_string())
                                .unwrap_or_else(|| name.to_string()),
                            other => other.to_string(),
                        },
                    };
                    let sql = match &item.alias {
                        Some(alias) => format!("{sql} AS {}", quote_ident(alias)),
                        None => sql,
                    };
                    entries.push((sql, vec![header], aggregate));
                }
                Ok(entries)
            }
        }
    }

    /// Canonical expansion of an unaliased bare variable in RETURN:
    /// relationship variables expand to `id, node1, label, node2` in
    /// fixed order; node variables stay single columns (handled by the
    /// caller). Returns `None` when the variable is not a relationship.
    fn expand_bare_variable(&mut self, name: &SmolStr) -> Result<Option<(String, Vec<String>)>> {
        let Some(binding) = self.bindings.get(name) else {
            return Err(KypherError::semantic(format!(
                "variable not bound in match clause: {name}"
            )));
        };
        let Some(occ) = binding.edge_occ else {
            return Ok(None);
        };
        let table_header = self.handle(occ).header.clone();
        let columns: Vec<String> = CANONICAL_COLUMNS
            .iter()
            .filter(|c| table_header.iter().any(|h| h == *c))
            .map(|c| c.to_string())
            .collect();
        let sql = columns
            .iter()
            .map(|c| self.column_sql(occ, c))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(Some((sql, columns)))
    }

    /// Suffix duplicate header fields with `.1`, `.2`, … in output order.
    fn dedup_header(fields: Vec<String>) -> Vec<String> {
        let mut seen: FxHashMap<String, usize> = FxHashMap::default();
        fields
            .into_iter()
            .map(|field| {
                let count = seen.entry(field.clone()).or_insert(0);
                *count += 1;
                if *count == 1 {
                    field
                } else {
                    format!("{field}.{}", *count - 1)
                }
            })
            .collect()
    }

    // =========================================================================
    // Assembly
    // =========================================================================

    fn run(mut self) -> Result<TranslatedQuery> {
        let entries = self.build_select()?;

        let select_list = entries
            .iter()
            .map(|(sql, _, _)| sql.clone())
            .collect::<Vec<_>>()
            .join(", ");
        let header =
            Self::dedup_header(entries.iter().flat_map(|(_, h, _)| h.clone()).collect());

        // aggregates group implicitly over every non-aggregate RETURN
        // entry, by select-list position; an expanded bare variable
        // occupies one position per expanded column
        let has_aggregate = entries.iter().any(|(_, _, agg)| *agg);
        let group_by = if has_aggregate {
            let mut ordinals = Vec::new();
            let mut position = 1;
            for (_, headers, aggregate) in &entries {
                if !aggregate {
                    ordinals.extend((position..position + headers.len()).map(|p| p.to_string()));
                }
                position += headers.len();
            }
            if ordinals.is_empty() {
                String::new()
            } else {
                format!(" GROUP BY {}", ordinals.join(", "))
            }
        } else {
            String::new()
        };

        let query = self.query;
        let mut where_clauses = std::mem::take(&mut self.constraints);
        if let Some(where_expr) = &query.where_clause {
            where_clauses.push(self.lower_expr(where_expr, false)?);
        }
        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", where_clauses.join(" AND "))
        };

        let from_sql = self
            .occurrences
            .iter()
            .map(|o| {
                format!(
                    "{} AS {}",
                    quote_ident(&self.graphs[o.graph].table),
                    o.alias
                )
            })
            .collect::<Vec<_>>()
            .join(", ");

        let order_sql = self.build_order_by()?;

        let limit_sql = match (&query.limit, &query.skip) {
            (None, None) => String::new(),
            (Some(limit), None) => format!(" LIMIT {}", self.lower_expr(limit, false)?),
            (Some(limit), Some(skip)) => format!(
                " LIMIT {} OFFSET {}",
                self.lower_expr(limit, false)?,
                self.lower_expr(skip, false)?
            ),
            (None, Some(skip)) => format!(" LIMIT -1 OFFSET {}", self.lower_expr(skip, false)?),
        };

        let distinct = if self.query.distinct { "DISTINCT " } else { "" };
        let sql = format!(
            "SELECT {distinct}{select_list} FROM {from_sql}{where_sql}{group_by}{order_sql}{limit_sql}"
        );

        let index_requests = self.apply_index_mode();

        Ok(TranslatedQuery {
            sql,
            params: self.params,
            header,
            index_requests,
        })
    }

    fn build_order_by(&mut self) -> Result<String> {
        let query = self.query;
        if query.order_by.is_empty() {
            return Ok(String::new());
        }
        let mut parts = Vec::new();
        for item in &query.order_by {
            let sql = self.lower_expr(&item.expr, true)?;
            let direction = if item.ascending { "ASC" } else { "DESC" };
            parts.push(format!("{sql} {direction}"));
        }
        Ok(format!(" ORDER BY {}", parts.join(", ")))
    }

    /// Apply the index-mode policy to the collected requests.
    fn apply_index_mode(&self) -> Vec<(String, String)> {
        match self.index_mode {
            IndexMode::None => Vec::new(),
            IndexMode::Auto | IndexMode::Expert => self.index_requests.iter().cloned().collect(),
            _ => {
                let columns = self
                    .index_mode
                    .canonical_columns()
                    .unwrap_or_else(|| unreachable!());
                let mut requests = IndexSet::new();
                for occ in 0..self.occurrences.len() {
                    let handle = self.handle(occ);
                    for column in columns {
                        if handle.header.iter().any(|h| h == column) {
                            requests.insert((handle.table.clone(), column.to_string()));
                        }
                    }
                }
                requests.into_iter().collect()
            }
        }
    }
}

/// SQL string literal with single-quote doubling.
fn sql_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
