//! Typed AST for the Kypher dialect.
//!
//! A [`Query`] owns two arenas, one for node patterns and one for
//! relationship patterns. Match clauses reference patterns through
//! [`NodeHandle`]/[`RelHandle`] indices, which keeps the pattern graph
//! acyclic even though nodes and relationships are mutually adjacent.

use std::fmt;

use smol_str::SmolStr;

/// Index of a node pattern in [`Query::nodes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub u32);

/// Index of a relationship pattern in [`Query::rels`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelHandle(pub u32);

/// Direction of a relationship pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// `-[r]->`
    #[default]
    Forward,
    /// `<-[r]-`
    Backward,
    /// `-[r]-`
    Undirected,
}

/// A node pattern: `(var? (:label)* ({prop: value, …})?)`
#[derive(Debug, Clone, Default)]
pub struct NodePattern {
    /// Variable name; `None` for anonymous nodes
    pub variable: Option<SmolStr>,
    /// Label constraints; applied to the endpoint column the node occupies
    pub labels: Vec<SmolStr>,
    /// Property map entries in source order
    pub properties: Vec<(SmolStr, Expr)>,
}

/// A relationship pattern: `[var? (:choice (|choice)*)? ({…})?]`
#[derive(Debug, Clone, Default)]
pub struct RelPattern {
    /// Variable name; `None` for anonymous relationships
    pub variable: Option<SmolStr>,
    /// Label choices; one becomes `=`, several become `IN (…)`
    pub labels: Vec<SmolStr>,
    /// Property map entries in source order
    pub properties: Vec<(SmolStr, Expr)>,
    /// Arrow direction around the bracket
    pub direction: Direction,
}

/// One step of a path chain: a relationship and its target node
#[derive(Debug, Clone, Copy)]
pub struct PathStep {
    pub rel: RelHandle,
    pub node: NodeHandle,
}

/// An alternating node/relationship chain: `(a)-[r]->(b)-[s]-(c)…`
#[derive(Debug, Clone)]
pub struct PathChain {
    pub start: NodeHandle,
    pub steps: Vec<PathStep>,
}

impl PathChain {
    /// True if this chain is a single node pattern with no edges
    pub fn is_node_only(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A comma-separated element of MATCH: optional graph qualifier plus chains
/// sharing it.
#[derive(Debug, Clone)]
pub struct MatchClause {
    /// Graph name qualifier (`g:` before the chain); `None` binds to the
    /// first input
    pub graph: Option<SmolStr>,
    pub chain: PathChain,
}

/// Binary operators in source-level form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    Xor,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    /// SQL spelling of the operator
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Or => "OR",
            Self::Xor => "!=",
            Self::And => "AND",
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
        }
    }

    /// Source spelling, used when rendering expressions back to text
    pub fn display(&self) -> &'static str {
        match self {
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::And => "AND",
            Self::Ne => "!=",
            other => other.sql(),
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// A Kypher expression tree.
#[derive(Debug, Clone)]
pub enum Expr {
    /// `NULL`
    Null,
    /// `TRUE` / `FALSE`
    Bool(bool),
    Integer(i64),
    Float(f64),
    /// String literal; single- and double-quoted forms both land here
    String(String),
    /// `$name` parameter reference
    Parameter(SmolStr),
    /// Bare variable reference
    Variable(SmolStr),
    /// `var.prop` property access
    Property { var: SmolStr, prop: SmolStr },
    /// Bracketed list, as in `x IN [a, b, c]`
    List(Vec<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `value IN list`
    In {
        value: Box<Expr>,
        list: Box<Expr>,
    },
    /// `value =~ pattern` (full-match regex)
    Regex {
        value: Box<Expr>,
        pattern: Box<Expr>,
    },
    /// `value IS [NOT] NULL`
    IsNull {
        value: Box<Expr>,
        negated: bool,
    },
    /// Function call, scalar or aggregate
    Call {
        function: SmolStr,
        distinct: bool,
        args: Vec<Expr>,
    },
    /// `CASE [operand] WHEN … THEN … [ELSE …] END`
    Case {
        operand: Option<Box<Expr>>,
        branches: Vec<(Expr, Expr)>,
        otherwise: Option<Box<Expr>>,
    },
}

impl Expr {
    /// True if this expression contains an aggregate function call.
    pub fn has_aggregate(&self, is_aggregate: &dyn Fn(&str) -> bool) -> bool {
        match self {
            Self::Call { function, args, .. } => {
                is_aggregate(function) || args.iter().any(|a| a.has_aggregate(is_aggregate))
            }
            Self::Unary { operand, .. } => operand.has_aggregate(is_aggregate),
            Self::Binary { left, right, .. } => {
                left.has_aggregate(is_aggregate) || right.has_aggregate(is_aggregate)
            }
            Self::In { value, list } => {
                value.has_aggregate(is_aggregate) || list.has_aggregate(is_aggregate)
            }
            Self::Regex { value, pattern } => {
                value.has_aggregate(is_aggregate) || pattern.has_aggregate(is_aggregate)
            }
            Self::IsNull { value, .. } => value.has_aggregate(is_aggregate),
            Self::List(items) => items.iter().any(|a| a.has_aggregate(is_aggregate)),
            Self::Case {
                operand,
                branches,
                otherwise,
            } => {
                operand.as_deref().is_some_and(|e| e.has_aggregate(is_aggregate))
                    || branches.iter().any(|(w, t)| {
                        w.has_aggregate(is_aggregate) || t.has_aggregate(is_aggregate)
                    })
                    || otherwise
                        .as_deref()
                        .is_some_and(|e| e.has_aggregate(is_aggregate))
            }
            _ => false,
        }
    }
}

impl fmt::Display for Expr {
    /// Render the expression back to Kypher-ish source text. Used for
    /// result-header fields of unaliased computed RETURN entries.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(true) => write!(f, "TRUE"),
            Self::Bool(false) => write!(f, "FALSE"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Parameter(name) => write!(f, "${name}"),
            Self::Variable(name) => write!(f, "{name}"),
            Self::Property { var, prop } => write!(f, "{var}.{prop}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Unary { op, operand } => match op {
                UnaryOp::Not => write!(f, "NOT {operand}"),
                UnaryOp::Neg => write!(f, "-{operand}"),
            },
            Self::Binary { op, left, right } => {
                write!(f, "{left} {} {right}", op.display())
            }
            Self::In { value, list } => write!(f, "{value} IN {list}"),
            Self::Regex { value, pattern } => write!(f, "{value} =~ {pattern}"),
            Self::IsNull { value, negated } => {
                if *negated {
                    write!(f, "{value} IS NOT NULL")
                } else {
                    write!(f, "{value} IS NULL")
                }
            }
            Self::Call {
                function,
                distinct,
                args,
            } => {
                write!(f, "{function}(")?;
                if *distinct {
                    write!(f, "DISTINCT ")?;
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Self::Case {
                operand,
                branches,
                otherwise,
            } => {
                write!(f, "CASE")?;
                if let Some(op) = operand {
                    write!(f, " {op}")?;
                }
                for (when, then) in branches {
                    write!(f, " WHEN {when} THEN {then}")?;
                }
                if let Some(e) = otherwise {
                    write!(f, " ELSE {e}")?;
                }
                write!(f, " END")
            }
        }
    }
}

/// One RETURN entry: an expression with an optional alias
#[derive(Debug, Clone)]
pub struct ReturnItem {
    pub expr: Expr,
    pub alias: Option<SmolStr>,
}

/// The RETURN list: `*` or explicit entries
#[derive(Debug, Clone)]
pub enum ReturnList {
    /// `RETURN *`: all pattern elements bound in MATCH, in textual order
    Star,
    Items(Vec<ReturnItem>),
}

/// One ORDER BY entry
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub expr: Expr,
    pub ascending: bool,
}

/// A complete Kypher query.
#[derive(Debug, Clone)]
pub struct Query {
    /// Node pattern arena, in textual order
    pub nodes: Vec<NodePattern>,
    /// Relationship pattern arena, in textual order
    pub rels: Vec<RelPattern>,
    /// MATCH clauses, in textual order
    pub matches: Vec<MatchClause>,
    /// The single WHERE expression, if any
    pub where_clause: Option<Expr>,
    /// `RETURN DISTINCT`
    pub distinct: bool,
    pub ret: ReturnList,
    pub order_by: Vec<OrderItem>,
    pub skip: Option<Expr>,
    pub limit: Option<Expr>,
}

impl Query {
    pub fn node(&self, handle: NodeHandle) -> &NodePattern {
        &self.nodes[handle.0 as usize]
    }

    pub fn rel(&self, handle: RelHandle) -> &RelPattern {
        &self.rels[handle.0 as usize]
    }
}
