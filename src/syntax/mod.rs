//! Syntax layer: typed AST for Kypher queries and parse errors.
//!
//! The parser builds these types directly; there is no intermediate
//! concrete syntax tree. Node and relationship patterns live in per-query
//! arenas ([`Query::nodes`], [`Query::rels`]) and reference each other
//! through integer handles, so pattern graphs stay cycle-free and cheap
//! to clone.

pub mod ast;
mod error;

pub use ast::{
    BinaryOp, Direction, MatchClause, NodeHandle, NodePattern, OrderItem, PathChain, PathStep,
    Query, RelHandle, RelPattern, ReturnItem, ReturnList, UnaryOp,
};
pub use ast::Expr;
pub use error::ParseError;
