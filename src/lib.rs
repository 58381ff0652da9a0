//! # kypher-base
//!
//! Core library for Kypher graph-pattern queries over KGTK files: query
//! parsing, SQL translation, and a persistent SQLite-backed graph cache.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! query      → Query driver (orchestration, result streaming)
//!   ↓
//! translate  → Pattern-to-SQL lowering, join planning, result headers
//!   ↓
//! store      → SQLite graph cache: import, metadata catalog, indexes
//!   ↓
//! literal    → KGTK literal predicates/accessors, scalar UDF registry
//!   ↓
//! parser     → Logos lexer, recursive-descent Kypher parser
//!   ↓
//! syntax     → AST types, ParseError
//!   ↓
//! tabio      → Compressed tabular I/O (gzip/bzip2/xz, TSV escaping)
//!   ↓
//! base       → Primitives (Span, identifier quoting)
//! ```

// ============================================================================
// MODULES (dependency order: base → tabio → syntax → parser → literal →
//          store → translate → query)
// ============================================================================

/// Foundation types: Span, SQL identifier quoting
pub mod base;

/// Compressed tabular I/O: extension-dispatched readers/writers, TSV escaping
pub mod tabio;

/// Syntax: AST types, ParseError
pub mod syntax;

/// Parser: Logos lexer, recursive-descent Kypher parser
pub mod parser;

/// Literal layer: KGTK literal predicates/accessors, UDF registry
pub mod literal;

/// Graph cache: SQLite store, graph import, index management
pub mod store;

/// Translator: Kypher AST to a single SQL SELECT
pub mod translate;

/// Query driver: parse → translate → import → execute → stream
pub mod query;

mod error;

// Re-export commonly needed items
pub use base::Span;
pub use error::{KypherError, Result};
pub use query::{KypherQuery, QuerySpec};
pub use store::SqliteStore;
