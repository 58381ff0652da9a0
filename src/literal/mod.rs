//! KGTK literal layer.
//!
//! Predicates and accessors over KGTK's textual literal syntax
//! (strings, language-qualified strings, dates, quantities,
//! geo-coordinates, symbols), exposed in two forms:
//!
//! - plain Rust functions in [`value`] for use inside the engine, and
//! - a registry of scalar UDFs in [`functions`] that the store installs
//!   on every connection, making the same functionality available in
//!   WHERE clauses and RETURN expressions.

pub mod functions;
pub mod value;

pub use functions::{
    AGGREGATE_FUNCTIONS, Scalar, UdfImpl, UserFunction, is_aggregate_function, is_user_function,
    lookup, registry,
};
