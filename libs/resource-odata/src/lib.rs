//! Restricted OData-style query language for the resource store.
//!
//! The grammar deliberately covers only what the resource API exposes:
//! binary comparisons (`eq ne lt le gt ge`), `and`/`or`/`not`,
//! `contains(path, 'literal')` plus the legacy `substringof('literal', path)`
//! spelling, property paths (including reserved `$created`, `$updated` and
//! `$author/id`), and string/number/boolean/date/null literals.
//!
//! Parsing never touches storage; translation of the AST into storage
//! predicates lives with the storage layer.

pub mod ast;
pub mod error;
pub mod parser;
pub mod query;

pub use ast::{CompareOp, FilterExpr, Literal};
pub use error::QuerySyntaxError;
pub use parser::parse_filter;
pub use query::{OrderBy, ResourceQuery, SortDir};
