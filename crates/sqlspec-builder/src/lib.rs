//! SQLSpec Builder - Fluent AST-backed query construction
//!
//! Builders assemble SQL through the core facade and materialize into
//! immutable [`sqlspec_core::Sql`] statements. Values land as literals
//! and are parameterized by the compilation pipeline; `build()` is pure
//! and idempotent per builder state.

mod delete;
mod explain;
mod expr;
mod insert;
mod merge;
mod select;
mod update;

pub use delete::{DeleteBuilder, delete_from};
pub use explain::{ExplainBuilder, explain, explain_sql};
pub use expr::{ColumnRef, Cond, col};
pub use insert::{InsertBuilder, insert_into};
pub use merge::{MergeBuilder, merge_into};
pub use select::{SelectBuilder, select};
pub use update::{UpdateBuilder, update};

/// Re-export commonly used types from sqlspec-core
pub use sqlspec_core::{Sql, StatementConfig, Value};
