//! SQLSpec Drivers - Driver dispatch templates
//!
//! This crate provides the base contract database adapters implement:
//! cursor/transaction hooks plus execution hooks, with a template method
//! that compiles through the core processor, routes by operation kind,
//! extracts results, and releases the cursor on every exit path. Sync
//! and async variants share the synchronous compilation pipeline.

mod async_dispatch;
mod dispatch;
mod registry;
mod script;

pub use async_dispatch::{AsyncDispatch, AsyncDriverAdapter};
pub use dispatch::{DriverAdapter, HookResult, SyncDispatch};
pub use registry::AdapterRegistry;
pub use script::ScriptOptions;

/// Re-export commonly used types from sqlspec-core
pub use sqlspec_core::{
    CompiledSql, OperationKind, ParameterStyle, Result, Row, Sql, SqlProcessor, SqlResult,
    SqlSpecError, StatementConfig, StatementOutcome, StatementStatus, TypedParameter, Value,
};
