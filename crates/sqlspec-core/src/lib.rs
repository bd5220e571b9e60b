//! SQLSpec Core - The SQL statement-processing engine
//!
//! This crate provides the compile-once, execute-many pipeline the rest
//! of SQLSpec is built on. It defines:
//!
//! - `Sql` - The immutable statement handle with copy-on-modify semantics
//! - `SqlProcessor` - Parse-once compilation with parameter normalization
//! - `ParameterStyle` / the parameter subsystem - style detection,
//!   cross-style conversion, list expansion, and type coercion
//! - `StatementConfig` - the hashable configuration bundle used in cache
//!   keys
//! - `CacheRegistry` - namespaced LRU caches with single-flight semantics
//! - `StatementFilter` - composable statement modifiers
//! - Common types like `Value`, `TypedParameter`, `Row`, `SqlResult`

pub mod ast;
mod cache;
mod config;
mod error;
pub mod events;
mod filters;
pub mod fingerprint;
pub mod params;
mod pipeline;
mod processor;
mod result;
mod script;
mod statement;
mod style;
mod value;

pub use cache::*;
pub use config::*;
pub use error::*;
pub use filters::*;
pub use pipeline::{
    Optimize, ParameterizeLiterals, PipelineStep, TransformContext, Validate, default_steps,
    run_steps,
};
pub use processor::*;
pub use result::*;
pub use script::*;
pub use statement::*;
pub use style::*;
pub use value::*;
