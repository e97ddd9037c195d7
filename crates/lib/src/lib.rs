//! kestrel-lib: Core types and logic for kestrel
//!
//! kestrel runs the build directives found in a document. This crate
//! provides:
//! - `Directive`/`Plan`: rule invocations in document order
//! - `Rule`: Lua rule scripts, resolved by identifier and validated on load
//! - `Evaluator`: bounded `if`/`unless`/`while`/`until` guards
//! - `Interpreter`: the pipeline that runs rule commands and their outcomes
//! - `ChangeCache`: persistent content checksums for "has this file changed"

pub mod cache;
pub mod conditional;
pub mod config;
pub mod consts;
pub mod directive;
pub mod interpreter;
pub mod lua;
pub mod platform;
pub mod process;
pub mod rule;
pub mod types;
pub mod util;
