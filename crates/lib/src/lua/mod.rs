//! Sandboxed Lua evaluation for rule scripts and conditional expressions.
//!
//! # Submodules
//!
//! - [`runtime`] - Lua state construction, sandbox environments, chunk loading
//! - [`markers`] - Typed tables (file references, triggers, commands)
//! - [`helpers`] - Capability sets injected into each environment

pub mod helpers;
pub mod markers;
pub mod runtime;
