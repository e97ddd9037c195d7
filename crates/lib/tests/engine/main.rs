//! Engine integration tests: rules on disk, directives in, outcomes out.

mod cache_tests;
mod common;
mod interpreter_tests;
mod validation_tests;
