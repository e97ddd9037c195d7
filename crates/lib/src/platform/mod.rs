//! Host platform detection.

pub mod os;

pub use os::{OsFamily, UnknownOs};
