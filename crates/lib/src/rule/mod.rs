//! Rules: resolution, loading and contract validation.
//!
//! A rule is a Lua script `<id>.lua` returning:
//!
//! ```lua
//! return {
//!   rule = {
//!     id = "compile",
//!     name = "Compile",
//!     description = "Runs the TeX engine",
//!     arguments = { "engine" },
//!     authors = { "Jane Doe" },
//!     requires = 1.0,
//!   },
//!   commands = {
//!     {
//!       name = "engine run",
//!       command = function() return command(obtain("engine", "pdflatex"), obtain("file")) end,
//!       exit = function(code) return code == 0 end,
//!     },
//!   },
//! }
//! ```

mod load;
mod resolve;
mod types;
mod validate;

pub use load::{load_rule, rule_env};
pub use resolve::RuleResolver;
pub use types::{CommandsError, HeaderError, Rule, RuleCommand, RuleError, RuleHeader, RuleLocation};
pub use validate::{check_identifier, check_version, validate_arguments, validate_commands, validate_header};

pub(crate) use types::display_lines;
