mod check;
mod run;

pub use check::cmd_check;
pub use run::{RunArgs, cmd_run};
