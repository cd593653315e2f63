//! Command implementations for devenv-cli

pub mod environment;
pub mod solution;

pub use environment::{UpdateRequest, run_status, run_update};
pub use solution::{run_add_project, run_list, run_remove_project};
