//! CLI command implementations.

pub mod check;
pub mod demo;
pub mod run;
pub mod tree;

pub use check::check_file;
pub use run::run_file;
pub use tree::print_tree;
