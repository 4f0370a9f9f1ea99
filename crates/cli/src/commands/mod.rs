//! CLI subcommands

pub mod predict;
pub mod status;
pub mod students;
