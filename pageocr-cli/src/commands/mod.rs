//! Subcommand implementations.

pub mod check;
pub mod delete;
pub mod get;
pub mod put;
