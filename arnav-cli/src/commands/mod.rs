//! CLI subcommands.

pub mod config;
pub mod geo;
pub mod simulate;
