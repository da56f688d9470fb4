//! CLI subcommands

pub mod export;
pub mod keys;
pub mod show;
