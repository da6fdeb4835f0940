//! Subcommand implementations

pub mod config;
pub mod curriculum;
pub mod doctor;
pub mod draft;
pub mod generate;
pub mod run;
