//! CLI library components for the OMOP mapper.

pub mod cli;
pub mod commands;
pub mod logging;
