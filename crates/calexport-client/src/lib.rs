//! calexport command-line client.
//!
//! Parses the command line, runs the export and writes the CSV file. The
//! `calexport` binary is a thin wrapper around [`commands::export::run`].

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::Args;
pub use config::ExportConfig;
pub use error::{ExportError, ExportResult};
