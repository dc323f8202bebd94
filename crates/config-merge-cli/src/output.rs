//! Output formats and document rendering

use clap::ValueEnum;
use config_merge_core::{Format, Result, SerializeOptions, serialize};
use serde_json::Value;
use std::io::{self, Write};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// JSON5
    Json5,
    /// TOML (the result must be a table without nulls)
    Toml,
    /// YAML, block style up to the inline depth
    Yaml,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => Format::Json,
            OutputFormat::Json5 => Format::Json5,
            OutputFormat::Toml => Format::Toml,
            OutputFormat::Yaml => Format::Yaml,
        }
    }
}

/// Render the final document
pub fn render(value: &Value, format: OutputFormat, inline_depth: usize) -> Result<String> {
    let options = SerializeOptions {
        inline_depth,
        ..SerializeOptions::default()
    };
    serialize(value, format.into(), &options)
}

/// Report a fatal error on stderr, independent of the log filter
pub fn report_error(err: &dyn std::fmt::Display) {
    eprintln!("Error: {err}");
}

/// Write the rendered document to stdout in one piece
pub fn write_document(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()
}
