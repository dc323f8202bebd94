//! config-merge CLI
//!
//! Merges, patches and env-substitutes configuration files in order and
//! prints the resulting document.

mod output;

use clap::Parser;
use config_merge_core::{
    ArrayMergePolicy, Environment, Pipeline, PipelineOptions, Result, expand_patterns,
    init_tracing,
};
use output::OutputFormat;
use std::io::IsTerminal;
use std::process::ExitCode;
use std::str::FromStr;
use tracing::debug;

#[derive(Parser)]
#[command(name = "config-merge")]
#[command(about = "Merge, patch and env-substitute JSON/JSON5/YAML/TOML configuration files")]
#[command(version = config_merge_core::VERSION)]
#[command(arg_required_else_help = true)]
#[command(
    long_about = "Processes files in order, building one configuration document.\n\
\n\
  files ending in .env and .sh are sourced and used for environment variable substitution\n\
  files ending in .json, .js, .json5, .toml, .yaml and .yml are deep-merged\n\
  files ending in .patch.json, .patch.js, .patch.json5, .patch.toml, .patch.yaml and\n  \
.patch.yml are applied as JSON Patch (RFC 6902)\n\
\n\
Examples:\n  \
config-merge base.yaml prod.env 'overrides/*.yaml'\n  \
config-merge -f json base.json fix.patch.json\n  \
config-merge -a concat a.yaml b.yaml"
)]
struct Cli {
    /// Files to process, in order
    #[arg(
        required = true,
        value_name = "FILE",
        help = "Input files, processed in order (glob patterns allowed)"
    )]
    files: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "yaml", help = "Output format")]
    format: OutputFormat,

    /// How arrays are combined when both sides have one
    #[arg(
        short = 'a',
        long,
        default_value = "merge",
        value_parser = ArrayMergePolicy::from_str,
        help = "Array merge policy: merge (by index), overwrite, or concat"
    )]
    array_merge: ArrayMergePolicy,

    /// Depth at which YAML output switches to inline notation
    #[arg(
        short = 'n',
        long,
        default_value_t = 10,
        help = "Depth to start using inline YAML notation at (0 disables)"
    )]
    inline: usize,

    /// Disable environment variable substitution
    #[arg(long, help = "Do not substitute environment variables into files")]
    no_env_subst: bool,

    /// Verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable colored log output
    #[arg(long)]
    no_color: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "config_merge=error",
        1 => "config_merge=warn",
        2 => "config_merge=info",
        3 => "config_merge=debug",
        _ => "config_merge=trace",
    };
    let ansi = !cli.no_color
        && std::env::var_os("NO_COLOR").is_none()
        && std::io::stderr().is_terminal();
    init_tracing(log_level, ansi, cli.verbose > 0);

    let document = match run(&cli) {
        Ok(document) => document,
        Err(e) => {
            debug!("{:?}", e);
            output::report_error(&e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = output::write_document(&document) {
        output::report_error(&e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Run the whole pipeline, returning the rendered document
fn run(cli: &Cli) -> Result<String> {
    let files = expand_patterns(&cli.files)?;
    debug!("Resolved {} input files", files.len());

    let options = PipelineOptions {
        array_policy: cli.array_merge,
        substitute_env: !cli.no_env_subst,
    };
    let value = Pipeline::new(options, Environment::from_host()).run(&files)?;

    output::render(&value, cli.format, cli.inline)
}
