//! config-merge core
//!
//! Builds a single configuration value by applying input files in order.
//! Each file is classified by extension and then either sourced into the
//! environment, deep-merged into the accumulator, or applied to it as an
//! RFC 6902 JSON Patch. JSON, JSON5, YAML and TOML are supported.

pub mod classify;
pub mod codec;
pub mod discovery;
pub mod env;
pub mod error;
pub mod merge;
pub mod patch;
pub mod pipeline;
pub mod result;
pub mod subst;

pub use classify::{FileKind, Format, classify};
pub use codec::{SerializeOptions, parse, serialize};
pub use discovery::expand_patterns;
pub use env::{EnvSourcer, Environment, RESERVED_VARIABLES, ShellEnvSourcer};
pub use error::{ConfigMergeError, ErrorKind, PatchError};
pub use merge::{ArrayMergePolicy, deep_merge};
pub use patch::{PatchOperation, apply_patch, apply_patch_document};
pub use pipeline::{Pipeline, PipelineOptions};
pub use result::Result;
pub use subst::substitute;

/// The value every input format parses into
pub type ConfigValue = serde_json::Value;

/// Initialize tracing/logging on stderr.
///
/// `RUST_LOG` takes precedence over `default_directive`. Source file and
/// line are attached to events only when `source_locations` is set.
pub fn init_tracing(default_directive: &str, ansi: bool, source_locations: bool) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(ansi)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(source_locations)
                .with_line_number(source_locations),
        )
        .init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
