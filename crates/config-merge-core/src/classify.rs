//! Input file classification by extension
//!
//! Every input path is one of:
//! - an env-source file (`.env`, `.sh`) sourced into the environment
//! - a patch file (`.patch.<fmt>`) applied as a JSON Patch document
//! - a merge file (`.<fmt>`) deep-merged into the accumulator
//!
//! Matching is case-insensitive and the most specific suffix wins, so
//! `app.patch.yaml` is a patch file while `app.yaml` is a merge file.

use crate::{ConfigMergeError, Result};
use std::fmt;
use std::path::Path;

/// Text formats understood by the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    Json5,
    Yaml,
    Toml,
}

impl Format {
    pub fn name(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Json5 => "json5",
            Format::Yaml => "yaml",
            Format::Toml => "toml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the pipeline does with an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    EnvSource,
    Merge(Format),
    Patch(Format),
}

const ENV_SUFFIXES: &[&str] = &[".env", ".sh"];

/// Format suffixes. `.js` is accepted as plain JSON.
const FORMAT_SUFFIXES: &[(&str, Format)] = &[
    (".json", Format::Json),
    (".js", Format::Json),
    (".json5", Format::Json5),
    (".yaml", Format::Yaml),
    (".yml", Format::Yaml),
    (".toml", Format::Toml),
];

const PATCH_MARKER: &str = ".patch";

/// Classify a path by its file name suffix
pub fn classify(path: &Path) -> Result<FileKind> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .ok_or_else(|| ConfigMergeError::UnrecognizedExtension {
            path: path.to_path_buf(),
        })?;

    if ENV_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
        return Ok(FileKind::EnvSource);
    }

    for (suffix, format) in FORMAT_SUFFIXES {
        if let Some(stem) = name.strip_suffix(suffix) {
            if stem.ends_with(PATCH_MARKER) {
                return Ok(FileKind::Patch(*format));
            }
            return Ok(FileKind::Merge(*format));
        }
    }

    Err(ConfigMergeError::UnrecognizedExtension {
        path: path.to_path_buf(),
    })
}
