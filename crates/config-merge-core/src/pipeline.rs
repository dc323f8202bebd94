//! Ordered accumulation pipeline
//!
//! Files are processed strictly in the order given. Each file either
//! mutates the environment (env-source), is deep-merged into the
//! accumulator (merge), or is applied to it as a JSON Patch (patch).
//! The first failure aborts the run; earlier effects are not undone.

use crate::classify::{FileKind, Format, classify};
use crate::codec;
use crate::env::{EnvSourcer, Environment, ShellEnvSourcer};
use crate::merge::{ArrayMergePolicy, deep_merge};
use crate::patch::apply_patch_document;
use crate::result::ResultExt;
use crate::subst::substitute;
use crate::{ConfigMergeError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Key holding the operation array in a TOML patch file
const TOML_PATCH_KEY: &str = "patch";

/// Run-wide pipeline settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub array_policy: ArrayMergePolicy,
    /// Substitute environment variables into merge and patch files
    pub substitute_env: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            array_policy: ArrayMergePolicy::Deep,
            substitute_env: true,
        }
    }
}

/// Owns the accumulator and environment for one run
pub struct Pipeline {
    options: PipelineOptions,
    env: Environment,
    accumulator: Value,
    sourcer: Box<dyn EnvSourcer>,
}

impl Pipeline {
    /// New pipeline with an empty accumulator, sourcing env files via `/bin/sh`
    pub fn new(options: PipelineOptions, env: Environment) -> Self {
        Self {
            options,
            env,
            accumulator: Value::Object(Map::new()),
            sourcer: Box::new(ShellEnvSourcer::default()),
        }
    }

    /// Replace the collaborator used for env-source files
    pub fn with_sourcer(mut self, sourcer: impl EnvSourcer + 'static) -> Self {
        self.sourcer = Box::new(sourcer);
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    #[cfg(test)]
    fn accumulator(&self) -> &Value {
        &self.accumulator
    }

    /// Process every file in order and return the accumulated value
    pub fn run<P: AsRef<Path>>(mut self, files: &[P]) -> Result<Value> {
        info!("Processing {} files", files.len());
        for file in files {
            self.process_file(file.as_ref())?;
        }
        Ok(self.accumulator)
    }

    /// Process one file; errors carry the file path
    pub fn process_file(&mut self, path: &Path) -> Result<()> {
        self.process(path).in_file(path)
    }

    fn process(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(ConfigMergeError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let kind = classify(path)?;
        debug!("Processing {} as {:?}", path.display(), kind);

        match kind {
            FileKind::EnvSource => self.env.apply_source(path, self.sourcer.as_ref()),
            FileKind::Merge(format) => {
                let document = self.load(path, format)?;
                if document.is_null() {
                    debug!("{} is empty, nothing to merge", path.display());
                    return Ok(());
                }
                deep_merge(&mut self.accumulator, document, self.options.array_policy);
                Ok(())
            }
            FileKind::Patch(format) => {
                let mut document = self.load(path, format)?;
                if format == Format::Toml {
                    document = unwrap_toml_patch(document)?;
                }
                apply_patch_document(&mut self.accumulator, document)
            }
        }
    }

    /// Read, substitute and parse a merge or patch file
    fn load(&self, path: &Path, format: Format) -> Result<Value> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigMergeError::io_error(path, e))?;
        let text = if self.options.substitute_env {
            substitute(&raw, &self.env)?
        } else {
            raw
        };
        codec::parse(&text, format)
    }
}

/// TOML has no top-level arrays, so operations live under `patch`
fn unwrap_toml_patch(document: Value) -> Result<Value> {
    match document {
        Value::Object(mut table) => table.shift_remove(TOML_PATCH_KEY).ok_or_else(|| {
            ConfigMergeError::malformed_patch(
                "TOML patch file must contain a key 'patch' holding an array of patches",
            )
        }),
        _ => Err(ConfigMergeError::malformed_patch(
            "TOML patch file must be a table",
        )),
    }
}
