//! Environment state used for variable substitution
//!
//! The environment is an owned map threaded through the pipeline rather
//! than the ambient process environment. It is seeded from the host and
//! mutated only by sourcing `.env`/`.sh` files.

use crate::{ConfigMergeError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// Shell-internal variables that are never imported from a sourced file
pub const RESERVED_VARIABLES: &[&str] = &["_", "SHLVL"];

/// Name/value pairs visible to substitution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// An empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the host process environment
    pub fn from_host() -> Self {
        let vars = std::env::vars_os()
            .map(|(k, v)| {
                (
                    k.to_string_lossy().into_owned(),
                    v.to_string_lossy().into_owned(),
                )
            })
            .collect();
        Self { vars }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Import `NAME=VALUE` lines, splitting on the first `=` only.
    ///
    /// Lines without `=`, with an empty name, or naming a reserved
    /// variable are skipped. Returns the number of variables set.
    pub fn apply_exports(&mut self, exported: &str) -> usize {
        let mut count = 0;
        for line in exported.lines() {
            let Some((name, value)) = line.split_once('=') else {
                continue;
            };
            if name.is_empty() || RESERVED_VARIABLES.contains(&name) {
                continue;
            }
            self.set(name, value);
            count += 1;
        }
        count
    }

    /// Source `path` with `sourcer` and import what it exports
    pub fn apply_source(&mut self, path: &Path, sourcer: &dyn EnvSourcer) -> Result<()> {
        let exported = sourcer.source(path, self)?;
        let count = self.apply_exports(&exported);
        debug!("Imported {} variables from {}", count, path.display());
        Ok(())
    }
}

/// Runs an env file and reports the variables it exports
pub trait EnvSourcer {
    /// Source `path` with `env` as the starting environment and return the
    /// resulting `NAME=VALUE` lines
    fn source(&self, path: &Path, env: &Environment) -> Result<String>;
}

/// Sources files through a POSIX shell with `set -a` so every assignment
/// is exported, then dumps the environment with `env`
#[derive(Debug, Clone)]
pub struct ShellEnvSourcer {
    shell: PathBuf,
}

const SOURCE_SCRIPT: &str = r#"set -a; . "$1" >&2; env"#;

impl ShellEnvSourcer {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellEnvSourcer {
    fn default() -> Self {
        Self::new("/bin/sh")
    }
}

impl EnvSourcer for ShellEnvSourcer {
    fn source(&self, path: &Path, env: &Environment) -> Result<String> {
        let failed = |message: String| ConfigMergeError::EnvSourceFailed {
            path: path.to_path_buf(),
            message,
        };

        // `.` searches PATH for names without a slash
        let absolute = std::path::absolute(path).map_err(|e| failed(e.to_string()))?;

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(SOURCE_SCRIPT)
            .arg("config-merge")
            .arg(&absolute)
            .env_clear()
            .envs(env.iter())
            .stdin(Stdio::null())
            .output()
            .map_err(|e| failed(format!("could not run {}: {e}", self.shell.display())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failed(format!(
                "{} exited with {}: {}",
                self.shell.display(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    struct FixedSourcer(&'static str);

    impl EnvSourcer for FixedSourcer {
        fn source(&self, _path: &Path, _env: &Environment) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_apply_exports_splits_on_first_equals() {
        let mut env = Environment::new();
        let count = env.apply_exports("URL=postgres://h/db?a=b\nEMPTY=\nnoequals\n=nameless\n");
        assert_eq!(count, 2);
        assert_eq!(env.get("URL"), Some("postgres://h/db?a=b"));
        assert_eq!(env.get("EMPTY"), Some(""));
        assert_eq!(env.iter().count(), 2);
    }

    #[test]
    fn test_reserved_variables_are_not_imported() {
        let mut env = Environment::new();
        env.apply_exports("_=/usr/bin/env\nSHLVL=3\nKEEP=1\n");
        assert_eq!(env.get("_"), None);
        assert_eq!(env.get("SHLVL"), None);
        assert_eq!(env.get("KEEP"), Some("1"));
    }

    #[test]
    fn test_later_sources_overwrite() {
        let mut env = Environment::new();
        env.set("X", "host");
        env.apply_source(Path::new("one.env"), &FixedSourcer("X=1\n"))
            .unwrap();
        assert_eq!(env.get("X"), Some("1"));
        env.apply_source(Path::new("two.env"), &FixedSourcer("X=2\n"))
            .unwrap();
        assert_eq!(env.get("X"), Some("2"));
    }

    #[test]
    fn test_from_host_sees_process_variables() {
        let env = Environment::from_host();
        if let Ok(path) = std::env::var("PATH") {
            assert_eq!(env.get("PATH"), Some(path.as_str()));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_sourcer_exports_assignments() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let file = temp_dir.path().join("vars.env");
        std::fs::write(&file, "GREETING=hello\nTARGET=\"$BASE/world\"\necho noise\n").unwrap();

        let mut env = Environment::new();
        env.set("BASE", "/srv");
        env.apply_source(&file, &ShellEnvSourcer::default()).unwrap();

        assert_eq!(env.get("GREETING"), Some("hello"));
        assert_eq!(env.get("TARGET"), Some("/srv/world"));
        assert_eq!(env.get("BASE"), Some("/srv"));
        assert_eq!(env.get("SHLVL"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_sourcer_failure_is_reported() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let file = temp_dir.path().join("broken.sh");
        std::fs::write(&file, "exit 3\n").unwrap();

        let mut env = Environment::new();
        let err = env
            .apply_source(&file, &ShellEnvSourcer::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EnvSource);
    }

    #[test]
    fn test_missing_shell_is_reported() {
        let sourcer = ShellEnvSourcer::new("/nonexistent/shell");
        let err = sourcer
            .source(Path::new("x.env"), &Environment::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EnvSource);
    }
}
