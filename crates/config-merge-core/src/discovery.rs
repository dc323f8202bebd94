//! Expansion of command-line file arguments
//!
//! Arguments containing glob metacharacters or `{a,b}` alternatives are
//! expanded with the `glob` crate after brace expansion; the matches of one
//! argument are sorted and deduplicated. Other arguments are passed through
//! untouched so a missing file is reported by name later.

use crate::{ConfigMergeError, Result};
use glob::glob;
use std::path::PathBuf;
use tracing::{debug, warn};

const GLOB_METACHARACTERS: &[char] = &['*', '?', '['];

/// Whether `arg` should be treated as a glob pattern
pub fn has_magic(arg: &str) -> bool {
    arg.contains(GLOB_METACHARACTERS) || brace_group(arg).is_some()
}

/// Expand the first `{x,y}` group of `pattern`, recursively.
///
/// Braces without a top-level comma are kept literally.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some((open, close)) = brace_group(pattern) else {
        return vec![pattern.to_string()];
    };
    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];

    split_alternatives(&pattern[open + 1..close])
        .into_iter()
        .flat_map(|alternative| expand_braces(&format!("{prefix}{alternative}{suffix}")))
        .collect()
}

/// Byte offsets of the first balanced brace group holding a top-level comma
fn brace_group(pattern: &str) -> Option<(usize, usize)> {
    for (open, _) in pattern.match_indices('{') {
        let mut depth = 0usize;
        let mut has_comma = false;
        for (offset, c) in pattern[open..].char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        if has_comma {
                            return Some((open, open + offset));
                        }
                        break;
                    }
                }
                ',' if depth == 1 => has_comma = true,
                _ => {}
            }
        }
    }
    None
}

fn split_alternatives(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

/// Expand arguments into an ordered file list, keeping argument order
pub fn expand_patterns<S: AsRef<str>>(args: &[S]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for arg in args {
        let arg = arg.as_ref();
        if !has_magic(arg) {
            files.push(PathBuf::from(arg));
            continue;
        }

        let mut matched = Vec::new();
        for pattern in expand_braces(arg) {
            let entries = glob(&pattern).map_err(|e| {
                ConfigMergeError::config_error(format!("Invalid glob pattern '{arg}': {e}"))
            })?;

            for entry in entries {
                match entry {
                    Ok(path) => {
                        if path.is_file() {
                            matched.push(path);
                        }
                    }
                    Err(e) => warn!("Glob entry error: {}", e),
                }
            }
        }
        matched.sort();
        matched.dedup();
        debug!("Pattern '{}' matched {} files", arg, matched.len());
        files.extend(matched);
    }

    Ok(files)
}
