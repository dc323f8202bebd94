//! Environment variable substitution in raw file text
//!
//! `$NAME` and `${NAME}` are replaced by the variable's value, or by the
//! empty string when it is unset. A `$` not followed by a name is kept as
//! is. An unterminated `${` or a braced reference that is not a valid name
//! is an error.

use crate::env::Environment;
use crate::{ConfigMergeError, Result};
use regex::Regex;
use std::sync::LazyLock;

static REFERENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([^}]*)(\})?|([A-Za-z_][A-Za-z0-9_]*))").unwrap()
});

static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Replace variable references in `text` using `env`
pub fn substitute(text: &str, env: &Environment) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in REFERENCE_REGEX.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };

        let name = match (caps.get(1), caps.get(2), caps.get(3)) {
            (Some(_), None, _) => {
                return Err(ConfigMergeError::substitution_error(format!(
                    "unterminated '${{' on line {}",
                    line_of(text, whole.start())
                )));
            }
            (Some(braced), Some(_), _) if !NAME_REGEX.is_match(braced.as_str()) => {
                return Err(ConfigMergeError::substitution_error(format!(
                    "bad substitution '{}' on line {}",
                    whole.as_str(),
                    line_of(text, whole.start())
                )));
            }
            (Some(braced), Some(_), _) => braced.as_str(),
            (None, _, Some(bare)) => bare.as_str(),
            (None, _, None) => continue,
        };

        out.push_str(&text[last..whole.start()]);
        out.push_str(env.get(name).unwrap_or_default());
        last = whole.end();
    }

    out.push_str(&text[last..]);
    Ok(out)
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}
