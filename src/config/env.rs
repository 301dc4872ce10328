use regex::{Captures, Regex};
use std::env;
use std::sync::LazyLock;

use crate::error::ConfigError;

static ENV_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Invalid regex pattern")
});

/// Expand `${VAR}` references and a leading `~/` in `value`.
///
/// An unset variable is an error naming the variable and `field`.
pub fn expand(value: &str, field: &str) -> Result<String, ConfigError> {
    let mut missing: Option<String> = None;

    let expanded = ENV_REF.replace_all(value, |caps: &Captures| {
        let name = &caps[1];
        match env::var(name) {
            Ok(v) => v,
            Err(_) => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    if let Some(var) = missing {
        return Err(ConfigError::MissingEnv {
            var,
            field: field.to_string(),
        });
    }

    Ok(expand_tilde(&expanded))
}

fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).display().to_string();
        }
    }
    path.to_string()
}
