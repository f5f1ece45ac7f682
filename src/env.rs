use crate::resolver::EnvVar;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULTS_FILE: &str = ".env.defaults";
pub const OUTPUT_FILE: &str = ".env";

/// Load .env.defaults into the process env; variables already set win.
/// Also performs a few passes of ${VAR} and ${VAR:-default} expansion.
pub fn load_defaults(root: &Path) -> Result<bool> {
    let path = root.join(DEFAULTS_FILE);
    if !path.exists() {
        return Ok(false);
    }
    dotenvy::from_path(&path).with_context(|| format!("failed to load {}", path.display()))?;

    // Multi-pass expansion so defaults may reference each other.
    for _pass in 0..5 {
        let keys: Vec<String> = std::env::vars().map(|(k, _)| k).collect();
        let mut changes = 0;

        for key in keys {
            if let Ok(val) = std::env::var(&key) {
                if !val.contains("${") {
                    continue;
                }
                let new_val = expand_value(&key, &val);
                if new_val != val {
                    std::env::set_var(&key, new_val);
                    changes += 1;
                }
            }
        }
        if changes == 0 {
            break;
        }
    }

    Ok(true)
}

fn expand_value(current_key: &str, input: &str) -> String {
    // Regex-free small parser: replace occurrences of ${NAME} or ${NAME:-default}
    let mut out = String::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '$' && i + 1 < chars.len() && chars[i + 1] == '{' {
            // find closing }
            let mut j = i + 2;
            while j < chars.len() && chars[j] != '}' {
                j += 1;
            }
            if j >= chars.len() {
                out.push(chars[i]);
                i += 1;
                continue;
            }
            let inner: String = chars[i + 2..j].iter().collect();
            let (name, def) = if let Some(pos) = inner.find(":-") {
                (inner[..pos].to_string(), Some(inner[pos + 2..].to_string()))
            } else {
                (inner, None)
            };

            let mut resolved: Option<String> = None;
            if name != current_key {
                if let Ok(v) = std::env::var(&name) {
                    if !v.is_empty() {
                        resolved = Some(v);
                    }
                }
            }

            if let Some(v) = resolved {
                out.push_str(&v);
            } else if let Some(d) = def {
                out.push_str(&d);
            }

            i = j + 1;
            continue;
        }

        out.push(chars[i]);
        i += 1;
    }
    out
}

/// One NAME=value line per resolved variable, insertion order preserved.
/// Values come from the process env by raw name; unset means empty.
pub fn render(variables: &[EnvVar]) -> String {
    let mut out = String::new();
    for var in variables {
        let value = std::env::var(var.raw).unwrap_or_default();
        out.push_str(var.name);
        out.push('=');
        out.push_str(&value);
        out.push('\n');
    }
    out
}

pub fn write_env_file(root: &Path, variables: &[EnvVar]) -> Result<PathBuf> {
    let path = root.join(OUTPUT_FILE);
    fs::write(&path, render(variables))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[EnvVar] = &[
        EnvVar { raw: "BE_CS_SERVER_HOSTNAME", name: "SERVER_HOSTNAME" },
        EnvVar { raw: "BE_CS_SERVER_PORT", name: "SERVER_PORT" },
        EnvVar { raw: "BE_CS_SERVER_TOKEN_KEY", name: "SERVER_TOKEN_KEY" },
    ];

    #[test]
    #[serial]
    fn render_pairs_stripped_names_with_raw_values() {
        std::env::set_var("BE_CS_SERVER_HOSTNAME", "api.local");
        std::env::set_var("BE_CS_SERVER_PORT", "8080");
        std::env::remove_var("BE_CS_SERVER_TOKEN_KEY");

        assert_eq!(
            render(VARS),
            "SERVER_HOSTNAME=api.local\nSERVER_PORT=8080\nSERVER_TOKEN_KEY=\n"
        );

        std::env::remove_var("BE_CS_SERVER_HOSTNAME");
        std::env::remove_var("BE_CS_SERVER_PORT");
    }

    #[test]
    #[serial]
    fn defaults_load_and_expand_references() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULTS_FILE),
            "DB_CS_MONGODB_INITDB_PORT=27017\n",
        )
        .unwrap();
        std::env::remove_var("DB_CS_MONGODB_INITDB_PORT");
        std::env::remove_var("APP_DB");
        // References in variables that were set outside the defaults file are
        // expanded too, including the ${VAR:-default} form.
        std::env::set_var(
            "DB_CS_MONGODB_CONNECTION_STRING",
            "mongodb://db:${DB_CS_MONGODB_INITDB_PORT}/${APP_DB:-app}",
        );

        assert!(load_defaults(dir.path()).unwrap());
        assert_eq!(
            std::env::var("DB_CS_MONGODB_CONNECTION_STRING").unwrap(),
            "mongodb://db:27017/app"
        );

        std::env::remove_var("DB_CS_MONGODB_INITDB_PORT");
        std::env::remove_var("DB_CS_MONGODB_CONNECTION_STRING");
    }

    #[test]
    #[serial]
    fn missing_defaults_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!load_defaults(dir.path()).unwrap());
    }

    #[test]
    #[serial]
    fn env_file_lands_at_the_stack_root() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("BE_CS_SERVER_HOSTNAME", "api.local");
        std::env::set_var("BE_CS_SERVER_PORT", "8080");
        std::env::set_var("BE_CS_SERVER_TOKEN_KEY", "secret");

        let path = write_env_file(dir.path(), VARS).unwrap();
        assert_eq!(path, dir.path().join(OUTPUT_FILE));
        let written = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            written,
            "SERVER_HOSTNAME=api.local\nSERVER_PORT=8080\nSERVER_TOKEN_KEY=secret\n"
        );

        for var in VARS {
            std::env::remove_var(var.raw);
        }
    }
}
