use crate::resolver::Resolution;
use anyhow::{anyhow, Context, Result};
use chrono::Local;
use crossterm::style::Stylize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const STATUS_FILE: &str = "status.json";

/// Last-known state per service, kept between invocations for `status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusFile {
    #[serde(default)]
    pub services: BTreeMap<String, ServiceStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub environment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default)]
    pub linked: bool,
    pub root: PathBuf,
    pub updated_at: String,
}

fn status_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("DEVSTACK_STATUS_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
        .map(|d| d.join("devstack"))
        .ok_or_else(|| anyhow!("no user config directory"))
}

pub fn load() -> Result<StatusFile> {
    let path = status_dir()?.join(STATUS_FILE);
    if !path.exists() {
        return Ok(StatusFile::default());
    }
    let text =
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid {}", path.display()))
}

fn save(status: &StatusFile) -> Result<()> {
    let dir = status_dir()?;
    fs::create_dir_all(&dir)?;
    let path = dir.join(STATUS_FILE);
    fs::write(&path, serde_json::to_string_pretty(status)?)
        .with_context(|| format!("failed to write {}", path.display()))
}

fn fresh_entry(root: &Path, environment: String) -> ServiceStatus {
    ServiceStatus {
        environment,
        database: None,
        linked: false,
        root: root.to_path_buf(),
        updated_at: Local::now().to_rfc3339(),
    }
}

/// Record the labels of a fresh resolution; the linked flag is left alone.
pub fn record_environment(service: &str, root: &Path, resolution: &Resolution) -> Result<()> {
    let mut status = load()?;
    let entry = status
        .services
        .entry(service.to_string())
        .or_insert_with(|| fresh_entry(root, resolution.environment.clone()));
    entry.environment = resolution.environment.clone();
    entry.database = resolution.database.map(|m| m.as_str().to_string());
    entry.root = root.to_path_buf();
    entry.updated_at = Local::now().to_rfc3339();
    save(&status)
}

/// Flip the linked flag, seeding the entry from the given resolution when the
/// service has never been recorded.
pub fn set_linked(service: &str, root: &Path, resolution: &Resolution, linked: bool) -> Result<()> {
    let mut status = load()?;
    let entry = status
        .services
        .entry(service.to_string())
        .or_insert_with(|| fresh_entry(root, resolution.environment.clone()));
    entry.linked = linked;
    entry.root = root.to_path_buf();
    entry.updated_at = Local::now().to_rfc3339();
    save(&status)
}

pub fn print(status: &StatusFile) {
    if status.services.is_empty() {
        println!(
            "{}",
            "no services recorded yet; run `devstack link` in a project".dim()
        );
        return;
    }

    println!("{}", "devstack".bold());
    for (name, s) in &status.services {
        let link_mark = if s.linked {
            "linked".green()
        } else {
            "unlinked".dark_grey()
        };
        let database = s
            .database
            .as_deref()
            .map(|d| format!(" db:{d}"))
            .unwrap_or_default();
        println!(
            "  {} {}{}  {}  {}",
            format!("{name:<9}").bold(),
            s.environment,
            database,
            link_mark,
            s.updated_at.clone().dim()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::resolve;
    use serial_test::serial;

    #[test]
    #[serial]
    fn environment_record_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("DEVSTACK_STATUS_DIR", dir.path());

        let res = resolve("backend", Some("connected"), None).unwrap();
        record_environment("backend", dir.path(), &res).unwrap();

        let status = load().unwrap();
        let entry = &status.services["backend"];
        assert_eq!(entry.environment, "connected");
        assert_eq!(entry.database.as_deref(), Some("local"));
        assert!(!entry.linked);

        std::env::remove_var("DEVSTACK_STATUS_DIR");
    }

    #[test]
    #[serial]
    fn linking_preserves_a_recorded_environment() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("DEVSTACK_STATUS_DIR", dir.path());

        let chosen = resolve("backend", Some("connected"), Some("remote")).unwrap();
        record_environment("backend", dir.path(), &chosen).unwrap();

        let default = resolve("backend", None, None).unwrap();
        set_linked("backend", dir.path(), &default, true).unwrap();

        let status = load().unwrap();
        let entry = &status.services["backend"];
        assert!(entry.linked);
        assert_eq!(entry.environment, "connected");
        assert_eq!(entry.database.as_deref(), Some("remote"));

        std::env::remove_var("DEVSTACK_STATUS_DIR");
    }

    #[test]
    #[serial]
    fn missing_status_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("DEVSTACK_STATUS_DIR", dir.path());

        assert!(load().unwrap().services.is_empty());

        std::env::remove_var("DEVSTACK_STATUS_DIR");
    }
}
