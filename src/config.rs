use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub const PROJECT_FILE: &str = "devstack.json";
pub const COMPOSE_FILE: &str = "docker-compose.yml";

/// Project-local configuration: which of the stack's services this directory
/// holds. Authored by hand next to the service's sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub service: String,
}

pub fn find_stack_root(start_dir: &Path) -> PathBuf {
    // Walk up until we find docker-compose.yml (preferred). If we only find
    // devstack.json, keep it as fallback but continue searching for the
    // compose file.
    let mut dir = start_dir.to_path_buf();
    let mut fallback: Option<PathBuf> = None;

    for _ in 0..12 {
        let compose = dir.join(COMPOSE_FILE);
        let project = dir.join(PROJECT_FILE);

        if compose.exists() {
            return dir;
        }
        if project.exists() && fallback.is_none() {
            fallback = Some(dir.clone());
        }

        if let Some(parent) = dir.parent() {
            let parent = parent.to_path_buf();
            if parent == dir {
                break;
            }
            dir = parent;
        } else {
            break;
        }
    }

    fallback.unwrap_or_else(|| start_dir.to_path_buf())
}

pub fn load_project_config(root: &Path) -> Result<ProjectConfig> {
    let path = root.join(PROJECT_FILE);
    let file = File::open(&path).with_context(|| {
        format!(
            "no {PROJECT_FILE} in {}; create one with {{\"service\": \"frontend|backend|database\"}}",
            root.display()
        )
    })?;
    let reader = BufReader::new(file);
    let cfg: ProjectConfig = serde_json::from_reader(reader)
        .with_context(|| format!("invalid {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn stack_root_prefers_compose_file_over_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join(COMPOSE_FILE), "services: {}\n").unwrap();
        let nested = root.join("services/backend");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join(PROJECT_FILE), r#"{"service":"backend"}"#).unwrap();

        assert_eq!(find_stack_root(&nested), root);
    }

    #[test]
    fn stack_root_falls_back_to_project_file_then_start_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let nested = root.join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.join("a").join(PROJECT_FILE), r#"{"service":"frontend"}"#).unwrap();

        assert_eq!(find_stack_root(&nested), root.join("a"));

        let bare = tempfile::tempdir().unwrap();
        assert_eq!(find_stack_root(bare.path()), bare.path());
    }

    #[test]
    fn project_config_parses_service_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PROJECT_FILE), r#"{"service":"backend"}"#).unwrap();

        let cfg = load_project_config(dir.path()).unwrap();
        assert_eq!(cfg.service, "backend");
    }

    #[test]
    fn missing_project_config_mentions_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_project_config(dir.path()).unwrap_err();
        assert!(err.to_string().contains(PROJECT_FILE));
    }
}
