use anyhow::{anyhow, Result};
use std::path::Path;
use tokio::process::Command;

pub fn resolve_docker_binary() -> String {
    std::env::var("DOCKER_BIN").unwrap_or_else(|_| "docker".to_string())
}

/// `docker info` is cheaper than a ping and also works for remote contexts.
pub async fn docker_available(docker_bin: &str, cwd: &Path) -> bool {
    Command::new(docker_bin)
        .current_dir(cwd)
        .args(["info"])
        .output()
        .await
        .map(|o| o.status.success())
        .unwrap_or(false)
}

async fn compose(docker_bin: &str, cwd: &Path, args: &[&str]) -> Result<()> {
    let mut full: Vec<&str> = vec!["compose"];
    full.extend_from_slice(args);

    let status = Command::new(docker_bin)
        .current_dir(cwd)
        .args(&full)
        .envs(std::env::vars())
        .status()
        .await?;
    if status.success() {
        Ok(())
    } else {
        Err(anyhow!(
            "{docker_bin} compose {} exited with {}",
            args.join(" "),
            status.code().unwrap_or(1)
        ))
    }
}

pub async fn compose_up(docker_bin: &str, cwd: &Path) -> Result<()> {
    compose(docker_bin, cwd, &["up", "-d", "--remove-orphans"]).await
}

pub async fn compose_down(docker_bin: &str, cwd: &Path) -> Result<()> {
    compose(docker_bin, cwd, &["down"]).await
}
