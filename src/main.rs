mod config;
mod docker;
mod env;
mod resolver;
mod status;

use anyhow::{bail, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::Path;

#[derive(Parser, Debug)]
#[command(
    name = "devstack",
    about = "Link a project to its docker compose stack, generate .env files and show stack status",
    version
)]
struct Cli {
    /// Bring the stack up and record the link (shortcut for `link`)
    #[arg(short = 'l', long = "link")]
    link: bool,

    /// Generate .env for the given environment (shortcut for `env`)
    #[arg(long = "env", value_name = "NAME")]
    env: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bring the compose stack up and record the link
    Link,
    /// Take the compose stack down and drop the link
    Unlink,
    /// Generate .env for an environment and optional database mode
    Env {
        /// Environment name (local, connected, remote; single/testing are local)
        environment: String,
        /// Database mode for backend projects (local or remote)
        database: Option<String>,
    },
    /// Show the recorded stack status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let start_dir = std::env::current_dir()?;
    let root = config::find_stack_root(&start_dir);

    match cli.command {
        Some(Commands::Link) => link(&root).await,
        Some(Commands::Unlink) => unlink(&root).await,
        Some(Commands::Env {
            environment,
            database,
        }) => generate_env(&root, Some(environment.as_str()), database.as_deref()),
        Some(Commands::Status) => show_status(),
        None => {
            if !cli.link && cli.env.is_none() {
                Cli::command().print_help()?;
                return Ok(());
            }
            // .env generation first so a combined --env --link sees the fresh file.
            if let Some(name) = cli.env.as_deref() {
                generate_env(&root, Some(name), None)?;
            }
            if cli.link {
                link(&root).await?;
            }
            Ok(())
        }
    }
}

async fn link(root: &Path) -> Result<()> {
    let cfg = config::load_project_config(root)?;
    let resolution = resolver::resolve(&cfg.service, None, None)?;

    let docker_bin = docker::resolve_docker_binary();
    if !docker::docker_available(&docker_bin, root).await {
        bail!("docker is not available (checked `{docker_bin} info`)");
    }
    docker::compose_up(&docker_bin, root).await?;
    status::set_linked(&cfg.service, root, &resolution, true)?;

    println!("✅ linked {} at {}", cfg.service, root.display());
    Ok(())
}

async fn unlink(root: &Path) -> Result<()> {
    let cfg = config::load_project_config(root)?;
    let resolution = resolver::resolve(&cfg.service, None, None)?;

    let docker_bin = docker::resolve_docker_binary();
    docker::compose_down(&docker_bin, root).await?;
    status::set_linked(&cfg.service, root, &resolution, false)?;

    println!("✅ unlinked {}", cfg.service);
    Ok(())
}

fn generate_env(root: &Path, environment: Option<&str>, database: Option<&str>) -> Result<()> {
    let cfg = config::load_project_config(root)?;
    let resolution = resolver::resolve(&cfg.service, environment, database)?;

    env::load_defaults(root)?;
    let path = env::write_env_file(root, &resolution.variables)?;
    status::record_environment(&cfg.service, root, &resolution)?;

    let database = resolution
        .database
        .map(|m| format!(", database {}", m.as_str()))
        .unwrap_or_default();
    println!(
        "wrote {} variables to {} ({} {}{})",
        resolution.variables.len(),
        path.display(),
        cfg.service,
        resolution.environment,
        database
    );
    Ok(())
}

fn show_status() -> Result<()> {
    let recorded = status::load()?;
    status::print(&recorded);
    Ok(())
}
