//! `recyconnect config` - inspect and initialize the config file

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use recyconnect_core::AppConfig;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a config file with default values
    Init(InitArgs),
    /// Print the effective config (admin password masked)
    Show,
    /// Show config file path
    Path,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Force overwrite existing config
    #[arg(long, short)]
    pub force: bool,
}

/// `path` is the `--config` override, if any.
pub fn run_config(args: ConfigArgs, path: Option<&Path>) -> Result<()> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(AppConfig::config_path);

    match args.command {
        ConfigCommands::Init(args) => {
            write_default(&path, args.force)?;
            println!("Wrote {}", path.display());
        }
        ConfigCommands::Show => {
            let config = AppConfig::load(Some(&path))
                .with_context(|| format!("Failed to load {}", path.display()))?;
            print!("{}", config.to_redacted_toml()?);
        }
        ConfigCommands::Path => println!("{}", path.display()),
    }
    Ok(())
}

fn write_default(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {}\n\nUse --force to overwrite",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let rendered = toml::to_string_pretty(&AppConfig::default())
        .context("Failed to render default config")?;
    std::fs::write(path, rendered).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_loadable_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        write_default(&path, false).unwrap();
        let loaded = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.server.bind, AppConfig::default().server.bind);
        assert_eq!(loaded.defaults.fallback_user_id, 2);
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\n").unwrap();

        assert!(write_default(&path, false).is_err());
        write_default(&path, true).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("[database]"));
    }
}
