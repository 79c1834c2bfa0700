//! `recyconnect serve` - run the REST API
//!
//! Connects to Postgres, creates missing tables, seeds the administrator
//! account, then serves until Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use recyconnect_core::domain::hash_password;
use recyconnect_core::AppConfig;
use recyconnect_server::db::{create_pool_with_options, schema, UserRepo};
use recyconnect_server::{run_server, AppState, ServerConfig};

/// Arguments for the serve command
#[derive(Parser, Debug, Default)]
pub struct ServeArgs {
    /// Address to bind to (overrides config, default 127.0.0.1:8080)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow any CORS origin instead of localhost only
    #[arg(long)]
    pub cors_permissive: bool,

    /// Database URL (overrides config)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Directory uploaded item images are written to
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,
}

impl ServeArgs {
    /// Fold command-line overrides into the loaded config.
    fn apply(self, config: &mut AppConfig) {
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if self.cors_permissive {
            config.server.cors_permissive = true;
        }
        if let Some(url) = self.database_url.filter(|u| !u.trim().is_empty()) {
            config.database.url = url;
        }
        if let Some(dir) = self.upload_dir {
            config.uploads.dir = dir;
        }
    }
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs, mut config: AppConfig) -> Result<()> {
    args.apply(&mut config);

    tracing::info!("Starting recyconnect server on {}", config.server.bind);

    let pool = create_pool_with_options(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to create database pool")?;

    schema::run(&pool)
        .await
        .context("Failed to initialize database schema")?;

    let admin_hash =
        hash_password(&config.admin.password).context("Failed to hash administrator password")?;
    UserRepo::new(&pool)
        .ensure_admin(&config.admin, &admin_hash)
        .await
        .context("Failed to seed administrator account")?;

    let state = AppState::new(pool, &config);
    run_server(state, ServerConfig::from(&config.server))
        .await
        .context("Server error")?;

    Ok(())
}
