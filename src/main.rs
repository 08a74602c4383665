//! verlicored - a single-threaded Direct Connect (NMDC) hub daemon.

use std::path::Path;
use tracing::{error, info};
use verlicore::config::{self, Config, LogFormat};
use verlicore::db::Database;
use verlicore::geo::NullGeo;
use verlicore::Server;

/// Resolve the configuration path from CLI arguments.
/// Supports `-c <path>`, `--config <path>`, or a bare path.
/// Falls back to `config.toml` when no argument is provided.
fn resolve_config_path() -> String {
    let mut args = std::env::args().skip(1);

    let raw_path = match args.next() {
        Some(flag) if flag == "-c" || flag == "--config" => args.next().unwrap_or_else(|| {
            eprintln!("Missing path after {flag}");
            std::process::exit(1);
        }),
        Some(path) => path,
        None => "config.toml".to_string(),
    };

    match std::fs::canonicalize(Path::new(&raw_path)) {
        Ok(p) => p.to_string_lossy().into_owned(),
        Err(_) => raw_path,
    }
}

fn main() -> anyhow::Result<()> {
    let config_path = resolve_config_path();

    let config = Config::load(&config_path).map_err(|e| {
        eprintln!("ERROR: failed to load config from {config_path}: {e}");
        e
    })?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match config.server.log_format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(true)
                .json()
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(true)
                .init();
        }
    }

    if let Err(errors) = config::validate(&config) {
        for err in &errors {
            error!(error = %err, "configuration validation failed");
        }
        anyhow::bail!("configuration validation failed with {} error(s)", errors.len());
    }

    if let Err(e) = verlicore::metrics::register_all() {
        error!(error = %e, "failed to register metrics");
    }

    info!(
        hub_name = %config.server.hub_name,
        listen_addr = %config.server.listen_addr,
        listen_port = config.server.listen_port,
        "starting verlicored"
    );

    let db = Database::open(&config.db.path)
        .map_err(|e| anyhow::anyhow!("failed to open database {}: {e}", config.db.path))?;

    let mut server = Server::new(config, db, Box::new(NullGeo))?;
    server.run()?;

    info!("hub shut down");
    Ok(())
}
