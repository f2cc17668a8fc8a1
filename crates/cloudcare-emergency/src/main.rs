use std::process::ExitCode;

use cloudcare_emergency::config::loader::{DEFAULT_CONFIG_FILE, load_config};
use cloudcare_emergency::{ServerBuilder, observability};

const CONFIG_ENV: &str = "CLOUDCARE_CONFIG";

/// Configuration file chosen at startup, with where the choice came from.
#[derive(Debug, PartialEq, Eq)]
struct ConfigLocation {
    path: String,
    origin: &'static str,
}

impl ConfigLocation {
    /// `--config <path>` first, then `CLOUDCARE_CONFIG`, then `cloudcare.toml`.
    fn resolve(args: impl IntoIterator<Item = String>, env_path: Option<String>) -> Self {
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            if arg != "--config" {
                continue;
            }
            if let Some(path) = args.next() {
                return Self {
                    path,
                    origin: "--config",
                };
            }
        }
        match env_path.filter(|p| !p.is_empty()) {
            Some(path) => Self {
                path,
                origin: CONFIG_ENV,
            },
            None => Self {
                path: DEFAULT_CONFIG_FILE.to_string(),
                origin: "default",
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => eprintln!("Warning: failed to load .env file: {e}"),
    }

    observability::init_tracing();

    let location = ConfigLocation::resolve(std::env::args().skip(1), std::env::var(CONFIG_ENV).ok());
    let cfg = match load_config(Some(&location.path)) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error in {}: {e}", location.path);
            return ExitCode::from(2);
        }
    };
    tracing::info!(path = %location.path, origin = location.origin, "Configuration loaded");
    observability::apply_logging_level(&cfg.logging.level);

    let server = match ServerBuilder::new().with_config(cfg).build().await {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Server initialization failed: {e:#}");
            return ExitCode::from(2);
        }
    };
    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Emergency server stopped with an error");
            ExitCode::FAILURE
        }
    }
}
