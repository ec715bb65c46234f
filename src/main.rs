//! NAT Web Console
//!
//! Edits the rule file consumed by the NAT forwarding engine through a
//! small, password-protected web UI.
//!
//! # Architecture Overview
//!
//! ```text
//!     Browser / natctl
//!          │
//!          ▼
//!   ┌─────────────┐    ┌──────────────┐    ┌─────────────────┐
//!   │  http       │───▶│ auth gate    │───▶│ rule handlers   │
//!   │ (TLS, ids,  │    │ (cookie →    │    │ (list, edit,    │
//!   │  trace)     │    │  session)    │    │  delete, save)  │
//!   └─────────────┘    └──────────────┘    └────────┬────────┘
//!                                                   │
//!                                                   ▼
//!                                          ┌─────────────────┐
//!                                          │   RuleStore     │◀── SIGHUP / watcher
//!                                          │ (Arc snapshot)  │
//!                                          └────────┬────────┘
//!                                                   │ codec
//!                                                   ▼
//!                                            /etc/nat.conf ──▶ NAT engine
//! ```

use std::path::PathBuf;

use clap::Parser;

use nat_webui::config::{load_config, ConsoleConfig};
use nat_webui::lifecycle::startup;
use nat_webui::observability::init_logging;

#[derive(Parser)]
#[command(name = "nat-webui")]
#[command(about = "Web console for the NAT port-forwarding rule file", long_about = None)]
struct Args {
    /// Service configuration file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the rule file path.
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Override the bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ConsoleConfig::default(),
    };
    if let Some(rules) = args.rules {
        config.rules.path = rules;
    }
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability);

    tracing::info!("nat-webui v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        rules = %config.rules.path.display(),
        passwd = %config.auth.passwd_path.display(),
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
