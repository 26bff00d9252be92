//! config-refresher daemon.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use config_refresher::core::{DEFAULT_ENV_PREFIX, Refresher, Settings};
use config_refresher::reload::KubeDeployments;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let mut loader = Settings::loader().with_env_prefix(DEFAULT_ENV_PREFIX);
    if let Some(path) = &args.settings {
        loader = loader.with_file(path);
    }
    let mut settings = loader.load().context("failed to load settings")?;
    args.apply_to(&mut settings);

    init_logging(settings.production_logging);
    info!("starting up");

    let cancel = CancellationToken::new();
    let mut builder = Refresher::builder()
        .with_settings(settings.clone())
        .with_cancellation(cancel.clone());

    if settings.dry_run {
        warn!("dry run enabled, deployments will not be patched");
    } else {
        let backend = KubeDeployments::try_default()
            .await
            .context("failed to create kubernetes client")?;
        builder = builder.with_backend(Arc::new(backend));
    }

    #[cfg(feature = "metrics")]
    {
        let meter = opentelemetry::global::meter("config-refresher");
        builder = builder.with_metrics(config_refresher::metrics::RefresherMetrics::new(meter));
    }

    let refresher = builder.build().context("failed to start refresher")?;

    tokio::spawn(shutdown_signal(cancel));
    refresher.run().await?;

    info!("shut down");
    Ok(())
}

fn init_logging(production: bool) {
    let level = if production { "info" } else { "debug" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,config_refresher={}", level)));

    if production {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received, stopping watchers");
    cancel.cancel();
}
