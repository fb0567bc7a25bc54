//! filer server binary.
//!
//! Loads the configuration, builds the catalog from the index directory,
//! starts the reconcile, transcoding and (optionally) stop-on-update tasks,
//! then serves HTTP until ctrl-c or the executable is replaced.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use filer_config::{ConfigLoad, ConfigLoader, ConfigLoaderOptions};
use filer_server::infra::notify::notifier_from_config;
use filer_server::infra::reconcile::run_reconcile_loop;
use filer_server::infra::self_update::BinaryWatcher;
use filer_server::infra::transcoding::{ResultSink, run_result_loop};
use filer_server::{AppParts, AppState, create_app};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "filer-server")]
#[command(about = "Content-addressed media catalog with on-demand transcoding")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "FILER_CONFIG")]
    config: Option<PathBuf>,

    /// `.env` file to load before reading the environment
    #[arg(long, env = "FILER_ENV_FILE")]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let ConfigLoad { config, warnings } = ConfigLoader::with_options(ConfigLoaderOptions {
        config_path: cli.config,
        env_file: cli.env_file,
    })
    .load()
    .context("failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = config.metadata.config_path.as_ref() {
        info!(path = %path.display(), "configuration loaded");
    }
    for warning in warnings.iter() {
        match &warning.hint {
            Some(hint) => warn!(message = %warning.message, hint = %hint, "configuration warning"),
            None => warn!(message = %warning.message, "configuration warning"),
        }
    }

    let config = Arc::new(config);
    let AppParts { state, updates } = AppState::build(Arc::clone(&config));

    let catalog = Arc::clone(&state.catalog);
    let summary = tokio::task::spawn_blocking(move || catalog.reload())
        .await
        .context("initial catalog load panicked")?;
    info!(
        dir = %config.index.dir.display(),
        sources = summary.sources,
        failed = summary.failed,
        records = summary.records,
        "catalog loaded"
    );

    tokio::spawn(run_reconcile_loop(
        Arc::clone(&state.catalog),
        state.path_translator(),
        config.index.reload,
        updates,
    ));

    if let Some(dest_dir) = config.transcoder.dest_dir.clone()
        && state.transcoder.is_enabled()
    {
        tokio::spawn(run_result_loop(
            Arc::clone(&state.transcoder),
            ResultSink {
                dest_dir,
                updates: state.updates.clone(),
                notifier: notifier_from_config(&config.notify),
            },
        ));
    }

    let watcher = if config.server.stop_on_update {
        Some(BinaryWatcher::current_exe().context("cannot locate the running executable")?)
    } else {
        None
    };

    let transcoder = Arc::clone(&state.transcoder);
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(config.server.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen))?;
    info!(addr = %config.server.listen, "starting filer server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(watcher))
        .await?;

    transcoder.close();
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal(watcher: Option<BinaryWatcher>) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };
    let replaced = async {
        match watcher {
            Some(watcher) => watcher.changed().await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c"),
        _ = replaced => {}
    }
}
