//! `revwatch` entrypoint: loads configuration and runs the poll loop until
//! interrupted.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use ortho_config::OrthoConfig;
use revwatch::telemetry::{NoopTelemetrySink, StderrJsonlTelemetrySink, TelemetrySink};
use revwatch::{
    AppError, GitHubError, Monitor, OctocrabActivitySource, ReviewActivitySource, RevwatchConfig,
    StateStore,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report_error(&error);
            ExitCode::FAILURE
        }
    }
}

fn report_error(error: &AppError) {
    let _ignored = writeln!(io::stderr().lock(), "{error}");
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
}

async fn run() -> Result<(), AppError> {
    let config = load_config()?;
    config.validate()?;

    let token = config.resolve_token()?;
    let api_base = config.api_base()?;
    let source: Arc<dyn ReviewActivitySource> =
        Arc::new(OctocrabActivitySource::for_token(&token, &api_base)?);

    let author = resolve_author(&config, source.as_ref()).await?;
    let cache_path = config.resolve_cache_path()?;
    let store = Arc::new(StateStore::load(cache_path)?);
    let backend = config.notifier_backend()?;
    let telemetry: Arc<dyn TelemetrySink> = if config.telemetry {
        Arc::new(StderrJsonlTelemetrySink)
    } else {
        Arc::new(NoopTelemetrySink)
    };

    tracing::info!(
        interval_seconds = config.interval_seconds,
        author = %author,
        cache = %store.path(),
        notifier = %backend,
        initialized = store.is_initialized(),
        "starting revwatch"
    );

    let monitor = Monitor::new(
        config.monitor_config(author),
        source,
        backend.into_sink(),
        store,
    )
    .with_telemetry(telemetry);

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));
    monitor.run(&cancel).await;
    Ok(())
}

/// Loads configuration from CLI, environment, and files.
fn load_config() -> Result<RevwatchConfig, AppError> {
    RevwatchConfig::load().map_err(|error| AppError::Configuration {
        message: error.to_string(),
    })
}

/// Uses the configured author or asks GitHub for the authenticated login.
async fn resolve_author(
    config: &RevwatchConfig,
    source: &dyn ReviewActivitySource,
) -> Result<String, AppError> {
    if let Some(author) = config.configured_author() {
        return Ok(author.to_owned());
    }

    let timeout = Duration::from_secs(config.request_timeout_seconds);
    match tokio::time::timeout(timeout, source.current_user_login()).await {
        Ok(Ok(login)) => Ok(login),
        Ok(Err(error)) => Err(AppError::AuthorResolution(error)),
        Err(_) => Err(AppError::AuthorResolution(GitHubError::Timeout {
            operation: "current user".to_owned(),
            seconds: timeout.as_secs(),
        })),
    }
}

async fn cancel_on_shutdown_signal(cancel: CancellationToken) {
    wait_for_shutdown_signal().await;
    tracing::info!("shutdown requested");
    cancel.cancel();
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(error) => {
            tracing::warn!("failed to listen for SIGTERM: {error}");
            wait_for_ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        () = wait_for_ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for Ctrl-C: {error}");
        std::future::pending::<()>().await;
    }
}
