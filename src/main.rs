use std::sync::Arc;
use std::time::Duration;

use fireguard_relay::health;
use fireguard_relay::ChangeWatcher;
use fireguard_relay::Error;
use fireguard_relay::FcmGateway;
use fireguard_relay::FirebaseDatabase;
use fireguard_relay::Relay;
use fireguard_relay::RelayConfig;
use fireguard_relay::Result;
use fireguard_relay::ServiceAccount;
use fireguard_relay::ServiceAccountTokenProvider;
use fireguard_relay::TokenProvider;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let settings = RelayConfig::new()?.validate()?;

    // Initializing Logs
    let _guard = init_observability(&settings.server.log_level)?;

    // Credentials are checked before anything subscribes
    let http = reqwest::Client::builder()
        .build()
        .map_err(|e| Error::Fatal(format!("failed to build http client: {e}")))?;
    let account = ServiceAccount::load(&settings.firebase)?;
    let tokens: Arc<dyn TokenProvider> = Arc::new(ServiceAccountTokenProvider::new(
        &account,
        http.clone(),
        Duration::from_millis(settings.firebase.request_timeout_ms),
    )?);
    let project_id = settings
        .firebase
        .project_id
        .clone()
        .unwrap_or_else(|| account.project_id.clone());
    info!("Relaying {} for project {}", settings.firebase.logs_path, project_id);

    let database = Arc::new(FirebaseDatabase::new(
        http.clone(),
        &settings.firebase,
        tokens.clone(),
    )?);
    let gateway = Arc::new(FcmGateway::new(http, &settings.firebase, &project_id, tokens)?);
    let relay = Arc::new(Relay::new(database.clone(), gateway));
    let watcher = ChangeWatcher::new(database, relay, settings.watcher.clone());

    // Initializing Shutdown Signal
    let (graceful_tx, graceful_rx) = watch::channel(());

    tokio::spawn(health::start_server(settings.server.port, graceful_rx.clone()));

    info!("Application started. Waiting for CTRL+C signal...");
    tokio::spawn(async {
        if let Err(e) = graceful_shutdown(graceful_tx).await {
            error!("Failed to shutdown: {:?}", e);
        }
    });

    let result = watcher.run(graceful_rx).await;
    if let Err(e) = &result {
        error!("watcher stops: {:?}", e);
    }

    info!("Exiting program.");
    result
}

async fn graceful_shutdown(graceful_tx: watch::Sender<()>) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    info!("Shutdown server..");
    graceful_tx.send(()).map_err(|e| {
        error!("Failed to send shutdown signal: {}", e);
        Error::SignalSenderClosed(format!("Failed to send shutdown signal: {}", e))
    })?;

    info!("Shutdown completed");
    Ok(())
}

/// `RUST_LOG` wins over the configured level when set.
pub fn init_observability(log_level: &str) -> Result<WorkerGuard> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)
            .map_err(|e| Error::InvalidConfig(format!("server.log_level {log_level}: {e}")))?,
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(filter);
    tracing_subscriber::registry().with(base_subscriber).init();

    Ok(guard)
}
