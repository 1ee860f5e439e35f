use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use courier_common::config::AppConfig;
use courier_common::db;
use courier_common::error::AppError;
use courier_common::shutdown::cancel_on_signal;
use courier_common::types::NotificationType;
use courier_notifier::{ChannelSender, DeliveryWorker, ResendChannel, SlackChannel, TwilioChannel};
use courier_outbox::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "courier_notifier=info,courier_outbox=info,courier_common=info".into()
                }),
        )
        .json()
        .init();

    tracing::info!("Courier Notifier starting...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Connect to database
    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    db::run_migrations(&pool).await?;

    let store = Store::new(pool);
    let cancel = CancellationToken::new();
    let mut workers = JoinSet::new();

    // Channel credentials are checked here, before anything is polled.
    for kind in &config.worker_channels {
        match kind {
            NotificationType::Sms => spawn_worker(
                &mut workers,
                DeliveryWorker::from_config(store.clone(), TwilioChannel::from_config(&config)?, &config),
                &cancel,
            ),
            NotificationType::Chat => spawn_worker(
                &mut workers,
                DeliveryWorker::from_config(store.clone(), SlackChannel::from_config(&config)?, &config),
                &cancel,
            ),
            NotificationType::Email => spawn_worker(
                &mut workers,
                DeliveryWorker::from_config(store.clone(), ResendChannel::from_config(&config)?, &config),
                &cancel,
            ),
        }
    }

    cancel_on_signal(cancel.clone());

    // The first worker to give up takes the others down with it.
    let mut failure: Option<anyhow::Error> = None;
    while let Some(joined) = workers.join_next().await {
        let result = match joined {
            Ok(result) => result.map_err(anyhow::Error::from),
            Err(e) => Err(anyhow::anyhow!("delivery task panicked: {}", e)),
        };

        if let Err(e) = result {
            tracing::error!(error = %e, "Delivery worker exited with error");
            cancel.cancel();
            failure.get_or_insert(e);
        }
    }

    if let Some(e) = failure {
        return Err(e);
    }

    tracing::info!("Courier Notifier stopped.");
    Ok(())
}

fn spawn_worker<S>(
    workers: &mut JoinSet<Result<(), AppError>>,
    worker: DeliveryWorker<S>,
    cancel: &CancellationToken,
) where
    S: ChannelSender + 'static,
{
    let cancel = cancel.clone();
    tracing::info!(channel = %S::KIND, "Starting delivery worker");
    workers.spawn(async move { worker.run(&cancel).await });
}
