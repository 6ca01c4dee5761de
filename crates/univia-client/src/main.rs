use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use univia_client::{ApiClient, LogNotifier};
use univia_core::Actor;
use univia_core::poller::{DEFAULT_POLL_PERIOD, NotificationPoller, PollScheduler, SeenFlags};

const JOB_NAME: &str = "teacher-messages";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "univia=debug".into()),
        )
        .init();

    let api_url = env::var("UNIVIA_API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let email = env::var("UNIVIA_EMAIL").context("UNIVIA_EMAIL must be set")?;
    let password = env::var("UNIVIA_PASSWORD").context("UNIVIA_PASSWORD must be set")?;
    let flags_path = env::var("UNIVIA_FLAGS_PATH").unwrap_or_else(|_| "univia-seen.json".to_string());
    let period = match env::var("UNIVIA_POLL_SECS") {
        Ok(secs) => Duration::from_secs(secs.parse().context("UNIVIA_POLL_SECS is not a number")?),
        Err(_) => DEFAULT_POLL_PERIOD,
    };

    let client = Arc::new(ApiClient::new(api_url));
    let session = client.login(&email, &password).await?;
    let viewer = Actor::new(session.user_id, session.role);

    let flags = SeenFlags::load(&flags_path).await?;
    let poller = Arc::new(NotificationPoller::new(client, Arc::new(LogNotifier), flags, viewer));

    let scheduler = PollScheduler::new(period);
    scheduler.schedule(JOB_NAME, poller).await;
    info!("Watching for teacher messages every {:?}", period);

    tokio::signal::ctrl_c().await?;
    scheduler.cancel(JOB_NAME).await;
    Ok(())
}
