mod config;
mod engine;
mod hass;
mod http;
mod models;
mod sensor;

use anyhow::Result;
use clap::Parser;
use config::Configuration;
use engine::{EngineClient, EngineError};
use hass::HassClient;
use http::HttpClient;
use models::User;
use sensor::FeedKind;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, sleep};
use tracing::{debug, error, info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(&cli.log_level)
        .init();

    info!("Starting plex-recs-bridge v0.1.0");

    // Load configuration
    let config = Arc::new(Configuration::from_file(&cli.config)?);
    info!("Configuration loaded from: {}", cli.config);

    // Initialize HTTP client
    let http_client = HttpClient::new();

    // A rejected API key never recovers on its own; anything else is left to
    // the scheduled retries.
    let engine_client = EngineClient::new(http_client.clone(), config.engine.clone());
    match engine_client.health().await {
        Ok(()) => info!("Engine reachable at {}", config.engine.base_url()),
        Err(EngineError::Unauthorized) => {
            return Err(anyhow::anyhow!("Engine rejected the configured API key"));
        }
        Err(e) => warn!("Engine health check failed: {}", e),
    }

    let hass_client = HassClient::new(http_client.clone(), config.homeassistant.clone());
    if let Err(e) = hass_client.status().await {
        warn!("Home Assistant API check failed: {}", e);
    }

    // Start sync tasks
    let sync_tasks = vec![
        tokio::spawn(feed_poll_sync(Arc::clone(&config), http_client.clone())),
        tokio::spawn(engine_health_sync(Arc::clone(&config), http_client.clone())),
    ];

    // Wait for all tasks (they run forever)
    for task in sync_tasks {
        if let Err(e) = task.await? {
            error!("Sync task failed: {}", e);
        }
    }

    Ok(())
}

async fn feed_poll_sync(config: Arc<Configuration>, http_client: HttpClient) -> Result<()> {
    let mut interval = interval(config.poll_interval());

    loop {
        interval.tick().await;

        if let Err(e) = run_poll(&config, &http_client).await {
            error!("Poll cycle failed: {}", e);
        }
    }
}

async fn engine_health_sync(config: Arc<Configuration>, http_client: HttpClient) -> Result<()> {
    let mut interval = interval(Duration::from_secs(24 * 60 * 60)); // 24 hours

    loop {
        interval.tick().await;

        let engine_client = EngineClient::new(http_client.clone(), config.engine.clone());
        match engine_client.health().await {
            Ok(()) => debug!("Engine health ping successful"),
            Err(e) => warn!("Engine health ping failed: {}", e),
        }
    }
}

async fn run_poll(config: &Configuration, http_client: &HttpClient) -> Result<()> {
    info!("Running feed poll");

    let engine_client = EngineClient::new(http_client.clone(), config.engine.clone());
    let hass_client = HassClient::new(http_client.clone(), config.homeassistant.clone());

    // Discovery failure aborts the whole cycle; every sensor keeps its
    // previous state until the next tick.
    let users = engine_client.get_users().await?;

    let mut published = 0usize;
    for user in &users {
        published += publish_user_feeds(&engine_client, &hass_client, user).await;

        // Small delay between users to be respectful
        sleep(Duration::from_millis(100)).await;
    }

    info!(
        "Poll completed: {} sensors published for {} users",
        published,
        users.len()
    );
    Ok(())
}

async fn publish_user_feeds(engine: &EngineClient, hass: &HassClient, user: &User) -> usize {
    let mut published = 0;

    for kind in [FeedKind::Recommendations, FeedKind::Recent] {
        let feed = match kind {
            FeedKind::Recommendations => engine.get_recommendations(&user.id).await,
            FeedKind::Recent => engine.get_recent(&user.id).await,
        };

        // A failed fetch skips the publish; the sensor keeps its previously
        // published state and goes stale until the next successful cycle.
        let feed = match feed {
            Ok(feed) => feed,
            Err(e) => {
                error!(
                    "Skipping {} feed for '{}': {}",
                    kind.attribute_key(),
                    user.display_name(),
                    e
                );
                continue;
            }
        };

        let entity_id = sensor::entity_id(kind, user);
        debug!(
            "Publishing {} items to sensor.{}",
            feed.items.len(),
            entity_id
        );

        let state = sensor::build_sensor_state(kind, user, &feed);
        match hass.publish_sensor(&entity_id, &state).await {
            Ok(()) => published += 1,
            Err(e) => error!("Failed to publish sensor '{}': {}", entity_id, e),
        }
    }

    published
}
