//! Runnable entrypoint: load a scenario document, resolve the configured
//! adapter, and serve it.
//!
//! Mirrors the reference launcher's startup sequence: validate the
//! scenario first (a validation failure aborts before anything else is
//! built), then resolve the adapter and credential (an unsupported adapter
//! or a placeholder credential is fatal), then start serving.

use std::sync::Arc;

use clap::Parser;
use scenario_engine::adapter::{http as http_adapter, memory::ChannelAdapter, AdapterKind};
use scenario_engine::config::{Cli, EngineConfig};
use scenario_engine::driver::Driver;
use scenario_engine::scenario::{RawDocument, Scenario};
use scenario_engine::store::{MemoryStore, UserKey};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match EngineConfig::from_cli(cli) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "invalid launch configuration, aborting");
            std::process::exit(1);
        }
    };

    let raw = match std::fs::read_to_string(&config.scenario_path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::error!(path = %config.scenario_path.display(), %err, "failed to read scenario document");
            std::process::exit(1);
        }
    };

    let doc: RawDocument = match serde_json::from_str(&raw) {
        Ok(doc) => doc,
        Err(err) => {
            tracing::error!(%err, "scenario document is not valid JSON");
            std::process::exit(1);
        }
    };

    let scenario = match Scenario::validate(doc) {
        Ok(scenario) => {
            tracing::info!(bot_name = scenario.bot_name(), "scenario validated");
            Arc::new(scenario)
        }
        Err(err) => {
            tracing::error!(%err, "scenario validation failed, aborting");
            std::process::exit(1);
        }
    };

    match config.adapter {
        AdapterKind::Memory => {
            let (adapter, mut events) = ChannelAdapter::new();
            let driver = Arc::new(Driver::new(scenario, MemoryStore::new(), adapter));
            driver.start(UserKey::new("local"), Default::default()).await;
            while let Some(event) = events.recv().await {
                tracing::info!(?event, "outbound event");
            }
        }
        AdapterKind::Webhook => {
            let driver = Arc::new(Driver::new(scenario, MemoryStore::new(), scenario_engine::adapter::http::WebhookAdapter::new()));
            let router = http_adapter::router(move |user, input| {
                let driver = driver.clone();
                async move { driver.resume(user, input).await }
            });

            let listener = match tokio::net::TcpListener::bind(&config.bind).await {
                Ok(listener) => listener,
                Err(err) => {
                    tracing::error!(bind = %config.bind, %err, "failed to bind webhook adapter");
                    std::process::exit(1);
                }
            };
            tracing::info!(bind = %config.bind, "webhook adapter listening");
            if let Err(err) = axum::serve(listener, router).await {
                tracing::error!(%err, "webhook adapter stopped unexpectedly");
            }
        }
    }
}
