//! confcache - config-file serving cache
//!
//! Main entry point: loads configuration, wires the Cache Engine, Watch
//! Index, collaborators, and Query Pipeline together, spawns the
//! Invalidator's receive loop, and serves the HTTP API.

use confcache::cache::CacheEngine;
use confcache::collaborators::{DefaultWatchKeyDeriver, InMemoryGrayRules, InMemoryResolver};
use confcache::config::AppConfig;
use confcache::http::{create_router, AppState};
use confcache::invalidator::Invalidator;
use confcache::message_bus::{BroadcastMessageBus, MessageBus};
use confcache::pipeline::QueryPipeline;
use confcache::watch_index::WatchIndex;
use std::panic;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    panic::set_hook(Box::new(|panic_info| {
        eprintln!("confcache fatal error:");
        eprintln!("{}", panic_info);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "Location: {}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            );
        }
    }));

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("confcache v{} starting up", confcache::VERSION);

    let config = AppConfig::from_env()?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        release_topic = %config.release_topic,
        max_cache_weight = config.max_cache_weight,
        write_ttl_secs = config.write_ttl.as_secs(),
        "configuration loaded"
    );

    let watch_index = Arc::new(WatchIndex::new());
    let cache = CacheEngine::new(config.max_cache_weight, config.write_ttl, watch_index.clone());

    let resolver = Arc::new(InMemoryResolver::new());
    let gray_rules = Arc::new(InMemoryGrayRules::new());
    let deriver = Arc::new(DefaultWatchKeyDeriver);

    let pipeline = Arc::new(QueryPipeline::new(
        cache.clone(),
        watch_index.clone(),
        resolver,
        gray_rules,
        deriver,
    ));

    let message_bus: Arc<dyn MessageBus> = Arc::new(BroadcastMessageBus::new());
    let invalidator = Invalidator::new(cache, watch_index, config.release_topic.clone());
    tokio::spawn(invalidator.run(message_bus));

    let app = create_router(AppState { pipeline });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(bind_addr = %config.bind_addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
