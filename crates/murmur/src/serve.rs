// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `murmur serve` command implementation.
//!
//! Wires the Twitter transport, the OpenAI generator and the SQLite
//! conversation store into the ingestion and dispatch loops, then runs until
//! SIGINT or SIGTERM. On shutdown the store is checkpointed and closed.

use std::sync::Arc;

use murmur_agent::shutdown;
use murmur_agent::{
    BatchConfig, GenerationSettings, IngestionPipeline, IngestionSettings, ReplyAgent,
    ReplyDispatcher, TokenBucket,
};
use murmur_config::MurmurConfig;
use murmur_core::{
    AgentIdentity, MurmurError, PluginAdapter, TextGenerator, TransportAdapter, with_deadline,
};
use murmur_openai::OpenAiGenerator;
use murmur_storage::ConversationStore;
use murmur_twitter::TwitterTransport;
use tracing::{info, warn};

/// Runs the agent until a shutdown signal arrives.
pub async fn run_serve(config: MurmurConfig) -> Result<(), MurmurError> {
    init_tracing(&config.agent.log_level);
    info!("starting murmur serve");

    let request_timeout = config.dispatch.request_timeout();
    let transport = Arc::new(TwitterTransport::new(
        &config.twitter,
        config.agent.account_id.clone(),
        request_timeout,
    )?);
    let account_id =
        with_deadline(request_timeout, transport.authenticated_account_id()).await?;
    let identity = AgentIdentity {
        account_id,
        name: config.agent.name.clone(),
        username: config.agent.username.clone(),
    };
    info!(account_id = %identity.account_id, username = %identity.username, "agent identity resolved");

    let store = Arc::new(ConversationStore::open(&config.storage, identity).await?);
    let generator = Arc::new(OpenAiGenerator::new(&config)?);
    let limiter = Arc::new(TokenBucket::new(
        config.dispatch.posts_per_window,
        config.dispatch.window(),
        config.dispatch.burst,
    ));
    info!(
        refill_secs = limiter.refill_interval().as_secs_f64(),
        burst = config.dispatch.burst,
        "post rate limiter configured"
    );

    let transport_dyn: Arc<dyn TransportAdapter> = transport.clone();
    let generator_dyn: Arc<dyn TextGenerator> = generator.clone();

    let ingestion = IngestionPipeline::new(
        Arc::clone(&store),
        Arc::clone(&transport_dyn),
        IngestionSettings {
            page_size: config.twitter.page_size,
            max_pages: config.ingestion.max_pages,
            request_timeout,
        },
    );
    let dispatcher = ReplyDispatcher::new(
        Arc::clone(&store),
        transport_dyn,
        generator_dyn,
        limiter,
        GenerationSettings {
            max_length: config.openai.max_length,
            temperature: config.openai.temperature,
        },
        request_timeout,
    );
    let agent = ReplyAgent::new(
        ingestion,
        dispatcher,
        config.ingestion.interval(),
        config.dispatch.interval(),
        BatchConfig::from(&config.dispatch),
    );

    let cancel = shutdown::install_signal_handler();
    agent.run(cancel).await;
    drop(agent);

    if let Err(e) = transport.shutdown().await {
        warn!(error = %e, "transport shutdown failed");
    }
    if let Err(e) = generator.shutdown().await {
        warn!(error = %e, "generator shutdown failed");
    }

    match Arc::try_unwrap(store) {
        Ok(store) => store.close().await?,
        Err(_) => warn!("conversation store still shared at shutdown, skipping checkpoint"),
    }

    info!("murmur serve shutdown complete");
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("murmur={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
