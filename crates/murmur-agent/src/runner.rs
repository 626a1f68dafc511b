// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The two cooperative interval loops: ingestion and dispatch.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::dispatcher::{BatchConfig, ReplyDispatcher};
use crate::ingestion::IngestionPipeline;

/// Owns both pipelines and drives them until cancelled.
pub struct ReplyAgent {
    ingestion: Arc<IngestionPipeline>,
    dispatcher: Arc<ReplyDispatcher>,
    ingestion_interval: Duration,
    dispatch_interval: Duration,
    batch: BatchConfig,
}

impl ReplyAgent {
    pub fn new(
        ingestion: IngestionPipeline,
        dispatcher: ReplyDispatcher,
        ingestion_interval: Duration,
        dispatch_interval: Duration,
        batch: BatchConfig,
    ) -> Self {
        Self {
            ingestion: Arc::new(ingestion),
            dispatcher: Arc::new(dispatcher),
            ingestion_interval,
            dispatch_interval,
            batch,
        }
    }

    /// Runs both loops until `cancel` fires, then waits for them to stop.
    ///
    /// An in-flight cycle finishes its current message or post before the
    /// loop observes cancellation.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            ingestion_secs = self.ingestion_interval.as_secs(),
            dispatch_secs = self.dispatch_interval.as_secs(),
            "reply agent started"
        );
        tokio::join!(
            ingestion_loop(Arc::clone(&self.ingestion), self.ingestion_interval, cancel.clone()),
            dispatch_loop(
                Arc::clone(&self.dispatcher),
                self.dispatch_interval,
                self.batch,
                cancel.clone()
            ),
        );
        info!("reply agent stopped");
    }
}

async fn ingestion_loop(
    pipeline: Arc<IngestionPipeline>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = pipeline.run_cycle(&cancel).await {
                    warn!(error = %e, "ingestion cycle failed, retrying next tick");
                }
            }
            _ = cancel.cancelled() => {
                info!("ingestion loop shutting down");
                break;
            }
        }
    }
}

async fn dispatch_loop(
    dispatcher: Arc<ReplyDispatcher>,
    period: Duration,
    batch: BatchConfig,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = dispatcher.process_pending(&cancel, &batch).await {
                    warn!(error = %e, "dispatch cycle failed, retrying next tick");
                }
            }
            _ = cancel.cancelled() => {
                info!("dispatch loop shutting down");
                break;
            }
        }
    }
}
