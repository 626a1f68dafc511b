// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply dispatcher.
//!
//! A dispatch cycle recalls eligible threads, splits them into fixed-size
//! batches, and for each thread generates a reply, waits for a post token,
//! posts, and records the reply in the store. A platform rate limit ends
//! the cycle after a cooldown of at least the platform's reset time; the
//! affected thread is left untouched and stays eligible.

use std::sync::Arc;
use std::time::Duration;

use murmur_config::model::DispatchConfig;
use murmur_core::{
    GenerationRequest, Message, MurmurError, PostReplyRequest, PostedReply, TextGenerator,
    TransportAdapter, with_deadline,
};
use murmur_storage::ConversationStore;
use strum::Display;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::eligibility::{ConversationThread, EligibilityEngine};
use crate::prompt::{ReplyContext, build_reply_prompt, finalize_reply};
use crate::rate_limit::TokenBucket;
use crate::retry::RetryPolicy;

/// Batching, retry and cooldown knobs for one dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub rate_limit_cooldown: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::from(&DispatchConfig::default())
    }
}

impl From<&DispatchConfig> for BatchConfig {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            batch_delay: Duration::from_secs(config.batch_delay_secs),
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
            rate_limit_cooldown: Duration::from_secs(config.rate_limit_cooldown_secs),
        }
    }
}

/// Generation parameters passed to the text generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub max_length: usize,
    pub temperature: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_length: 280,
            temperature: 0.7,
        }
    }
}

/// Where a dispatch cycle currently is, for log context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DispatchPhase {
    Idle,
    Recalling,
    Batching,
    RateLimitWait,
    Generate,
    Post,
    Persist,
}

/// Counts for one dispatch cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub threads: usize,
    pub replied: usize,
    pub skipped: usize,
    pub failed: usize,
    /// The cycle stopped early because the platform rate-limited a post.
    pub rate_limited: bool,
}

enum ThreadOutcome {
    Replied,
    Skipped,
    Failed,
    /// Carries the platform's reset hint, if it sent one.
    RateLimited(Option<Duration>),
    Cancelled,
}

pub struct ReplyDispatcher {
    store: Arc<ConversationStore>,
    transport: Arc<dyn TransportAdapter>,
    generator: Arc<dyn TextGenerator>,
    engine: EligibilityEngine,
    limiter: Arc<TokenBucket>,
    generation: GenerationSettings,
    request_timeout: Duration,
}

impl ReplyDispatcher {
    pub fn new(
        store: Arc<ConversationStore>,
        transport: Arc<dyn TransportAdapter>,
        generator: Arc<dyn TextGenerator>,
        limiter: Arc<TokenBucket>,
        generation: GenerationSettings,
        request_timeout: Duration,
    ) -> Self {
        Self {
            engine: EligibilityEngine::new(Arc::clone(&store)),
            store,
            transport,
            generator,
            limiter,
            generation,
            request_timeout,
        }
    }

    fn agent_id(&self) -> &str {
        &self.store.agent().account_id
    }

    /// Runs one dispatch cycle.
    pub async fn process_pending(
        &self,
        cancel: &CancellationToken,
        config: &BatchConfig,
    ) -> Result<DispatchReport, MurmurError> {
        debug!(phase = %DispatchPhase::Recalling, "dispatch cycle started");
        let threads = self.engine.recall(self.agent_id()).await?;
        let mut report = DispatchReport {
            threads: threads.len(),
            ..Default::default()
        };
        if threads.is_empty() {
            debug!(phase = %DispatchPhase::Idle, "no eligible threads");
            return Ok(report);
        }

        let retry = RetryPolicy::new(config.max_retries, config.retry_delay);
        let batch_count = threads.len().div_ceil(config.batch_size.max(1));

        'batches: for (batch_no, batch) in threads.chunks(config.batch_size.max(1)).enumerate() {
            info!(
                phase = %DispatchPhase::Batching,
                batch = batch_no + 1,
                batches = batch_count,
                size = batch.len(),
                "processing batch"
            );

            for thread in batch {
                if cancel.is_cancelled() {
                    break 'batches;
                }
                match self.handle_thread(thread, cancel, &retry).await {
                    ThreadOutcome::Replied => report.replied += 1,
                    ThreadOutcome::Skipped => report.skipped += 1,
                    ThreadOutcome::Failed => report.failed += 1,
                    ThreadOutcome::Cancelled => break 'batches,
                    ThreadOutcome::RateLimited(retry_after) => {
                        report.rate_limited = true;
                        let pause = cooldown(config, retry_after);
                        warn!(
                            conversation_id = %thread.conversation_id,
                            cooldown_secs = pause.as_secs(),
                            retry_after_secs = retry_after.map(|d| d.as_secs()),
                            "platform rate limit hit, pausing dispatch"
                        );
                        sleep_or_cancel(pause, cancel).await;
                        break 'batches;
                    }
                }
            }

            if batch_no + 1 < batch_count
                && !sleep_or_cancel(config.batch_delay, cancel).await
            {
                break;
            }
        }

        info!(
            phase = %DispatchPhase::Idle,
            threads = report.threads,
            replied = report.replied,
            skipped = report.skipped,
            failed = report.failed,
            rate_limited = report.rate_limited,
            "dispatch cycle complete"
        );
        Ok(report)
    }

    async fn handle_thread(
        &self,
        thread: &ConversationThread,
        cancel: &CancellationToken,
        retry: &RetryPolicy,
    ) -> ThreadOutcome {
        let Some(target) = thread.target(self.agent_id()) else {
            debug!(conversation_id = %thread.conversation_id, "thread has no reply target");
            return ThreadOutcome::Skipped;
        };
        let message_id = target.id.as_str();
        let conversation_id = thread.conversation_id.as_str();

        let outcome = self.attempt_reply(thread, target, cancel, retry).await;
        if matches!(outcome, ThreadOutcome::Replied | ThreadOutcome::Failed)
            && let Err(e) = self.store.record_attempt(message_id).await
        {
            warn!(message_id, conversation_id, error = %e, "failed to record dispatch attempt");
        }
        outcome
    }

    /// Generates, posts and persists one reply. Rate limits and cancellation
    /// return before anything is written for the target.
    async fn attempt_reply(
        &self,
        thread: &ConversationThread,
        target: &Message,
        cancel: &CancellationToken,
        retry: &RetryPolicy,
    ) -> ThreadOutcome {
        let message_id = target.id.as_str();
        let conversation_id = thread.conversation_id.as_str();

        debug!(phase = %DispatchPhase::Generate, message_id, conversation_id, "generating reply");
        let context = ReplyContext::from_thread(thread, target, self.generation.max_length);
        let request = GenerationRequest {
            prompt: build_reply_prompt(&context),
            max_length: self.generation.max_length,
            temperature: self.generation.temperature,
        };
        let request = &request;
        let generated = retry
            .run("generate", cancel, move |_| {
                with_deadline(self.request_timeout, self.generator.generate(request))
            })
            .await;
        let text = match generated {
            Ok(raw) => finalize_reply(&raw, self.generation.max_length),
            Err(e) => return self.classify_failure("generate", message_id, conversation_id, e),
        };
        if text.is_empty() {
            warn!(message_id, conversation_id, "generator returned empty reply");
            return ThreadOutcome::Failed;
        }

        let post = PostReplyRequest {
            text: text.clone(),
            reply_to_id: message_id.to_string(),
            conversation_id: Some(conversation_id.to_string()),
        };
        let post = &post;
        let posted = retry
            .run("post", cancel, move |attempt| {
                async move {
                    debug!(phase = %DispatchPhase::RateLimitWait, message_id, attempt, "waiting for post token");
                    self.limiter.acquire(cancel).await?;
                    debug!(phase = %DispatchPhase::Post, message_id, attempt, "posting reply");
                    with_deadline(self.request_timeout, self.transport.post_reply(post)).await
                }
            })
            .await;
        let posted = match posted {
            Ok(p) => p,
            Err(e) => return self.classify_failure("post", message_id, conversation_id, e),
        };

        self.persist_reply(message_id, conversation_id, &posted, &text)
            .await;
        ThreadOutcome::Replied
    }

    fn classify_failure(
        &self,
        operation: &str,
        message_id: &str,
        conversation_id: &str,
        err: MurmurError,
    ) -> ThreadOutcome {
        if matches!(err, MurmurError::Cancelled) {
            return ThreadOutcome::Cancelled;
        }
        if err.is_rate_limit() {
            let retry_after = match err {
                MurmurError::RateLimited { retry_after } => retry_after,
                _ => None,
            };
            return ThreadOutcome::RateLimited(retry_after);
        }
        error!(operation, message_id, conversation_id, error = %err, "reply failed after retries");
        ThreadOutcome::Failed
    }

    /// Records a posted reply. The reply is live on the platform at this
    /// point, so failures fall back to closing the message and never re-post.
    async fn persist_reply(
        &self,
        message_id: &str,
        conversation_id: &str,
        posted: &PostedReply,
        text: &str,
    ) {
        debug!(phase = %DispatchPhase::Persist, message_id, reply_id = %posted.id, "recording reply");
        let conversation = posted.conversation_id.as_deref().unwrap_or(conversation_id);
        match self
            .store
            .record_own_reply(message_id, &posted.id, conversation, text)
            .await
        {
            Ok(()) => info!(message_id, conversation_id, reply_id = %posted.id, "reply posted"),
            Err(e) => {
                error!(message_id, reply_id = %posted.id, error = %e, "failed to record reply, closing message");
                if let Err(e) = self.store.mark_answered(message_id, Some(&posted.id)).await {
                    error!(
                        message_id,
                        conversation_id,
                        reply_id = %posted.id,
                        error = %e,
                        "failed to close answered message; manual reconciliation required"
                    );
                }
            }
        }
    }
}

/// Pause after a platform rate limit: the configured cooldown, stretched to
/// the platform's reset hint when that is longer.
fn cooldown(config: &BatchConfig, retry_after: Option<Duration>) -> Duration {
    retry_after.map_or(config.rate_limit_cooldown, |hint| {
        hint.max(config.rate_limit_cooldown)
    })
}

/// Sleeps for `duration`. Returns false if cancelled first.
async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
