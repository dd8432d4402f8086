//! Session processing orchestrator.
//!
//! Drives one session through `Initializing → InitialTurn → StreamingItems →
//! Draining → Completed`.  The initial turn runs sequentially; everything
//! after it is submitted through the admission limiter into the in-flight
//! set, so items are *submitted* in source order but *complete* (and append
//! to the transcript) in whatever order the remote calls finish.
//!
//! Each concurrent item gets an independent context snapshot: the first two
//! transcript turns plus its own rendered prompt, never the live transcript.
//! Concurrent items must not observe each other's in-progress appends.

use std::sync::Arc;

use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use scribe_domain::config::Settings;
use scribe_domain::error::{Error, Result};
use scribe_domain::item::PendingItem;
use scribe_domain::stream::BoxStream;
use scribe_domain::trace::TraceEvent;
use scribe_domain::turn::Turn;
use scribe_providers::{CompletionClient, CompletionRequest};
use scribe_sessions::{context_window, Session};

use crate::dispatch::{self, RenderedPrompt};
use crate::hooks::{
    default_escalation, EscalationPredicate, FallbackStrategy, ObservationSink, PromptBuilders,
    PromptContext, SessionDirectory,
};
use crate::inflight::InFlightSet;
use crate::limiter::AdmissionLimiter;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Outcome & options
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How a session run ended.  Callers only ever see one of these or a
/// propagated error; per-item drops are invisible except through logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    /// Cooperative cancellation: a clean, silent stop.
    Aborted,
    /// The session was handed to the fallback strategy.
    Escalated,
}

pub struct WorkerOptions {
    pub prompt_context: PromptContext,
    pub fallback: Option<Arc<dyn FallbackStrategy>>,
    /// Which failures abandon this worker for the fallback.
    pub escalate_when: EscalationPredicate,
    pub cancel: CancellationToken,
}

impl WorkerOptions {
    pub fn new(prompt_context: PromptContext) -> Self {
        Self {
            prompt_context,
            fallback: None,
            escalate_when: default_escalation(),
            cancel: CancellationToken::new(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Worker
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct SessionWorker {
    settings: Arc<Settings>,
    client: Arc<dyn CompletionClient>,
    builders: Arc<dyn PromptBuilders>,
    sink: Arc<dyn ObservationSink>,
    directory: Arc<dyn SessionDirectory>,
    options: WorkerOptions,
}

impl SessionWorker {
    pub fn new(
        settings: Arc<Settings>,
        client: Arc<dyn CompletionClient>,
        builders: Arc<dyn PromptBuilders>,
        sink: Arc<dyn ObservationSink>,
        directory: Arc<dyn SessionDirectory>,
        options: WorkerOptions,
    ) -> Self {
        Self {
            settings,
            client,
            builders,
            sink,
            directory,
            options,
        }
    }

    /// Drain `items` for `session`.
    ///
    /// Returns the terminal outcome, or the error itself for configuration
    /// failures and escalation-class failures with no fallback registered.
    pub async fn process_session(
        &self,
        session: Arc<Session>,
        mut items: BoxStream<'static, PendingItem>,
    ) -> Result<SessionOutcome> {
        let session_id = session.session_id().to_owned();

        if self.options.cancel.is_cancelled() {
            TraceEvent::SessionAborted { session_id }.emit();
            return Ok(SessionOutcome::Aborted);
        }

        // ── Initializing ────────────────────────────────────────────
        if let Err(err) = self.resolve_memory_session(&session).await {
            return self.escalate_or_fail(session, err).await;
        }

        // ── InitialTurn ─────────────────────────────────────────────
        // Exactly one sequential call, not under the limiter; its reply is
        // appended and forwarded before any concurrent work begins.
        if let Err(err) = self.initial_turn(&session).await {
            return self.escalate_or_fail(session, err).await;
        }

        // ── StreamingItems ──────────────────────────────────────────
        let worker_cfg = self.settings.snapshot().worker.clamped();
        let limiter = AdmissionLimiter::new(worker_cfg.max_concurrent);
        let mut inflight = InFlightSet::new(limiter.limit());
        let escalation: Arc<Mutex<Option<Error>>> = Arc::new(Mutex::new(None));
        let mut last_cwd: Option<String> = None;
        let mut submitted = 0usize;

        loop {
            if escalation.lock().is_some() {
                break;
            }

            let maybe_item = tokio::select! {
                biased;
                _ = self.options.cancel.cancelled() => {
                    // Already-issued calls may still land their side effects.
                    inflight.detach_all();
                    TraceEvent::SessionAborted { session_id }.emit();
                    return Ok(SessionOutcome::Aborted);
                }
                item = items.next() => item,
            };
            let Some(item) = maybe_item else {
                break;
            };

            let item = propagate_cwd(item, &mut last_cwd);
            let Some(prompt) = dispatch::classify(
                &item,
                &session,
                self.builders.as_ref(),
                &self.options.prompt_context,
            ) else {
                tracing::debug!(kind = item.kind(), "skipping unhandled item kind");
                continue;
            };

            let request = self.build_item_request(&session, &prompt);
            submitted += 1;

            let task = {
                let client = Arc::clone(&self.client);
                let sink = Arc::clone(&self.sink);
                let session = Arc::clone(&session);
                let limiter = limiter.clone();
                let escalate_when = Arc::clone(&self.options.escalate_when);
                let escalation = Arc::clone(&escalation);
                async move {
                    let result = limiter
                        .run(process_one(
                            client.as_ref(),
                            sink.as_ref(),
                            &session,
                            request,
                            &prompt,
                        ))
                        .await;
                    if let Err(err) = result {
                        if escalate_when(&err) {
                            tracing::warn!(
                                kind = prompt.kind,
                                error = %err,
                                "session-level failure, flagging for escalation"
                            );
                            let mut slot = escalation.lock();
                            if slot.is_none() {
                                *slot = Some(err);
                            }
                        } else {
                            let usage = session.usage();
                            tracing::warn!(
                                kind = prompt.kind,
                                error = %err,
                                session_input_tokens = usage.input_tokens,
                                session_output_tokens = usage.output_tokens,
                                "dropping failed item"
                            );
                            TraceEvent::ItemDropped {
                                kind: prompt.kind.to_owned(),
                                error: err.to_string(),
                            }
                            .emit();
                        }
                    }
                }
            };
            inflight.submit(task).await;
        }

        // ── Draining ────────────────────────────────────────────────
        inflight.drain().await;
        TraceEvent::SessionDrained {
            session_id,
            items_submitted: submitted,
        }
        .emit();

        if let Some(err) = escalation.lock().take() {
            return self.escalate_or_fail(session, err).await;
        }

        Ok(SessionOutcome::Completed)
    }

    // ── state helpers ───────────────────────────────────────────────

    /// Read-through resolve of the durable secondary identity; mint and
    /// persist only when no prior run assigned one.
    async fn resolve_memory_session(&self, session: &Arc<Session>) -> Result<()> {
        let session_id = session.session_id();
        let (effective, reused) = match self.directory.load_memory_session_id(session_id).await? {
            Some(existing) => (existing, true),
            None => {
                let minted = uuid::Uuid::new_v4().to_string();
                let effective = self
                    .directory
                    .persist_memory_session_id(session_id, &minted)
                    .await?;
                (effective, false)
            }
        };
        let effective = session.assign_memory_session_id(effective);

        TraceEvent::MemorySessionAssigned {
            session_id: session_id.to_owned(),
            memory_session_id: effective,
            reused,
        }
        .emit();
        Ok(())
    }

    async fn initial_turn(&self, session: &Arc<Session>) -> Result<()> {
        let cfg = self.settings.snapshot();
        let ctx = &self.options.prompt_context;
        let opening = if session.transcript_len() == 0 {
            self.builders.session_opening(ctx)
        } else {
            self.builders.continuation(ctx)
        };

        // The initial turn is the one call built from the full conversation
        // context (truncated), not a two-turn snapshot.
        let mut turns = session.transcript_snapshot();
        turns.push(Turn::user(opening.clone()));
        let turns = context_window::truncate(&turns, &cfg.context);

        let completion = self
            .client
            .complete(CompletionRequest {
                turns,
                model: Some(cfg.provider.model.clone()),
                max_tokens: Some(cfg.provider.max_tokens),
            })
            .await?;

        if completion.text.is_empty() {
            tracing::warn!(
                session_id = session.session_id(),
                "initial turn returned an empty reply"
            );
        }
        session.record_usage(completion.usage);
        session.append_turns(&[Turn::user(opening), Turn::assistant(completion.text.clone())]);
        self.sink
            .process(
                &completion.text,
                session,
                completion.usage,
                None,
                self.client.label(),
                None,
            )
            .await?;
        Ok(())
    }

    fn build_item_request(&self, session: &Session, prompt: &RenderedPrompt) -> CompletionRequest {
        let cfg = self.settings.snapshot();
        let mut turns = session.head(2);
        turns.push(Turn::user(prompt.text.clone()));
        let turns = context_window::truncate(&turns, &cfg.context);
        CompletionRequest {
            turns,
            model: Some(cfg.provider.model.clone()),
            max_tokens: Some(cfg.provider.max_tokens),
        }
    }

    async fn escalate_or_fail(
        &self,
        session: Arc<Session>,
        err: Error,
    ) -> Result<SessionOutcome> {
        if (self.options.escalate_when)(&err) {
            if let Some(fallback) = &self.options.fallback {
                TraceEvent::SessionEscalated {
                    session_id: session.session_id().to_owned(),
                    reason: err.to_string(),
                }
                .emit();
                fallback
                    .start_session(Arc::clone(&session), self.client.label())
                    .await?;
                return Ok(SessionOutcome::Escalated);
            }
        }
        Err(err)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Per-item processing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One item: remote call, counters, transcript append, sink.  Runs inside a
/// limiter slot; any error here is this item's alone.
async fn process_one(
    client: &dyn CompletionClient,
    sink: &dyn ObservationSink,
    session: &Session,
    request: CompletionRequest,
    prompt: &RenderedPrompt,
) -> Result<()> {
    let completion = client.complete(request).await?;
    session.record_usage(completion.usage);
    if completion.text.is_empty() {
        tracing::debug!(kind = prompt.kind, "soft-empty reply");
    }
    session.append_turns(&[
        Turn::user(prompt.text.clone()),
        Turn::assistant(completion.text.clone()),
    ]);
    sink.process(
        &completion.text,
        session,
        completion.usage,
        prompt.created_at_epoch,
        client.label(),
        prompt.cwd.as_deref(),
    )
    .await?;
    session.clear_pending_watermark();
    Ok(())
}

/// Carry the most recently seen cwd onto observations that lack their own.
fn propagate_cwd(item: PendingItem, last_cwd: &mut Option<String>) -> PendingItem {
    match item {
        PendingItem::Observation(mut obs) => {
            match &obs.cwd {
                Some(cwd) => *last_cwd = Some(cwd.clone()),
                None => obs.cwd = last_cwd.clone(),
            }
            PendingItem::Observation(obs)
        }
        other => other,
    }
}
