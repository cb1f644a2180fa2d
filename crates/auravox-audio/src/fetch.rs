//! Fetch coordination: at most one synthesis call per live segment.
//!
//! [`FetchCoordinator::resolve`] is the single entry point for both
//! navigation and prefetch. It consults the cache, joins an in-flight
//! fetch for the same segment when one exists, and otherwise becomes the
//! producer for that segment. Joiners wait on a `watch` channel the
//! producer settles exactly once.
//!
//! # Locking discipline
//!
//! All bookkeeping (`context`, cache, in-flight registry) lives behind a
//! single `std::sync::Mutex` that is never held across an `.await`. The
//! cache/registry check and the pending-entry insert happen under one
//! lock acquisition, so two concurrent callers for the same segment can
//! never both become producers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use auravox_core::{SpeechSynthesizer, SynthesisError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::{AudioCache, AudioHandle, ReadingContext};

// ── In-flight registry ─────────────────────────────────────────────

/// What a settled fetch produced. `None` covers every failure mode; the
/// producer has already logged the specifics.
#[derive(Debug, Clone)]
enum FetchOutcome {
    Pending,
    Settled(Option<AudioHandle>),
}

#[derive(Debug)]
struct PendingFetch {
    context: ReadingContext,
    rx: watch::Receiver<FetchOutcome>,
}

#[derive(Debug)]
struct FetchState {
    context: Option<ReadingContext>,
    cache: AudioCache,
    inflight: HashMap<usize, PendingFetch>,
}

enum Role {
    Joiner(watch::Receiver<FetchOutcome>),
    Producer {
        context: ReadingContext,
        tx: watch::Sender<FetchOutcome>,
    },
}

// ── Coordinator ────────────────────────────────────────────────────

/// Deduplicating fetch front for the [`SpeechSynthesizer`] port.
///
/// Shared by the session and its prefetch tasks behind an `Arc`.
pub struct FetchCoordinator {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    timeout: Duration,
    state: Mutex<FetchState>,
}

impl FetchCoordinator {
    /// `timeout` bounds each synthesis call; `cache_capacity` bounds the
    /// number of clips kept warm.
    #[must_use]
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        timeout: Duration,
        cache_capacity: usize,
    ) -> Self {
        Self {
            synthesizer,
            timeout,
            state: Mutex::new(FetchState {
                context: None,
                cache: AudioCache::new(cache_capacity),
                inflight: HashMap::new(),
            }),
        }
    }

    /// Switch to a new reading context.
    ///
    /// Clips and pending entries from any other context are dropped
    /// immediately; fetches already running for the old context are left
    /// to finish but their results will fail the context check on
    /// completion and be discarded. Setting the current context again is
    /// a no-op. Returns whether the context actually changed.
    pub fn set_context(&self, context: ReadingContext) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.context.as_ref() == Some(&context) {
            return false;
        }
        let released = state.cache.retain_context(&context);
        state.inflight.retain(|_, pending| pending.context == context);
        info!(
            document_id = %context.document_id,
            voice_id = %context.voice_id,
            released,
            "reading context changed"
        );
        state.context = Some(context);
        true
    }

    /// Non-blocking cache probe under the current context.
    #[must_use]
    pub fn peek_cached(&self, index: usize) -> Option<AudioHandle> {
        let state = self.state.lock().unwrap();
        let context = state.context.as_ref()?;
        state.cache.get(context, index)
    }

    /// Resolve audio for segment `index` with body `text`.
    ///
    /// Returns the clip on success and `None` on any failure (logged, not
    /// surfaced). `None` is also returned when no context is set or when
    /// the context changes while the fetch is in flight.
    pub async fn resolve(&self, index: usize, text: &str) -> Option<AudioHandle> {
        let role = {
            let mut state = self.state.lock().unwrap();
            let Some(context) = state.context.clone() else {
                debug!(index, "resolve without a reading context");
                return None;
            };
            if let Some(handle) = state.cache.get(&context, index) {
                return Some(handle);
            }
            match state.inflight.get(&index) {
                Some(pending) if pending.context == context => Role::Joiner(pending.rx.clone()),
                _ => {
                    let (tx, rx) = watch::channel(FetchOutcome::Pending);
                    state.inflight.insert(
                        index,
                        PendingFetch {
                            context: context.clone(),
                            rx,
                        },
                    );
                    Role::Producer { context, tx }
                }
            }
        };

        match role {
            Role::Joiner(mut rx) => {
                debug!(index, "joining in-flight fetch");
                match rx
                    .wait_for(|outcome| matches!(outcome, FetchOutcome::Settled(_)))
                    .await
                {
                    Ok(outcome) => match &*outcome {
                        FetchOutcome::Settled(handle) => handle.clone(),
                        FetchOutcome::Pending => None,
                    },
                    // Producer dropped without settling (cancelled).
                    Err(_) => None,
                }
            }
            Role::Producer { context, tx } => self.produce(index, text, context, tx).await,
        }
    }

    async fn produce(
        &self,
        index: usize,
        text: &str,
        context: ReadingContext,
        tx: watch::Sender<FetchOutcome>,
    ) -> Option<AudioHandle> {
        // If this future is dropped mid-synthesis the registry entry must
        // still come out, or the segment would be stuck joinable forever.
        let guard = RegistryGuard {
            coordinator: self,
            index,
            context: context.clone(),
            armed: true,
        };

        let outcome = tokio::time::timeout(
            self.timeout,
            self.synthesizer.synthesize(text, &context.voice_id),
        )
        .await;

        let handle = match outcome {
            Ok(Ok(clip)) => Some(Arc::new(clip)),
            Ok(Err(SynthesisError::EmptyInput)) => {
                debug!(index, "segment has no speakable text");
                None
            }
            Ok(Err(err)) => {
                warn!(index, error = %err, "synthesis failed");
                None
            }
            Err(_) => {
                warn!(index, timeout_secs = self.timeout.as_secs(), "synthesis timed out");
                None
            }
        };

        let result = {
            let mut state = self.state.lock().unwrap();
            guard.remove_entry(&mut state);
            if state.context.as_ref() == Some(&context) {
                if let Some(handle) = &handle {
                    state.cache.insert(context, index, Arc::clone(handle));
                }
                handle
            } else {
                // Stale producer: the clip (if any) drops right here.
                debug!(index, "context changed mid-fetch, discarding result");
                None
            }
        };
        guard.disarm();

        let _ = tx.send(FetchOutcome::Settled(result.clone()));
        result
    }

    fn remove_inflight(&self, index: usize, context: &ReadingContext) {
        let mut state = self.state.lock().unwrap();
        remove_matching(&mut state, index, context);
    }
}

impl std::fmt::Debug for FetchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCoordinator")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Only remove the entry this producer owns. A newer entry for the same
/// index under a fresher context must survive.
fn remove_matching(state: &mut FetchState, index: usize, context: &ReadingContext) {
    if state
        .inflight
        .get(&index)
        .is_some_and(|pending| pending.context == *context)
    {
        state.inflight.remove(&index);
    }
}

struct RegistryGuard<'a> {
    coordinator: &'a FetchCoordinator,
    index: usize,
    context: ReadingContext,
    armed: bool,
}

impl RegistryGuard<'_> {
    fn remove_entry(&self, state: &mut FetchState) {
        remove_matching(state, self.index, &self.context);
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for RegistryGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.coordinator.remove_inflight(self.index, &self.context);
        }
    }
}
