//! The reading session: navigation, prefetch, and the state the UI sees.
//!
//! Navigation is last-wins. Every accepted navigation mints a token; a
//! resolution only mutates [`VisibleState`] if its token is still the
//! newest when it lands. Superseded resolutions stay in the cache (the
//! work is not wasted) but never touch what the user sees.
//!
//! # Locking discipline
//!
//! `SessionState` sits behind a `std::sync::Mutex` that is never held
//! across an `.await`. Decisions (target index, token, loading
//! presentation) are made under one lock acquisition, the fetch runs
//! unlocked, and the result is applied under a second acquisition guarded
//! by the token check.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use auravox_core::{
    PositionStore, ReaderSettings, SearchHit, SegmentStore, SpeechSynthesizer,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cache::{AudioHandle, ReadingContext};
use crate::error::ReaderError;
use crate::fetch::FetchCoordinator;
use crate::stats::{self, ReadingStats};

// ── Public surface types ───────────────────────────────────────────

/// Tuning for a [`ReaderSession`].
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Initial voice and playback speed.
    pub settings: ReaderSettings,
    /// Maximum number of clips kept warm in the cache.
    pub cache_capacity: usize,
    /// Upper bound on a single synthesis call.
    pub synthesis_timeout: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            settings: ReaderSettings::default(),
            cache_capacity: 16,
            synthesis_timeout: Duration::from_secs(30),
        }
    }
}

/// A document handed to [`ReaderSession::open_document`].
#[derive(Debug, Clone)]
pub struct OpenDocument {
    /// Stable identifier, also the key for position persistence.
    pub id: String,
    /// The document's segments.
    pub store: SegmentStore,
    /// Segment index to resume from (clamped to the document).
    pub last_position: usize,
    /// Previously saved bookmarks.
    pub bookmarks: Vec<usize>,
}

/// How the active segment is doing, for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadingHint {
    /// Nothing requested yet, or the segment had nothing to say.
    Idle,
    /// A fetch for the active segment is in flight.
    Fetching,
    /// The active segment's audio is ready.
    Ready,
    /// The newest fetch for the active segment failed.
    Failed,
}

/// Snapshot of what the UI should currently present.
///
/// `audio` and `next_audio` only ever hold clips whose context matches
/// the session's current document and voice.
#[derive(Debug, Clone)]
pub struct VisibleState {
    /// Segment the user is on.
    pub active_index: usize,
    /// Audio for the active segment, once resolved.
    pub audio: Option<AudioHandle>,
    /// Prefetched audio for the following segment, for gapless playback.
    pub next_audio: Option<AudioHandle>,
    /// Whether a loading indicator should show for the active segment.
    pub is_loading: bool,
    /// Finer-grained presentation hint.
    pub hint: LoadingHint,
}

impl Default for VisibleState {
    fn default() -> Self {
        Self {
            active_index: 0,
            audio: None,
            next_audio: None,
            is_loading: false,
            hint: LoadingHint::Idle,
        }
    }
}

/// Events emitted on the session's channel, in occurrence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    /// A document was opened (or reopened).
    DocumentOpened { document_id: String, segments: usize },
    /// The voice changed; cached audio for the old voice was dropped.
    VoiceChanged { voice_id: String },
    /// A fetch for the active segment started and the UI should show it.
    Loading { index: usize },
    /// The active segment's audio became available.
    SegmentReady { index: usize },
    /// Lookahead audio for `index` is warm in `next_audio`.
    NextSegmentReady { index: usize },
    /// The newest fetch for the active segment failed.
    SegmentFailed { index: usize },
    /// `advance` was called on the last segment.
    EndOfDocument,
    /// A bookmark was added or removed.
    BookmarkToggled { index: usize, bookmarked: bool },
}

// ── Session ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum NavigationKind {
    /// User jumped here. Clear the old audio and show loading at once.
    Manual,
    /// Natural progression. Keep the screen quiet unless there is an
    /// actual wait.
    Sequential,
}

#[derive(Debug)]
struct SessionState {
    document_id: Option<String>,
    store: SegmentStore,
    settings: ReaderSettings,
    bookmarks: BTreeSet<usize>,
    token: u64,
    visible: VisibleState,
}

/// One user's reading session over one synthesizer.
///
/// All methods take `&self`; wrap the session in an `Arc` to share it
/// with a UI layer.
pub struct ReaderSession {
    coordinator: Arc<FetchCoordinator>,
    state: Arc<Mutex<SessionState>>,
    events: mpsc::UnboundedSender<ReaderEvent>,
    positions: Arc<dyn PositionStore>,
}

impl ReaderSession {
    /// Create a session and the receiving end of its event channel.
    #[must_use]
    pub fn new(
        config: ReaderConfig,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        positions: Arc<dyn PositionStore>,
    ) -> (Self, mpsc::UnboundedReceiver<ReaderEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let session = Self {
            coordinator: Arc::new(FetchCoordinator::new(
                synthesizer,
                config.synthesis_timeout,
                config.cache_capacity,
            )),
            state: Arc::new(Mutex::new(SessionState {
                document_id: None,
                store: SegmentStore::default(),
                settings: config.settings.clamped(),
                bookmarks: BTreeSet::new(),
                token: 0,
                visible: VisibleState::default(),
            })),
            events,
            positions,
        };
        (session, rx)
    }

    // ── Documents ──────────────────────────────────────────────────

    /// Open `document` and resume at its saved position.
    ///
    /// Reopening the currently open document with the same voice keeps
    /// the cache; anything else invalidates clips from the old context.
    pub async fn open_document(&self, document: OpenDocument) -> Result<(), ReaderError> {
        let segments = document.store.len();
        let (start, voice_id) = {
            let mut state = self.state.lock().unwrap();
            let start = if segments == 0 {
                0
            } else {
                document.last_position.min(segments - 1)
            };
            state.document_id = Some(document.id.clone());
            state.store = document.store;
            state.bookmarks = document
                .bookmarks
                .into_iter()
                .filter(|&index| index < segments)
                .collect();
            state.visible = VisibleState {
                active_index: start,
                ..VisibleState::default()
            };
            (start, state.settings.voice.clone())
        };

        self.coordinator.set_context(ReadingContext {
            document_id: document.id.clone(),
            voice_id,
        });
        info!(document_id = %document.id, segments, start, "document opened");
        self.emit(ReaderEvent::DocumentOpened {
            document_id: document.id,
            segments,
        });

        if segments > 0 {
            self.navigate_inner(start, NavigationKind::Manual).await?;
        }
        Ok(())
    }

    /// The id of the open document, if any.
    #[must_use]
    pub fn document_id(&self) -> Option<String> {
        self.state.lock().unwrap().document_id.clone()
    }

    // ── Navigation ─────────────────────────────────────────────────

    /// Jump to an arbitrary segment. Clears the current audio and shows
    /// the loading indicator immediately.
    pub async fn navigate(&self, index: usize) -> Result<(), ReaderError> {
        self.navigate_inner(index, NavigationKind::Manual).await
    }

    /// Move to the next segment. Returns `Ok(false)` (and emits
    /// [`ReaderEvent::EndOfDocument`]) when already on the last one.
    pub async fn advance(&self) -> Result<bool, ReaderError> {
        let target = {
            let state = self.state.lock().unwrap();
            if state.document_id.is_none() {
                return Err(ReaderError::NoDocument);
            }
            let next = state.visible.active_index + 1;
            (next < state.store.len()).then_some(next)
        };
        match target {
            Some(index) => {
                self.navigate_inner(index, NavigationKind::Sequential).await?;
                Ok(true)
            }
            None => {
                self.emit(ReaderEvent::EndOfDocument);
                Ok(false)
            }
        }
    }

    /// Move to the previous segment. Returns `Ok(false)` when already on
    /// the first one.
    pub async fn previous(&self) -> Result<bool, ReaderError> {
        let target = {
            let state = self.state.lock().unwrap();
            if state.document_id.is_none() {
                return Err(ReaderError::NoDocument);
            }
            state.visible.active_index.checked_sub(1)
        };
        match target {
            Some(index) => {
                self.navigate_inner(index, NavigationKind::Manual).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ── Settings ───────────────────────────────────────────────────

    /// Switch voices. Audio for the old voice is invalidated and the
    /// active segment is re-fetched with the new one. Selecting the
    /// current voice is a no-op.
    pub async fn set_voice(&self, voice_id: &str) -> Result<(), ReaderError> {
        let resume = {
            let mut state = self.state.lock().unwrap();
            if state.settings.voice == voice_id {
                return Ok(());
            }
            state.settings.voice = voice_id.to_string();
            state
                .document_id
                .clone()
                .map(|document_id| (document_id, state.visible.active_index))
        };

        self.emit(ReaderEvent::VoiceChanged {
            voice_id: voice_id.to_string(),
        });

        if let Some((document_id, index)) = resume {
            self.coordinator.set_context(ReadingContext {
                document_id,
                voice_id: voice_id.to_string(),
            });
            self.navigate_inner(index, NavigationKind::Manual).await?;
        }
        Ok(())
    }

    /// Set the playback speed, clamped to the supported range. Affects
    /// remaining-time estimates only; the audio itself is speed-agnostic.
    pub fn set_speed(&self, speed: f32) {
        let mut state = self.state.lock().unwrap();
        state.settings.speed = speed.clamp(auravox_core::MIN_SPEED, auravox_core::MAX_SPEED);
    }

    /// Current settings snapshot.
    #[must_use]
    pub fn settings(&self) -> ReaderSettings {
        self.state.lock().unwrap().settings.clone()
    }

    // ── Bookmarks ──────────────────────────────────────────────────

    /// Toggle the bookmark on `index`. Returns whether the segment is
    /// bookmarked afterwards. The new set is persisted fire-and-forget.
    pub fn toggle_bookmark(&self, index: usize) -> Result<bool, ReaderError> {
        let (document_id, bookmarked, snapshot) = {
            let mut state = self.state.lock().unwrap();
            let document_id = state.document_id.clone().ok_or(ReaderError::NoDocument)?;
            if index >= state.store.len() {
                return Err(ReaderError::IndexOutOfBounds {
                    index,
                    len: state.store.len(),
                });
            }
            let bookmarked = if state.bookmarks.remove(&index) {
                false
            } else {
                state.bookmarks.insert(index);
                true
            };
            let snapshot: Vec<usize> = state.bookmarks.iter().copied().collect();
            (document_id, bookmarked, snapshot)
        };

        self.emit(ReaderEvent::BookmarkToggled { index, bookmarked });
        let positions = Arc::clone(&self.positions);
        tokio::spawn(async move {
            if let Err(err) = positions.save_bookmarks(&document_id, &snapshot).await {
                debug!(error = %err, "bookmark save failed");
            }
        });
        Ok(bookmarked)
    }

    /// Bookmarked segment indices in ascending order.
    #[must_use]
    pub fn bookmarks(&self) -> Vec<usize> {
        self.state.lock().unwrap().bookmarks.iter().copied().collect()
    }

    /// Whether `index` is bookmarked.
    #[must_use]
    pub fn is_bookmarked(&self, index: usize) -> bool {
        self.state.lock().unwrap().bookmarks.contains(&index)
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Case-insensitive search over the open document's segments.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        self.state.lock().unwrap().store.search(query)
    }

    /// Snapshot of the presentation state.
    #[must_use]
    pub fn visible_state(&self) -> VisibleState {
        self.state.lock().unwrap().visible.clone()
    }

    /// Progress and remaining-time estimate at the current speed.
    #[must_use]
    pub fn reading_stats(&self) -> ReadingStats {
        let state = self.state.lock().unwrap();
        stats::reading_stats(&state.store, state.visible.active_index, state.settings.speed)
    }

    // ── Internals ──────────────────────────────────────────────────

    async fn navigate_inner(&self, index: usize, kind: NavigationKind) -> Result<(), ReaderError> {
        let (token, document_id, text) = {
            let mut state = self.state.lock().unwrap();
            let document_id = state.document_id.clone().ok_or(ReaderError::NoDocument)?;
            let segment = state.store.get(index).ok_or(ReaderError::IndexOutOfBounds {
                index,
                len: state.store.len(),
            })?;
            let text = segment.text.clone();

            state.token += 1;
            let token = state.token;
            state.visible.active_index = index;
            state.visible.next_audio = None;

            let cached = self.coordinator.peek_cached(index).is_some();
            let show_loading = match kind {
                NavigationKind::Manual => {
                    state.visible.audio = None;
                    true
                }
                NavigationKind::Sequential => !cached,
            };
            if show_loading {
                state.visible.is_loading = true;
                state.visible.hint = LoadingHint::Fetching;
                self.emit(ReaderEvent::Loading { index });
            }
            (token, document_id, text)
        };

        if !has_speakable_text(&text) {
            // Nothing to say. The navigation itself still counts.
            let mut state = self.state.lock().unwrap();
            if state.token == token {
                state.visible.audio = None;
                state.visible.is_loading = false;
                state.visible.hint = LoadingHint::Idle;
            }
            drop(state);
            self.persist_position(document_id, index);
            self.spawn_prefetch(token, index);
            return Ok(());
        }

        let handle = self.coordinator.resolve(index, &text).await;

        {
            let mut state = self.state.lock().unwrap();
            if state.token != token {
                debug!(index, "navigation superseded, result not applied");
                return Ok(());
            }
            state.visible.is_loading = false;
            match handle {
                Some(handle) => {
                    state.visible.audio = Some(handle);
                    state.visible.hint = LoadingHint::Ready;
                    self.emit(ReaderEvent::SegmentReady { index });
                }
                None => {
                    state.visible.hint = LoadingHint::Failed;
                    self.emit(ReaderEvent::SegmentFailed { index });
                }
            }
        }

        self.persist_position(document_id, index);
        self.spawn_prefetch(token, index);
        Ok(())
    }

    /// Warm the lookahead: the next segment feeds `next_audio` for
    /// gapless playback, the one after only primes the cache. Both run
    /// detached so navigation latency never includes them.
    fn spawn_prefetch(&self, token: u64, index: usize) {
        let (next, after_next) = {
            let state = self.state.lock().unwrap();
            let text_at = |i: usize| {
                state
                    .store
                    .get(i)
                    .map(|segment| segment.text.clone())
                    .filter(|text| has_speakable_text(text))
            };
            (text_at(index + 1), text_at(index + 2))
        };

        if let Some(text) = next {
            let coordinator = Arc::clone(&self.coordinator);
            let state = Arc::clone(&self.state);
            let events = self.events.clone();
            tokio::spawn(async move {
                let Some(handle) = coordinator.resolve(index + 1, &text).await else {
                    return;
                };
                let mut state = state.lock().unwrap();
                if state.token == token && state.visible.next_audio.is_none() {
                    state.visible.next_audio = Some(handle);
                    let _ = events.send(ReaderEvent::NextSegmentReady { index: index + 1 });
                }
            });
        }

        if let Some(text) = after_next {
            let coordinator = Arc::clone(&self.coordinator);
            tokio::spawn(async move {
                // Cache-priming only; the handle is dropped on purpose.
                let _ = coordinator.resolve(index + 2, &text).await;
            });
        }
    }

    fn persist_position(&self, document_id: String, index: usize) {
        let positions = Arc::clone(&self.positions);
        tokio::spawn(async move {
            if let Err(err) = positions.save_position(&document_id, index).await {
                debug!(error = %err, "position save failed");
            }
        });
    }

    fn emit(&self, event: ReaderEvent) {
        // A dropped receiver means nobody is listening; that is fine.
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for ReaderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderSession")
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

/// Mirror of the adapter-side sanitization threshold: fewer than two
/// non-whitespace characters is treated as silence, not an error.
fn has_speakable_text(text: &str) -> bool {
    text.trim().chars().count() >= 2
}
