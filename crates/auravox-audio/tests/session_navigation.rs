//! End-to-end session behavior over a scripted synthesizer: request
//! coalescing, last-wins navigation, prefetch, voice changes, and
//! resource release.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use async_trait::async_trait;
use auravox_audio::{
    LoadingHint, OpenDocument, ReaderConfig, ReaderEvent, ReaderSession, VisibleState,
};
use auravox_core::{
    AudioClip, NoopPositionStore, PositionStore, PositionStoreError, SegmentStore,
    SpeechSynthesizer, SynthesisError,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tokio::time::sleep;

// ── Scripted synthesizer ───────────────────────────────────────────

/// Returns each text's bytes as its "audio". Individual texts can be
/// gated so tests control when their fetch completes.
#[derive(Default)]
struct FakeSynthesizer {
    calls: Mutex<Vec<(String, String)>>,
    gates: Mutex<HashMap<String, watch::Receiver<bool>>>,
}

impl FakeSynthesizer {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Block synthesis of `text` until the returned sender fires `true`.
    fn gate(&self, text: &str) -> watch::Sender<bool> {
        let (tx, rx) = watch::channel(false);
        self.gates.lock().unwrap().insert(text.to_string(), rx);
        tx
    }

    fn calls_for(&self, text: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == text)
            .count()
    }

    fn voices_used_for(&self, text: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == text)
            .map(|(_, voice)| voice.clone())
            .collect()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<AudioClip, SynthesisError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), voice_id.to_string()));
        let gate = self.gates.lock().unwrap().get(text).cloned();
        if let Some(mut rx) = gate {
            let _ = rx.wait_for(|open| *open).await;
        }
        Ok(AudioClip {
            bytes: text.as_bytes().to_vec(),
            sample_rate: 24_000,
            duration: Duration::from_millis(5),
        })
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn segment_text(index: usize) -> String {
    format!("segmento {index} con texto de prueba")
}

fn document(segments: usize, last_position: usize) -> OpenDocument {
    OpenDocument {
        id: "doc-1".to_string(),
        store: SegmentStore::from_texts((0..segments).map(segment_text)),
        last_position,
        bookmarks: Vec::new(),
    }
}

fn session_over(
    synth: Arc<FakeSynthesizer>,
) -> (Arc<ReaderSession>, UnboundedReceiver<ReaderEvent>) {
    let (session, rx) = ReaderSession::new(
        ReaderConfig::default(),
        synth,
        Arc::new(NoopPositionStore),
    );
    (Arc::new(session), rx)
}

fn drain(rx: &mut UnboundedReceiver<ReaderEvent>) -> Vec<ReaderEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn audio_text(visible: &VisibleState) -> String {
    String::from_utf8(visible.audio.as_ref().expect("audio present").bytes.clone()).unwrap()
}

/// Long enough for spawned prefetch tasks to settle against an ungated
/// fake synthesizer.
async fn settle() {
    sleep(Duration::from_millis(50)).await;
}

// ── Coalescing ─────────────────────────────────────────────────────

#[tokio::test]
async fn manual_navigation_joins_an_in_flight_prefetch() {
    let synth = FakeSynthesizer::new();
    let release = synth.gate(&segment_text(1));
    let (session, _rx) = session_over(Arc::clone(&synth));

    // Opening at 0 starts a prefetch for segment 1 that blocks on the gate.
    session.open_document(document(5, 0)).await.unwrap();
    sleep(Duration::from_millis(20)).await;
    assert_eq!(synth.calls_for(&segment_text(1)), 1);

    let navigating = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.navigate(1).await })
    };
    sleep(Duration::from_millis(20)).await;
    release.send(true).unwrap();
    navigating.await.unwrap().unwrap();

    assert_eq!(synth.calls_for(&segment_text(1)), 1);
    assert_eq!(audio_text(&session.visible_state()), segment_text(1));
}

// ── Last wins ──────────────────────────────────────────────────────

#[tokio::test]
async fn latest_navigation_wins_regardless_of_completion_order() {
    let synth = FakeSynthesizer::new();
    let gate_2 = synth.gate(&segment_text(2));
    let gate_5 = synth.gate(&segment_text(5));
    let gate_3 = synth.gate(&segment_text(3));
    let (session, mut rx) = session_over(Arc::clone(&synth));
    session.open_document(document(10, 0)).await.unwrap();
    settle().await;
    drain(&mut rx);

    let mut pending = Vec::new();
    for target in [2usize, 5, 3] {
        let session = Arc::clone(&session);
        pending.push(tokio::spawn(async move { session.navigate(target).await }));
        sleep(Duration::from_millis(20)).await;
    }

    // Completion order deliberately differs from issue order.
    gate_5.send(true).unwrap();
    gate_2.send(true).unwrap();
    gate_3.send(true).unwrap();
    for task in pending {
        task.await.unwrap().unwrap();
    }
    settle().await;

    let visible = session.visible_state();
    assert_eq!(visible.active_index, 3);
    assert_eq!(audio_text(&visible), segment_text(3));
    assert!(!visible.is_loading);

    let ready: Vec<usize> = drain(&mut rx)
        .into_iter()
        .filter_map(|event| match event {
            ReaderEvent::SegmentReady { index } => Some(index),
            _ => None,
        })
        .collect();
    assert!(ready.contains(&3));
    assert!(!ready.contains(&2) && !ready.contains(&5));

    // Superseded results stayed cached: revisiting costs no new call.
    session.navigate(5).await.unwrap();
    assert_eq!(synth.calls_for(&segment_text(5)), 1);
    assert_eq!(audio_text(&session.visible_state()), segment_text(5));
}

#[tokio::test]
async fn stale_prefetch_primes_the_cache_but_not_the_screen() {
    let synth = FakeSynthesizer::new();
    let gate_3 = synth.gate(&segment_text(3));
    let (session, _rx) = session_over(Arc::clone(&synth));
    session.open_document(document(10, 0)).await.unwrap();
    settle().await;

    // Advancing to 1 prefetches 2 (instant) and 3 (gated).
    assert!(session.advance().await.unwrap());
    sleep(Duration::from_millis(20)).await;
    assert_eq!(synth.calls_for(&segment_text(3)), 1);

    // Jump away while 3 is still in flight, then let it finish late.
    session.navigate(7).await.unwrap();
    gate_3.send(true).unwrap();
    settle().await;

    let visible = session.visible_state();
    assert_eq!(visible.active_index, 7);
    assert_eq!(audio_text(&visible), segment_text(7));

    // The late result went into the cache, not the screen.
    session.navigate(3).await.unwrap();
    assert_eq!(synth.calls_for(&segment_text(3)), 1);
    assert_eq!(audio_text(&session.visible_state()), segment_text(3));
}

// ── Prefetch ───────────────────────────────────────────────────────

#[tokio::test]
async fn prefetched_advance_needs_no_loading_indicator() {
    let synth = FakeSynthesizer::new();
    let (session, mut rx) = session_over(Arc::clone(&synth));
    session.open_document(document(5, 0)).await.unwrap();
    settle().await;
    drain(&mut rx);

    assert!(session.advance().await.unwrap());

    assert_eq!(synth.calls_for(&segment_text(1)), 1);
    let events = drain(&mut rx);
    assert!(
        !events.contains(&ReaderEvent::Loading { index: 1 }),
        "cache hit must not flash a loading state, got {events:?}"
    );
    assert!(events.contains(&ReaderEvent::SegmentReady { index: 1 }));
    assert_eq!(audio_text(&session.visible_state()), segment_text(1));
}

#[tokio::test]
async fn lookahead_fills_next_audio_and_primes_one_more() {
    let synth = FakeSynthesizer::new();
    let (session, mut rx) = session_over(Arc::clone(&synth));
    session.open_document(document(5, 0)).await.unwrap();
    settle().await;

    let visible = session.visible_state();
    let next = visible.next_audio.expect("next segment prefetched");
    assert_eq!(next.bytes, segment_text(1).as_bytes());
    assert_eq!(synth.calls_for(&segment_text(2)), 1);
    assert!(drain(&mut rx).contains(&ReaderEvent::NextSegmentReady { index: 1 }));
}

// ── Context changes ────────────────────────────────────────────────

#[tokio::test]
async fn voice_change_refetches_with_the_new_voice() {
    let synth = FakeSynthesizer::new();
    let (session, mut rx) = session_over(Arc::clone(&synth));
    session.open_document(document(3, 0)).await.unwrap();
    settle().await;
    drain(&mut rx);

    session.set_voice("voice_pepe").await.unwrap();
    settle().await;

    let voices = synth.voices_used_for(&segment_text(0));
    assert_eq!(voices.len(), 2);
    assert_eq!(voices[1], "voice_pepe");
    assert!(drain(&mut rx).contains(&ReaderEvent::VoiceChanged {
        voice_id: "voice_pepe".to_string()
    }));
    assert_eq!(audio_text(&session.visible_state()), segment_text(0));
}

#[tokio::test]
async fn selecting_the_current_voice_changes_nothing() {
    let synth = FakeSynthesizer::new();
    let (session, mut rx) = session_over(Arc::clone(&synth));
    session.open_document(document(3, 0)).await.unwrap();
    settle().await;
    let calls_before = synth.calls_for(&segment_text(0));
    drain(&mut rx);

    let current = session.settings().voice;
    session.set_voice(&current).await.unwrap();
    settle().await;

    assert_eq!(synth.calls_for(&segment_text(0)), calls_before);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn voice_change_releases_clips_from_the_old_voice() {
    let synth = FakeSynthesizer::new();
    let (session, _rx) = session_over(Arc::clone(&synth));
    session.open_document(document(3, 0)).await.unwrap();
    settle().await;

    let (weak_audio, weak_next): (Weak<AudioClip>, Weak<AudioClip>) = {
        let visible = session.visible_state();
        (
            Arc::downgrade(visible.audio.as_ref().unwrap()),
            Arc::downgrade(visible.next_audio.as_ref().unwrap()),
        )
    };

    session.set_voice("voice_pepe").await.unwrap();
    settle().await;

    assert!(weak_audio.upgrade().is_none(), "old active clip still alive");
    assert!(weak_next.upgrade().is_none(), "old lookahead clip still alive");
}

// ── Documents and edges ────────────────────────────────────────────

#[tokio::test]
async fn open_resumes_at_the_clamped_saved_position() {
    let synth = FakeSynthesizer::new();
    let (session, mut rx) = session_over(Arc::clone(&synth));

    session.open_document(document(3, 99)).await.unwrap();
    settle().await;

    assert_eq!(session.visible_state().active_index, 2);
    assert!(drain(&mut rx).contains(&ReaderEvent::DocumentOpened {
        document_id: "doc-1".to_string(),
        segments: 3,
    }));
}

#[tokio::test]
async fn advance_past_the_end_reports_end_of_document() {
    let synth = FakeSynthesizer::new();
    let (session, mut rx) = session_over(Arc::clone(&synth));
    session.open_document(document(1, 0)).await.unwrap();
    settle().await;
    drain(&mut rx);

    assert!(!session.advance().await.unwrap());

    assert_eq!(session.visible_state().active_index, 0);
    assert!(drain(&mut rx).contains(&ReaderEvent::EndOfDocument));
}

#[tokio::test]
async fn previous_on_the_first_segment_stays_put() {
    let synth = FakeSynthesizer::new();
    let (session, _rx) = session_over(Arc::clone(&synth));
    session.open_document(document(3, 0)).await.unwrap();

    assert!(!session.previous().await.unwrap());
    assert_eq!(session.visible_state().active_index, 0);
}

#[tokio::test]
async fn navigation_without_a_document_is_an_error() {
    let synth = FakeSynthesizer::new();
    let (session, _rx) = session_over(synth);

    assert!(session.navigate(0).await.is_err());
    assert!(session.advance().await.is_err());
}

#[tokio::test]
async fn out_of_bounds_navigation_is_rejected() {
    let synth = FakeSynthesizer::new();
    let (session, _rx) = session_over(Arc::clone(&synth));
    session.open_document(document(3, 0)).await.unwrap();
    settle().await;

    assert!(session.navigate(3).await.is_err());
    assert_eq!(session.visible_state().active_index, 0);
}

#[tokio::test]
async fn unspeakable_segment_navigates_silently() {
    let synth = FakeSynthesizer::new();
    let (session, mut rx) = session_over(Arc::clone(&synth));
    let doc = OpenDocument {
        id: "doc-1".to_string(),
        store: SegmentStore::from_texts(["hola mundo entero", "x", "tercer segmento aqui"]),
        last_position: 0,
        bookmarks: Vec::new(),
    };
    session.open_document(doc).await.unwrap();
    settle().await;
    drain(&mut rx);

    session.navigate(1).await.unwrap();
    settle().await;

    let visible = session.visible_state();
    assert_eq!(visible.active_index, 1);
    assert!(visible.audio.is_none());
    assert_eq!(visible.hint, LoadingHint::Idle);
    assert_eq!(synth.calls_for("x"), 0);
    let events = drain(&mut rx);
    assert!(!events.iter().any(|e| matches!(e, ReaderEvent::SegmentFailed { .. })));
}

// ── Bookmarks ──────────────────────────────────────────────────────

#[tokio::test]
async fn bookmarks_toggle_and_stay_sorted() {
    let synth = FakeSynthesizer::new();
    let (session, mut rx) = session_over(Arc::clone(&synth));
    session.open_document(document(5, 0)).await.unwrap();
    settle().await;
    drain(&mut rx);

    assert!(session.toggle_bookmark(3).unwrap());
    assert!(session.toggle_bookmark(1).unwrap());
    assert_eq!(session.bookmarks(), vec![1, 3]);
    assert!(session.is_bookmarked(3));

    assert!(!session.toggle_bookmark(3).unwrap());
    assert_eq!(session.bookmarks(), vec![1]);

    let events = drain(&mut rx);
    assert!(events.contains(&ReaderEvent::BookmarkToggled {
        index: 3,
        bookmarked: true
    }));
    assert!(events.contains(&ReaderEvent::BookmarkToggled {
        index: 3,
        bookmarked: false
    }));
}

// ── Persistence ────────────────────────────────────────────────────

mockall::mock! {
    Positions {}

    #[async_trait]
    impl PositionStore for Positions {
        async fn save_position(
            &self,
            document_id: &str,
            index: usize,
        ) -> Result<(), PositionStoreError>;

        async fn save_bookmarks(
            &self,
            document_id: &str,
            bookmarks: &[usize],
        ) -> Result<(), PositionStoreError>;
    }
}

#[tokio::test]
async fn accepted_navigations_persist_the_position() {
    let mut positions = MockPositions::new();
    positions
        .expect_save_position()
        .withf(|document_id, index| document_id == "doc-1" && (*index == 0 || *index == 2))
        .times(2..)
        .returning(|_, _| Ok(()));
    positions
        .expect_save_bookmarks()
        .withf(|document_id, bookmarks| document_id == "doc-1" && bookmarks == [2usize].as_slice())
        .times(1)
        .returning(|_, _| Ok(()));

    let synth = FakeSynthesizer::new();
    let (session, _rx) = ReaderSession::new(
        ReaderConfig::default(),
        synth,
        Arc::new(positions),
    );
    session.open_document(document(3, 0)).await.unwrap();
    session.navigate(2).await.unwrap();
    session.toggle_bookmark(2).unwrap();
    settle().await;
}
