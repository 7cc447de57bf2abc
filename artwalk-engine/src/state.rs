//! Shared experience state
//!
//! Thread-safe shared state for coordination between the experience engine,
//! the API handlers, and the SSE broadcaster. Constructed once in `main` and
//! injected into every component that needs it.

use artwalk_common::events::{HuntEvent, TrackingSignal};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, RwLock};

/// Shared state accessible by all components
///
/// Uses RwLock for concurrent read access with rare writes; boolean flags
/// that flip from async completions are atomics.
pub struct SharedState {
    /// Latest tracking quality reported by the AR engine
    pub tracking_signal: RwLock<TrackingSignal>,

    /// Event broadcaster for SSE events
    pub event_tx: broadcast::Sender<HuntEvent>,

    /// True once a recorded clip is ready; the outer UI shows media review
    media_review: AtomicBool,

    /// Result of the one-shot submission-limit check (false until checked)
    submission_limit_reached: AtomicBool,
}

impl SharedState {
    /// Create new shared state with default values
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100); // Buffer up to 100 events
        Self {
            // Tracking starts LIMITED until the engine reports otherwise
            tracking_signal: RwLock::new(TrackingSignal::Limited),
            event_tx,
            media_review: AtomicBool::new(false),
            submission_limit_reached: AtomicBool::new(false),
        }
    }

    /// Broadcast an event to all SSE listeners
    pub fn broadcast_event(&self, event: HuntEvent) {
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to event stream for SSE
    pub fn subscribe_events(&self) -> broadcast::Receiver<HuntEvent> {
        self.event_tx.subscribe()
    }

    /// Get current tracking signal
    pub async fn get_tracking_signal(&self) -> TrackingSignal {
        *self.tracking_signal.read().await
    }

    /// Set current tracking signal
    pub async fn set_tracking_signal(&self, signal: TrackingSignal) {
        *self.tracking_signal.write().await = signal;
    }

    pub fn set_media_review(&self, active: bool) {
        self.media_review.store(active, Ordering::Release);
    }

    pub fn media_review(&self) -> bool {
        self.media_review.load(Ordering::Acquire)
    }

    pub fn set_submission_limit_reached(&self, reached: bool) {
        self.submission_limit_reached.store(reached, Ordering::Release);
    }

    pub fn submission_limit_reached(&self) -> bool {
        self.submission_limit_reached.load(Ordering::Acquire)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
