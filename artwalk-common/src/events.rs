//! Event types for the Artwalk event system
//!
//! Every state change the UI layer cares about is broadcast as a `HuntEvent`.
//! The `type` tag doubles as the SSE event name, so the variant names here are
//! the wire contract with the UI.

use serde::{Deserialize, Serialize};

/// Tracking quality signal from the AR engine
///
/// Read-only input: the engine reports pose-estimation confidence, the
/// experience layer never writes it back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrackingSignal {
    /// Device pose is uncertain (first launch, low light, featureless walls)
    Limited,
    /// Device pose is well estimated, placement is reliable
    Normal,
}

impl std::fmt::Display for TrackingSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackingSignal::Limited => write!(f, "LIMITED"),
            TrackingSignal::Normal => write!(f, "NORMAL"),
        }
    }
}

/// Serializable summary of the experience state machine variant
///
/// The full machine state carries the artwork record and load progress; this
/// is the flattened phase name sent to UI clients.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExperiencePhase {
    Idle,
    Positioning,
    Loading,
    Viewing,
}

impl std::fmt::Display for ExperiencePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExperiencePhase::Idle => write!(f, "idle"),
            ExperiencePhase::Positioning => write!(f, "positioning"),
            ExperiencePhase::Loading => write!(f, "loading"),
            ExperiencePhase::Viewing => write!(f, "viewing"),
        }
    }
}

/// Artwalk event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HuntEvent {
    /// QR scan pass finished; `code` is None when no symbol was found
    QrScanResult {
        code: Option<String>,
        points: Vec<(f32, f32)>,
        source_width: u32,
        source_height: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Experience state machine changed variant
    ExperienceStateChanged {
        phase: ExperiencePhase,
        artwork_id: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Placement/repositioning started (reticle visible, content not committed)
    RepositioningStarted {
        artwork_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Asset load progress for the committed artwork
    ContentLoadProgress {
        artwork_id: String,
        ratio: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Committed artwork is fully resident and interactive
    ContentLoaded {
        artwork_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Tracking quality passthrough from the AR engine
    TrackingStatusChanged {
        signal: TrackingSignal,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The tracking gate opened; placement may begin.
    /// `fallback` is true when the 5s timeout fired while still LIMITED.
    PlacementUnlocked {
        fallback: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Recorder confirmed capture started
    RecordingStarted {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Recorder progress (elapsed/total, unclamped passthrough)
    RecordingProgress {
        ratio: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Recorder stopped capturing; encoding in progress
    RecordingStopped {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Encoded clip is available; UI should enter media review
    RecordingReady {
        video_url: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Clip discarded, recorder back to idle
    RecordingCleared {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An artwork reached the Viewing state
    ArtworkViewed {
        artwork_id: String,
        newly_viewed: bool,
        viewed_count: usize,
        total_count: usize,
        unlock_reward: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// All non-bonus artworks have been viewed
    HuntCompleted {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Result of the one-shot submission-limit check
    SubmissionLimit {
        reached: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl HuntEvent {
    /// Get event type as string for SSE event naming and filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            HuntEvent::QrScanResult { .. } => "QrScanResult",
            HuntEvent::ExperienceStateChanged { .. } => "ExperienceStateChanged",
            HuntEvent::RepositioningStarted { .. } => "RepositioningStarted",
            HuntEvent::ContentLoadProgress { .. } => "ContentLoadProgress",
            HuntEvent::ContentLoaded { .. } => "ContentLoaded",
            HuntEvent::TrackingStatusChanged { .. } => "TrackingStatusChanged",
            HuntEvent::PlacementUnlocked { .. } => "PlacementUnlocked",
            HuntEvent::RecordingStarted { .. } => "RecordingStarted",
            HuntEvent::RecordingProgress { .. } => "RecordingProgress",
            HuntEvent::RecordingStopped { .. } => "RecordingStopped",
            HuntEvent::RecordingReady { .. } => "RecordingReady",
            HuntEvent::RecordingCleared { .. } => "RecordingCleared",
            HuntEvent::ArtworkViewed { .. } => "ArtworkViewed",
            HuntEvent::HuntCompleted { .. } => "HuntCompleted",
            HuntEvent::SubmissionLimit { .. } => "SubmissionLimit",
        }
    }
}
