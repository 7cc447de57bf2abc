//! Experience state machine
//!
//! The sole authority over which artwork (if any) is currently placed or
//! visible. The machine itself is synchronous and side-effect free: each
//! dispatch applies one transition and returns the effects the surrounding
//! engine must execute (renderer commands, event broadcasts). That keeps
//! every transition atomic and the whole table unit-testable without a
//! runtime.
//!
//! Unmatched (state, event) pairs are logged no-ops. A strict-mode machine
//! instead returns `Error::InvalidTransition`, so tests can assert that
//! illegal transitions are rejected.

use crate::error::{Error, Result};
use crate::experience::reticle::Reticle;
use crate::render::SurfacePoint;
use artwalk_common::catalog::ArtworkRecord;
use artwalk_common::events::ExperiencePhase;
use tracing::warn;

/// The core state value. Exactly one variant is active at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum ExperienceState {
    /// No artwork selected
    Idle,
    /// Reticle follows detected surfaces; content not committed
    Positioning { artwork: ArtworkRecord },
    /// Asset being fetched/decoded; progress in [0,1], monotonic
    Loading { artwork: ArtworkRecord, progress: f32 },
    /// Content placed and interactive
    Viewing { artwork: ArtworkRecord },
}

impl ExperienceState {
    pub fn phase(&self) -> ExperiencePhase {
        match self {
            ExperienceState::Idle => ExperiencePhase::Idle,
            ExperienceState::Positioning { .. } => ExperiencePhase::Positioning,
            ExperienceState::Loading { .. } => ExperiencePhase::Loading,
            ExperienceState::Viewing { .. } => ExperiencePhase::Viewing,
        }
    }

    pub fn artwork(&self) -> Option<&ArtworkRecord> {
        match self {
            ExperienceState::Idle => None,
            ExperienceState::Positioning { artwork }
            | ExperienceState::Loading { artwork, .. }
            | ExperienceState::Viewing { artwork } => Some(artwork),
        }
    }
}

/// A pointer event forwarded to the interaction controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerSample {
    Down { id: u32, x: f32, y: f32 },
    Move { id: u32, x: f32, y: f32 },
    Up { id: u32 },
}

/// Inputs accepted by the machine
#[derive(Debug, Clone)]
pub enum ExperienceInput {
    /// Enter positioning for an artwork (tracking gate already passed)
    RequestPlacement { artwork: ArtworkRecord },
    /// A surface point was detected under the screen-center ray
    SurfaceUpdate { point: SurfacePoint },
    /// User confirmed placement. None anchors at the current reticle
    /// position; an explicit point overrides it.
    CommitPlacement { point: Option<SurfacePoint> },
    /// Asset load progress from the renderer
    LoadProgress { ratio: f32 },
    /// Asset fully resident
    LoadComplete,
    /// Re-enter positioning, preserving the current artwork
    RequestReposition,
    /// Pointer input while content is on screen
    Pointer(PointerSample),
    /// Drop the current artwork and release its resources
    ClearArtwork,
}

impl ExperienceInput {
    fn name(&self) -> &'static str {
        match self {
            ExperienceInput::RequestPlacement { .. } => "RequestPlacement",
            ExperienceInput::SurfaceUpdate { .. } => "SurfaceUpdate",
            ExperienceInput::CommitPlacement { .. } => "CommitPlacement",
            ExperienceInput::LoadProgress { .. } => "LoadProgress",
            ExperienceInput::LoadComplete => "LoadComplete",
            ExperienceInput::RequestReposition => "RequestReposition",
            ExperienceInput::Pointer(_) => "Pointer",
            ExperienceInput::ClearArtwork => "ClearArtwork",
        }
    }
}

/// Side effects the engine must execute after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Placement overlay/reticle became active for this artwork
    AnnounceRepositioning { artwork_id: String },
    /// Reticle moved (already smoothed)
    MoveReticle { point: SurfacePoint },
    /// Begin async asset load, anchored at `anchor` facing the camera
    BeginAssetLoad { artwork: ArtworkRecord, anchor: SurfacePoint },
    /// Progress changed (post-monotonic-filter value)
    AnnounceLoadProgress { artwork_id: String, ratio: f32 },
    /// Content fully resident and interactive
    AnnounceLoaded { artwork_id: String },
    /// Forward to the interaction controller
    ForwardPointer(PointerSample),
    /// Dispose the loaded asset and reset interaction
    DisposeContent,
}

/// The experience state machine
pub struct ExperienceMachine {
    state: ExperienceState,
    reticle: Reticle,
    strict: bool,
}

impl ExperienceMachine {
    pub fn new() -> Self {
        Self {
            state: ExperienceState::Idle,
            reticle: Reticle::new(),
            strict: false,
        }
    }

    /// A machine that rejects unsupported (state, event) pairs with an error
    /// instead of logging. Used by test harnesses.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::new()
        }
    }

    pub fn state(&self) -> &ExperienceState {
        &self.state
    }

    pub fn phase(&self) -> ExperiencePhase {
        self.state.phase()
    }

    /// Current reticle position, if a surface has been seen this session
    pub fn reticle_position(&self) -> Option<SurfacePoint> {
        self.reticle.position()
    }

    /// Apply one input. Returns the effects to execute, or
    /// `Error::InvalidTransition` in strict mode for unsupported pairs.
    pub fn dispatch(&mut self, input: ExperienceInput) -> Result<Vec<Effect>> {
        match (&self.state, input) {
            (ExperienceState::Idle, ExperienceInput::RequestPlacement { artwork }) => {
                self.reticle.clear();
                let effects = vec![Effect::AnnounceRepositioning {
                    artwork_id: artwork.id.clone(),
                }];
                self.state = ExperienceState::Positioning { artwork };
                Ok(effects)
            }

            (ExperienceState::Positioning { .. }, ExperienceInput::SurfaceUpdate { point }) => {
                let smoothed = self.reticle.advance(point);
                Ok(vec![Effect::MoveReticle { point: smoothed }])
            }

            (ExperienceState::Positioning { artwork }, ExperienceInput::CommitPlacement { point }) => {
                // Guard: a valid surface point must exist, either carried by
                // the commit or previously observed by the reticle
                let Some(anchor) = point.or_else(|| self.reticle.position()) else {
                    warn!("commit ignored: no surface detected yet");
                    return Ok(vec![]);
                };
                let artwork = artwork.clone();
                self.state = ExperienceState::Loading {
                    artwork: artwork.clone(),
                    progress: 0.0,
                };
                Ok(vec![Effect::BeginAssetLoad { artwork, anchor }])
            }

            (ExperienceState::Loading { artwork, progress }, ExperienceInput::LoadProgress { ratio }) => {
                // Monotonic non-decreasing within a load session
                let artwork = artwork.clone();
                let next = ratio.clamp(0.0, 1.0).max(*progress);
                let artwork_id = artwork.id.clone();
                self.state = ExperienceState::Loading {
                    artwork,
                    progress: next,
                };
                Ok(vec![Effect::AnnounceLoadProgress {
                    artwork_id,
                    ratio: next,
                }])
            }

            (ExperienceState::Loading { artwork, .. }, ExperienceInput::LoadComplete) => {
                let artwork = artwork.clone();
                let effects = vec![Effect::AnnounceLoaded {
                    artwork_id: artwork.id.clone(),
                }];
                self.state = ExperienceState::Viewing { artwork };
                Ok(effects)
            }

            (ExperienceState::Viewing { artwork }, ExperienceInput::RequestReposition) => {
                let artwork = artwork.clone();
                self.reticle.clear();
                let effects = vec![Effect::AnnounceRepositioning {
                    artwork_id: artwork.id.clone(),
                }];
                self.state = ExperienceState::Positioning { artwork };
                Ok(effects)
            }

            (
                ExperienceState::Loading { .. } | ExperienceState::Viewing { .. },
                ExperienceInput::Pointer(sample),
            ) => Ok(vec![Effect::ForwardPointer(sample)]),

            (
                ExperienceState::Loading { .. } | ExperienceState::Viewing { .. },
                ExperienceInput::ClearArtwork,
            ) => {
                self.reticle.clear();
                self.state = ExperienceState::Idle;
                Ok(vec![Effect::DisposeContent])
            }

            // Abandoning placement: nothing was loaded, nothing to dispose
            (ExperienceState::Positioning { .. }, ExperienceInput::ClearArtwork) => {
                self.reticle.clear();
                self.state = ExperienceState::Idle;
                Ok(vec![])
            }

            (state, input) => {
                if self.strict {
                    return Err(Error::InvalidTransition(format!(
                        "{} in phase '{}'",
                        input.name(),
                        state.phase()
                    )));
                }
                warn!("ignoring {} in phase '{}'", input.name(), state.phase());
                Ok(vec![])
            }
        }
    }
}

impl Default for ExperienceMachine {
    fn default() -> Self {
        Self::new()
    }
}
