//! Renderer-facing contract
//!
//! The 3D/AR renderer is an external collaborator. The engine talks to it
//! through two mpsc channels: commands out, events in. The engine is the only
//! component permitted to send content add/remove commands, so the loaded
//! asset has a single owner.

use artwalk_common::events::TrackingSignal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A point on a detected surface, in world coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfacePoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl SurfacePoint {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Linear interpolation toward `target` by factor `t` in [0,1]
    pub fn lerp(self, target: SurfacePoint, t: f32) -> SurfacePoint {
        let t = t.clamp(0.0, 1.0);
        SurfacePoint {
            x: self.x + (target.x - self.x) * t,
            y: self.y + (target.y - self.y) * t,
            z: self.z + (target.z - self.z) * t,
        }
    }
}

/// Commands accepted by the renderer
#[derive(Debug, Clone, PartialEq)]
pub enum RendererCommand {
    /// Move the placement reticle to follow a detected surface
    SetReticle { point: SurfacePoint },

    /// Begin async load of an artwork asset, anchored at `anchor`, facing the
    /// camera. The renderer echoes `generation` back in load events so stale
    /// completions can be discarded.
    LoadArtwork {
        artwork_id: String,
        anchor: SurfacePoint,
        generation: u64,
    },

    /// Remove and dispose the current content (asset, audio, GPU handles)
    RemoveContent,

    PauseAudio,
    ResumeAudio,
    PauseTracking,
    ResumeTracking,

    StartRecording,
    StopRecording,
}

/// Events emitted by the renderer
#[derive(Debug, Clone)]
pub enum RendererEvent {
    /// Pose-estimation quality changed
    TrackingStatus { signal: TrackingSignal },

    /// A surface was hit under the screen-center ray this frame
    SurfaceHit { point: SurfacePoint },

    /// Asset load progress for the load stamped with `generation`
    LoadProgress { generation: u64, ratio: f32 },

    /// Asset fully resident for the load stamped with `generation`
    LoadComplete { generation: u64 },

    /// Per-frame animation tick
    FrameTick { delta_seconds: f32 },

    RecordingStarted,
    RecordingProgress { elapsed_ms: u64, total_ms: u64 },
    RecordingStopped,
    /// Encoded clip bytes
    RecordingReady { data: Vec<u8> },
}

/// Create the command/event channel pair shared with the renderer host
pub fn renderer_channels() -> (
    mpsc::UnboundedSender<RendererCommand>,
    mpsc::UnboundedReceiver<RendererCommand>,
    mpsc::UnboundedSender<RendererEvent>,
    mpsc::UnboundedReceiver<RendererEvent>,
) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    (cmd_tx, cmd_rx, event_tx, event_rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_midpoint() {
        let a = SurfacePoint::new(0.0, 0.0, 0.0);
        let b = SurfacePoint::new(2.0, 4.0, -2.0);

        let mid = a.lerp(b, 0.5);
        assert_eq!(mid, SurfacePoint::new(1.0, 2.0, -1.0));
    }

    #[test]
    fn test_lerp_clamps_factor() {
        let a = SurfacePoint::new(0.0, 0.0, 0.0);
        let b = SurfacePoint::new(1.0, 1.0, 1.0);

        assert_eq!(a.lerp(b, 2.0), b);
        assert_eq!(a.lerp(b, -1.0), a);
    }
}
