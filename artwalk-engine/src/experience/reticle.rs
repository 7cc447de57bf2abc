//! Placement reticle
//!
//! During positioning the reticle follows detected surface geometry. It is
//! smoothed toward each new surface point rather than snapped, so jittery
//! plane detection does not make the cursor shake.

use crate::render::SurfacePoint;

/// Fraction of the distance to the target covered per surface update
const DEFAULT_SMOOTHING: f32 = 0.35;

#[derive(Debug, Clone)]
pub struct Reticle {
    position: Option<SurfacePoint>,
    smoothing: f32,
}

impl Reticle {
    pub fn new() -> Self {
        Self {
            position: None,
            smoothing: DEFAULT_SMOOTHING,
        }
    }

    /// Advance toward a newly detected surface point and return the smoothed
    /// cursor position. The first point snaps (there is nothing to ease from).
    pub fn advance(&mut self, target: SurfacePoint) -> SurfacePoint {
        let next = match self.position {
            None => target,
            Some(current) => current.lerp(target, self.smoothing),
        };
        self.position = Some(next);
        next
    }

    /// Current cursor position; None until a surface has been seen
    pub fn position(&self) -> Option<SurfacePoint> {
        self.position
    }

    /// Forget the surface; placement requires a fresh hit afterwards
    pub fn clear(&mut self) {
        self.position = None;
    }
}

impl Default for Reticle {
    fn default() -> Self {
        Self::new()
    }
}
