//! Content interaction controller
//!
//! Drives the content container's rotation, scale, and pan from pointer
//! input while an artwork is loading or being viewed. All motion is advanced
//! once per frame tick; per-tick steps are scaled by `delta / reference_delta`
//! so gestures feel the same at 30 and 60 fps.
//!
//! Pointer bookkeeping rules:
//! - pointers are tracked by id
//! - the `down` edge flag is cleared after one processing tick, so a fresh
//!   pointer never contributes a movement delta on its first tick
//! - a pointer is removed the tick after its `up` flag is observed
//! - `down` immediately followed by `up` for the same id within one tick
//!   collapses to a no-op

use std::collections::BTreeMap;
use tracing::debug;

/// Which pan axes respond to two-finger dragging
#[derive(Debug, Clone, Copy)]
pub struct AxisMask {
    pub x: bool,
    pub y: bool,
}

/// Tuning constants for the gesture model
#[derive(Debug, Clone)]
pub struct InteractionConfig {
    /// Radians of yaw per pixel of single-pointer drag
    pub rotate_sensitivity: f32,
    /// Whether vertical drag also tilts the content (pitch)
    pub rotate_vertical: bool,
    /// Fraction of flick velocity retained per reference frame
    pub inertia_decay: f32,
    /// Velocity below which the flick stops (radians per reference frame)
    pub inertia_floor: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    /// Fraction of remaining scale distance covered per reference frame
    pub scale_smoothing: f32,
    pub pan_enabled: bool,
    pub pan_axes: AxisMask,
    /// World units of pan per pixel of midpoint displacement
    pub pan_sensitivity: f32,
    /// Pan clamp, world units from the anchor per axis
    pub pan_limit: f32,
    /// The frame duration all per-tick steps are normalized against
    pub reference_delta: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            rotate_sensitivity: 0.008,
            rotate_vertical: false,
            inertia_decay: 0.92,
            inertia_floor: 0.0005,
            min_scale: 0.25,
            max_scale: 4.0,
            scale_smoothing: 0.25,
            pan_enabled: false,
            pan_axes: AxisMask { x: true, y: false },
            pan_sensitivity: 0.002,
            pan_limit: 1.5,
            reference_delta: 1.0 / 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PointerState {
    x: f32,
    y: f32,
    last_x: f32,
    last_y: f32,
    down: bool,
    up: bool,
}

#[derive(Debug, Clone, Copy)]
struct PinchBase {
    distance: f32,
    scale: f32,
}

/// Gesture state for the content container
pub struct InteractionController {
    config: InteractionConfig,
    pointers: BTreeMap<u32, PointerState>,
    yaw: f32,
    pitch: f32,
    yaw_velocity: f32,
    pitch_velocity: f32,
    scale: f32,
    scale_target: f32,
    pinch_base: Option<PinchBase>,
    pan_anchor: Option<(f32, f32)>,
    pan_x: f32,
    pan_y: f32,
}

impl InteractionController {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            config,
            pointers: BTreeMap::new(),
            yaw: 0.0,
            pitch: 0.0,
            yaw_velocity: 0.0,
            pitch_velocity: 0.0,
            scale: 1.0,
            scale_target: 1.0,
            pinch_base: None,
            pan_anchor: None,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }

    pub fn pointer_down(&mut self, id: u32, x: f32, y: f32) {
        self.pointers.insert(
            id,
            PointerState {
                x,
                y,
                last_x: x,
                last_y: y,
                down: true,
                up: false,
            },
        );
    }

    pub fn pointer_move(&mut self, id: u32, x: f32, y: f32) {
        match self.pointers.get_mut(&id) {
            Some(p) => {
                p.x = x;
                p.y = y;
            }
            None => debug!("move for untracked pointer {}", id),
        }
    }

    pub fn pointer_up(&mut self, id: u32) {
        match self.pointers.get_mut(&id) {
            Some(p) => p.up = true,
            None => debug!("up for untracked pointer {}", id),
        }
    }

    /// Advance the gesture model by one frame
    pub fn update(&mut self, delta_seconds: f32) {
        let norm = (delta_seconds / self.config.reference_delta).max(0.0);

        // down+up within the same tick: the pointer never becomes active
        self.pointers.retain(|_, p| !(p.down && p.up));

        let held: Vec<u32> = self
            .pointers
            .iter()
            .filter(|(_, p)| !p.up)
            .map(|(id, _)| *id)
            .collect();

        match held.len() {
            0 => self.advance_inertia(norm),
            1 => self.advance_drag(held[0], norm),
            _ => self.advance_pinch(held[0], held[1]),
        }

        // Ease scale toward target, frame-rate independent
        let alpha = (self.config.scale_smoothing * norm).min(1.0);
        self.scale += (self.scale_target - self.scale) * alpha;

        // End-of-tick bookkeeping: down edges expire, movement deltas are
        // consumed, released pointers leave the registry
        for p in self.pointers.values_mut() {
            p.down = false;
            p.last_x = p.x;
            p.last_y = p.y;
        }
        self.pointers.retain(|_, p| !p.up);
    }

    fn advance_drag(&mut self, id: u32, norm: f32) {
        self.pinch_base = None;
        self.pan_anchor = None;

        let p = self.pointers[&id];
        if p.down {
            // Fresh pointer: no delta on its first tick
            self.yaw_velocity = 0.0;
            self.pitch_velocity = 0.0;
            return;
        }

        let dx = p.x - p.last_x;
        let dy = p.y - p.last_y;

        let yaw_step = dx * self.config.rotate_sensitivity;
        self.yaw += yaw_step;
        self.yaw_velocity = if norm > 0.0 { yaw_step / norm } else { 0.0 };

        if self.config.rotate_vertical {
            let pitch_step = dy * self.config.rotate_sensitivity;
            self.pitch += pitch_step;
            self.pitch_velocity = if norm > 0.0 { pitch_step / norm } else { 0.0 };
        }
    }

    fn advance_inertia(&mut self, norm: f32) {
        self.pinch_base = None;
        self.pan_anchor = None;

        self.yaw += self.yaw_velocity * norm;
        self.pitch += self.pitch_velocity * norm;

        let decay = self.config.inertia_decay.powf(norm);
        self.yaw_velocity *= decay;
        self.pitch_velocity *= decay;

        if self.yaw_velocity.abs() < self.config.inertia_floor {
            self.yaw_velocity = 0.0;
        }
        if self.pitch_velocity.abs() < self.config.inertia_floor {
            self.pitch_velocity = 0.0;
        }
    }

    fn advance_pinch(&mut self, a: u32, b: u32) {
        // Grabbing with two fingers stops any flick
        self.yaw_velocity = 0.0;
        self.pitch_velocity = 0.0;

        let pa = self.pointers[&a];
        let pb = self.pointers[&b];
        let distance = ((pa.x - pb.x).powi(2) + (pa.y - pb.y).powi(2)).sqrt();
        let midpoint = ((pa.x + pb.x) / 2.0, (pa.y + pb.y) / 2.0);

        if pa.down || pb.down || self.pinch_base.is_none() {
            // Gesture (re)starts: rebase, no delta this tick
            self.pinch_base = Some(PinchBase {
                distance: distance.max(f32::EPSILON),
                scale: self.scale_target,
            });
            self.pan_anchor = Some(midpoint);
            return;
        }

        let base = self.pinch_base.unwrap();
        self.scale_target = (base.scale * distance / base.distance)
            .clamp(self.config.min_scale, self.config.max_scale);

        if self.config.pan_enabled {
            if let Some(anchor) = self.pan_anchor {
                if self.config.pan_axes.x {
                    self.pan_x = (self.pan_x
                        + (midpoint.0 - anchor.0) * self.config.pan_sensitivity)
                        .clamp(-self.config.pan_limit, self.config.pan_limit);
                }
                if self.config.pan_axes.y {
                    self.pan_y = (self.pan_y
                        + (midpoint.1 - anchor.1) * self.config.pan_sensitivity)
                        .clamp(-self.config.pan_limit, self.config.pan_limit);
                }
            }
            self.pan_anchor = Some(midpoint);
        }
    }

    /// Drop all gesture state; called when content is cleared
    pub fn reset(&mut self) {
        self.pointers.clear();
        self.yaw = 0.0;
        self.pitch = 0.0;
        self.yaw_velocity = 0.0;
        self.pitch_velocity = 0.0;
        self.scale = 1.0;
        self.scale_target = 1.0;
        self.pinch_base = None;
        self.pan_anchor = None;
        self.pan_x = 0.0;
        self.pan_y = 0.0;
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn pan(&self) -> (f32, f32) {
        (self.pan_x, self.pan_y)
    }

    pub fn active_pointer_count(&self) -> usize {
        self.pointers.len()
    }
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(InteractionConfig::default())
    }
}
