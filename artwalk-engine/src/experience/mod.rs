//! Experience orchestration
//!
//! `machine` holds the pure state machine, `interaction` the gesture model,
//! `reticle` the placement cursor, and `engine` the async orchestrator that
//! wires them to the renderer, the QR pipeline, and the event bus.

pub mod engine;
pub mod interaction;
pub mod machine;
pub mod reticle;

pub use engine::{EngineSnapshot, ExperienceEngine, UiCommand};
pub use machine::{Effect, ExperienceInput, ExperienceMachine, ExperienceState, PointerSample};
