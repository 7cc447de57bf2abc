//! # Artwalk Common Library
//!
//! Shared code for the Artwalk experience services including:
//! - Event types (HuntEvent enum) broadcast to UI clients
//! - Artwork catalog (fixed registry of collectible artworks)
//! - Common error types
//! - Configuration loading and root folder resolution

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;

pub use catalog::{ArtworkRecord, Catalog};
pub use error::{Error, Result};
pub use events::{ExperiencePhase, HuntEvent, TrackingSignal};
