//! QR ingestion pipeline
//!
//! Samples camera luminance buffers, throttles decode dispatches, and feeds
//! scan outcomes into the experience engine.

pub mod codes;
pub mod ingest;

pub use ingest::{FoundSymbol, LumaFrame, QrDecoder, QrIngest, QrSymbol, ScanOutcome, ScanScheduler};
