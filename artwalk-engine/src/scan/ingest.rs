//! QR frame ingestion with throttling
//!
//! Decoding a frame is CPU-expensive; overlapping decodes would starve the
//! render loop. The scheduler enforces two policies:
//! - at most one decode in flight (new frames are dropped, never queued)
//! - at least `1000 / scans_per_second` ms between dispatches
//!
//! Decode failures are treated the same as "no symbol found": the pipeline
//! emits None and releases the in-flight slot.

use crate::error::Result;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A decoded QR symbol
#[derive(Debug, Clone)]
pub struct QrSymbol {
    pub text: String,
    /// Corner points in source-pixel coordinates
    pub points: Vec<(f32, f32)>,
    /// Decoder confidence
    pub quality: f32,
}

/// A camera luminance buffer
#[derive(Debug, Clone)]
pub struct LumaFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// External QR symbol decoder, run on a blocking worker thread
pub trait QrDecoder: Send + Sync + 'static {
    fn scan_grayscale(&self, data: &[u8], width: u32, height: u32) -> Result<Vec<QrSymbol>>;
}

/// The first symbol found in a frame
#[derive(Debug, Clone)]
pub struct FoundSymbol {
    pub text: String,
    pub points: Vec<(f32, f32)>,
}

/// Result of one decode pass
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// None when the frame contained no decodable symbol (or decode failed)
    pub found: Option<FoundSymbol>,
    pub source_width: u32,
    pub source_height: u32,
}

/// Pure dispatch policy: rate throttle + single decode in flight
#[derive(Debug)]
pub struct ScanScheduler {
    min_interval: Duration,
    last_dispatch: Option<Instant>,
    in_flight: bool,
}

impl ScanScheduler {
    pub fn new(scans_per_second: f64) -> Self {
        let rate = if scans_per_second > 0.0 {
            scans_per_second
        } else {
            crate::config::DEFAULT_SCANS_PER_SECOND
        };
        Self {
            min_interval: Duration::from_secs_f64(1.0 / rate),
            last_dispatch: None,
            in_flight: false,
        }
    }

    /// Decide whether a decode may be dispatched at `now`.
    /// On true, the caller owns the in-flight slot until `finish()`.
    pub fn try_begin(&mut self, now: Instant) -> bool {
        if self.in_flight {
            return false;
        }
        if let Some(last) = self.last_dispatch {
            if now.duration_since(last) < self.min_interval {
                return false;
            }
        }
        self.last_dispatch = Some(now);
        self.in_flight = true;
        true
    }

    /// Release the in-flight slot; called on every completion path
    pub fn finish(&mut self) {
        self.in_flight = false;
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }
}

/// Async shell around the scheduler and the external decoder
pub struct QrIngest {
    decoder: Arc<dyn QrDecoder>,
    scheduler: Arc<Mutex<ScanScheduler>>,
    results_tx: mpsc::UnboundedSender<ScanOutcome>,
}

impl QrIngest {
    pub fn new(
        decoder: Arc<dyn QrDecoder>,
        scans_per_second: f64,
        results_tx: mpsc::UnboundedSender<ScanOutcome>,
    ) -> Self {
        Self {
            decoder,
            scheduler: Arc::new(Mutex::new(ScanScheduler::new(scans_per_second))),
            results_tx,
        }
    }

    /// Offer a camera frame to the pipeline.
    ///
    /// Returns true when a decode was dispatched; false when the frame was
    /// dropped (decode pending, or scan interval not yet elapsed).
    pub fn offer_frame(&self, frame: LumaFrame) -> bool {
        {
            let mut scheduler = self.scheduler.lock().unwrap();
            if !scheduler.try_begin(Instant::now()) {
                return false;
            }
        }

        let decoder = Arc::clone(&self.decoder);
        let scheduler = Arc::clone(&self.scheduler);
        let results_tx = self.results_tx.clone();
        let (width, height) = (frame.width, frame.height);

        tokio::spawn(async move {
            let decode = tokio::task::spawn_blocking(move || {
                decoder.scan_grayscale(&frame.data, frame.width, frame.height)
            })
            .await;

            let found = match decode {
                Ok(Ok(symbols)) => {
                    // First detected symbol wins; the rest are ignored
                    symbols.into_iter().next().map(|s| FoundSymbol {
                        text: s.text,
                        points: s.points,
                    })
                }
                Ok(Err(e)) => {
                    warn!("QR decode failed: {}", e);
                    None
                }
                Err(e) => {
                    warn!("QR decode task aborted: {}", e);
                    None
                }
            };

            // Release the slot before publishing so the next eligible frame
            // is never turned away by a decode that already resolved.
            scheduler.lock().unwrap().finish();

            if results_tx
                .send(ScanOutcome {
                    found,
                    source_width: width,
                    source_height: height,
                })
                .is_err()
            {
                debug!("scan outcome dropped: engine stopped");
            }
        });

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> LumaFrame {
        LumaFrame {
            width: 640,
            height: 480,
            data: vec![0u8; 640 * 480],
        }
    }

    struct FixedDecoder {
        symbols: Vec<QrSymbol>,
    }

    impl QrDecoder for FixedDecoder {
        fn scan_grayscale(&self, _data: &[u8], _w: u32, _h: u32) -> Result<Vec<QrSymbol>> {
            Ok(self.symbols.clone())
        }
    }

    struct FailingDecoder;

    impl QrDecoder for FailingDecoder {
        fn scan_grayscale(&self, _data: &[u8], _w: u32, _h: u32) -> Result<Vec<QrSymbol>> {
            Err(crate::error::Error::Internal("decoder exploded".to_string()))
        }
    }

    /// Decoder that blocks until released, to hold the in-flight slot open
    struct BlockingDecoder {
        release: Mutex<std::sync::mpsc::Receiver<()>>,
    }

    impl QrDecoder for BlockingDecoder {
        fn scan_grayscale(&self, _data: &[u8], _w: u32, _h: u32) -> Result<Vec<QrSymbol>> {
            self.release.lock().unwrap().recv().ok();
            Ok(vec![])
        }
    }

    #[test]
    fn test_scheduler_enforces_rate() {
        let mut scheduler = ScanScheduler::new(2.0); // 500ms interval
        let start = Instant::now();

        assert!(scheduler.try_begin(start));
        scheduler.finish();

        // Too soon
        assert!(!scheduler.try_begin(start + Duration::from_millis(100)));
        assert!(!scheduler.try_begin(start + Duration::from_millis(499)));

        // Interval elapsed
        assert!(scheduler.try_begin(start + Duration::from_millis(500)));
    }

    #[test]
    fn test_scheduler_single_decode_in_flight() {
        let mut scheduler = ScanScheduler::new(1000.0); // effectively no rate limit
        let start = Instant::now();

        assert!(scheduler.try_begin(start));
        // Slot held: even far in the future, no second dispatch
        assert!(!scheduler.try_begin(start + Duration::from_secs(60)));

        scheduler.finish();
        assert!(scheduler.try_begin(start + Duration::from_secs(60)));
    }

    #[test]
    fn test_scheduler_bounded_dispatch_count() {
        // Frames offered every 10ms for 2 simulated seconds at 2 scans/s:
        // at most ceil(2.0 * 2) = 4 dispatches.
        let mut scheduler = ScanScheduler::new(2.0);
        let start = Instant::now();
        let mut dispatched = 0;

        for tick in 0..200 {
            let now = start + Duration::from_millis(10 * tick);
            if scheduler.try_begin(now) {
                dispatched += 1;
                scheduler.finish();
            }
        }

        assert!(dispatched <= 4, "dispatched {} times", dispatched);
        assert!(dispatched >= 3);
    }

    #[tokio::test]
    async fn test_found_symbol_emitted() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let decoder = Arc::new(FixedDecoder {
            symbols: vec![QrSymbol {
                text: "AW02".to_string(),
                points: vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)],
                quality: 0.9,
            }],
        });
        let ingest = QrIngest::new(decoder, 2.0, tx);

        assert!(ingest.offer_frame(frame()));

        let outcome = rx.recv().await.unwrap();
        let found = outcome.found.unwrap();
        assert_eq!(found.text, "AW02");
        assert_eq!(outcome.source_width, 640);
    }

    #[tokio::test]
    async fn test_zero_symbols_emits_none_and_releases_slot() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ingest = QrIngest::new(Arc::new(FixedDecoder { symbols: vec![] }), 1_000_000.0, tx);

        assert!(ingest.offer_frame(frame()));
        let outcome = rx.recv().await.unwrap();
        assert!(outcome.found.is_none());

        // No decode pending: the next frame is permitted immediately
        assert!(ingest.offer_frame(frame()));
        assert!(rx.recv().await.unwrap().found.is_none());
    }

    #[tokio::test]
    async fn test_decode_error_treated_as_none() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ingest = QrIngest::new(Arc::new(FailingDecoder), 1_000_000.0, tx);

        assert!(ingest.offer_frame(frame()));
        let outcome = rx.recv().await.unwrap();
        assert!(outcome.found.is_none());

        // Error path released the in-flight slot
        assert!(ingest.offer_frame(frame()));
        assert!(rx.recv().await.unwrap().found.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_frames_dropped_while_decode_pending() {
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ingest = QrIngest::new(
            Arc::new(BlockingDecoder {
                release: Mutex::new(release_rx),
            }),
            1_000_000.0,
            tx,
        );

        assert!(ingest.offer_frame(frame()));
        // Decode is blocked inside the worker: these frames must be dropped
        assert!(!ingest.offer_frame(frame()));
        assert!(!ingest.offer_frame(frame()));

        release_tx.send(()).unwrap();
        assert!(rx.recv().await.unwrap().found.is_none());

        // Slot released after completion
        assert!(ingest.offer_frame(frame()));
        release_tx.send(()).unwrap();
        assert!(rx.recv().await.unwrap().found.is_none());
    }
}
