//! Video recording lifecycle
//!
//! A strict four-state machine mirroring the external recorder's event
//! stream: idle → recording → encoding → ready, cycling back to idle on
//! clear. The recorder is the source of truth: its events always apply, with
//! a warning when they arrive in an unexpected state. Caller-invoked
//! operations are the opposite: invalid-state invocation is a programmer
//! error and returns `Error::InvalidState`.

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Platform media capability: registers clips under revocable URLs and
/// shares/saves them on request
pub trait MediaStore: Send + Sync {
    /// Register a clip and return a revocable URL for it.
    /// Implementations log registration failures and still return the URL
    /// they would have used.
    fn register(&self, data: &[u8]) -> String;

    /// Release the resources behind a previously registered URL
    fn revoke(&self, url: &str);

    /// Package the clip as a file and invoke the platform share/save flow
    fn share(&self, filename: &str, data: &[u8]) -> Result<()>;
}

/// A retained, encoded clip with its revocable URL
pub struct ClipHandle {
    pub url: String,
    pub data: Arc<Vec<u8>>,
}

/// Recording lifecycle state
pub enum RecordingState {
    /// No capture in progress, no retained clip
    Idle,
    /// Capturing; progress is elapsed/total, pass-through from the recorder
    Recording { progress: f64 },
    /// Capture stopped, encoder still working
    Encoding,
    /// Encoded clip retained until cleared
    Ready { clip: ClipHandle },
}

impl RecordingState {
    pub fn phase_name(&self) -> &'static str {
        match self {
            RecordingState::Idle => "none",
            RecordingState::Recording { .. } => "recording",
            RecordingState::Encoding => "encoding",
            RecordingState::Ready { .. } => "ready",
        }
    }
}

/// Drives `RecordingState` from recorder events and exposes the operations
/// valid in each state
pub struct RecordingLifecycle {
    state: RecordingState,
    store: Arc<dyn MediaStore>,
}

impl RecordingLifecycle {
    pub fn new(store: Arc<dyn MediaStore>) -> Self {
        Self {
            state: RecordingState::Idle,
            store,
        }
    }

    pub fn state(&self) -> &RecordingState {
        &self.state
    }

    /// Validate that a capture may start. The actual transition happens when
    /// the recorder confirms with its `started` event.
    pub fn request_start(&self) -> Result<()> {
        match self.state {
            RecordingState::Idle => Ok(()),
            _ => Err(Error::InvalidState(format!(
                "startRecording invalid in state '{}'",
                self.state.phase_name()
            ))),
        }
    }

    /// Validate that a capture may stop
    pub fn request_stop(&self) -> Result<()> {
        match self.state {
            RecordingState::Recording { .. } => Ok(()),
            _ => Err(Error::InvalidState(format!(
                "stopRecording invalid in state '{}'",
                self.state.phase_name()
            ))),
        }
    }

    /// Recorder confirmed capture started
    pub fn on_started(&mut self) {
        if !matches!(self.state, RecordingState::Idle) {
            warn!(
                "recorder reported 'started' while in state '{}'; following the recorder",
                self.state.phase_name()
            );
        }
        self.release_clip();
        self.state = RecordingState::Recording { progress: 0.0 };
    }

    /// Recorder progress update; returns the new ratio when applied.
    /// Values are not clamped here, the recorder owns their meaning.
    pub fn on_progress(&mut self, elapsed_ms: u64, total_ms: u64) -> Option<f64> {
        match &mut self.state {
            RecordingState::Recording { progress } => {
                *progress = if total_ms == 0 {
                    0.0
                } else {
                    elapsed_ms as f64 / total_ms as f64
                };
                Some(*progress)
            }
            _ => {
                debug!(
                    "recorder progress ignored in state '{}'",
                    self.state.phase_name()
                );
                None
            }
        }
    }

    /// Recorder stopped capturing; encoding begins
    pub fn on_stopped(&mut self) {
        if !matches!(self.state, RecordingState::Recording { .. }) {
            warn!(
                "recorder reported 'stopped' while in state '{}'; following the recorder",
                self.state.phase_name()
            );
        }
        self.state = RecordingState::Encoding;
    }

    /// Encoded clip arrived; retain it behind a revocable URL
    pub fn on_ready(&mut self, data: Vec<u8>) {
        if !matches!(self.state, RecordingState::Encoding) {
            warn!(
                "recorder reported 'ready' while in state '{}'; following the recorder",
                self.state.phase_name()
            );
        }
        // A replaced clip must release its URL first
        self.release_clip();

        let data = Arc::new(data);
        let url = self.store.register(&data);
        info!("recorded clip ready ({} bytes) at {}", data.len(), url);
        self.state = RecordingState::Ready {
            clip: ClipHandle { url, data },
        };
    }

    /// Drop the retained clip and return to idle
    pub fn clear(&mut self) {
        self.release_clip();
        self.state = RecordingState::Idle;
    }

    /// Package the retained clip as `filename` and hand it to the platform
    /// share/save flow. Share failures are logged, never fatal.
    pub fn download(&self, filename: &str) -> Result<()> {
        match &self.state {
            RecordingState::Ready { clip } => {
                if let Err(e) = self.store.share(filename, &clip.data) {
                    warn!("share failed for {}: {}", filename, e);
                }
                Ok(())
            }
            _ => Err(Error::InvalidState(format!(
                "download invalid in state '{}'",
                self.state.phase_name()
            ))),
        }
    }

    fn release_clip(&mut self) {
        if let RecordingState::Ready { clip } = &self.state {
            self.store.revoke(&clip.url);
        }
    }
}

impl Drop for RecordingLifecycle {
    fn drop(&mut self) {
        // No URL may outlive the lifecycle
        self.release_clip();
    }
}

/// Filesystem-backed media store: clips live under `<root>/clips`, shared
/// copies under `<root>/exports`
pub struct FileMediaStore {
    clips_dir: PathBuf,
    exports_dir: PathBuf,
    counter: AtomicU64,
}

impl FileMediaStore {
    pub fn new(root: &std::path::Path) -> Self {
        Self {
            clips_dir: root.join("clips"),
            exports_dir: root.join("exports"),
            counter: AtomicU64::new(0),
        }
    }
}

impl MediaStore for FileMediaStore {
    fn register(&self, data: &[u8]) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let path = self.clips_dir.join(format!("clip-{:04}.webm", n));

        if let Err(e) = std::fs::create_dir_all(&self.clips_dir)
            .and_then(|_| std::fs::write(&path, data))
        {
            warn!("failed to persist clip {}: {}", path.display(), e);
        }
        path.to_string_lossy().into_owned()
    }

    fn revoke(&self, url: &str) {
        if let Err(e) = std::fs::remove_file(url) {
            debug!("clip {} already gone: {}", url, e);
        }
    }

    fn share(&self, filename: &str, data: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.exports_dir)?;
        let target = self.exports_dir.join(filename);
        std::fs::write(&target, data)?;
        info!("clip exported to {}", target.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// In-memory store that records register/revoke/share calls
    #[derive(Default)]
    struct SpyStore {
        registered: Mutex<Vec<String>>,
        revoked: Mutex<Vec<String>>,
        shared: Mutex<Vec<String>>,
        fail_share: bool,
    }

    impl MediaStore for SpyStore {
        fn register(&self, _data: &[u8]) -> String {
            let mut reg = self.registered.lock().unwrap();
            let url = format!("mem://clip/{}", reg.len());
            reg.push(url.clone());
            url
        }

        fn revoke(&self, url: &str) {
            self.revoked.lock().unwrap().push(url.to_string());
        }

        fn share(&self, filename: &str, _data: &[u8]) -> Result<()> {
            if self.fail_share {
                return Err(Error::Internal("share sheet dismissed".to_string()));
            }
            self.shared.lock().unwrap().push(filename.to_string());
            Ok(())
        }
    }

    fn lifecycle() -> (RecordingLifecycle, Arc<SpyStore>) {
        let store = Arc::new(SpyStore::default());
        (RecordingLifecycle::new(store.clone()), store)
    }

    #[test]
    fn test_full_cycle() {
        let (mut rec, store) = lifecycle();
        assert_eq!(rec.state().phase_name(), "none");

        rec.request_start().unwrap();
        rec.on_started();
        assert_eq!(rec.state().phase_name(), "recording");

        assert_eq!(rec.on_progress(3_000, 15_000), Some(0.2));

        rec.request_stop().unwrap();
        rec.on_stopped();
        assert_eq!(rec.state().phase_name(), "encoding");

        rec.on_ready(vec![1, 2, 3]);
        assert_eq!(rec.state().phase_name(), "ready");

        rec.clear();
        assert_eq!(rec.state().phase_name(), "none");
        // The clip URL was revoked exactly once
        assert_eq!(store.revoked.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_start_invalid_outside_idle() {
        let (mut rec, _store) = lifecycle();
        rec.on_started();

        let err = rec.request_start().unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn test_stop_invalid_outside_recording() {
        let (rec, _store) = lifecycle();
        assert!(matches!(
            rec.request_stop(),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_started_while_recording_warns_but_transitions() {
        let (mut rec, _store) = lifecycle();
        rec.on_started();
        rec.on_progress(5_000, 15_000);

        // The recorder restarted underneath us; follow it, no panic
        rec.on_started();
        match rec.state() {
            RecordingState::Recording { progress } => assert_eq!(*progress, 0.0),
            other => panic!("expected recording, got '{}'", other.phase_name()),
        }
    }

    #[test]
    fn test_progress_passthrough_unclamped() {
        let (mut rec, _store) = lifecycle();
        rec.on_started();

        // Recorder overran its nominal total; we pass the ratio through
        assert_eq!(rec.on_progress(18_000, 15_000), Some(1.2));
    }

    #[test]
    fn test_progress_ignored_outside_recording() {
        let (mut rec, _store) = lifecycle();
        assert_eq!(rec.on_progress(1_000, 15_000), None);
    }

    #[test]
    fn test_download_only_in_ready() {
        let (mut rec, store) = lifecycle();
        assert!(matches!(rec.download("clip.webm"), Err(Error::InvalidState(_))));

        rec.on_started();
        rec.on_stopped();
        rec.on_ready(vec![9; 16]);

        rec.download("clip.webm").unwrap();
        assert_eq!(store.shared.lock().unwrap().as_slice(), ["clip.webm"]);
    }

    #[test]
    fn test_share_failure_is_not_fatal() {
        let store = Arc::new(SpyStore {
            fail_share: true,
            ..Default::default()
        });
        let mut rec = RecordingLifecycle::new(store);
        rec.on_started();
        rec.on_stopped();
        rec.on_ready(vec![1]);

        // Caught and logged
        rec.download("clip.webm").unwrap();
    }

    #[test]
    fn test_url_revoked_on_drop() {
        let store = Arc::new(SpyStore::default());
        {
            let mut rec = RecordingLifecycle::new(store.clone());
            rec.on_started();
            rec.on_stopped();
            rec.on_ready(vec![1]);
        }
        assert_eq!(store.revoked.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_repeated_recordings_leak_no_urls() {
        let (mut rec, store) = lifecycle();

        for _ in 0..3 {
            rec.on_started();
            rec.on_stopped();
            rec.on_ready(vec![1]);
            rec.clear();
        }

        let registered = store.registered.lock().unwrap().len();
        let revoked = store.revoked.lock().unwrap().len();
        assert_eq!(registered, 3);
        assert_eq!(revoked, 3);
    }

    #[test]
    fn test_file_store_register_share_revoke() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileMediaStore::new(dir.path());

        let url = store.register(&[1, 2, 3, 4]);
        assert!(std::path::Path::new(&url).exists());

        store.share("out.webm", &[1, 2, 3, 4]).unwrap();
        assert!(dir.path().join("exports").join("out.webm").exists());

        store.revoke(&url);
        assert!(!std::path::Path::new(&url).exists());
    }
}
