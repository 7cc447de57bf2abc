//! Experience engine
//!
//! Orchestrates the experience state machine against the outside world. All
//! inputs — UI commands, renderer events, scan outcomes, gate notifications —
//! funnel into one select loop, so transitions are applied serially and in
//! arrival order. Asynchronous completions (asset loads) carry the generation
//! number they were dispatched with; a completion whose generation no longer
//! matches is stale and silently discarded instead of resurrecting a dead
//! state.

use crate::error::{Error, Result};
use crate::experience::interaction::InteractionController;
use crate::experience::machine::{
    Effect, ExperienceInput, ExperienceMachine, PointerSample,
};
use crate::progress::ProgressTracker;
use crate::recording::{MediaStore, RecordingLifecycle, RecordingState};
use crate::render::{RendererCommand, RendererEvent, SurfacePoint};
use crate::scan::{codes, ScanOutcome};
use crate::state::SharedState;
use crate::tracking::{GateOpened, TrackingGate, GATE_TIMEOUT};
use artwalk_common::catalog::ArtworkRecord;
use artwalk_common::events::{ExperiencePhase, HuntEvent};
use artwalk_common::Catalog;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Commands from the UI layer
#[derive(Debug, Clone)]
pub enum UiCommand {
    /// Select an artwork for placement (already resolved from a code)
    PlaceArtwork { artwork: ArtworkRecord },
    /// Confirm placement; None anchors at the current reticle position
    CommitPlacement { point: Option<SurfacePoint> },
    /// Re-enter positioning for the current artwork
    RequestReposition,
    /// Drop the current artwork
    ClearArtwork,
    /// Pointer input over the AR view
    Pointer(PointerSample),
    /// App moved to foreground/background
    SetVisibility { visible: bool },
}

/// Serializable view of the engine for the UI
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub phase: ExperiencePhase,
    pub artwork_id: Option<String>,
    pub load_progress: Option<f32>,
    pub recording: &'static str,
    pub media_review: bool,
}

/// The experience engine: single owner of the loaded asset and the only
/// component that sends content commands to the renderer
pub struct ExperienceEngine {
    shared: Arc<SharedState>,
    catalog: Arc<Catalog>,
    progress: Arc<ProgressTracker>,
    machine: Arc<Mutex<ExperienceMachine>>,
    interaction: Arc<Mutex<InteractionController>>,
    recording: Arc<Mutex<RecordingLifecycle>>,
    renderer_tx: mpsc::UnboundedSender<RendererCommand>,
    load_generation: Arc<AtomicU64>,
    ui_tx: mpsc::UnboundedSender<UiCommand>,
    ui_rx: Mutex<Option<mpsc::UnboundedReceiver<UiCommand>>>,
}

impl ExperienceEngine {
    pub fn new(
        shared: Arc<SharedState>,
        catalog: Arc<Catalog>,
        progress: Arc<ProgressTracker>,
        media_store: Arc<dyn MediaStore>,
        renderer_tx: mpsc::UnboundedSender<RendererCommand>,
    ) -> Self {
        let (ui_tx, ui_rx) = mpsc::unbounded_channel();

        Self {
            shared,
            catalog,
            progress,
            machine: Arc::new(Mutex::new(ExperienceMachine::new())),
            interaction: Arc::new(Mutex::new(InteractionController::default())),
            recording: Arc::new(Mutex::new(RecordingLifecycle::new(media_store))),
            renderer_tx,
            load_generation: Arc::new(AtomicU64::new(0)),
            ui_tx,
            ui_rx: Mutex::new(Some(ui_rx)),
        }
    }

    /// Spawn the engine loop, consuming renderer events and scan outcomes
    pub fn start(
        &self,
        renderer_rx: mpsc::UnboundedReceiver<RendererEvent>,
        scan_rx: mpsc::UnboundedReceiver<ScanOutcome>,
    ) {
        let ui_rx = self
            .ui_rx
            .lock()
            .unwrap()
            .take()
            .expect("engine already started");

        let worker = EngineWorker {
            shared: Arc::clone(&self.shared),
            catalog: Arc::clone(&self.catalog),
            progress: Arc::clone(&self.progress),
            machine: Arc::clone(&self.machine),
            interaction: Arc::clone(&self.interaction),
            recording: Arc::clone(&self.recording),
            renderer_tx: self.renderer_tx.clone(),
            load_generation: Arc::clone(&self.load_generation),
        };

        tokio::spawn(worker.run(ui_rx, renderer_rx, scan_rx));
        info!("Experience engine started");
    }

    // ---- UI surface -----------------------------------------------------

    /// Apply a scanned/typed code string (the URL-hash equivalent).
    /// Unrecognized codes are rejected with no state change.
    pub fn apply_code(&self, code: &str) -> Result<()> {
        let artwork_id =
            codes::resolve(code).ok_or_else(|| Error::UnknownCode(code.to_string()))?;
        self.place_artwork(artwork_id)
    }

    /// Select an artwork by id for placement
    pub fn place_artwork(&self, artwork_id: &str) -> Result<()> {
        let artwork = self
            .catalog
            .get(artwork_id)
            .ok_or_else(|| Error::NotFound(format!("artwork '{}'", artwork_id)))?
            .clone();
        self.send_ui(UiCommand::PlaceArtwork { artwork })
    }

    pub fn commit_placement(&self, point: Option<SurfacePoint>) -> Result<()> {
        self.send_ui(UiCommand::CommitPlacement { point })
    }

    pub fn request_reposition(&self) -> Result<()> {
        self.send_ui(UiCommand::RequestReposition)
    }

    pub fn clear_artwork(&self) -> Result<()> {
        self.send_ui(UiCommand::ClearArtwork)
    }

    pub fn pointer(&self, sample: PointerSample) -> Result<()> {
        self.send_ui(UiCommand::Pointer(sample))
    }

    pub fn set_visibility(&self, visible: bool) -> Result<()> {
        self.send_ui(UiCommand::SetVisibility { visible })
    }

    fn send_ui(&self, cmd: UiCommand) -> Result<()> {
        self.ui_tx
            .send(cmd)
            .map_err(|_| Error::Internal("engine loop stopped".to_string()))
    }

    // ---- Recording surface ---------------------------------------------

    /// Ask the recorder to start. Invalid outside the idle recording state.
    pub fn start_recording(&self) -> Result<()> {
        self.recording.lock().unwrap().request_start()?;
        self.send_renderer(RendererCommand::StartRecording)
    }

    /// Ask the recorder to stop. Invalid unless recording.
    pub fn stop_recording(&self) -> Result<()> {
        self.recording.lock().unwrap().request_stop()?;
        self.send_renderer(RendererCommand::StopRecording)
    }

    /// Drop the retained clip and leave media review
    pub fn clear_recording(&self) {
        self.recording.lock().unwrap().clear();
        self.shared.set_media_review(false);
        self.shared.broadcast_event(HuntEvent::RecordingCleared {
            timestamp: chrono::Utc::now(),
        });
    }

    /// Share/save the retained clip. Invalid unless a clip is ready.
    pub fn download_recording(&self, filename: &str) -> Result<()> {
        self.recording.lock().unwrap().download(filename)
    }

    fn send_renderer(&self, cmd: RendererCommand) -> Result<()> {
        self.renderer_tx
            .send(cmd)
            .map_err(|_| Error::Internal("renderer channel closed".to_string()))
    }

    // ---- Introspection --------------------------------------------------

    pub fn snapshot(&self) -> EngineSnapshot {
        let machine = self.machine.lock().unwrap();
        let state = machine.state();
        let load_progress = match state {
            crate::experience::machine::ExperienceState::Loading { progress, .. } => {
                Some(*progress)
            }
            _ => None,
        };
        EngineSnapshot {
            phase: state.phase(),
            artwork_id: state.artwork().map(|a| a.id.clone()),
            load_progress,
            recording: self.recording.lock().unwrap().state().phase_name(),
            media_review: self.shared.media_review(),
        }
    }
}

/// Loop-side handles; everything the select loop needs without keeping the
/// public engine (and its ui sender) alive
struct EngineWorker {
    shared: Arc<SharedState>,
    catalog: Arc<Catalog>,
    progress: Arc<ProgressTracker>,
    machine: Arc<Mutex<ExperienceMachine>>,
    interaction: Arc<Mutex<InteractionController>>,
    recording: Arc<Mutex<RecordingLifecycle>>,
    renderer_tx: mpsc::UnboundedSender<RendererCommand>,
    load_generation: Arc<AtomicU64>,
}

impl EngineWorker {
    async fn run(
        self,
        mut ui_rx: mpsc::UnboundedReceiver<UiCommand>,
        mut renderer_rx: mpsc::UnboundedReceiver<RendererEvent>,
        mut scan_rx: mpsc::UnboundedReceiver<ScanOutcome>,
    ) {
        let (gate_tx, mut gate_rx) = mpsc::unbounded_channel();
        let mut gate = TrackingGate::new(gate_tx, GATE_TIMEOUT);
        let mut pending_placement: Option<ArtworkRecord> = None;

        loop {
            tokio::select! {
                Some(cmd) = ui_rx.recv() => {
                    self.handle_ui(cmd, &mut gate, &mut pending_placement).await;
                }
                Some(event) = renderer_rx.recv() => {
                    self.handle_renderer(event, &mut gate).await;
                }
                Some(outcome) = scan_rx.recv() => {
                    self.handle_scan(outcome, &mut gate, &mut pending_placement).await;
                }
                Some(opened) = gate_rx.recv() => {
                    self.handle_gate(opened, &mut gate, &mut pending_placement).await;
                }
                else => {
                    info!("experience engine loop stopped");
                    break;
                }
            }
        }
    }

    async fn handle_ui(
        &self,
        cmd: UiCommand,
        gate: &mut TrackingGate,
        pending: &mut Option<ArtworkRecord>,
    ) {
        match cmd {
            UiCommand::PlaceArtwork { artwork } => {
                self.begin_placement(artwork, gate, pending).await;
            }
            UiCommand::CommitPlacement { point } => {
                self.apply(ExperienceInput::CommitPlacement { point }).await;
            }
            UiCommand::RequestReposition => {
                self.apply(ExperienceInput::RequestReposition).await;
            }
            UiCommand::ClearArtwork => {
                // Dropping the artwork also cancels a placement still waiting
                // on the tracking gate
                *pending = None;
                gate.disarm();
                self.apply(ExperienceInput::ClearArtwork).await;
            }
            UiCommand::Pointer(sample) => {
                self.apply(ExperienceInput::Pointer(sample)).await;
            }
            UiCommand::SetVisibility { visible } => {
                // Backgrounding pauses audio and tracking but keeps all
                // state, so foregrounding resumes cleanly
                if visible {
                    let _ = self.renderer_tx.send(RendererCommand::ResumeAudio);
                    let _ = self.renderer_tx.send(RendererCommand::ResumeTracking);
                } else {
                    let _ = self.renderer_tx.send(RendererCommand::PauseAudio);
                    let _ = self.renderer_tx.send(RendererCommand::PauseTracking);
                }
            }
        }
    }

    async fn handle_renderer(&self, event: RendererEvent, gate: &mut TrackingGate) {
        match event {
            RendererEvent::TrackingStatus { signal } => {
                self.shared.set_tracking_signal(signal).await;
                gate.on_signal(signal);
                self.shared.broadcast_event(HuntEvent::TrackingStatusChanged {
                    signal,
                    timestamp: chrono::Utc::now(),
                });
            }

            RendererEvent::SurfaceHit { point } => {
                // High-frequency event: only meaningful while positioning
                if self.phase() == ExperiencePhase::Positioning {
                    self.apply(ExperienceInput::SurfaceUpdate { point }).await;
                }
            }

            RendererEvent::FrameTick { delta_seconds } => {
                let phase = self.phase();
                if phase == ExperiencePhase::Loading || phase == ExperiencePhase::Viewing {
                    self.interaction.lock().unwrap().update(delta_seconds);
                }
            }

            RendererEvent::LoadProgress { generation, ratio } => {
                if self.is_stale(generation) {
                    debug!("stale load progress (generation {})", generation);
                    return;
                }
                self.apply(ExperienceInput::LoadProgress { ratio }).await;
            }

            RendererEvent::LoadComplete { generation } => {
                if self.is_stale(generation) {
                    debug!("stale load completion (generation {})", generation);
                    return;
                }
                self.apply(ExperienceInput::LoadComplete).await;
            }

            RendererEvent::RecordingStarted => {
                self.recording.lock().unwrap().on_started();
                self.shared.broadcast_event(HuntEvent::RecordingStarted {
                    timestamp: chrono::Utc::now(),
                });
            }

            RendererEvent::RecordingProgress { elapsed_ms, total_ms } => {
                let applied = self
                    .recording
                    .lock()
                    .unwrap()
                    .on_progress(elapsed_ms, total_ms);
                if let Some(ratio) = applied {
                    self.shared.broadcast_event(HuntEvent::RecordingProgress {
                        ratio,
                        timestamp: chrono::Utc::now(),
                    });
                }
            }

            RendererEvent::RecordingStopped => {
                self.recording.lock().unwrap().on_stopped();
                self.shared.broadcast_event(HuntEvent::RecordingStopped {
                    timestamp: chrono::Utc::now(),
                });
            }

            RendererEvent::RecordingReady { data } => {
                let video_url = {
                    let mut recording = self.recording.lock().unwrap();
                    recording.on_ready(data);
                    match recording.state() {
                        RecordingState::Ready { clip } => clip.url.clone(),
                        _ => String::new(),
                    }
                };
                // A finished clip forces the outer UI into media review
                self.shared.set_media_review(true);
                self.shared.broadcast_event(HuntEvent::RecordingReady {
                    video_url,
                    timestamp: chrono::Utc::now(),
                });
            }
        }
    }

    async fn handle_scan(
        &self,
        outcome: ScanOutcome,
        gate: &mut TrackingGate,
        pending: &mut Option<ArtworkRecord>,
    ) {
        self.shared.broadcast_event(HuntEvent::QrScanResult {
            code: outcome.found.as_ref().map(|f| f.text.clone()),
            points: outcome
                .found
                .as_ref()
                .map(|f| f.points.clone())
                .unwrap_or_default(),
            source_width: outcome.source_width,
            source_height: outcome.source_height,
            timestamp: chrono::Utc::now(),
        });

        let Some(found) = outcome.found else {
            return;
        };

        let Some(artwork_id) = codes::resolve(&found.text) else {
            warn!("unrecognized code '{}'", found.text);
            return;
        };

        // Re-scanning the artwork that is already active is a no-op
        if self.current_artwork_id().as_deref() == Some(artwork_id) {
            debug!("artwork '{}' already active, ignoring scan", artwork_id);
            return;
        }

        let Some(artwork) = self.catalog.get(artwork_id).cloned() else {
            warn!("code '{}' maps to unknown artwork '{}'", found.text, artwork_id);
            return;
        };
        self.begin_placement(artwork, gate, pending).await;
    }

    async fn handle_gate(
        &self,
        opened: GateOpened,
        gate: &mut TrackingGate,
        pending: &mut Option<ArtworkRecord>,
    ) {
        gate.disarm();
        self.shared.broadcast_event(HuntEvent::PlacementUnlocked {
            fallback: opened.fallback,
            timestamp: chrono::Utc::now(),
        });

        if let Some(artwork) = pending.take() {
            self.apply(ExperienceInput::RequestPlacement { artwork }).await;
        }
    }

    /// Route a selected artwork toward positioning, swapping out any content
    /// already on screen and holding at the tracking gate if needed
    async fn begin_placement(
        &self,
        artwork: ArtworkRecord,
        gate: &mut TrackingGate,
        pending: &mut Option<ArtworkRecord>,
    ) {
        let phase = self.phase();

        if self.current_artwork_id().as_deref() == Some(artwork.id.as_str())
            && phase != ExperiencePhase::Idle
        {
            debug!("artwork '{}' already active", artwork.id);
            return;
        }

        // Content swap: release the current artwork first
        if phase == ExperiencePhase::Loading || phase == ExperiencePhase::Viewing {
            self.apply(ExperienceInput::ClearArtwork).await;
        }

        if gate.permits() {
            self.apply(ExperienceInput::RequestPlacement { artwork }).await;
        } else {
            debug!("tracking limited, holding '{}' at the gate", artwork.id);
            *pending = Some(artwork);
            gate.arm();
        }
    }

    /// Dispatch into the machine and execute the resulting effects
    async fn apply(&self, input: ExperienceInput) {
        let effects = {
            let mut machine = self.machine.lock().unwrap();
            match machine.dispatch(input) {
                Ok(effects) => effects,
                Err(e) => {
                    // Lenient machines never error; keep the loop alive anyway
                    warn!("dispatch rejected: {}", e);
                    return;
                }
            }
        };

        for effect in effects {
            self.execute(effect).await;
        }
    }

    async fn execute(&self, effect: Effect) {
        match effect {
            Effect::AnnounceRepositioning { artwork_id } => {
                self.shared.broadcast_event(HuntEvent::RepositioningStarted {
                    artwork_id,
                    timestamp: chrono::Utc::now(),
                });
                self.broadcast_phase();
            }

            Effect::MoveReticle { point } => {
                let _ = self.renderer_tx.send(RendererCommand::SetReticle { point });
            }

            Effect::BeginAssetLoad { artwork, anchor } => {
                let generation = self.load_generation.fetch_add(1, Ordering::AcqRel) + 1;
                let _ = self.renderer_tx.send(RendererCommand::LoadArtwork {
                    artwork_id: artwork.id.clone(),
                    anchor,
                    generation,
                });
                self.broadcast_phase();
            }

            Effect::AnnounceLoadProgress { artwork_id, ratio } => {
                self.shared.broadcast_event(HuntEvent::ContentLoadProgress {
                    artwork_id,
                    ratio,
                    timestamp: chrono::Utc::now(),
                });
            }

            Effect::AnnounceLoaded { artwork_id } => {
                self.shared.broadcast_event(HuntEvent::ContentLoaded {
                    artwork_id: artwork_id.clone(),
                    timestamp: chrono::Utc::now(),
                });
                self.broadcast_phase();

                if let Err(e) = self.progress.mark_viewed(&artwork_id).await {
                    warn!("failed to record viewed artwork '{}': {}", artwork_id, e);
                }
            }

            Effect::ForwardPointer(sample) => {
                let mut interaction = self.interaction.lock().unwrap();
                match sample {
                    PointerSample::Down { id, x, y } => interaction.pointer_down(id, x, y),
                    PointerSample::Move { id, x, y } => interaction.pointer_move(id, x, y),
                    PointerSample::Up { id } => interaction.pointer_up(id),
                }
            }

            Effect::DisposeContent => {
                // Invalidate any in-flight load before the renderer disposes
                self.load_generation.fetch_add(1, Ordering::AcqRel);
                let _ = self.renderer_tx.send(RendererCommand::RemoveContent);
                self.interaction.lock().unwrap().reset();
                self.broadcast_phase();
            }
        }
    }

    fn broadcast_phase(&self) {
        let (phase, artwork_id) = {
            let machine = self.machine.lock().unwrap();
            (
                machine.phase(),
                machine.state().artwork().map(|a| a.id.clone()),
            )
        };
        self.shared.broadcast_event(HuntEvent::ExperienceStateChanged {
            phase,
            artwork_id,
            timestamp: chrono::Utc::now(),
        });
    }

    fn phase(&self) -> ExperiencePhase {
        self.machine.lock().unwrap().phase()
    }

    fn current_artwork_id(&self) -> Option<String> {
        self.machine
            .lock()
            .unwrap()
            .state()
            .artwork()
            .map(|a| a.id.clone())
    }

    fn is_stale(&self, generation: u64) -> bool {
        generation != self.load_generation.load(Ordering::Acquire)
    }
}
