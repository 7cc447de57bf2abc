//! Tracking gate
//!
//! Plane-tracking quality is unreliable on first launch. Blocking placement
//! until the engine reports NORMAL would strand users on low-end devices, so
//! the gate fails open after a bounded wait: arm it when the placement
//! overlay becomes visible, and it opens on NORMAL tracking or after the
//! timeout, whichever comes first.

use artwalk_common::events::TrackingSignal;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Default wait before proceeding despite LIMITED tracking
pub const GATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Notification that placement may begin.
/// `fallback` is true when the timeout fired while tracking was still LIMITED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateOpened {
    pub fallback: bool,
}

/// Derives "may proceed to positioning" from the external tracking signal
pub struct TrackingGate {
    signal: TrackingSignal,
    armed: bool,
    timer: Option<JoinHandle<()>>,
    timeout: Duration,
    notify_tx: mpsc::UnboundedSender<GateOpened>,
}

impl TrackingGate {
    pub fn new(notify_tx: mpsc::UnboundedSender<GateOpened>, timeout: Duration) -> Self {
        Self {
            signal: TrackingSignal::Limited,
            armed: false,
            timer: None,
            timeout,
            notify_tx,
        }
    }

    pub fn signal(&self) -> TrackingSignal {
        self.signal
    }

    /// Whether placement may proceed without waiting
    pub fn permits(&self) -> bool {
        self.signal == TrackingSignal::Normal
    }

    /// Arm the gate when the placement overlay becomes visible.
    ///
    /// Opens immediately under NORMAL tracking; otherwise starts the
    /// fail-open timer. Re-arming while already armed is a no-op.
    pub fn arm(&mut self) {
        if self.permits() {
            let _ = self.notify_tx.send(GateOpened { fallback: false });
            return;
        }
        if self.armed {
            return;
        }
        self.armed = true;

        let tx = self.notify_tx.clone();
        let timeout = self.timeout;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            debug!("tracking gate timeout elapsed, failing open");
            let _ = tx.send(GateOpened { fallback: true });
        }));
    }

    /// Feed a tracking signal update; opens the gate if it was waiting
    pub fn on_signal(&mut self, signal: TrackingSignal) {
        self.signal = signal;
        if signal == TrackingSignal::Normal && self.armed {
            self.disarm();
            let _ = self.notify_tx.send(GateOpened { fallback: false });
        }
    }

    /// Cancel the wait without opening; clears the timer
    pub fn disarm(&mut self) {
        self.armed = false;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

impl Drop for TrackingGate {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_open() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut gate = TrackingGate::new(tx, GATE_TIMEOUT);

        gate.arm();
        assert!(gate.is_armed());

        tokio::time::advance(Duration::from_secs(5)).await;
        let opened = rx.recv().await.unwrap();
        assert!(opened.fallback);
    }

    #[tokio::test(start_paused = true)]
    async fn test_normal_signal_opens_before_timeout() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut gate = TrackingGate::new(tx, GATE_TIMEOUT);

        gate.arm();
        tokio::time::advance(Duration::from_secs(2)).await;
        gate.on_signal(TrackingSignal::Normal);

        let opened = rx.recv().await.unwrap();
        assert!(!opened.fallback);
        assert!(!gate.is_armed());

        // Timer was aborted: advancing past the deadline yields no second event
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_arm_under_normal_opens_immediately() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut gate = TrackingGate::new(tx, GATE_TIMEOUT);

        gate.on_signal(TrackingSignal::Normal);
        gate.arm();

        let opened = rx.recv().await.unwrap();
        assert!(!opened.fallback);
        assert!(!gate.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_clears_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut gate = TrackingGate::new(tx, GATE_TIMEOUT);

        gate.arm();
        gate.disarm();

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_while_armed_keeps_single_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut gate = TrackingGate::new(tx, GATE_TIMEOUT);

        gate.arm();
        tokio::time::advance(Duration::from_secs(3)).await;
        gate.arm(); // no-op, original deadline stands

        tokio::time::advance(Duration::from_secs(2)).await;
        let opened = rx.recv().await.unwrap();
        assert!(opened.fallback);

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }
}
