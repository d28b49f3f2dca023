//! Stream session: drives frames from a source through the reconciler to a sink.
//!
//! The session owns no threads. The host calls `step` once per frame on
//! whatever thread it likes; the render pass reads the shared `SessionState`
//! from its own thread.

use anyhow::Result;
use std::time::{Duration, Instant};

use crate::ingest::{FrameSink, FrameSource};
use crate::reconcile::{FrameOutcome, FrameReconciler};
use crate::state::SessionState;

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Counters for one session run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub updates: u64,
    pub failures: u64,
}

/// Summary of a single `step`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepReport {
    /// Frame shown, label set unchanged.
    Unchanged,
    /// Frame shown, new categories published.
    Updated,
    /// Detection failed, original frame shown.
    Failed,
}

pub struct StreamSession {
    source: Box<dyn FrameSource>,
    reconciler: FrameReconciler,
    sink: Box<dyn FrameSink>,
    stats: SessionStats,
    last_health_log: Instant,
}

impl StreamSession {
    pub fn new(
        source: Box<dyn FrameSource>,
        reconciler: FrameReconciler,
        sink: Box<dyn FrameSink>,
    ) -> Self {
        Self {
            source,
            reconciler,
            sink,
            stats: SessionStats::default(),
            last_health_log: Instant::now(),
        }
    }

    pub fn state(&self) -> &SessionState {
        self.reconciler.state()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Connect the source and start playing from a clean slate.
    pub fn start(&mut self) -> Result<()> {
        self.source.connect()?;
        self.reconciler.reset();
        self.state().reset();
        self.stats = SessionStats::default();
        self.state().set_playing(true);
        log::info!("stream session started");
        Ok(())
    }

    /// Stop playing. Category state goes back to initial.
    pub fn stop(&mut self) {
        self.state().set_playing(false);
        self.reconciler.reset();
        self.state().reset();
        log::info!(
            "stream session stopped after {} frames ({} updates, {} failures)",
            self.stats.frames,
            self.stats.updates,
            self.stats.failures
        );
    }

    /// Pull one frame, reconcile it and hand the result to the sink.
    ///
    /// Source and sink errors propagate; detection errors do not.
    pub fn step(&mut self) -> Result<StepReport> {
        let frame = self.source.next_frame()?;
        let outcome = self.reconciler.process(frame);
        self.sink.show(outcome.frame())?;

        self.stats.frames += 1;
        let report = match &outcome {
            FrameOutcome::Passthrough { .. } => {
                self.stats.failures += 1;
                StepReport::Failed
            }
            FrameOutcome::Annotated {
                update: Some(_), ..
            } => {
                self.stats.updates += 1;
                StepReport::Updated
            }
            FrameOutcome::Annotated { update: None, .. } => StepReport::Unchanged,
        };

        if self.last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
            let stats = self.source.stats();
            log::info!(
                "source health={} frames={} location={} failures={}",
                self.source.is_healthy(),
                stats.frames_captured,
                stats.location,
                self.stats.failures
            );
            self.last_health_log = Instant::now();
        }
        Ok(report)
    }
}
