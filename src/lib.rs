//! Waste sorter
//!
//! Camera frames go through an object detector; detected labels are sorted
//! into recyclable, non-recyclable and hazardous lists shown in a sidebar.
//!
//! # Module Structure
//!
//! - `category`: label sets, category tables, the classifier and display formatting
//! - `reconcile`: per-frame pipeline publishing category changes
//! - `state`: session state shared by the frame loop and the render pass
//! - `sidebar`: category placeholders and the render pass
//! - `detect`: detector backends (scripted, ONNX via tract)
//! - `ingest`: frame sources and sinks (synthetic, V4L2 webcam)
//! - `session`: source -> reconciler -> sink driver
//! - `config`: file + environment configuration
//! - `frame`: RGB frames, resizing and overlays
//! - `ui`: terminal output for the binary
//!
//! # Invariants
//!
//! - Category tables are built once from configuration and never mutated.
//! - A category update is published only when a frame's label set differs
//!   from the previous frame's, and is consumed exactly once by the render pass.
//! - Detection failures never stop the stream: the original frame is shown.

pub mod category;
pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod reconcile;
pub mod session;
pub mod sidebar;
pub mod state;
pub mod ui;

pub use category::{
    classify, display_label, CategorizedResult, CategoryTables, DetectionLabel, LabelSet,
    WasteCategory,
};
pub use config::{IceServer, SorterConfig};
pub use detect::{
    registry_from_settings, BackendRegistry, ClassNames, Detection, DetectionResult,
    DetectorBackend, ScriptStep, ScriptedBackend, SharedBackend,
};
pub use frame::{BoundingBox, VideoFrame};
pub use ingest::{open_source, FrameSink, FrameSource, LatestFrameSink, SyntheticSource};
pub use reconcile::{FrameError, FrameOutcome, FrameReconciler, ReconcilerSettings};
pub use session::{SessionStats, StepReport, StreamSession};
pub use sidebar::Sidebar;
pub use state::SessionState;
