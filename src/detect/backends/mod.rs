pub mod scripted;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use scripted::{ScriptStep, ScriptedBackend, DEMO_CLASSES};

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;
