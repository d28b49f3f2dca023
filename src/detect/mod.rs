//! Detection collaborator: backends that turn frames into class-indexed boxes.

mod backend;
mod backends;
pub mod decode;
mod names;
mod registry;
mod result;

use anyhow::{anyhow, Result};

pub use backend::DetectorBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use backends::{ScriptStep, ScriptedBackend, DEMO_CLASSES};
pub use names::ClassNames;
pub use registry::{BackendRegistry, SharedBackend};
pub use result::{Detection, DetectionResult};

use crate::config::DetectorSettings;

/// Frames the demo backend holds each scripted scene for.
const DEMO_SCENE_FRAMES: u32 = 30;

/// Build a registry from configuration, with the configured backend as default.
pub fn registry_from_settings(settings: &DetectorSettings) -> Result<BackendRegistry> {
    let names = match &settings.class_names_path {
        Some(path) => ClassNames::from_file(path)?,
        None => ClassNames::new(DEMO_CLASSES.iter().map(|s| s.to_string()).collect()),
    };

    let mut registry = BackendRegistry::new();
    match settings.backend.as_str() {
        "scripted" => {
            registry.register(ScriptedBackend::demo(names, DEMO_SCENE_FRAMES));
        }
        "tract" => {
            #[cfg(feature = "backend-tract")]
            {
                let model_path = settings
                    .model_path
                    .as_ref()
                    .ok_or_else(|| anyhow!("tract backend requires a model path"))?;
                registry.register(TractBackend::new(
                    model_path,
                    names,
                    settings.input_width,
                    settings.input_height,
                )?);
            }
            #[cfg(not(feature = "backend-tract"))]
            {
                drop(names);
                return Err(anyhow!("tract backend requires the backend-tract feature"));
            }
        }
        other => return Err(anyhow!("unknown detector backend '{}'", other)),
    }
    registry.set_default(&settings.backend)?;
    Ok(registry)
}
