use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::category::{CategoryTables, LabelSet};
use crate::frame::{processing_height, PROCESSING_WIDTH};

const DEFAULT_BACKEND: &str = "scripted";
const DEFAULT_CONFIDENCE: f32 = 0.6;
const DEFAULT_MODEL_INPUT: u32 = 640;
const DEFAULT_SOURCE: &str = "stub://webcam";
const DEFAULT_FPS: u32 = 10;
const DEFAULT_CAPTURE_WIDTH: u32 = 1280;
const DEFAULT_CAPTURE_HEIGHT: u32 = 720;
const MAX_PROCESSING_WIDTH: u32 = 3840;

const DEFAULT_RECYCLABLE: &[&str] = &[
    "glass_bottle",
    "plastic_bottle",
    "aluminium_can",
    "cardboard_box",
    "paper",
];
const DEFAULT_NON_RECYCLABLE: &[&str] = &["chip_bag", "styrofoam_cup", "plastic_bag"];
const DEFAULT_HAZARDOUS: &[&str] = &["battery", "paint_can", "light_bulb"];
const DEFAULT_STUN_URLS: &[&str] = &["stun:stun.l.google.com:19302", "stun:stun1.l.google.com:19302"];

#[derive(Debug, Deserialize, Default)]
struct SorterConfigFile {
    categories: Option<CategoriesConfigFile>,
    detector: Option<DetectorConfigFile>,
    stream: Option<StreamConfigFile>,
    rtc: Option<RtcConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CategoriesConfigFile {
    recyclable: Option<Vec<String>>,
    non_recyclable: Option<Vec<String>>,
    hazardous: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    class_names: Option<PathBuf>,
    confidence: Option<f32>,
    input_width: Option<u32>,
    input_height: Option<u32>,
    processing_width: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct StreamConfigFile {
    source: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct RtcConfigFile {
    ice_servers: Option<Vec<IceServer>>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct SorterConfig {
    pub categories: CategorySettings,
    pub detector: DetectorSettings,
    pub stream: StreamSettings,
    pub rtc: RtcSettings,
}

#[derive(Debug, Clone)]
pub struct CategorySettings {
    pub recyclable: Vec<String>,
    pub non_recyclable: Vec<String>,
    pub hazardous: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    /// Registry name of the backend (`scripted` or `tract`).
    pub backend: String,
    pub model_path: Option<PathBuf>,
    pub class_names_path: Option<PathBuf>,
    pub confidence: f32,
    /// Model input size.
    pub input_width: u32,
    pub input_height: u32,
    /// Frames are scaled to this width (16:9) before detection.
    pub processing_width: u32,
}

impl DetectorSettings {
    pub fn processing_size(&self) -> (u32, u32) {
        (self.processing_width, processing_height(self.processing_width))
    }
}

#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// `stub://...` for the synthetic source, a device path such as `/dev/video0` otherwise.
    pub source: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct RtcSettings {
    pub ice_servers: Vec<IceServer>,
}

/// ICE server entry handed to the browser-side transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl RtcSettings {
    /// `{"iceServers": [...]}` as expected by `RTCPeerConnection`.
    pub fn to_rtc_configuration(&self) -> serde_json::Value {
        serde_json::json!({ "iceServers": self.ice_servers })
    }
}

impl SorterConfig {
    /// Load from `WASTE_SORTER_CONFIG` (if set), then apply env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("WASTE_SORTER_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Load from an explicit file (or defaults), then apply env overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply command-line overrides and re-validate.
    pub fn override_with(&mut self, source: Option<String>, backend: Option<String>) -> Result<()> {
        if let Some(source) = source {
            self.stream.source = source;
        }
        if let Some(backend) = backend {
            self.detector.backend = backend;
        }
        self.validate()
    }

    fn from_file(file: SorterConfigFile) -> Self {
        let categories = file.categories.unwrap_or_default();
        let categories = CategorySettings {
            recyclable: categories
                .recyclable
                .unwrap_or_else(|| to_strings(DEFAULT_RECYCLABLE)),
            non_recyclable: categories
                .non_recyclable
                .unwrap_or_else(|| to_strings(DEFAULT_NON_RECYCLABLE)),
            hazardous: categories
                .hazardous
                .unwrap_or_else(|| to_strings(DEFAULT_HAZARDOUS)),
        };

        let detector = file.detector.unwrap_or_default();
        let detector = DetectorSettings {
            backend: detector
                .backend
                .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
            model_path: detector.model_path,
            class_names_path: detector.class_names,
            confidence: detector.confidence.unwrap_or(DEFAULT_CONFIDENCE),
            input_width: detector.input_width.unwrap_or(DEFAULT_MODEL_INPUT),
            input_height: detector.input_height.unwrap_or(DEFAULT_MODEL_INPUT),
            processing_width: detector.processing_width.unwrap_or(PROCESSING_WIDTH),
        };

        let stream = file.stream.unwrap_or_default();
        let stream = StreamSettings {
            source: stream.source.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            target_fps: stream.target_fps.unwrap_or(DEFAULT_FPS),
            width: stream.width.unwrap_or(DEFAULT_CAPTURE_WIDTH),
            height: stream.height.unwrap_or(DEFAULT_CAPTURE_HEIGHT),
        };

        let rtc = RtcSettings {
            ice_servers: file
                .rtc
                .and_then(|rtc| rtc.ice_servers)
                .unwrap_or_else(|| {
                    vec![IceServer {
                        urls: to_strings(DEFAULT_STUN_URLS),
                        username: None,
                        credential: None,
                    }]
                }),
        };

        Self {
            categories,
            detector,
            stream,
            rtc,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(source) = non_empty_env("WASTE_SORTER_SOURCE") {
            self.stream.source = source;
        }
        if let Some(backend) = non_empty_env("WASTE_SORTER_BACKEND") {
            self.detector.backend = backend;
        }
        if let Some(model) = non_empty_env("WASTE_SORTER_MODEL") {
            self.detector.model_path = Some(PathBuf::from(model));
        }
        if let Some(confidence) = non_empty_env("WASTE_SORTER_CONFIDENCE") {
            self.detector.confidence = confidence
                .parse()
                .map_err(|_| anyhow!("WASTE_SORTER_CONFIDENCE must be a number"))?;
        }
        if let Some(labels) = non_empty_env("WASTE_SORTER_RECYCLABLE") {
            self.categories.recyclable = split_csv(&labels);
        }
        if let Some(labels) = non_empty_env("WASTE_SORTER_NON_RECYCLABLE") {
            self.categories.non_recyclable = split_csv(&labels);
        }
        if let Some(labels) = non_empty_env("WASTE_SORTER_HAZARDOUS") {
            self.categories.hazardous = split_csv(&labels);
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        let confidence = self.detector.confidence;
        if !(confidence > 0.0 && confidence <= 1.0) {
            return Err(anyhow!(
                "detector confidence must be in (0, 1], got {}",
                confidence
            ));
        }
        if self.detector.input_width == 0 || self.detector.input_height == 0 {
            return Err(anyhow!("detector input size must be non-zero"));
        }
        let processing_width = self.detector.processing_width;
        if processing_height(processing_width) == 0 {
            return Err(anyhow!("processing width {} is too small", processing_width));
        }
        if processing_width > MAX_PROCESSING_WIDTH {
            return Err(anyhow!(
                "processing width {} exceeds {}",
                processing_width,
                MAX_PROCESSING_WIDTH
            ));
        }
        if self.detector.backend == "tract" && self.detector.model_path.is_none() {
            return Err(anyhow!("tract backend requires detector.model_path"));
        }
        if self.stream.target_fps == 0 {
            return Err(anyhow!("stream target_fps must be >= 1"));
        }
        if self.stream.width == 0 || self.stream.height == 0 {
            return Err(anyhow!("stream frame size must be non-zero"));
        }

        for (name, labels) in [
            ("recyclable", &mut self.categories.recyclable),
            ("non_recyclable", &mut self.categories.non_recyclable),
            ("hazardous", &mut self.categories.hazardous),
        ] {
            for label in labels.iter_mut() {
                *label = label.trim().to_string();
                if label.is_empty() {
                    return Err(anyhow!("empty label in {} category", name));
                }
            }
        }

        for server in &self.rtc.ice_servers {
            if server.urls.is_empty() {
                return Err(anyhow!("ICE server entry has no urls"));
            }
            for url in &server.urls {
                if !["stun:", "turn:", "turns:"]
                    .iter()
                    .any(|scheme| url.starts_with(scheme))
                {
                    return Err(anyhow!("unsupported ICE server url {}", url));
                }
            }
        }

        for (label, categories) in self.category_tables().overlaps() {
            log::warn!(
                "label '{}' is listed in several categories: {:?}",
                label,
                categories
            );
        }
        Ok(())
    }

    /// Immutable membership tables for the classifier.
    pub fn category_tables(&self) -> CategoryTables {
        CategoryTables::new(
            self.categories.recyclable.iter().cloned().collect::<LabelSet>(),
            self.categories.non_recyclable.iter().cloned().collect(),
            self.categories.hazardous.iter().cloned().collect(),
        )
    }

    /// Same as `category_tables`, ready to share between threads.
    pub fn shared_category_tables(&self) -> Arc<CategoryTables> {
        Arc::new(self.category_tables())
    }
}

fn read_config_file(path: &Path) -> Result<SorterConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
