use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ReceiptError, Result};

/// The event every receipt must be dated on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub name: String,
    pub date: NaiveDate,
    pub location: String,
}

impl Default for EventConfig {
    fn default() -> Self {
        EventConfig {
            name: "Christmas Super Midnight Sale".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 12, 20).unwrap_or_default(),
            location: "Supermal Karawaci".to_string(),
        }
    }
}

/// Per-mission thresholds. Shared read-only by every validation of that mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionRequirement {
    pub id: u8,
    pub name: String,
    #[serde(default)]
    pub category: String,
    /// Minimum spend in Rupiah (inclusive).
    pub min_amount: i64,
    /// Earliest accepted transaction time, `HH:MM` 24-hour.
    pub min_time: String,
    /// How `min_time` is shown to participants, e.g. "19.30 WIB".
    #[serde(default)]
    pub min_time_display: String,
    #[serde(default)]
    pub description: String,
}

impl MissionRequirement {
    /// `min_time` as minutes since midnight, `None` when it does not parse.
    pub fn min_time_minutes(&self) -> Option<u32> {
        NaiveTime::parse_from_str(self.min_time.trim(), "%H:%M")
            .ok()
            .map(|t| t.hour() * 60 + t.minute())
    }

    pub fn display_min_time(&self) -> &str {
        if self.min_time_display.is_empty() {
            &self.min_time
        } else {
            &self.min_time_display
        }
    }

    pub fn food_and_beverage() -> Self {
        MissionRequirement {
            id: 1,
            name: "Misi F&B".to_string(),
            category: "Food & Beverage".to_string(),
            min_amount: 150_000,
            min_time: "19:30".to_string(),
            min_time_display: "19.30 WIB".to_string(),
            description: "Belanja di tenant F&B min. Rp 150.000".to_string(),
        }
    }

    pub fn fashion() -> Self {
        MissionRequirement {
            id: 2,
            name: "Misi Fashion".to_string(),
            category: "Fashion & Accessories".to_string(),
            min_amount: 250_000,
            min_time: "20:00".to_string(),
            min_time_display: "20.00 WIB".to_string(),
            description: "Belanja di tenant Fashion min. Rp 250.000".to_string(),
        }
    }
}

/// Which recognition backend `ocr::build_recognizer` constructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    /// The `tesseract` executable, fed a PNG on stdin.
    #[default]
    TesseractCli,
    /// In-process libtesseract (cargo feature `tesseract`).
    Tesseract,
}

/// Colour space handed to the engine after preprocessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum InputView {
    Rgb,
    #[default]
    Gray,
    /// Grayscale followed by histogram equalisation.
    Equalized,
}

/// Immutable recognition-engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub engine: EngineKind,
    /// Language hints, local language first. Short codes ("id", "en") are accepted.
    pub languages: Vec<String>,
    /// Path or name of the tesseract executable.
    pub binary: PathBuf,
    /// Directory containing `tessdata/` (native engine) or the traineddata files (CLI).
    pub tessdata_dir: Option<PathBuf>,
    /// Tesseract page segmentation mode for the CLI engine. 4 = single column of varied text.
    pub page_seg_mode: u8,
    pub input_view: InputView,
}

impl Default for OcrConfig {
    fn default() -> Self {
        OcrConfig {
            engine: EngineKind::default(),
            languages: vec!["ind".to_string(), "eng".to_string()],
            binary: PathBuf::from("tesseract"),
            tessdata_dir: None,
            page_seg_mode: 4,
            input_view: InputView::default(),
        }
    }
}

/// Tunables for `preprocess::preprocess`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub enabled: bool,
    /// Upscale when the longest side is below this many pixels…
    pub upscale_below_px: u32,
    /// …or when the encoded file is smaller than this many bytes.
    pub upscale_below_bytes: usize,
    pub upscale_factor: u32,
    /// Longest side after upscaling.
    pub max_dimension: u32,
    pub sharpen_strength: f32,
    pub sharpen_strength_upscaled: f32,
    pub contrast: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        PreprocessConfig {
            enabled: true,
            upscale_below_px: 1500,
            upscale_below_bytes: 200 * 1024,
            upscale_factor: 2,
            max_dimension: 3000,
            sharpen_strength: 0.3,
            sharpen_strength_upscaled: 0.6,
            contrast: 1.2,
        }
    }
}

/// Empirical amount-selection knobs. Tune against labelled receipts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmountHeuristics {
    /// Among fallback total candidates, the smallest value at or above this wins.
    pub preferred_floor: i64,
    /// Last-resort scan for the most repeated grouped number.
    pub use_frequency_scan: bool,
}

impl Default for AmountHeuristics {
    fn default() -> Self {
        AmountHeuristics {
            preferred_floor: 100_000,
            use_frequency_scan: true,
        }
    }
}

/// Upload constraints enforced by the calling layer before a receipt reaches the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadPolicy {
    pub max_bytes: usize,
    pub allowed_types: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        UploadPolicy {
            max_bytes: 10 * 1024 * 1024,
            // the formats the bundled decoder is built with
            allowed_types: ["image/jpeg", "image/png", "image/webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl UploadPolicy {
    /// Returns the participant-facing rejection message, if any.
    pub fn check(&self, media_type: &str, byte_size: usize) -> Result<(), String> {
        if byte_size > self.max_bytes {
            return Err(format!(
                "Ukuran file maksimal {}MB",
                self.max_bytes / (1024 * 1024)
            ));
        }
        let media_type = media_type.trim().to_ascii_lowercase();
        if !self.allowed_types.iter().any(|t| *t == media_type) {
            return Err("Format file harus JPG, PNG, atau WebP".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    pub event: EventConfig,
    pub missions: Vec<MissionRequirement>,
    pub ocr: OcrConfig,
    pub preprocess: PreprocessConfig,
    pub amount: AmountHeuristics,
    pub upload: UploadPolicy,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        CampaignConfig {
            event: EventConfig::default(),
            missions: vec![
                MissionRequirement::food_and_beverage(),
                MissionRequirement::fashion(),
            ],
            ocr: OcrConfig::default(),
            preprocess: PreprocessConfig::default(),
            amount: AmountHeuristics::default(),
            upload: UploadPolicy::default(),
        }
    }
}

impl CampaignConfig {
    pub fn mission(&self, id: u8) -> Option<&MissionRequirement> {
        self.missions.iter().find(|m| m.id == id)
    }

    /// Reject values the pipeline or validator cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.missions.is_empty() {
            return Err(ReceiptError::Config("no missions defined".to_string()));
        }
        let mut seen = HashSet::new();
        for m in &self.missions {
            if !seen.insert(m.id) {
                return Err(ReceiptError::Config(format!("duplicate mission id {}", m.id)));
            }
            if m.min_time_minutes().is_none() {
                return Err(ReceiptError::Config(format!(
                    "mission {}: min_time {:?} is not HH:MM",
                    m.id, m.min_time
                )));
            }
            if m.min_amount < 0 {
                return Err(ReceiptError::Config(format!(
                    "mission {}: negative min_amount",
                    m.id
                )));
            }
        }
        let p = &self.preprocess;
        if p.upscale_factor == 0 || p.max_dimension == 0 {
            return Err(ReceiptError::Config(
                "preprocess upscale_factor and max_dimension must be positive".to_string(),
            ));
        }
        if !(p.contrast > 0.0) {
            return Err(ReceiptError::Config("preprocess contrast must be positive".to_string()));
        }
        if self.ocr.languages.is_empty() {
            return Err(ReceiptError::Config("ocr.languages is empty".to_string()));
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<CampaignConfig> {
    let shown = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|source| ReceiptError::Io {
        path: shown.clone(),
        source,
    })?;
    let cfg: CampaignConfig =
        serde_json::from_str(&text).map_err(|source| ReceiptError::Json { path: shown, source })?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn save_config(path: &Path, config: &CampaignConfig) -> Result<()> {
    let shown = path.display().to_string();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ReceiptError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }
    let text = serde_json::to_string_pretty(config).map_err(|source| ReceiptError::Json {
        path: shown.clone(),
        source,
    })?;
    fs::write(path, text).map_err(|source| ReceiptError::Io { path: shown, source })
}
