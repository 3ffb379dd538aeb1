use base64::Engine;
use serde::Serialize;
use std::path::Path;

use crate::error::{ReceiptError, Result};

/// Smallest amount (Rupiah) a receipt total can plausibly be.
pub const AMOUNT_MIN: i64 = 1_000;
/// Largest amount (Rupiah) a receipt total can plausibly be.
pub const AMOUNT_MAX: i64 = 50_000_000;

pub const DATE_WEIGHT: u8 = 30;
pub const TIME_WEIGHT: u8 = 30;
pub const AMOUNT_WEIGHT: u8 = 40;

pub fn is_plausible_amount(value: i64) -> bool {
    (AMOUNT_MIN..=AMOUNT_MAX).contains(&value)
}

/// An uploaded receipt photo. Owned by the caller for one processing request.
#[derive(Debug, Clone)]
pub struct ReceiptImage {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

impl ReceiptImage {
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        ReceiptImage {
            bytes,
            media_type: media_type.into(),
        }
    }

    /// Read a file, inferring the media type from its extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| ReceiptError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let media_type = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("jpg" | "jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("webp") => "image/webp",
            Some("heic") => "image/heic",
            _ => "application/octet-stream",
        };
        Ok(ReceiptImage::new(bytes, media_type))
    }

    /// Decode a `data:image/...;base64,...` URL as produced by browser file readers.
    pub fn from_data_url(url: &str) -> Result<Self> {
        let rest = url
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| ReceiptError::DataUrl("missing data: prefix".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| ReceiptError::DataUrl("missing payload separator".to_string()))?;
        let media_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| ReceiptError::DataUrl("only base64 payloads are supported".to_string()))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| ReceiptError::DataUrl(e.to_string()))?;
        Ok(ReceiptImage::new(bytes, media_type))
    }

    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }
}

/// Transcript produced by one recognition run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecognizedText {
    pub text: String,
    pub engine_name: String,
}

/// Structured fields pulled from a receipt transcript.
///
/// `confidence` is derived from which fields are present and cannot be set
/// independently; amounts outside [`AMOUNT_MIN`, `AMOUNT_MAX`] are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedReceiptData {
    date: Option<String>,
    time: Option<String>,
    amount: Option<i64>,
    raw_text: String,
    confidence: u8,
}

impl ExtractedReceiptData {
    pub fn new(
        date: Option<String>,
        time: Option<String>,
        amount: Option<i64>,
        raw_text: impl Into<String>,
    ) -> Self {
        let amount = amount.filter(|&a| is_plausible_amount(a));
        let confidence = date.is_some() as u8 * DATE_WEIGHT
            + time.is_some() as u8 * TIME_WEIGHT
            + amount.is_some() as u8 * AMOUNT_WEIGHT;
        ExtractedReceiptData {
            date,
            time,
            amount,
            raw_text: raw_text.into(),
            confidence,
        }
    }

    /// The "extraction failed" shape: no fields, no transcript, zero confidence.
    pub fn empty() -> Self {
        ExtractedReceiptData::new(None, None, None, String::new())
    }

    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    pub fn time(&self) -> Option<&str> {
        self.time.as_deref()
    }

    pub fn amount(&self) -> Option<i64> {
        self.amount
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// 0–100.
    pub fn confidence(&self) -> u8 {
        self.confidence
    }
}
