use image::DynamicImage;
use rayon::prelude::*;
use tesseract::{PageSegMode, Tesseract};

use super::{build_lang, input_view, Recognizer};
use crate::config::{InputView, OcrConfig};
use crate::error::{ReceiptError, Result};
use crate::receipt::RecognizedText;

const NAME: &str = "tesseract/native";

/// Layouts a printed receipt usually fits.
const PSMS: &[PageSegMode] = &[
    PageSegMode::PsmAuto,
    PageSegMode::PsmSingleColumn,
    PageSegMode::PsmSingleBlock,
];

/// In-process libtesseract. Runs every mode in `PSMS` and keeps the transcript
/// with the best mean word confidence.
pub struct TesseractRecognizer {
    config: OcrConfig,
}

impl TesseractRecognizer {
    pub fn new(config: OcrConfig) -> Self {
        TesseractRecognizer { config }
    }
}

impl Recognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        NAME
    }

    fn recognize(&self, image: &DynamicImage, progress: &dyn Fn(u8)) -> Result<RecognizedText> {
        progress(0);
        let lang = build_lang(&self.config.languages);
        let datapath = match &self.config.tessdata_dir {
            Some(dir) => Some(
                dir.to_str()
                    .ok_or_else(|| ReceiptError::engine(NAME, "tessdata path is not UTF-8"))?
                    .to_string(),
            ),
            None => None,
        };

        let (bytes, w, h, bpp) = match input_view(image, self.config.input_view) {
            DynamicImage::ImageLuma8(gray) => {
                let (w, h) = gray.dimensions();
                (gray.into_raw(), w, h, 1)
            }
            other => {
                debug_assert_eq!(self.config.input_view, InputView::Rgb);
                let rgb = other.to_rgb8();
                let (w, h) = rgb.dimensions();
                (rgb.into_raw(), w, h, 3)
            }
        };
        progress(10);

        let attempts: Vec<Result<(String, i32)>> = PSMS
            .par_iter()
            .map(|&psm| try_ocr(&bytes, w, h, bpp, datapath.as_deref(), &lang, psm))
            .collect();
        progress(95);

        let mut best: Option<(String, i32)> = None;
        let mut last_err = None;
        for attempt in attempts {
            match attempt {
                Ok((text, conf)) => {
                    tracing::debug!(conf, chars = text.len(), "tesseract page segmentation attempt");
                    if best.as_ref().map_or(true, |(_, c)| conf > *c) {
                        best = Some((text, conf));
                    }
                }
                Err(e) => last_err = Some(e),
            }
        }
        progress(100);

        match (best, last_err) {
            (Some((text, _)), _) => Ok(RecognizedText {
                text,
                engine_name: NAME.to_string(),
            }),
            (None, Some(e)) => Err(e),
            (None, None) => Ok(RecognizedText {
                text: String::new(),
                engine_name: NAME.to_string(),
            }),
        }
    }
}

/// One Tesseract pass. `bpp` is bytes per pixel: 1 grayscale, 3 RGB.
fn try_ocr(
    bytes: &[u8],
    w: u32,
    h: u32,
    bpp: i32,
    datapath: Option<&str>,
    lang: &str,
    psm: PageSegMode,
) -> Result<(String, i32)> {
    let mut tess = Tesseract::new(datapath, Some(lang))
        .map_err(|e| ReceiptError::engine(NAME, e))?
        .set_frame(bytes, w as i32, h as i32, bpp, w as i32 * bpp)
        .map_err(|e| ReceiptError::engine(NAME, e))?;
    tess.set_page_seg_mode(psm);
    let mut tess = tess.recognize().map_err(|e| ReceiptError::engine(NAME, e))?;

    let text = tess
        .get_text()
        .map_err(|e| ReceiptError::engine(NAME, e))?
        .trim()
        .to_string();
    Ok((text, tess.mean_text_conf()))
}
