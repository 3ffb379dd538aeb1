pub mod cli;
#[cfg(feature = "tesseract")]
pub mod tesseract;

use image::DynamicImage;
use imageproc::contrast::equalize_histogram;

use crate::config::{EngineKind, InputView, OcrConfig};
use crate::error::Result;
use crate::receipt::RecognizedText;

// ── Public types ─────────────────────────────────────────────────────────────

/// Every recognition backend implements this.
///
/// `recognize` borrows the decoded image so the pipeline can hand the same
/// buffer to a second attempt; engines copy only what they convert.
/// `progress` receives 0–100.
pub trait Recognizer: Send + Sync {
    fn name(&self) -> &str;
    fn recognize(&self, image: &DynamicImage, progress: &dyn Fn(u8)) -> Result<RecognizedText>;
}

/// Build the engine selected in `config`.
pub fn build_recognizer(config: &OcrConfig) -> Result<Box<dyn Recognizer>> {
    match config.engine {
        EngineKind::TesseractCli => Ok(Box::new(cli::TesseractCli::new(config.clone()))),
        #[cfg(feature = "tesseract")]
        EngineKind::Tesseract => Ok(Box::new(tesseract::TesseractRecognizer::new(config.clone()))),
        #[cfg(not(feature = "tesseract"))]
        EngineKind::Tesseract => Err(crate::error::ReceiptError::EngineUnavailable(
            "tesseract (rebuild with --features tesseract)".to_string(),
        )),
    }
}

/// Run `engine`, turning any failure into an empty transcript.
pub fn recognize_or_empty(
    engine: &dyn Recognizer,
    image: &DynamicImage,
    progress: &dyn Fn(u8),
) -> RecognizedText {
    match engine.recognize(image, progress) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(engine = engine.name(), error = %e, "recognition failed, using empty text");
            RecognizedText {
                text: String::new(),
                engine_name: engine.name().to_string(),
            }
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Convert to the colour space the engine is configured to read.
pub(crate) fn input_view(image: &DynamicImage, view: InputView) -> DynamicImage {
    match view {
        InputView::Rgb => DynamicImage::ImageRgb8(image.to_rgb8()),
        InputView::Gray => DynamicImage::ImageLuma8(image.to_luma8()),
        InputView::Equalized => DynamicImage::ImageLuma8(equalize_histogram(&image.to_luma8())),
    }
}

/// Tesseract language string, e.g. `["id", "en"]` → `"ind+eng"`.
pub(crate) fn build_lang(languages: &[String]) -> String {
    if languages.is_empty() {
        return "ind+eng".to_string();
    }
    languages
        .iter()
        .map(|l| match l.trim() {
            "id" | "ind" => "ind",
            "en" | "eng" => "eng",
            other => other,
        })
        .collect::<Vec<_>>()
        .join("+")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReceiptError;
    use image::{GenericImageView, Luma, Rgba, RgbaImage};

    struct Broken;

    impl Recognizer for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn recognize(&self, _: &DynamicImage, _: &dyn Fn(u8)) -> Result<RecognizedText> {
            Err(ReceiptError::engine("broken", "no engine"))
        }
    }

    #[test]
    fn language_codes() {
        assert_eq!(build_lang(&["id".into(), "en".into()]), "ind+eng");
        assert_eq!(build_lang(&[" ind ".into(), "jpn".into()]), "ind+jpn");
        assert_eq!(build_lang(&[]), "ind+eng");
    }

    #[test]
    fn failures_become_empty_text() {
        let img = DynamicImage::new_rgb8(2, 2);
        let out = recognize_or_empty(&Broken, &img, &|_| {});
        assert_eq!(out.text, "");
        assert_eq!(out.engine_name, "broken");
    }

    #[test]
    fn input_views() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255])));
        assert!(matches!(input_view(&img, InputView::Rgb), DynamicImage::ImageRgb8(_)));
        let gray = input_view(&img, InputView::Gray);
        assert_eq!(gray.dimensions(), (3, 2));
        assert!(matches!(gray, DynamicImage::ImageLuma8(_)));
        let eq = input_view(&img, InputView::Equalized).to_luma8();
        // a single-level image equalises to full white
        assert_eq!(*eq.get_pixel(0, 0), Luma([255]));
    }

    #[cfg(not(feature = "tesseract"))]
    #[test]
    fn native_engine_needs_the_feature() {
        let config = OcrConfig {
            engine: EngineKind::Tesseract,
            ..OcrConfig::default()
        };
        assert!(matches!(
            build_recognizer(&config),
            Err(ReceiptError::EngineUnavailable(_))
        ));
    }

    #[test]
    fn cli_engine_is_the_default() {
        let engine = build_recognizer(&OcrConfig::default()).unwrap();
        assert_eq!(engine.name(), "tesseract/cli");
    }
}
