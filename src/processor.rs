use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use image::DynamicImage;

use crate::config::{AmountHeuristics, CampaignConfig, PreprocessConfig};
use crate::error::Result;
use crate::extract::extract_fields;
use crate::ocr::{build_recognizer, recognize_or_empty, Recognizer};
use crate::preprocess::preprocess;
use crate::receipt::{ExtractedReceiptData, ReceiptImage};

/// Shared cancellation flag. Clone it into whatever needs to stop a running scan.
#[derive(Debug, Clone)]
pub struct CancelFlag(pub Arc<AtomicBool>);

impl Default for CancelFlag {
    fn default() -> Self {
        CancelFlag(Arc::new(AtomicBool::new(false)))
    }
}

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-call hooks for [`ReceiptProcessor::process_with`].
pub struct ProcessOptions<'a> {
    /// Overall progress, 0–100, across both attempts.
    pub progress: &'a dyn Fn(u8),
    pub cancel: CancelFlag,
}

fn no_progress(_: u8) {}

impl Default for ProcessOptions<'_> {
    fn default() -> Self {
        ProcessOptions {
            progress: &no_progress,
            cancel: CancelFlag::default(),
        }
    }
}

/// Which image an attempt ran on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Enhanced,
    Original,
}

/// Receipt photo → extracted fields.
///
/// Holds no per-call state; one processor can serve many threads.
pub struct ReceiptProcessor {
    recognizer: Box<dyn Recognizer>,
    preprocess: PreprocessConfig,
    heuristics: AmountHeuristics,
}

impl ReceiptProcessor {
    pub fn new(
        recognizer: Box<dyn Recognizer>,
        preprocess: PreprocessConfig,
        heuristics: AmountHeuristics,
    ) -> Self {
        ReceiptProcessor {
            recognizer,
            preprocess,
            heuristics,
        }
    }

    /// Build the configured engine and wrap it.
    pub fn from_config(config: &CampaignConfig) -> Result<Self> {
        let recognizer = build_recognizer(&config.ocr)?;
        Ok(ReceiptProcessor::new(
            recognizer,
            config.preprocess.clone(),
            config.amount.clone(),
        ))
    }

    pub fn recognizer_name(&self) -> &str {
        self.recognizer.name()
    }

    pub fn process(&self, image: &ReceiptImage) -> ExtractedReceiptData {
        self.process_with(image, &ProcessOptions::default())
    }

    /// Run the pipeline. Never fails: every error degrades to
    /// [`ExtractedReceiptData::empty`].
    ///
    /// The enhanced image is tried first. Only when that scores zero is the
    /// decoded original tried as well, and the better of the two returned.
    pub fn process_with(
        &self,
        image: &ReceiptImage,
        options: &ProcessOptions<'_>,
    ) -> ExtractedReceiptData {
        let progress = options.progress;
        progress(0);

        let Some(decoded) = guarded("decode", || Ok(image::load_from_memory(&image.bytes)?)) else {
            tracing::warn!(media_type = %image.media_type, "cannot decode receipt image");
            progress(100);
            return ExtractedReceiptData::empty();
        };
        tracing::debug!(
            width = decoded.width(),
            height = decoded.height(),
            bytes = image.byte_size(),
            "decoded receipt"
        );

        let enhanced = if self.preprocess.enabled {
            guarded("preprocess", || preprocess(&decoded, image.byte_size(), &self.preprocess))
        } else {
            None
        };
        progress(10);
        if options.cancel.is_cancelled() {
            return ExtractedReceiptData::empty();
        }

        // Without a distinct enhanced image there is only one attempt to make.
        let Some(enhanced) = enhanced else {
            let data = self.attempt(Attempt::Original, &decoded, &|p: u8| progress(scaled(p, 10, 90)));
            progress(100);
            return data;
        };

        let first = self.attempt(Attempt::Enhanced, &enhanced, &|p: u8| progress(scaled(p, 10, 45)));
        drop(enhanced);
        if first.confidence() > 0 || options.cancel.is_cancelled() {
            progress(100);
            return first;
        }

        tracing::info!("enhanced image scored zero, retrying on the original");
        let second = self.attempt(Attempt::Original, &decoded, &|p: u8| progress(scaled(p, 55, 45)));
        progress(100);
        best_attempt(first, second)
    }

    /// Recognize and extract once. A panicking engine counts as an empty result.
    fn attempt(
        &self,
        which: Attempt,
        image: &DynamicImage,
        progress: &dyn Fn(u8),
    ) -> ExtractedReceiptData {
        let run = || {
            let recognized = recognize_or_empty(self.recognizer.as_ref(), image, progress);
            extract_fields(&recognized.text, &self.heuristics)
        };
        match catch_unwind(AssertUnwindSafe(run)) {
            Ok(data) => {
                tracing::info!(
                    attempt = ?which,
                    engine = self.recognizer.name(),
                    confidence = data.confidence(),
                    "recognition attempt finished"
                );
                data
            }
            Err(_) => {
                tracing::warn!(attempt = ?which, engine = self.recognizer.name(), "recognition engine panicked");
                ExtractedReceiptData::empty()
            }
        }
    }
}

/// Run one image stage. Errors and panics both come back as `None`, which
/// callers treat as "use what you already have".
fn guarded<T>(stage: &str, run: impl FnOnce() -> Result<T>) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(run)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            tracing::warn!(stage, error = %e, "image stage failed");
            None
        }
        Err(_) => {
            tracing::warn!(stage, "image stage panicked");
            None
        }
    }
}

/// Map an attempt's own 0–100 onto `start..=start + span` of the overall bar.
fn scaled(p: u8, start: u8, span: u8) -> u8 {
    start + (u16::from(p.min(100)) * u16::from(span) / 100) as u8
}

/// The higher-confidence result; ties keep `first`.
pub fn best_attempt(first: ExtractedReceiptData, second: ExtractedReceiptData) -> ExtractedReceiptData {
    if second.confidence() > first.confidence() {
        second
    } else {
        first
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipt::RecognizedText;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Answers with the next scripted transcript and records the input size.
    struct Scripted {
        replies: Mutex<Vec<&'static str>>,
        seen: Arc<Mutex<Vec<(u32, u32)>>>,
    }

    impl Scripted {
        fn new(replies: &[&'static str]) -> Self {
            Scripted {
                replies: Mutex::new(replies.iter().rev().copied().collect()),
                seen: Arc::default(),
            }
        }
    }

    impl Recognizer for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }
        fn recognize(&self, image: &DynamicImage, progress: &dyn Fn(u8)) -> Result<RecognizedText> {
            self.seen.lock().unwrap().push((image.width(), image.height()));
            progress(100);
            let text = self.replies.lock().unwrap().pop().unwrap_or("");
            Ok(RecognizedText {
                text: text.to_string(),
                engine_name: "scripted".to_string(),
            })
        }
    }

    fn png(w: u32, h: u32) -> ReceiptImage {
        let img = RgbImage::from_pixel(w, h, Rgb([240, 240, 240]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        ReceiptImage::new(bytes, "image/png")
    }

    fn data(conf_fields: (bool, bool, bool)) -> ExtractedReceiptData {
        ExtractedReceiptData::new(
            conf_fields.0.then(|| "20 Dec 2025".to_string()),
            conf_fields.1.then(|| "19:45".to_string()),
            conf_fields.2.then_some(200_000),
            "",
        )
    }

    #[test]
    fn best_attempt_prefers_higher_confidence_then_first() {
        let a = data((true, false, false));
        let b = data((false, false, true));
        assert_eq!(best_attempt(a.clone(), b.clone()), b);
        assert_eq!(best_attempt(b.clone(), a.clone()), b);
        let c = data((false, true, false));
        assert_eq!(best_attempt(a.clone(), c), a);
    }

    #[test]
    fn single_attempt_when_first_scores() {
        let engine = Scripted::new(&["20 Dec 2025 19:45\nTotal payment: 200.000"]);
        let processor = ReceiptProcessor::new(
            Box::new(engine),
            PreprocessConfig::default(),
            AmountHeuristics::default(),
        );
        let out = processor.process(&png(10, 8));
        assert_eq!(out.confidence(), 100);
    }

    #[test]
    fn preprocessing_feeds_upscaled_image_then_original() {
        let engine = Scripted::new(&["", "Total payment: 200.000"]);
        let seen = engine.seen.clone();
        let processor = ReceiptProcessor::new(
            Box::new(engine),
            PreprocessConfig::default(),
            AmountHeuristics::default(),
        );
        let out = processor.process(&png(10, 8));
        assert_eq!(out.amount(), Some(200_000));
        assert_eq!(out.confidence(), 40);
        assert_eq!(*seen.lock().unwrap(), vec![(20, 16), (10, 8)]);
    }

    #[test]
    fn disabled_preprocessing_runs_once_on_original() {
        let engine = Scripted::new(&["", "Total payment: 200.000"]);
        let seen = engine.seen.clone();
        let processor = ReceiptProcessor::new(
            Box::new(engine),
            PreprocessConfig {
                enabled: false,
                ..PreprocessConfig::default()
            },
            AmountHeuristics::default(),
        );
        assert_eq!(processor.process(&png(10, 8)), ExtractedReceiptData::empty());
        assert_eq!(*seen.lock().unwrap(), vec![(10, 8)]);
    }

    #[test]
    fn image_stage_failures_become_none() {
        assert_eq!(guarded("ok", || Ok(7)), Some(7));
        assert_eq!(
            guarded("err", || -> Result<u8> { Err(crate::error::ReceiptError::Config("bad".into())) }),
            None
        );
        assert_eq!(guarded("panic", || -> Result<u8> { panic!("resize bug") }), None);
    }

    #[test]
    fn undecodable_bytes_give_empty_result() {
        let processor = ReceiptProcessor::new(
            Box::new(Scripted::new(&["Total payment: 200.000"])),
            PreprocessConfig::default(),
            AmountHeuristics::default(),
        );
        let junk = ReceiptImage::new(b"not an image".to_vec(), "image/jpeg");
        assert_eq!(processor.process(&junk), ExtractedReceiptData::empty());
    }

    #[test]
    fn cancelled_before_recognition() {
        let processor = ReceiptProcessor::new(
            Box::new(Scripted::new(&["Total payment: 200.000"])),
            PreprocessConfig::default(),
            AmountHeuristics::default(),
        );
        let options = ProcessOptions::default();
        options.cancel.cancel();
        assert_eq!(
            processor.process_with(&png(10, 8), &options),
            ExtractedReceiptData::empty()
        );
    }

    #[test]
    fn progress_ends_at_100_and_never_decreases() {
        let processor = ReceiptProcessor::new(
            Box::new(Scripted::new(&["", ""])),
            PreprocessConfig::default(),
            AmountHeuristics::default(),
        );
        let seen = Mutex::new(Vec::new());
        let record = |p: u8| seen.lock().unwrap().push(p);
        let options = ProcessOptions {
            progress: &record,
            cancel: CancelFlag::default(),
        };
        processor.process_with(&png(10, 8), &options);
        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
    }
}
