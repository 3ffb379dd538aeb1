use std::io::Cursor;
use std::sync::Mutex;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use receiptor_lib::config::{AmountHeuristics, PreprocessConfig};
use receiptor_lib::error::ReceiptError;
use receiptor_lib::extract::extract_amount;
use receiptor_lib::locale::{format_thousands, parse_amount};
use receiptor_lib::{
    extract_fields, CampaignConfig, MissionRequirement, MissionValidator, ReceiptImage,
    ReceiptProcessor, RecognizedText, Recognizer, Result,
};

/// Returns one scripted transcript per call, then empty text.
struct FakeEngine {
    replies: Mutex<Vec<String>>,
}

impl FakeEngine {
    fn boxed(replies: &[&str]) -> Box<dyn Recognizer> {
        Box::new(FakeEngine {
            replies: Mutex::new(replies.iter().rev().map(|s| s.to_string()).collect()),
        })
    }
}

impl Recognizer for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }
    fn recognize(&self, _: &DynamicImage, _: &dyn Fn(u8)) -> Result<RecognizedText> {
        let text = self.replies.lock().unwrap().pop().unwrap_or_default();
        Ok(RecognizedText {
            text,
            engine_name: "fake".to_string(),
        })
    }
}

struct FailingEngine;

impl Recognizer for FailingEngine {
    fn name(&self) -> &str {
        "failing"
    }
    fn recognize(&self, _: &DynamicImage, _: &dyn Fn(u8)) -> Result<RecognizedText> {
        Err(ReceiptError::Engine {
            engine: "failing".to_string(),
            message: "worker crashed".to_string(),
        })
    }
}

struct PanickingEngine;

impl Recognizer for PanickingEngine {
    fn name(&self) -> &str {
        "panicking"
    }
    fn recognize(&self, _: &DynamicImage, _: &dyn Fn(u8)) -> Result<RecognizedText> {
        panic!("engine bug")
    }
}

fn processor(engine: Box<dyn Recognizer>) -> ReceiptProcessor {
    ReceiptProcessor::new(engine, PreprocessConfig::default(), AmountHeuristics::default())
}

fn photo() -> ReceiptImage {
    let img = RgbImage::from_pixel(32, 48, Rgb([235, 235, 230]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    ReceiptImage::new(bytes, "image/png")
}

fn validator() -> MissionValidator {
    MissionValidator::from_config(&CampaignConfig::default())
}

const HAPPY: &str = "KOPI SENJA PIK\n20 Dec 2025 19:45\nCappuccino   2 x 100.000\nTotal payment: 200.000\nTerima kasih";

#[test]
fn happy_path_passes_mission_one() {
    let data = processor(FakeEngine::boxed(&[HAPPY])).process(&photo());
    assert_eq!(data.amount(), Some(200_000));
    assert_eq!(data.confidence(), 100);

    let verdict = validator().validate(&MissionRequirement::food_and_beverage(), &data);
    assert!(verdict.is_valid());
    assert!(verdict.errors().is_empty());
}

#[test]
fn late_time_fails_only_the_time_check() {
    let text = HAPPY.replace("19:45", "19:15");
    let data = processor(FakeEngine::boxed(&[&text])).process(&photo());
    let verdict = validator().validate(&MissionRequirement::food_and_beverage(), &data);
    assert!(!verdict.is_valid());
    assert_eq!(verdict.errors(), ["Waktu transaksi minimal 19.30 WIB"]);
}

#[test]
fn discount_figure_is_never_the_total() {
    let ambiguous = "20 Dec 2025 19:45\nTotal: 300.000\nHemat: 300.000";
    assert_eq!(extract_amount(ambiguous), None);

    let with_payment = format!("{ambiguous}\nDebit BCA: 270.000");
    assert_eq!(extract_amount(&with_payment), Some(270_000));
}

#[test]
fn garbled_digits_are_repaired() {
    let data = extract_fields("Tota1 payment: 1O0.OOO", &AmountHeuristics::default());
    assert_eq!(data.amount(), Some(100_000));
    assert_eq!(data.raw_text(), "Tota1 payment: 1O0.OOO");
}

#[test]
fn zero_confidence_falls_back_to_original_image() {
    let data = processor(FakeEngine::boxed(&["@@ ## unreadable", HAPPY])).process(&photo());
    assert_eq!(data.confidence(), 100);
    assert_eq!(data.raw_text(), HAPPY);
}

#[test]
fn both_attempts_empty_gives_empty_result() {
    let data = processor(FakeEngine::boxed(&["", ""])).process(&photo());
    assert_eq!(data.confidence(), 0);
    assert_eq!(data.date(), None);
    assert_eq!(data.raw_text(), "");
}

#[test]
fn engine_errors_and_panics_degrade_to_zero_confidence() {
    for engine in [
        Box::new(FailingEngine) as Box<dyn Recognizer>,
        Box::new(PanickingEngine),
    ] {
        let data = processor(engine).process(&photo());
        assert_eq!(data.confidence(), 0);
        let verdict = validator().validate(&MissionRequirement::fashion(), &data);
        assert_eq!(verdict.errors().len(), 3);
    }
}

#[test]
fn date_strictness() {
    let v = validator();
    assert!(!v.is_event_date("21/12/2025"));
    // every component of the event date is present, but scattered
    assert!(!v.is_event_date("Kasir 20 Meja 12 Struk 2025"));
    assert!(v.is_event_date("20 Desember 2025"));
}

#[test]
fn extracted_amounts_stay_in_range() {
    for text in [
        "Total payment: 999",
        "Total payment: 60.000.000",
        "Grand Total 900\n120.000.000\n120.000.000",
        "Tunai: 1.000",
    ] {
        if let Some(amount) = extract_amount(text) {
            assert!((1_000..=50_000_000).contains(&amount), "{text} -> {amount}");
        }
    }
}

#[test]
fn parse_amount_reads_its_own_format() {
    for value in [1_000, 12_345, 150_000, 999_999, 1_000_000, 25_500_750, 50_000_000] {
        assert_eq!(parse_amount(&format_thousands(value)), value);
    }
}

#[test]
fn verdict_is_valid_exactly_when_error_free() {
    let texts = [HAPPY, "", "20/12/2025 21:00\nTunai: 90.000", "2025-12-20 20:30\nQRIS: 410.500"];
    let config = CampaignConfig::default();
    for text in texts {
        let data = extract_fields(text, &config.amount);
        for mission in &config.missions {
            let verdict = validator().validate(mission, &data);
            assert_eq!(verdict.is_valid(), verdict.errors().is_empty());
            assert_eq!(verdict.errors().len(), verdict.failed_checks().len());
            assert_eq!(
                u32::from(data.confidence()),
                30 * data.date().is_some() as u32
                    + 30 * data.time().is_some() as u32
                    + 40 * data.amount().is_some() as u32
            );
        }
    }
}
