pub mod config;
pub mod error;
pub mod extract;
pub mod locale;
pub mod normalize;
pub mod ocr;
pub mod preprocess;
pub mod processor;
pub mod receipt;
pub mod validate;

pub use config::{load_config, save_config, CampaignConfig, MissionRequirement};
pub use error::{ReceiptError, Result};
pub use extract::extract_fields;
pub use ocr::{build_recognizer, Recognizer};
pub use processor::{CancelFlag, ProcessOptions, ReceiptProcessor};
pub use receipt::{ExtractedReceiptData, ReceiptImage, RecognizedText};
pub use validate::{validate_for_mission, MissionValidator, RuleCheck, ValidationVerdict};
