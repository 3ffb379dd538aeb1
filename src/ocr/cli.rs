use std::ffi::OsString;
use std::io::Write;
use std::process::{Command, Stdio};

use image::DynamicImage;

use super::{build_lang, input_view, Recognizer};
use crate::config::OcrConfig;
use crate::error::{ReceiptError, Result};
use crate::preprocess::encode_png;
use crate::receipt::RecognizedText;

const NAME: &str = "tesseract/cli";

/// The `tesseract` executable, fed a lossless PNG on stdin.
pub struct TesseractCli {
    config: OcrConfig,
}

impl TesseractCli {
    pub fn new(config: OcrConfig) -> Self {
        TesseractCli { config }
    }

    fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "stdin".into(),
            "stdout".into(),
            "-l".into(),
            build_lang(&self.config.languages).into(),
            "--psm".into(),
            self.config.page_seg_mode.to_string().into(),
        ];
        if let Some(dir) = &self.config.tessdata_dir {
            args.push("--tessdata-dir".into());
            args.push(dir.clone().into_os_string());
        }
        args
    }
}

impl Recognizer for TesseractCli {
    fn name(&self) -> &str {
        NAME
    }

    fn recognize(&self, image: &DynamicImage, progress: &dyn Fn(u8)) -> Result<RecognizedText> {
        progress(0);
        let png = encode_png(&input_view(image, self.config.input_view))?;
        progress(20);

        let mut child = Command::new(&self.config.binary)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ReceiptError::engine(NAME, format!("cannot start {:?}: {e}", self.config.binary))
            })?;

        // Feed stdin from another thread so a full stdout pipe cannot deadlock us.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReceiptError::engine(NAME, "stdin not captured"))?;
        let writer = std::thread::spawn(move || stdin.write_all(&png));

        let output = child
            .wait_with_output()
            .map_err(|e| ReceiptError::engine(NAME, e))?;
        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(error = %e, "tesseract closed stdin early"),
            Err(_) => return Err(ReceiptError::engine(NAME, "stdin writer panicked")),
        }
        progress(90);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReceiptError::engine(
                NAME,
                format!("{}: {}", output.status, stderr.trim()),
            ));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::debug!(chars = text.len(), "tesseract/cli transcript");
        progress(100);
        Ok(RecognizedText {
            text,
            engine_name: NAME.to_string(),
        })
    }
}
