use anyhow::{Context, Result};

pub mod logging;
pub mod ocr;
pub mod preview;
pub mod server;
pub mod settings;
pub mod store;
mod test_util;

pub use ocr::{OcrError, ParsedProblem, segment};

/// Segments a raw Clova OCR response (JSON text) into a problem.
pub fn parse_clova_json(input: &str) -> Result<ParsedProblem> {
    let response: serde_json::Value =
        serde_json::from_str(input).with_context(|| "OCR response is not valid JSON")?;
    Ok(ocr::parse_response(&response)?)
}
