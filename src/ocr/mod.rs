mod clova;
mod engine;
mod segment;

pub use clova::{extract_tokens, parse_response};
pub use engine::{ClovaOcr, OcrEngine, OcrFuture, OcrImage};
pub use segment::{is_choice_marker, segment};

/// A multiple-choice problem recovered from one OCR pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParsedProblem {
    #[serde(rename = "problem")]
    pub stem: String,
    pub choices: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("malformed OCR response: {0}")]
    MalformedUpstreamResponse(String),
    #[error("OCR response contains no recognized text")]
    EmptyFieldList,
    #[error("OCR request failed with status {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("OCR request failed: {0}")]
    Transport(String),
    #[error("invalid image data: {0}")]
    InvalidImage(String),
    #[error("OCR is not configured: {0}")]
    NotConfigured(&'static str),
}
