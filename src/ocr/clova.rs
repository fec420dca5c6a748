use serde_json::Value;

use super::segment::segment;
use super::{OcrError, ParsedProblem};

/// Pulls `images[0].fields[*].inferText` out of a Clova General OCR response.
///
/// A missing or mistyped path is `MalformedUpstreamResponse`. A field list
/// that is empty, or whose texts are all blank, is `EmptyFieldList`.
pub fn extract_tokens(response: &Value) -> Result<Vec<String>, OcrError> {
    let images = response
        .get("images")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("images"))?;
    let image = images.first().ok_or_else(|| malformed("images[0]"))?;
    let fields = image
        .get("fields")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("images[0].fields"))?;

    let mut tokens = Vec::with_capacity(fields.len());
    for (idx, field) in fields.iter().enumerate() {
        let text = field
            .get("inferText")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed(&format!("images[0].fields[{}].inferText", idx)))?;
        tokens.push(text.to_string());
    }

    if tokens.iter().all(|token| token.trim().is_empty()) {
        return Err(OcrError::EmptyFieldList);
    }
    Ok(tokens)
}

pub fn parse_response(response: &Value) -> Result<ParsedProblem, OcrError> {
    let tokens = extract_tokens(response)?;
    Ok(segment(&tokens))
}

fn malformed(path: &str) -> OcrError {
    OcrError::MalformedUpstreamResponse(format!("missing or invalid `{}`", path))
}
