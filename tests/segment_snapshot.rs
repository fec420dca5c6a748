use snapsolve_server::ocr::{extract_tokens, is_choice_marker};
use snapsolve_server::{parse_clova_json, segment};

const CLOVA_RESPONSE: &str = include_str!("fixtures/clova_response.json");

#[test]
fn clova_fixture_snapshot() {
    let parsed = parse_clova_json(CLOVA_RESPONSE).unwrap();
    insta::assert_json_snapshot!("clova_fixture", parsed);
}

#[test]
fn fixture_choice_count_matches_markers() {
    let value: serde_json::Value = serde_json::from_str(CLOVA_RESPONSE).unwrap();
    let tokens = extract_tokens(&value).unwrap();
    let parsed = segment(&tokens);
    let markers = tokens
        .iter()
        .filter(|token| is_choice_marker(token))
        .collect::<Vec<_>>();
    assert_eq!(parsed.choices.len(), markers.len());
    for (choice, marker) in parsed.choices.iter().zip(markers) {
        assert!(choice.starts_with(marker.as_str()));
    }
}

#[test]
fn invalid_json_is_reported() {
    let err = parse_clova_json("not json").unwrap_err();
    assert!(err.to_string().contains("not valid JSON"));
}

#[test]
fn malformed_payload_surfaces_typed_error() {
    let err = parse_clova_json(r#"{"images": [{}]}"#).unwrap_err();
    let ocr_err = err
        .downcast_ref::<snapsolve_server::OcrError>()
        .expect("typed OCR error");
    assert!(matches!(
        ocr_err,
        snapsolve_server::OcrError::MalformedUpstreamResponse(_)
    ));
}
