use gibbler_core::errors::{ErrorInfo, GibblerError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("span", "[0,1]")
        .with_context("reason", "example")
}

#[test]
fn sample_error_surface() {
    let err = GibblerError::Sample(sample_info("S001", "coverage gap"));
    assert_eq!(err.info().code, "S001");
    assert!(err.info().context.contains_key("span"));
}

#[test]
fn options_error_surface() {
    let err = GibblerError::Options(sample_info("O001", "span out of range"));
    assert_eq!(err.info().code, "O001");
    assert!(err.info().context.contains_key("reason"));
}

#[test]
fn config_error_surface() {
    let err = GibblerError::Config(sample_info("C001", "burn-in exceeds iterations"));
    assert_eq!(err.info().code, "C001");
}

#[test]
fn display_includes_context_and_hint() {
    let err = GibblerError::Io(sample_info("IO1", "disk full").with_hint("free some space"));
    let rendered = err.to_string();
    assert!(rendered.starts_with("io error: disk full (code: IO1)"));
    assert!(rendered.contains("reason=example"));
    assert!(rendered.ends_with("hint: free some space"));
}

#[test]
fn errors_roundtrip_through_json() {
    let err = GibblerError::Serde(sample_info("SE1", "schema mismatch"));
    let json = serde_json::to_string(&err).unwrap();
    assert!(json.contains("\"family\":\"Serde\""));
    let restored: GibblerError = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, err);
}
