//! Integration tests for error handling

use irview_core::error::{IrviewError, ResultExt};

#[test]
fn test_error_context_chaining() {
    let base_error = IrviewError::open_device("index 4 out of range");
    let with_context = base_error.with_context("Starting preview");

    let msg = format!("{}", with_context);
    assert!(msg.contains("Starting preview"));
    assert!(msg.contains("index 4 out of range"));
}

#[test]
fn test_error_context_preserves_hint_and_code() {
    let base_error = IrviewError::enumeration("permission denied");
    let hint_before = base_error.user_hint();

    let with_context = base_error.with_context("Listing devices");
    assert_eq!(hint_before, with_context.user_hint());
    assert_eq!(with_context.code(), "ENUM_FAILED");
}

#[test]
fn test_result_ext_context() {
    let result: Result<(), IrviewError> = Err(IrviewError::acquisition("VIDIOC_DQBUF failed"));
    let err = result.context("Reading frame").unwrap_err();
    assert!(err.to_string().contains("Reading frame"));
    assert!(matches!(err.root(), IrviewError::Acquisition(_)));
}

#[test]
fn test_codes() {
    assert_eq!(IrviewError::enumeration("x").code(), "ENUM_FAILED");
    assert_eq!(IrviewError::open_device("x").code(), "OPEN_FAILED");
    assert_eq!(IrviewError::NoFrameAvailable.code(), "NO_FRAME");
    assert_eq!(IrviewError::config("x").code(), "CONFIG");
    assert_eq!(IrviewError::Unsupported("x".into()).code(), "UNSUPPORTED");
    assert_eq!(IrviewError::acquisition("x").code(), "ACQUISITION");

    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    assert_eq!(IrviewError::from(io).code(), "IO");
}

#[test]
fn test_user_hints() {
    let err = IrviewError::open_device("test");
    assert!(err.user_hint().unwrap().contains("irview list"));

    let err = IrviewError::config("test");
    assert!(err.user_hint().unwrap().contains("config.toml"));

    let err = IrviewError::NoFrameAvailable;
    assert!(err.user_hint().unwrap().contains("preview"));

    assert!(IrviewError::acquisition("test").user_hint().is_none());
}

#[test]
fn test_recoverable_errors() {
    assert!(IrviewError::open_device("busy").is_user_recoverable());
    assert!(IrviewError::NoFrameAvailable.is_user_recoverable());
    assert!(!IrviewError::acquisition("gone").is_user_recoverable());
    assert!(
        IrviewError::config("bad")
            .with_context("Loading")
            .is_user_recoverable()
    );
}

#[test]
fn test_nested_context_keeps_code() {
    let err = IrviewError::acquisition("VIDIOC_DQBUF failed")
        .with_context("Reading frame")
        .with_context("Preview session");
    assert_eq!(err.code(), "ACQUISITION");
}
