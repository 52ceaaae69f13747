//! Unit tests for host.rs
//!
//! The event loop itself needs a display; these cover how render errors
//! are handled once it is running.

use crate::app::RenderFailure;
use crate::error::Error;

// ============================================================================
// RENDER FAILURE CLASSIFICATION
// ============================================================================

#[test]
fn test_missing_back_buffer_skips_frame() {
    let error = Error::BackBufferUnavailable("swapchain out of date".to_string());
    assert_eq!(RenderFailure::classify(&error), RenderFailure::SkipFrame);
}

#[test]
fn test_frame_errors_abandon_only_that_frame() {
    let errors = [
        Error::InvalidResource("swapchain has no render target view".to_string()),
        Error::InvalidFrameState("draw after overlay".to_string()),
        Error::ViewCreationFailed("depth".to_string()),
        Error::BackendError("draw failed".to_string()),
    ];
    for error in &errors {
        assert_eq!(RenderFailure::classify(error), RenderFailure::AbandonFrame, "{}", error);
    }
}

#[test]
fn test_device_loss_is_fatal() {
    assert_eq!(RenderFailure::classify(&Error::DeviceLost), RenderFailure::Fatal);
    assert_eq!(RenderFailure::classify(&Error::OutOfMemory), RenderFailure::Fatal);
}
