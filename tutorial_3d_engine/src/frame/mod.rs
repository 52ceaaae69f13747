//! Per-frame rendering sequence

mod frame_renderer;

pub use frame_renderer::{FramePhase, FrameRenderer, FrameBindings, DrawCall};
