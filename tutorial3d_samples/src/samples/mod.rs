//! The three samples, each an [`Application`](tutorial_3d_engine::tutorial3d::app::Application)

pub mod common;
mod textured_scene;
mod triangle;
mod overlay_sample;
mod camera_sample;

pub use triangle::TriangleSample;
pub use overlay_sample::OverlaySample;
pub use camera_sample::CameraSample;
