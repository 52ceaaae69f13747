//! Camera module - fly camera and its shader constants.
//!
//! The camera is owned and driven by the application; the engine only
//! consumes the [`CameraConstants`] it produces.

mod camera;

pub use camera::{PerspectiveCamera, CameraConstants};
