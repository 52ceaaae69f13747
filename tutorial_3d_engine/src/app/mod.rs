//! Application base - window host, input tracking and device ownership

mod application;
mod input;
mod device_resources;
mod host;

pub use application::{Application, AppConfig, AppContext, UpdateContext};
pub use input::InputState;
pub use device_resources::DeviceResources;
pub use host::{ApplicationHost, RenderFailure};
