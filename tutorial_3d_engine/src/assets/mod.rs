//! Asset factories - shaders, textures and models loaded from disk
//!
//! Relative paths resolve against the factory's root directory.

mod pipeline_factory;
mod texture_factory;
mod model_factory;

pub use pipeline_factory::{PipelineFactory, PipelineFormats, VERTEX_ENTRY_POINT, FRAGMENT_ENTRY_POINT};
pub use texture_factory::TextureFactory;
pub use model_factory::{ModelFactory, Model, MeshData};
