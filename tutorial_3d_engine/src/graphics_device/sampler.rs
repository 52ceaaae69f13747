/// Sampler trait and sampler descriptor

use std::any::Any;

/// Texel filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    /// Nearest texel (point sampling)
    Nearest,
    /// Linear interpolation
    Linear,
}

/// Texture coordinate addressing outside [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    /// Wrap around
    Repeat,
    /// Mirror on every repeat
    MirroredRepeat,
    /// Clamp to the edge texel
    ClampToEdge,
}

/// Descriptor for creating a sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub mip_filter: Filter,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
    pub address_w: AddressMode,
}

impl Default for SamplerDesc {
    /// Linear minification and magnification, point mip selection, wrap addressing
    fn default() -> Self {
        Self {
            min_filter: Filter::Linear,
            mag_filter: Filter::Linear,
            mip_filter: Filter::Nearest,
            address_u: AddressMode::Repeat,
            address_v: AddressMode::Repeat,
            address_w: AddressMode::Repeat,
        }
    }
}

/// Sampler resource trait
pub trait Sampler: Send + Sync {
    /// Descriptor the sampler was created with
    fn desc(&self) -> &SamplerDesc;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}
