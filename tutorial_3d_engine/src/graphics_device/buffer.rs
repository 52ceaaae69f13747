/// Buffer trait and buffer descriptor

use std::any::Any;
use crate::error::Result;

/// What a buffer is bound as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Vertex buffer
    Vertex,
    /// Index buffer
    Index,
    /// Constant (uniform) buffer, rewritten every frame
    Constant,
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Size in bytes
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
    /// Optional initial contents (must not exceed `size`)
    pub data: Option<Vec<u8>>,
}

impl BufferDesc {
    /// Buffer initialized from a slice of plain-old-data values
    pub fn with_data<T: bytemuck::Pod>(usage: BufferUsage, values: &[T]) -> Self {
        let bytes: &[u8] = bytemuck::cast_slice(values);
        Self {
            size: bytes.len() as u64,
            usage,
            data: Some(bytes.to_vec()),
        }
    }

    /// Zero-initialized constant buffer large enough for one `T`
    pub fn constant<T: bytemuck::Pod>() -> Self {
        Self {
            size: std::mem::size_of::<T>() as u64,
            usage: BufferUsage::Constant,
            data: None,
        }
    }
}

/// Index buffer element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    /// 16-bit indices (max 65535 vertices)
    U16,
    /// 32-bit indices
    U32,
}

impl IndexType {
    /// Size in bytes of one index element
    pub fn size_bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Buffer resource trait
///
/// Implemented by backend-specific buffer types (e.g., VulkanBuffer).
/// The buffer is automatically destroyed when dropped.
pub trait Buffer: Send + Sync {
    /// Size in bytes
    fn size(&self) -> u64;

    /// Usage the buffer was created with
    fn usage(&self) -> BufferUsage;

    /// Write `data` at `offset` bytes
    fn update(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}
