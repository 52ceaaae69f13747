/// Model factory - glTF import and procedural meshes
///
/// Every model is a single indexed `PositionColorUv` mesh: all primitives of
/// the default scene are merged with their node transforms applied. glTF is
/// right-handed, so positions are mirrored on Z and triangles re-wound to
/// keep counter-clockwise front faces in the engine's left-handed space.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::{Mat4, Vec3};

use crate::error::{Error, Result};
use crate::graphics_device::{
    Buffer, BufferDesc, BufferUsage, GraphicsDevice, IndexType, VertexPositionColorUv,
};
use crate::{engine_debug, engine_error, engine_warn};

/// CPU-side merged mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<VertexPositionColorUv>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Axis-aligned cube centered on the origin, one color per face
    pub fn cube(half_extent: f32) -> Self {
        // (outward normal, face up vector, color)
        let faces = [
            (Vec3::Z, Vec3::Y, [0.90, 0.30, 0.30]),
            (Vec3::NEG_Z, Vec3::Y, [0.30, 0.90, 0.30]),
            (Vec3::X, Vec3::Y, [0.30, 0.30, 0.90]),
            (Vec3::NEG_X, Vec3::Y, [0.90, 0.90, 0.30]),
            (Vec3::Y, Vec3::Z, [0.30, 0.90, 0.90]),
            (Vec3::NEG_Y, Vec3::Z, [0.90, 0.30, 0.90]),
        ];
        // Counter-clockwise when seen from outside
        let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

        let mut mesh = MeshData::default();
        for (normal, up, color) in faces {
            let right = up.cross(-normal);
            let base = mesh.vertices.len() as u32;
            for (sx, sy) in corners {
                let position = (normal + right * sx + up * sy) * half_extent;
                mesh.vertices.push(VertexPositionColorUv {
                    position: position.to_array(),
                    color,
                    uv: [(sx + 1.0) * 0.5, (1.0 - sy) * 0.5],
                });
            }
            mesh.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Append `other`, rebasing its indices
    pub fn append(&mut self, other: &MeshData) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }
}

/// GPU mesh ready to bind
pub struct Model {
    pub vertex_buffer: Arc<dyn Buffer>,
    pub index_buffer: Arc<dyn Buffer>,
    pub index_type: IndexType,
    pub vertex_count: u32,
    pub index_count: u32,
}

pub struct ModelFactory {
    root: PathBuf,
}

impl ModelFactory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Import a glTF/GLB file and upload it
    pub fn load_model(&self, device: &mut dyn GraphicsDevice, path: impl AsRef<Path>) -> Result<Model> {
        let full_path = self.root.join(path.as_ref());
        let (document, buffers, _images) = gltf::import(&full_path).map_err(|e| {
            engine_error!("tutorial3d::ModelFactory", "Failed to import '{}': {}", full_path.display(), e);
            Error::AssetLoadFailed(format!("{}: {}", full_path.display(), e))
        })?;

        let mesh = merge_document(&document, &buffers)?;
        engine_debug!(
            "tutorial3d::ModelFactory",
            "Loaded '{}' ({} vertices, {} triangles)",
            full_path.display(),
            mesh.vertices.len(),
            mesh.triangle_count()
        );
        Self::upload(device, &mesh)
    }

    /// Merge a glTF document held in memory (`.gltf` with embedded buffers or `.glb`)
    pub fn import_slice(bytes: &[u8]) -> Result<MeshData> {
        let (document, buffers, _images) = gltf::import_slice(bytes)
            .map_err(|e| Error::AssetLoadFailed(format!("glTF import: {}", e)))?;
        merge_document(&document, &buffers)
    }

    /// Upload a mesh as vertex and 32-bit index buffers
    pub fn upload(device: &mut dyn GraphicsDevice, mesh: &MeshData) -> Result<Model> {
        if mesh.vertices.is_empty() || mesh.indices.is_empty() {
            return Err(Error::AssetLoadFailed("mesh has no triangles".to_string()));
        }

        let vertex_buffer = device.create_buffer(BufferDesc::with_data(BufferUsage::Vertex, &mesh.vertices))?;
        let index_buffer = device.create_buffer(BufferDesc::with_data(BufferUsage::Index, &mesh.indices))?;

        Ok(Model {
            vertex_buffer,
            index_buffer,
            index_type: IndexType::U32,
            vertex_count: mesh.vertices.len() as u32,
            index_count: mesh.indices.len() as u32,
        })
    }
}

fn merge_document(document: &gltf::Document, buffers: &[gltf::buffer::Data]) -> Result<MeshData> {
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| Error::AssetLoadFailed("glTF has no scene".to_string()))?;

    let mut mesh = MeshData::default();
    for node in scene.nodes() {
        merge_node(&node, Mat4::IDENTITY, buffers, &mut mesh)?;
    }

    if mesh.indices.is_empty() {
        return Err(Error::AssetLoadFailed("glTF contains no triangle geometry".to_string()));
    }
    Ok(mesh)
}

fn merge_node(node: &gltf::Node, parent: Mat4, buffers: &[gltf::buffer::Data], mesh: &mut MeshData) -> Result<()> {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(node_mesh) = node.mesh() {
        for primitive in node_mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                engine_warn!(
                    "tutorial3d::ModelFactory",
                    "Skipping primitive with mode {:?} in mesh {}",
                    primitive.mode(),
                    node_mesh.index()
                );
                continue;
            }
            mesh.append(&read_primitive(&primitive, world, buffers)?);
        }
    }

    for child in node.children() {
        merge_node(&child, world, buffers, mesh)?;
    }
    Ok(())
}

fn read_primitive(primitive: &gltf::Primitive, world: Mat4, buffers: &[gltf::buffer::Data]) -> Result<MeshData> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or_else(|| Error::AssetLoadFailed("primitive has no positions".to_string()))?
        .collect();
    let colors: Vec<[f32; 3]> = match reader.read_colors(0) {
        Some(colors) => colors.into_rgb_f32().collect(),
        None => vec![[1.0, 1.0, 1.0]; positions.len()],
    };
    let uvs: Vec<[f32; 2]> = match reader.read_tex_coords(0) {
        Some(uvs) => uvs.into_f32().collect(),
        None => vec![[0.0, 0.0]; positions.len()],
    };
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    if colors.len() != positions.len() || uvs.len() != positions.len() {
        return Err(Error::AssetLoadFailed("primitive attribute counts differ".to_string()));
    }
    if let Some(bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
        return Err(Error::AssetLoadFailed(format!("index {} out of range", bad)));
    }

    let vertices = positions
        .iter()
        .zip(colors.iter().zip(uvs.iter()))
        .map(|(position, (color, uv))| {
            let p = world.transform_point3(Vec3::from_array(*position));
            VertexPositionColorUv {
                position: [p.x, p.y, -p.z],
                color: *color,
                uv: *uv,
            }
        })
        .collect();

    // Mirroring flips the winding; swap two corners of every triangle
    let indices = indices
        .chunks_exact(3)
        .flat_map(|tri| [tri[0], tri[2], tri[1]])
        .collect();

    Ok(MeshData { vertices, indices })
}

#[cfg(test)]
#[path = "model_factory_tests.rs"]
mod tests;
