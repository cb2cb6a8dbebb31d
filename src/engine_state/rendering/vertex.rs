//! Vertex data structures and layouts for chunk rendering.
//!
//! [`MeshBuffers`] keeps attributes in parallel arrays; the GPU gets them
//! interleaved as [`Vertex`]. Each draw additionally carries one [`Instance`]
//! holding the chunk's world translation.

use cgmath::Vector3;

use super::meshing::MeshBuffers;

/// A vertex in the chunk rendering pipeline.
///
/// # Memory Layout
/// - Position: [f32; 3] (12 bytes)
/// - Normal: [f32; 3] (12 bytes)
/// - Texture Coordinates: [f32; 2] (8 bytes)
/// - Color: [f32; 4] (16 bytes)
///
/// Total size: 48 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Chunk-local position
    pub position: [f32; 3],
    /// Outward face normal
    pub normal: [f32; 3],
    /// Atlas UV
    pub tex_coords: [f32; 2],
    /// RGBA tint
    pub color: [f32; 4],
}

impl Vertex {
    /// Interleaves the attribute arrays of `buffers`.
    pub fn interleave(buffers: &MeshBuffers) -> Vec<Vertex> {
        buffers
            .positions
            .iter()
            .zip(&buffers.normals)
            .zip(&buffers.texcoords)
            .zip(&buffers.colors)
            .map(|(((&position, &normal), &tex_coords), &color)| Vertex {
                position,
                normal,
                tex_coords,
                color,
            })
            .collect()
    }

    /// Returns the vertex buffer layout description for the shader pipeline.
    ///
    /// # Shader Attributes
    /// - `location = 0`: position (vec3<f32>)
    /// - `location = 1`: normal (vec3<f32>)
    /// - `location = 2`: tex_coords (vec2<f32>)
    /// - `location = 3`: color (vec4<f32>)
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Per-draw data: where the chunk sits in the world.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Instance {
    /// World-space translation of the chunk's local origin
    pub translation: [f32; 3],
}

impl Instance {
    /// Wraps a translation.
    pub fn new(translation: Vector3<f32>) -> Self {
        Instance {
            translation: translation.into(),
        }
    }

    /// Instance-stepped layout at `location = 4`.
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Instance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 4,
                format: wgpu::VertexFormat::Float32x3,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::{rendering::meshing::Face, voxels::block::block_side::BlockSide};

    #[test]
    fn interleaving_keeps_attribute_order() {
        let mut buffers = MeshBuffers::new();
        buffers.push_face(
            &Face::new(1, 2, 3, BlockSide::TOP),
            [0.0, 0.0, 0.5, 0.5],
            [1.0, 0.5, 0.25, 1.0],
        );

        let vertices = Vertex::interleave(&buffers);
        assert_eq!(vertices.len(), 4);
        for (i, vertex) in vertices.iter().enumerate() {
            assert_eq!(vertex.position, buffers.positions[i]);
            assert_eq!(vertex.normal, [0.0, 1.0, 0.0]);
            assert_eq!(vertex.tex_coords, buffers.texcoords[i]);
            assert_eq!(vertex.color, [1.0, 0.5, 0.25, 1.0]);
        }
    }

    #[test]
    fn layouts_match_struct_sizes() {
        assert_eq!(std::mem::size_of::<Vertex>(), 48);
        assert_eq!(Vertex::desc().array_stride, 48);
        assert_eq!(Instance::desc().array_stride, 12);
    }
}
