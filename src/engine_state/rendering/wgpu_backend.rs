//! wgpu implementation of [`RenderBackend`].
//!
//! Every chunk mesh owns one interleaved vertex buffer and one `u32` index
//! buffer. Draws are collected between `begin_frame` and `end_frame`; the
//! chunk translations go into a shared instance buffer and each chunk is drawn
//! with the one instance that belongs to it.
//!
//! Frames are rendered into an off-screen color target, so no window or
//! surface is needed.

use std::collections::HashMap;

use cgmath::{Matrix4, Vector3};
use log::{debug, info, warn};
use wgpu::util::DeviceExt;

use super::{
    backend::{MeshHandle, RenderBackend},
    frustum::Frustum,
    meshing::MeshBuffers,
    texture::Texture,
    vertex::{Instance, Vertex},
};
use crate::{engine_state::camera_state::camera::CameraUniform, error::EngineError};

/// Background color of the off-screen target.
const SKY_COLOR: wgpu::Color = wgpu::Color {
    r: 0.53,
    g: 0.71,
    b: 0.92,
    a: 1.0,
};

/// Instance slots allocated up front.
const INITIAL_INSTANCE_CAPACITY: usize = 256;

/// Vertex and index buffers of one chunk mesh.
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn new(device: &wgpu::Device, buffers: &MeshBuffers) -> Self {
        let vertices = Vertex::interleave(buffers);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Chunk Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Chunk Index Buffer"),
            contents: bytemuck::cast_slice(&buffers.indices),
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        });

        GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: buffers.indices.len() as u32,
        }
    }

    /// Writes in place when the new geometry fits, otherwise reallocates.
    fn update(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, buffers: &MeshBuffers) {
        let vertices = Vertex::interleave(buffers);
        let vertex_bytes: &[u8] = bytemuck::cast_slice(&vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(&buffers.indices);

        if vertex_bytes.len() as u64 <= self.vertex_buffer.size()
            && index_bytes.len() as u64 <= self.index_buffer.size()
        {
            queue.write_buffer(&self.vertex_buffer, 0, vertex_bytes);
            queue.write_buffer(&self.index_buffer, 0, index_bytes);
            self.index_count = buffers.indices.len() as u32;
        } else {
            self.destroy();
            *self = GpuMesh::new(device, buffers);
        }
    }

    fn destroy(&self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
    }
}

/// Renders chunk meshes into an off-screen texture with wgpu.
pub struct WgpuChunkBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    render_pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    color_target: Texture,
    depth_texture: Texture,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    meshes: HashMap<MeshHandle, GpuMesh>,
    next_handle: u64,
    draws: Vec<(MeshHandle, Instance)>,
    frustum: Frustum,
    frames_submitted: u64,
}

impl WgpuChunkBackend {
    /// Picks an adapter and device without a surface and builds the backend.
    ///
    /// # Arguments
    /// * `width` - Width of the off-screen target in pixels
    /// * `height` - Height of the off-screen target in pixels
    ///
    /// # Errors
    /// [`EngineError::NoAdapter`] when no GPU is available;
    /// [`EngineError::RequestDevice`] when the adapter refuses a device.
    pub async fn request(width: u32, height: u32) -> Result<Self, EngineError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            flags: wgpu::InstanceFlags::empty(),
            backend_options: wgpu::BackendOptions::from_env_or_default(),
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;
        info!("Using GPU adapter: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                label: None,
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                trace: wgpu::Trace::Off,
            })
            .await?;

        Ok(Self::new(device, queue, width, height))
    }

    /// Builds the pipeline and render targets on an existing device.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, width: u32, height: u32) -> Self {
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::bytes_of(&CameraUniform::new()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("camera_bind_group_layout"),
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Chunk Render Pipeline Layout"),
            bind_group_layouts: &[&camera_bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Chunk Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../shaders/chunk.wgsl").into()),
        });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Chunk Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Vertex::desc(), Instance::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: Texture::COLOR_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: Texture::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let color_target = Texture::create_render_target(&device, width, height, "Chunk Color Target");
        let depth_texture = Texture::create_depth_texture(&device, width, height, "Chunk Depth Texture");
        let instance_buffer = Self::create_instance_buffer(&device, INITIAL_INSTANCE_CAPACITY);

        WgpuChunkBackend {
            device,
            queue,
            render_pipeline,
            camera_buffer,
            camera_bind_group,
            color_target,
            depth_texture,
            instance_buffer,
            instance_capacity: INITIAL_INSTANCE_CAPACITY,
            meshes: HashMap::new(),
            next_handle: 0,
            draws: Vec::new(),
            frustum: Frustum::everything(),
            frames_submitted: 0,
        }
    }

    fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Chunk Instance Buffer"),
            size: (capacity * std::mem::size_of::<Instance>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Number of meshes currently allocated on the GPU.
    pub fn live_meshes(&self) -> usize {
        self.meshes.len()
    }

    /// Number of frames submitted to the queue.
    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    /// The texture frames are rendered into.
    pub fn color_target(&self) -> &wgpu::Texture {
        &self.color_target.texture
    }

    /// Blocks until the GPU has finished all submitted work.
    pub fn wait_idle(&self) {
        if let Err(err) = self.device.poll(wgpu::PollType::Wait) {
            warn!("Waiting for the GPU failed: {}", err);
        }
    }
}

impl RenderBackend for WgpuChunkBackend {
    fn create_mesh(&mut self, buffers: &MeshBuffers) -> MeshHandle {
        let handle = MeshHandle(self.next_handle);
        self.next_handle += 1;
        self.meshes.insert(handle, GpuMesh::new(&self.device, buffers));
        handle
    }

    fn update_mesh(&mut self, handle: MeshHandle, buffers: &MeshBuffers) {
        match self.meshes.get_mut(&handle) {
            Some(mesh) => mesh.update(&self.device, &self.queue, buffers),
            None => warn!("Update of unknown mesh {:?}", handle),
        }
    }

    fn destroy_mesh(&mut self, handle: MeshHandle) {
        match self.meshes.remove(&handle) {
            Some(mesh) => mesh.destroy(),
            None => warn!("Destroy of unknown mesh {:?}", handle),
        }
    }

    fn begin_frame(&mut self) {
        self.draws.clear();
    }

    fn draw(&mut self, handle: MeshHandle, translation: Vector3<f32>) {
        self.draws.push((handle, Instance::new(translation)));
    }

    fn end_frame(&mut self) {
        if self.draws.len() > self.instance_capacity {
            self.instance_capacity = self.draws.len().next_power_of_two();
            self.instance_buffer.destroy();
            self.instance_buffer = Self::create_instance_buffer(&self.device, self.instance_capacity);
            debug!("Grew chunk instance buffer to {} slots", self.instance_capacity);
        }

        let instances: Vec<Instance> = self.draws.iter().map(|(_, instance)| *instance).collect();
        if !instances.is_empty() {
            self.queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Chunk Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Chunk Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.color_target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(SKY_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));

            for (slot, (handle, _)) in self.draws.iter().enumerate() {
                let Some(mesh) = self.meshes.get(handle) else {
                    warn!("Draw of unknown mesh {:?}", handle);
                    continue;
                };
                let instance = slot as u32;
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, instance..instance + 1);
            }
        }

        self.queue.submit([encoder.finish()]);
        self.frames_submitted += 1;
    }

    fn set_view_projection(&mut self, view_projection: Matrix4<f32>) {
        self.frustum = Frustum::from_view_projection(view_projection);
        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniform::from_matrix(view_projection)),
        );
    }

    fn frustum(&self) -> &Frustum {
        &self.frustum
    }
}

impl Drop for WgpuChunkBackend {
    fn drop(&mut self) {
        for mesh in self.meshes.values() {
            mesh.destroy();
        }
    }
}
