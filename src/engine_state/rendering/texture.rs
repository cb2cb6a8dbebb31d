//! Texture handling for the rendering pipeline.
//!
//! Render targets only: the color texture chunks are drawn into and the
//! depth buffer that goes with it.

/// A GPU texture together with its default view.
pub struct Texture {
    /// The underlying WebGPU texture resource.
    pub texture: wgpu::Texture,
    /// The texture view used as a render attachment.
    pub view: wgpu::TextureView,
}

impl Texture {
    /// The texture format used for depth buffers.
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// The texture format used for off-screen color targets.
    pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    /// Creates a new depth texture.
    ///
    /// # Arguments
    /// * `device` - The WebGPU device
    /// * `width` - Width in pixels
    /// * `height` - Height in pixels
    /// * `label` - Debug label for the texture
    pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Self {
        Self::create(
            device,
            width,
            height,
            Self::DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
            label,
        )
    }

    /// Creates a color texture that can be rendered to and copied from.
    ///
    /// # Arguments
    /// * `device` - The WebGPU device
    /// * `width` - Width in pixels
    /// * `height` - Height in pixels
    /// * `label` - Debug label for the texture
    pub fn create_render_target(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Self {
        Self::create(
            device,
            width,
            height,
            Self::COLOR_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            label,
        )
    }

    fn create(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        };

        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self { texture, view }
    }
}
