//! Upload seam between the resource manager and whatever owns GPU memory.

use asset_common::{
    gpu::Vertex,
    scene::{MeshData, MeshPrimitive, RawTexture, SamplerInfo, TextureKind},
};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct GpuHandle(u64);

#[derive(Clone, Debug, PartialEq)]
pub struct GpuMesh {
    pub handle: GpuHandle,
    pub vertex_count: usize,
    pub index_count: usize,
    pub primitive: MeshPrimitive,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GpuTexture {
    pub handle: GpuHandle,
    pub kind: TextureKind,
    pub dimensions: (u32, u32),
    pub mip_levels: usize,
    pub sampler: SamplerInfo,
}

pub trait GpuBackend {
    fn upload_mesh(&mut self, mesh: &MeshData) -> GpuMesh;

    /// `None` when the texture data cannot be uploaded. The caller keeps the texture slot
    /// empty.
    fn upload_texture(&mut self, texture: &RawTexture) -> Option<GpuTexture>;
}

/// Backend that only does the bookkeeping of an upload. Used by tools and tests that never
/// open a device.
#[derive(Debug, Default)]
pub struct HeadlessGpu {
    next_handle: u64,
    pub uploaded_bytes: usize,
    pub mesh_uploads: usize,
    pub texture_uploads: usize,
}

impl HeadlessGpu {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&mut self) -> GpuHandle {
        let handle = GpuHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }
}

impl GpuBackend for HeadlessGpu {
    fn upload_mesh(&mut self, mesh: &MeshData) -> GpuMesh {
        let vertices = mesh.vertices();
        self.uploaded_bytes += vertices.len() * Vertex::STRIDE;
        self.uploaded_bytes += mesh.indices.len() * std::mem::size_of::<u32>();
        self.mesh_uploads += 1;
        GpuMesh {
            handle: self.handle(),
            vertex_count: vertices.len(),
            index_count: mesh.indices.len(),
            primitive: mesh.primitive,
        }
    }

    fn upload_texture(&mut self, texture: &RawTexture) -> Option<GpuTexture> {
        let dimensions = texture.dimensions()?;
        for (level, image) in texture.levels.iter().enumerate() {
            let (width, height) = image.dimensions;
            let expected = width as usize * height as usize * image.format.bytes_per_pixel();
            if image.bytes.len() != expected {
                log::error!(
                    "Texture level {} has {} bytes, expected {}",
                    level,
                    image.bytes.len(),
                    expected
                );
                return None;
            }
            self.uploaded_bytes += expected;
        }
        self.texture_uploads += 1;
        Some(GpuTexture {
            handle: self.handle(),
            kind: texture.kind,
            dimensions,
            mip_levels: texture.levels.len(),
            sampler: texture.sampler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset_common::scene::{BytesImageData, ColorSpace, ImageFormat};

    fn texture(bytes: usize) -> RawTexture {
        RawTexture::new(
            BytesImageData {
                dimensions: (2, 2),
                format: ImageFormat::R8G8B8A8_UNORM,
                color_space: ColorSpace::SRGB,
                bytes: vec![255; bytes],
            },
            SamplerInfo::default(),
        )
    }

    #[test]
    fn handles_are_unique() {
        let mut gpu = HeadlessGpu::new();
        let cube = MeshData::new_unit_cube();
        let a = gpu.upload_mesh(&cube);
        let b = gpu.upload_mesh(&cube);
        assert_ne!(a.handle, b.handle);
        assert_eq!(a.index_count, 36);
        assert_eq!(gpu.mesh_uploads, 2);
    }

    #[test]
    fn truncated_textures_are_rejected() {
        let mut gpu = HeadlessGpu::new();
        assert!(gpu.upload_texture(&texture(16)).is_some());
        assert!(gpu.upload_texture(&texture(15)).is_none());
        assert_eq!(gpu.texture_uploads, 1);
    }
}
