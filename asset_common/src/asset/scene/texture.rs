use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum TextureKind {
    #[default]
    Texture2D,
    /// Six square faces stored as consecutive levels.
    CubeMap,
}

/// Raw texture as produced by an importer: mip levels from largest to smallest.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RawTexture {
    pub kind: TextureKind,
    pub levels: Vec<BytesImageData>,
    pub sampler: SamplerInfo,
}

impl RawTexture {
    pub fn new(data: BytesImageData, sampler: SamplerInfo) -> Self {
        Self {
            kind: TextureKind::Texture2D,
            levels: vec![data],
            sampler,
        }
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.levels.first().map(|level| level.dimensions)
    }
}

#[derive(Clone, Deserialize, Serialize)]
pub struct BytesImageData {
    pub dimensions: (u32, u32),
    pub format: ImageFormat,
    pub color_space: ColorSpace,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for BytesImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BytesImageData")
            .field("dimensions", &self.dimensions)
            .field("format", &self.format)
            .field("color_space", &self.color_space)
            .field("byte_len", &self.bytes.len())
            .finish()
    }
}

#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ImageFormat {
    R8_UNORM,
    R8G8_UNORM,
    R8G8B8_UNORM,
    R8G8B8A8_UNORM,
    R16_UNORM,
    R16G16_UNORM,
    R16G16B16A16_UNORM,
    R32G32B32A32_SFLOAT,
}

impl ImageFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            ImageFormat::R8_UNORM => 1,
            ImageFormat::R8G8_UNORM | ImageFormat::R16_UNORM => 2,
            ImageFormat::R8G8B8_UNORM => 3,
            ImageFormat::R8G8B8A8_UNORM | ImageFormat::R16G16_UNORM => 4,
            ImageFormat::R16G16B16A16_UNORM => 8,
            ImageFormat::R32G32B32A32_SFLOAT => 16,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ColorSpace {
    Linear,
    SRGB,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct SamplerInfo {
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub mipmap_mode: MipmapMode,
    pub address_mode: [AddressMode; 3],
}

impl Default for SamplerInfo {
    fn default() -> Self {
        Self {
            min_filter: Filter::Linear,
            mag_filter: Filter::Linear,
            mipmap_mode: MipmapMode::Linear,
            address_mode: [AddressMode::Repeat; 3],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Filter {
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum AddressMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum MipmapMode {
    Nearest,
    Linear,
}
