use std::{collections::HashSet, path::Path};

use asset_common::{
    scene::{
        AddressMode, BytesImageData, ColorSpace, Filter, ImageFormat, MeshData, MeshPrimitive,
        MipmapMode, ObjectData, ObjectInstance, PbrAttributes, PhongAttributes, RawMaterial,
        RawTexture, SamplerInfo, SceneData,
    },
    transform::Transform,
};
use gltf::texture::Sampler;
use ultraviolet::{Mat4, Vec2, Vec3, Vec4};

use crate::{ImportError, Importer};

/// Custom vertex attribute holding object ids, written as `_OBJECT_ID` in the file.
pub const OBJECT_ID_ATTRIBUTE: &str = "OBJECT_ID";

/// Reads `.gltf`/`.glb` files.
///
/// Every (mesh, primitive) pair becomes one importer mesh. A node whose mesh has several
/// primitives instances the first one itself and gets one extra child object per remaining
/// primitive; those extra objects are numbered after the file's own nodes.
#[derive(Default)]
pub struct GltfImporter {
    file: Option<OpenFile>,
}

struct OpenFile {
    meshes: Vec<Option<MeshData>>,
    materials: Vec<RawMaterial>,
    textures: Vec<TextureSource>,
    images: Vec<gltf::image::Data>,
    objects: Vec<ObjectData>,
    scenes: Vec<SceneData>,
    default_scene: Option<usize>,
}

struct TextureSource {
    image: usize,
    sampler: SamplerInfo,
    color_space: ColorSpace,
}

impl GltfImporter {
    pub fn new() -> Self {
        Self { file: None }
    }

    fn open(&self) -> Option<&OpenFile> {
        self.file.as_ref()
    }
}

impl Importer for GltfImporter {
    fn open_file(&mut self, path: &Path) -> Result<(), ImportError> {
        self.file = None;
        if !path.exists() {
            return Err(ImportError::NotFound(path.to_path_buf()));
        }
        let (document, buffers, images) =
            gltf::import(path).map_err(|source| ImportError::Gltf {
                path: path.to_path_buf(),
                source,
            })?;

        let file = OpenFile::load(&document, &buffers, images);
        log::debug!(
            "Opened {}: {} meshes, {} materials, {} textures, {} objects",
            path.display(),
            file.meshes.len(),
            file.materials.len(),
            file.textures.len(),
            file.objects.len()
        );
        self.file = Some(file);
        Ok(())
    }

    fn close(&mut self) {
        self.file = None;
    }

    fn mesh_count(&self) -> usize {
        self.open().map_or(0, |file| file.meshes.len())
    }

    fn material_count(&self) -> usize {
        self.open().map_or(0, |file| file.materials.len())
    }

    fn texture_count(&self) -> usize {
        self.open().map_or(0, |file| file.textures.len())
    }

    fn object_count(&self) -> usize {
        self.open().map_or(0, |file| file.objects.len())
    }

    fn mesh(&self, index: usize) -> Option<MeshData> {
        self.open()?.meshes.get(index)?.clone()
    }

    fn material(&self, index: usize) -> Option<RawMaterial> {
        self.open()?.materials.get(index).cloned()
    }

    fn texture(&self, index: usize) -> Option<RawTexture> {
        let file = self.open()?;
        let source = file.textures.get(index)?;
        let image = file.images.get(source.image)?;
        let (bytes, format) = convert_image_format(&image.pixels, image.format);
        Some(RawTexture::new(
            BytesImageData {
                dimensions: (image.width, image.height),
                format,
                color_space: source.color_space,
                bytes,
            },
            source.sampler,
        ))
    }

    fn object3d(&self, index: usize) -> Option<ObjectData> {
        self.open()?.objects.get(index).cloned()
    }

    fn default_scene(&self) -> Option<usize> {
        self.open()?.default_scene
    }

    fn scene(&self, index: usize) -> Option<SceneData> {
        self.open()?.scenes.get(index).cloned()
    }
}

impl OpenFile {
    fn load(
        document: &gltf::Document,
        buffers: &[gltf::buffer::Data],
        images: Vec<gltf::image::Data>,
    ) -> Self {
        let mut meshes = Vec::new();
        // gltf mesh index -> (importer mesh index, material) per primitive
        let mut primitive_lookup: Vec<Vec<(usize, Option<usize>)>> = Vec::new();
        for mesh in document.meshes() {
            let mut primitives = Vec::new();
            for primitive in mesh.primitives() {
                primitives.push((meshes.len(), primitive.material().index()));
                meshes.push(load_primitive(&primitive, buffers));
            }
            primitive_lookup.push(primitives);
        }

        let srgb_textures = srgb_texture_indices(document);
        let textures = document
            .textures()
            .map(|texture| TextureSource {
                image: texture.source().index(),
                sampler: load_sampler(texture.sampler()),
                color_space: if srgb_textures.contains(&texture.index()) {
                    ColorSpace::SRGB
                } else {
                    ColorSpace::Linear
                },
            })
            .collect();

        let node_count = document.nodes().count();
        let mut objects: Vec<ObjectData> = Vec::with_capacity(node_count);
        let mut extra_objects = Vec::new();
        for node in document.nodes() {
            let local_transform = {
                let (position, orientation, scale) = node.transform().decomposed();
                Transform::from_arrays(position, orientation, scale)
            };

            let mut children = Vec::new();
            let instance = if let Some(mesh) = node.mesh() {
                let primitives = &primitive_lookup[mesh.index()];
                for &(mesh, material) in primitives.iter().skip(1) {
                    children.push(node_count + extra_objects.len());
                    extra_objects.push(ObjectData::mesh(mesh, material, Mat4::identity()));
                }
                match primitives.first() {
                    Some(&(mesh, material)) => ObjectInstance::Mesh { mesh, material },
                    None => ObjectInstance::Empty,
                }
            } else if node.light().is_some() {
                ObjectInstance::Light
            } else if node.camera().is_some() {
                ObjectInstance::Camera
            } else {
                ObjectInstance::Empty
            };
            children.extend(node.children().map(|child| child.index()));

            objects.push(ObjectData {
                name: node.name().map(str::to_owned),
                transform: Mat4::from(local_transform),
                instance,
                children,
            });
        }
        objects.extend(extra_objects);

        let scenes = document
            .scenes()
            .map(|scene| SceneData {
                children: scene.nodes().map(|node| node.index()).collect(),
            })
            .collect();
        let default_scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .map(|scene| scene.index());

        Self {
            meshes,
            materials: document.materials().map(|m| load_material(&m)).collect(),
            textures,
            images,
            objects,
            scenes,
            default_scene,
        }
    }
}

fn load_primitive(
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
) -> Option<MeshData> {
    let kind = match primitive.mode() {
        gltf::mesh::Mode::Triangles => MeshPrimitive::Triangles,
        gltf::mesh::Mode::Lines => MeshPrimitive::Lines,
        mode => {
            log::warn!("Skipping primitive with unsupported mode {:?}", mode);
            return None;
        }
    };

    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|v| &v.0[..]));
    let Some(positions) = reader.read_positions() else {
        log::warn!("Skipping primitive without positions");
        return None;
    };
    let positions: Vec<Vec3> = positions.map(Vec3::from).collect();
    let indices = reader
        .read_indices()
        .map(|indices| indices.into_u32().collect())
        .unwrap_or_else(|| (0..(positions.len() as u32)).collect());

    Some(MeshData {
        primitive: kind,
        normals: reader
            .read_normals()
            .map(|normals| normals.map(Vec3::from).collect()),
        tex_coords: reader
            .read_tex_coords(0)
            .map(|uvs| uvs.into_f32().map(Vec2::from).collect()),
        tangents: reader
            .read_tangents()
            .map(|tangents| tangents.map(Vec4::from).collect()),
        bitangents: None,
        colors: reader
            .read_colors(0)
            .map(|colors| colors.into_rgba_f32().map(Vec4::from).collect()),
        object_ids: read_object_ids(primitive, buffers, positions.len()),
        positions,
        indices,
    })
}

/// Per-vertex object ids of instance meshes, stored in the custom `_OBJECT_ID` attribute.
fn read_object_ids(
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
    vertex_count: usize,
) -> Option<Vec<u32>> {
    use gltf::accessor::{DataType, Dimensions, Iter};

    let accessor = primitive.get(&gltf::Semantic::Extras(OBJECT_ID_ATTRIBUTE.to_owned()))?;
    let get_buffer_data =
        |buffer: gltf::Buffer<'_>| buffers.get(buffer.index()).map(|data| &data.0[..]);
    let ids: Option<Vec<u32>> = match (accessor.data_type(), accessor.dimensions()) {
        (DataType::U8, Dimensions::Scalar) => {
            Iter::<u8>::new(accessor, get_buffer_data).map(|ids| ids.map(u32::from).collect())
        }
        (DataType::U16, Dimensions::Scalar) => {
            Iter::<u16>::new(accessor, get_buffer_data).map(|ids| ids.map(u32::from).collect())
        }
        (DataType::U32, Dimensions::Scalar) => {
            Iter::<u32>::new(accessor, get_buffer_data).map(|ids| ids.collect())
        }
        (DataType::F32, Dimensions::Scalar) => Iter::<f32>::new(accessor, get_buffer_data)
            .map(|ids| ids.map(|id| id.max(0.0).round() as u32).collect()),
        (data_type, dimensions) => {
            log::warn!(
                "Ignoring object ids stored as {:?} {:?}",
                data_type,
                dimensions
            );
            None
        }
    };

    match ids {
        Some(ids) if ids.len() == vertex_count => Some(ids),
        Some(ids) => {
            log::warn!(
                "Ignoring {} object ids for {} vertices",
                ids.len(),
                vertex_count
            );
            None
        }
        None => None,
    }
}

fn load_material(material: &gltf::Material<'_>) -> RawMaterial {
    let material_pbr = material.pbr_metallic_roughness();
    let base_color = Vec4::from(material_pbr.base_color_factor());
    let base_color_texture = material_pbr
        .base_color_texture()
        .map(|info| info.texture().index());
    let normal_texture = material
        .normal_texture()
        .map(|normal_texture| normal_texture.texture().index());

    let emissive_factor = material.emissive_factor();
    let emissive = material
        .emissive_strength()
        .map(|value| emissive_factor.map(|v| v * value))
        .unwrap_or(emissive_factor)
        .into();

    // Flat and Phong shading read the base color as diffuse.
    let phong = PhongAttributes {
        diffuse_color: base_color,
        diffuse_texture: base_color_texture,
        normal_texture,
        ..Default::default()
    };

    RawMaterial {
        name: material.name().map(str::to_owned),
        phong: Some(phong),
        pbr: Some(PbrAttributes {
            base_color,
            base_color_texture,
            normal_texture,
            roughness_factor: material_pbr.roughness_factor(),
            metallic_factor: material_pbr.metallic_factor(),
            metallic_roughness_texture: material_pbr
                .metallic_roughness_texture()
                .map(|info| info.texture().index()),
            emissive,
            emissive_texture: material
                .emissive_texture()
                .map(|info| info.texture().index()),
        }),
        double_sided: material.double_sided(),
    }
}

/// Textures holding color data, everything else is sampled linearly.
fn srgb_texture_indices(document: &gltf::Document) -> HashSet<usize> {
    let mut srgb = HashSet::new();
    for material in document.materials() {
        if let Some(info) = material.pbr_metallic_roughness().base_color_texture() {
            srgb.insert(info.texture().index());
        }
        if let Some(info) = material.emissive_texture() {
            srgb.insert(info.texture().index());
        }
    }
    srgb
}

fn load_sampler(sampler: Sampler) -> SamplerInfo {
    let FilterAndMipmapMode {
        min_filter,
        mipmap_mode,
    } = sampler
        .min_filter()
        .unwrap_or(gltf::texture::MinFilter::Linear)
        .into();
    let mag_filter = from_gltf_filter(
        sampler
            .mag_filter()
            .unwrap_or(gltf::texture::MagFilter::Linear),
    );

    SamplerInfo {
        min_filter,
        mag_filter,
        mipmap_mode,
        address_mode: [
            from_gltf_address_mode(sampler.wrap_s()),
            from_gltf_address_mode(sampler.wrap_t()),
            AddressMode::ClampToEdge,
        ],
    }
}

fn from_gltf_address_mode(wrapping_mode: gltf::texture::WrappingMode) -> AddressMode {
    match wrapping_mode {
        gltf::texture::WrappingMode::ClampToEdge => AddressMode::ClampToEdge,
        gltf::texture::WrappingMode::MirroredRepeat => AddressMode::MirroredRepeat,
        gltf::texture::WrappingMode::Repeat => AddressMode::Repeat,
    }
}

fn from_gltf_filter(filter: gltf::texture::MagFilter) -> Filter {
    match filter {
        gltf::texture::MagFilter::Nearest => Filter::Nearest,
        gltf::texture::MagFilter::Linear => Filter::Linear,
    }
}

struct FilterAndMipmapMode {
    min_filter: Filter,
    mipmap_mode: MipmapMode,
}

impl From<gltf::texture::MinFilter> for FilterAndMipmapMode {
    fn from(min_filter: gltf::texture::MinFilter) -> Self {
        use gltf::texture::MinFilter;
        let (min_filter, mipmap_mode) = match min_filter {
            MinFilter::Nearest | MinFilter::NearestMipmapNearest => {
                (Filter::Nearest, MipmapMode::Nearest)
            }
            MinFilter::Linear | MinFilter::LinearMipmapNearest => {
                (Filter::Linear, MipmapMode::Nearest)
            }
            MinFilter::NearestMipmapLinear => (Filter::Nearest, MipmapMode::Linear),
            MinFilter::LinearMipmapLinear => (Filter::Linear, MipmapMode::Linear),
        };
        FilterAndMipmapMode {
            min_filter,
            mipmap_mode,
        }
    }
}

/// Three channel formats are widened to four, GPUs rarely sample them directly.
fn convert_image_format(pixels: &[u8], format: gltf::image::Format) -> (Vec<u8>, ImageFormat) {
    use gltf::image::Format;
    match format {
        Format::R8 => (pixels.to_vec(), ImageFormat::R8_UNORM),
        Format::R8G8 => (pixels.to_vec(), ImageFormat::R8G8_UNORM),
        Format::R8G8B8 => (add_alpha(pixels, &[255]), ImageFormat::R8G8B8A8_UNORM),
        Format::R8G8B8A8 => (pixels.to_vec(), ImageFormat::R8G8B8A8_UNORM),
        Format::R16 => (pixels.to_vec(), ImageFormat::R16_UNORM),
        Format::R16G16 => (pixels.to_vec(), ImageFormat::R16G16_UNORM),
        Format::R16G16B16 => (
            add_alpha(pixels, &u16::MAX.to_ne_bytes()),
            ImageFormat::R16G16B16A16_UNORM,
        ),
        Format::R16G16B16A16 => (pixels.to_vec(), ImageFormat::R16G16B16A16_UNORM),
        Format::R32G32B32FLOAT => (
            add_alpha(pixels, &1.0f32.to_ne_bytes()),
            ImageFormat::R32G32B32A32_SFLOAT,
        ),
        Format::R32G32B32A32FLOAT => (pixels.to_vec(), ImageFormat::R32G32B32A32_SFLOAT),
    }
}

fn add_alpha(pixels: &[u8], alpha: &[u8]) -> Vec<u8> {
    let channel = alpha.len();
    let mut out = Vec::with_capacity(pixels.len() / 3 * 4);
    for pixel in pixels.chunks_exact(channel * 3) {
        out.extend_from_slice(pixel);
        out.extend_from_slice(alpha);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_images_gain_an_opaque_alpha_channel() {
        let (bytes, format) =
            convert_image_format(&[1, 2, 3, 4, 5, 6], gltf::image::Format::R8G8B8);
        assert_eq!(format, ImageFormat::R8G8B8A8_UNORM);
        assert_eq!(bytes, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn missing_file_is_reported() {
        let mut importer = GltfImporter::new();
        let result = importer.open_file(Path::new("/definitely/not/here.glb"));
        assert!(matches!(result, Err(ImportError::NotFound(_))));
        assert_eq!(importer.mesh_count(), 0);
        assert!(importer.default_scene().is_none());
    }
}
