//! Shader-ready materials built from importer materials.

use asset_common::{
    ids::{IdRange, LocalId, MaterialId, TextureId},
    scene::{PbrAttributes, PhongAttributes, RawMaterial},
};
use ultraviolet::{Vec3, Vec4};

/// Which shader family a drawable uses.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ShadingKind {
    Flat,
    Phong,
    Pbr,
}

/// Name under which a drawable finds its material. The three reserved materials exist from
/// the start, everything else is addressed by its global ID.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MaterialKey {
    Default,
    White,
    PerVertexObjectId,
    Id(MaterialId),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PhongMaterialData {
    pub ambient_color: Vec4,
    pub diffuse_color: Vec4,
    pub specular_color: Vec4,
    pub shininess: f32,
    pub ambient_texture: Option<TextureId>,
    pub diffuse_texture: Option<TextureId>,
    pub specular_texture: Option<TextureId>,
    pub normal_texture: Option<TextureId>,
    /// Color comes from the vertex object id instead of the attributes above.
    pub per_vertex_object_id: bool,
}

impl Default for PhongMaterialData {
    fn default() -> Self {
        Self {
            ambient_color: Vec4::new(0.1, 0.1, 0.1, 1.0),
            diffuse_color: Vec4::one(),
            specular_color: Vec4::new(0.2, 0.2, 0.2, 1.0),
            shininess: 80.0,
            ambient_texture: None,
            diffuse_texture: None,
            specular_texture: None,
            normal_texture: None,
            per_vertex_object_id: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PbrMaterialData {
    pub base_color: Vec4,
    pub base_color_texture: Option<TextureId>,
    pub normal_texture: Option<TextureId>,
    pub roughness: f32,
    pub metallic: f32,
    pub metallic_roughness_texture: Option<TextureId>,
    pub emissive: Vec3,
    pub emissive_texture: Option<TextureId>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MaterialData {
    Phong(PhongMaterialData),
    Pbr(PbrMaterialData),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    pub shading: ShadingKind,
    pub data: MaterialData,
    pub double_sided: bool,
}

impl Material {
    pub fn new(shading: ShadingKind, data: MaterialData) -> Self {
        Self {
            name: None,
            shading,
            data,
            double_sided: false,
        }
    }

    pub fn default_phong() -> Self {
        Self::new(
            ShadingKind::Phong,
            MaterialData::Phong(PhongMaterialData::default()),
        )
    }

    /// Fully lit white, used for debug geometry drawn without lights.
    pub fn white() -> Self {
        Self::new(
            ShadingKind::Phong,
            MaterialData::Phong(PhongMaterialData {
                ambient_color: Vec4::one(),
                ..Default::default()
            }),
        )
    }

    pub fn per_vertex_object_id() -> Self {
        Self::new(
            ShadingKind::Phong,
            MaterialData::Phong(PhongMaterialData {
                per_vertex_object_id: true,
                ..Default::default()
            }),
        )
    }

    /// Phong material with a single color, as used by trajectory tubes.
    pub fn colored(color: Vec4) -> Self {
        Self::new(
            ShadingKind::Phong,
            MaterialData::Phong(PhongMaterialData {
                ambient_color: color,
                diffuse_color: color,
                specular_color: Vec4::one(),
                ..Default::default()
            }),
        )
    }
}

/// Options that decide how an importer material is turned into a [`Material`].
#[derive(Clone, Copy, Debug)]
pub struct MaterialBuildOptions {
    pub requires_lighting: bool,
    pub build_phong_from_pbr: bool,
}

/// Local texture references resolve against the texture range of the same load.
struct TextureResolver {
    range: Option<IdRange<TextureId>>,
}

impl TextureResolver {
    fn resolve(&self, local: Option<LocalId>) -> Option<TextureId> {
        let local = local?;
        let global = self.range.and_then(|range| range.global(local));
        if global.is_none() {
            log::warn!("Material refers to texture {} which was not loaded", local);
        }
        global
    }
}

/// Returns `None` when the material has no attribute set the options can use.
pub fn build_material(
    raw: &RawMaterial,
    textures: Option<IdRange<TextureId>>,
    options: MaterialBuildOptions,
) -> Option<Material> {
    let textures = TextureResolver { range: textures };

    let (shading, data) = match (&raw.pbr, &raw.phong) {
        (Some(pbr), _) if options.requires_lighting => {
            if options.build_phong_from_pbr {
                (
                    ShadingKind::Phong,
                    MaterialData::Phong(phong_from_pbr(pbr, &textures)),
                )
            } else {
                (ShadingKind::Pbr, MaterialData::Pbr(pbr_shaded(pbr, &textures)))
            }
        }
        (_, Some(phong)) if options.requires_lighting => (
            ShadingKind::Phong,
            MaterialData::Phong(phong_shaded(phong, &textures)),
        ),
        (_, Some(phong)) => (
            ShadingKind::Flat,
            MaterialData::Phong(flat_shaded(phong, &textures)),
        ),
        (_, None) => return None,
    };

    Some(Material {
        name: raw.name.clone(),
        shading,
        data,
        double_sided: raw.double_sided,
    })
}

/// Ambient-only material. Falls back from the ambient texture to the diffuse texture, and
/// from textures to the ambient color.
fn flat_shaded(phong: &PhongAttributes, textures: &TextureResolver) -> PhongMaterialData {
    let mut material = PhongMaterialData {
        ambient_color: Vec4::one(),
        diffuse_color: Vec4::zero(),
        specular_color: Vec4::zero(),
        ..Default::default()
    };
    material.ambient_texture = textures
        .resolve(phong.ambient_texture)
        .or_else(|| textures.resolve(phong.diffuse_texture));
    if material.ambient_texture.is_none() {
        material.ambient_color = phong.ambient_color;
    }
    material
}

fn phong_shaded(phong: &PhongAttributes, textures: &TextureResolver) -> PhongMaterialData {
    PhongMaterialData {
        ambient_color: phong.ambient_color,
        diffuse_color: phong.diffuse_color,
        specular_color: phong.specular_color,
        shininess: phong.shininess,
        ambient_texture: textures.resolve(phong.ambient_texture),
        diffuse_texture: textures.resolve(phong.diffuse_texture),
        specular_texture: textures.resolve(phong.specular_texture),
        normal_texture: textures.resolve(phong.normal_texture),
        per_vertex_object_id: false,
    }
}

fn pbr_shaded(pbr: &PbrAttributes, textures: &TextureResolver) -> PbrMaterialData {
    PbrMaterialData {
        base_color: pbr.base_color,
        base_color_texture: textures.resolve(pbr.base_color_texture),
        normal_texture: textures.resolve(pbr.normal_texture),
        roughness: pbr.roughness_factor,
        metallic: pbr.metallic_factor,
        metallic_roughness_texture: textures.resolve(pbr.metallic_roughness_texture),
        emissive: pbr.emissive,
        emissive_texture: textures.resolve(pbr.emissive_texture),
    }
}

/// Approximates a metallic-roughness material with Phong terms.
fn phong_from_pbr(pbr: &PbrAttributes, textures: &TextureResolver) -> PhongMaterialData {
    let metallic = pbr.metallic_factor.clamp(0.0, 1.0);
    let dielectric = Vec4::new(0.04, 0.04, 0.04, 1.0);
    let specular = dielectric + (pbr.base_color - dielectric) * metallic;
    let diffuse = pbr.base_color * (1.0 - metallic);
    PhongMaterialData {
        ambient_color: pbr.base_color * 0.1,
        diffuse_color: Vec4::new(diffuse.x, diffuse.y, diffuse.z, pbr.base_color.w),
        specular_color: Vec4::new(specular.x, specular.y, specular.z, 1.0),
        shininess: ((1.0 - pbr.roughness_factor.clamp(0.0, 1.0)) * 128.0).max(1.0),
        ambient_texture: None,
        diffuse_texture: textures.resolve(pbr.base_color_texture),
        specular_texture: None,
        normal_texture: textures.resolve(pbr.normal_texture),
        per_vertex_object_id: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset_common::ids::GlobalId;

    fn textures() -> Option<IdRange<TextureId>> {
        Some(IdRange::new(TextureId::new(10), TextureId::new(11)))
    }

    fn options(requires_lighting: bool, build_phong_from_pbr: bool) -> MaterialBuildOptions {
        MaterialBuildOptions {
            requires_lighting,
            build_phong_from_pbr,
        }
    }

    #[test]
    fn lit_pbr_materials_stay_pbr() {
        let raw = RawMaterial {
            pbr: Some(PbrAttributes {
                base_color_texture: Some(1),
                ..Default::default()
            }),
            phong: Some(PhongAttributes::default()),
            ..Default::default()
        };
        let material = build_material(&raw, textures(), options(true, false)).unwrap();
        assert_eq!(material.shading, ShadingKind::Pbr);
        let MaterialData::Pbr(pbr) = material.data else {
            panic!("expected pbr data");
        };
        assert_eq!(pbr.base_color_texture, Some(TextureId::new(11)));

        let converted = build_material(&raw, textures(), options(true, true)).unwrap();
        assert_eq!(converted.shading, ShadingKind::Phong);
    }

    #[test]
    fn unlit_materials_use_the_diffuse_texture_as_ambient() {
        let raw = RawMaterial {
            phong: Some(PhongAttributes {
                diffuse_texture: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        let material = build_material(&raw, textures(), options(false, false)).unwrap();
        assert_eq!(material.shading, ShadingKind::Flat);
        let MaterialData::Phong(phong) = material.data else {
            panic!("expected phong data");
        };
        assert_eq!(phong.ambient_texture, Some(TextureId::new(10)));
        assert_eq!(phong.ambient_color, Vec4::one());
        assert_eq!(phong.diffuse_color, Vec4::zero());
    }

    #[test]
    fn pbr_only_materials_need_lighting() {
        let raw = RawMaterial {
            pbr: Some(PbrAttributes::default()),
            ..Default::default()
        };
        assert!(build_material(&raw, None, options(false, false)).is_none());
    }

    #[test]
    fn references_outside_the_range_are_dropped() {
        let raw = RawMaterial {
            phong: Some(PhongAttributes {
                normal_texture: Some(7),
                ..Default::default()
            }),
            ..Default::default()
        };
        let material = build_material(&raw, textures(), options(true, false)).unwrap();
        let MaterialData::Phong(phong) = material.data else {
            panic!("expected phong data");
        };
        assert_eq!(phong.normal_texture, None);
    }
}
