use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use ultraviolet::{Vec3, Vec4};

use crate::ids::LocalId;

bitflags! {
    /// Attribute sets an imported material carries.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct MaterialTypes: u8 {
        const PHONG = 1 << 0;
        const PBR = 1 << 1;
    }
}

/// Texture references are local indices into the importer's texture list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhongAttributes {
    pub ambient_color: Vec4,
    pub diffuse_color: Vec4,
    pub specular_color: Vec4,
    pub shininess: f32,
    pub ambient_texture: Option<LocalId>,
    pub diffuse_texture: Option<LocalId>,
    pub specular_texture: Option<LocalId>,
    pub normal_texture: Option<LocalId>,
}

impl Default for PhongAttributes {
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
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PbrAttributes {
    pub base_color: Vec4,
    pub base_color_texture: Option<LocalId>,
    pub normal_texture: Option<LocalId>,
    pub roughness_factor: f32,
    pub metallic_factor: f32,
    pub metallic_roughness_texture: Option<LocalId>,
    pub emissive: Vec3,
    pub emissive_texture: Option<LocalId>,
}

impl Default for PbrAttributes {
    fn default() -> Self {
        Self {
            base_color: Vec4::one(),
            base_color_texture: None,
            normal_texture: None,
            roughness_factor: 1.0,
            metallic_factor: 1.0,
            metallic_roughness_texture: None,
            emissive: Vec3::zero(),
            emissive_texture: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMaterial {
    pub name: Option<String>,
    pub phong: Option<PhongAttributes>,
    pub pbr: Option<PbrAttributes>,
    pub double_sided: bool,
}

impl RawMaterial {
    pub fn types(&self) -> MaterialTypes {
        let mut types = MaterialTypes::empty();
        types.set(MaterialTypes::PHONG, self.phong.is_some());
        types.set(MaterialTypes::PBR, self.pbr.is_some());
        types
    }

    /// Every local texture index this material refers to.
    pub fn texture_references(&self) -> Vec<LocalId> {
        let phong = self.phong.iter().flat_map(|p| {
            [
                p.ambient_texture,
                p.diffuse_texture,
                p.specular_texture,
                p.normal_texture,
            ]
        });
        let pbr = self.pbr.iter().flat_map(|p| {
            [
                p.base_color_texture,
                p.normal_texture,
                p.metallic_roughness_texture,
                p.emissive_texture,
            ]
        });
        phong.chain(pbr).flatten().collect()
    }
}
