use serde::{Deserialize, Serialize};
use ultraviolet::{Mat3, Mat4, Vec3};

const ORTHOGONAL_EPSILON: f32 = 1.0e-4;

/// Orientation of an asset's native coordinate system.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoordinateFrame {
    pub up: Vec3,
    pub front: Vec3,
    pub origin: Vec3,
}

impl Default for CoordinateFrame {
    fn default() -> Self {
        Self {
            up: Vec3::unit_y(),
            front: -Vec3::unit_z(),
            origin: Vec3::zero(),
        }
    }
}

impl CoordinateFrame {
    /// Fails when `up` and `front` are degenerate or not orthogonal.
    pub fn new(up: Vec3, front: Vec3, origin: Vec3) -> Option<Self> {
        if up.mag_sq() < ORTHOGONAL_EPSILON || front.mag_sq() < ORTHOGONAL_EPSILON {
            return None;
        }
        let (up, front) = (up.normalized(), front.normalized());
        if up.dot(front).abs() > ORTHOGONAL_EPSILON {
            return None;
        }
        Some(Self { up, front, origin })
    }

    /// Like [`CoordinateFrame::new`], falling back to the default frame.
    pub fn from_up_front_or_default(up: Vec3, front: Vec3, origin: Vec3) -> Self {
        Self::new(up, front, origin).unwrap_or_else(|| {
            log::warn!(
                "Up {:?} and front {:?} are not orthogonal, using the default frame",
                up,
                front
            );
            Self {
                origin,
                ..Self::default()
            }
        })
    }

    /// Columns are right, up and back.
    fn basis(&self) -> Mat3 {
        let up = self.up.normalized();
        let front = self.front.normalized();
        Mat3::new(front.cross(up), up, -front)
    }

    /// Rotation mapping this frame's up/front onto the world's.
    pub fn rotation_frame_to_world(&self) -> Mat4 {
        let world = CoordinateFrame::default().basis();
        (world * self.basis().transposed()).into_homogeneous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).mag() < 1.0e-5
    }

    #[test]
    fn default_frame_is_identity() {
        let rotation = CoordinateFrame::default().rotation_frame_to_world();
        assert_eq!(rotation, Mat4::identity());
    }

    #[test]
    fn z_up_frame_maps_up_to_world_up() {
        let frame = CoordinateFrame::new(Vec3::unit_z(), Vec3::unit_y(), Vec3::zero()).unwrap();
        let rotation = frame.rotation_frame_to_world();
        assert!(approx(rotation.transform_vec3(Vec3::unit_z()), Vec3::unit_y()));
        assert!(approx(rotation.transform_vec3(Vec3::unit_y()), -Vec3::unit_z()));
    }

    #[test]
    fn non_orthogonal_frame_is_rejected() {
        assert!(CoordinateFrame::new(Vec3::unit_y(), Vec3::one(), Vec3::zero()).is_none());
        let fallback =
            CoordinateFrame::from_up_front_or_default(Vec3::unit_y(), Vec3::one(), Vec3::one());
        assert_eq!(fallback.up, Vec3::unit_y());
        assert_eq!(fallback.origin, Vec3::one());
    }
}
