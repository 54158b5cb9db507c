use serde::{Deserialize, Serialize};
use ultraviolet::{Mat4, Vec3};

/// Axis aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Collapses to the origin for an empty point set.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut min = Vec3::broadcast(f32::INFINITY);
        let mut max = Vec3::broadcast(f32::NEG_INFINITY);
        let mut any = false;
        for point in points {
            min = min.min_by_component(*point);
            max = max.max_by_component(*point);
            any = true;
        }
        if !any {
            return Self::new(Vec3::zero(), Vec3::zero());
        }
        Self { min, max }
    }

    /// Bounds of `points` after applying `transform` to each of them.
    pub fn from_transformed_points<'a>(
        transform: &Mat4,
        points: impl IntoIterator<Item = &'a Vec3>,
    ) -> Self {
        let transformed: Vec<Vec3> = points
            .into_iter()
            .map(|point| transform.transform_point3(*point))
            .collect();
        Self::from_points(&transformed)
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new(Vec3::zero(), Vec3::zero())
    }
}
