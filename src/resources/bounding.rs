use glam::{Affine3A, Vec3};

/// Axis-aligned bounding box.
///
/// The default value is *undefined* (inverted infinite extents): merging
/// anything into it yields exactly that thing, and it reports a zero size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub const UNDEFINED: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_defined(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    pub fn clear(&mut self) {
        *self = Self::UNDEFINED;
    }

    pub fn define(&mut self, other: &BoundingBox) {
        *self = *other;
    }

    #[must_use]
    pub fn center(&self) -> Vec3 {
        if self.is_defined() {
            (self.min + self.max) * 0.5
        } else {
            Vec3::ZERO
        }
    }

    #[must_use]
    pub fn size(&self) -> Vec3 {
        if self.is_defined() {
            self.max - self.min
        } else {
            Vec3::ZERO
        }
    }

    #[must_use]
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn merge(&mut self, other: &BoundingBox) {
        if other.is_defined() {
            *self = self.union(other);
        }
    }

    pub fn merge_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn merge_sphere(&mut self, sphere: &Sphere) {
        let extent = Vec3::splat(sphere.radius);
        self.merge_point(sphere.center - extent);
        self.merge_point(sphere.center + extent);
    }

    /// Box enclosing the eight transformed corners.
    #[must_use]
    pub fn transformed(&self, matrix: &Affine3A) -> Self {
        if !self.is_defined() {
            return *self;
        }

        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];

        let mut result = Self::UNDEFINED;
        for corner in corners {
            result.merge_point(matrix.transform_point3(corner));
        }
        result
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    #[must_use]
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_merge() {
        let mut bb = BoundingBox::default();
        assert!(!bb.is_defined());
        assert_eq!(bb.size(), Vec3::ZERO);

        bb.merge(&BoundingBox::new(Vec3::NEG_ONE, Vec3::ONE));
        assert_eq!(bb.min, Vec3::NEG_ONE);
        assert_eq!(bb.max, Vec3::ONE);
    }

    #[test]
    fn test_merge_sphere() {
        let mut bb = BoundingBox::default();
        bb.merge_sphere(&Sphere::new(Vec3::new(2.0, 0.0, 0.0), 0.5));
        assert_eq!(bb.min, Vec3::new(1.5, -0.5, -0.5));
        assert_eq!(bb.max, Vec3::new(2.5, 0.5, 0.5));
    }
}
