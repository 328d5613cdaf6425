use glam::Vec3;

/// Axis-aligned world volume, used for collision and ground geometry.
#[derive(Copy, Clone, Debug, Default)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        !(self.max.x < other.min.x
            || self.min.x > other.max.x
            || self.max.y < other.min.y
            || self.min.y > other.max.y
            || self.max.z < other.min.z
            || self.min.z > other.max.z)
    }

    /// Whether (x, z) falls inside the horizontal footprint.
    #[inline]
    pub fn contains_xz(&self, x: f32, z: f32) -> bool {
        x >= self.min.x && x <= self.max.x && z >= self.min.z && z <= self.max.z
    }

    pub fn expanded(&self, r: f32) -> Aabb {
        let e = Vec3::splat(r);
        Aabb {
            min: self.min - e,
            max: self.max + e,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_and_footprint() {
        let a = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(1.0));
        let b = Aabb::from_center_half_extents(Vec3::new(1.5, 0.0, 0.0), Vec3::splat(1.0));
        let c = Aabb::from_center_half_extents(Vec3::new(5.0, 0.0, 0.0), Vec3::splat(1.0));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(a.contains_xz(0.5, -0.5));
        assert!(!a.contains_xz(2.0, 0.0));
    }

    #[test]
    fn expansion_grows_every_side() {
        let a = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(1.0)).expanded(0.3);
        assert!((a.max.x - 1.3).abs() < 1e-6);
        assert!((a.min.z + 1.3).abs() < 1e-6);
    }
}
