use crate::geom::Aabb;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Vertex format for scene geometry.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SceneVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

/// A flat-shaded renderable model (one slab, pillar, etc.).
#[derive(Debug)]
pub struct Model {
    pub name: String,
    pub vertices: Vec<SceneVertex>,
    pub indices: Vec<u32>,
    pub visible: bool,
    /// Debug visualization of a collision volume, hidden by default.
    pub is_collision_bound: bool,
}

impl Model {
    /// Axis-aligned box with per-face normals and a uniform color.
    pub fn slab(name: &str, bounds: Aabb, color: [f32; 4]) -> Self {
        let c = bounds.center();
        let h = bounds.half_extents();

        // (normal, two in-plane axes) per face.
        let faces: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Y, Vec3::NEG_Z),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::NEG_Z, Vec3::X),
            (Vec3::Z, Vec3::Y, Vec3::NEG_X),
            (Vec3::NEG_Z, Vec3::Y, Vec3::X),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (n, u, v) in faces {
            let face_center = c + n * (n.abs() * h);
            let half_u = u * (u.abs() * h);
            let half_v = v * (v.abs() * h);
            let base = vertices.len() as u32;

            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let p = face_center + half_u * su + half_v * sv;
                vertices.push(SceneVertex {
                    position: p.to_array(),
                    normal: n.to_array(),
                    color,
                });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self {
            name: name.to_string(),
            vertices,
            indices,
            visible: true,
            is_collision_bound: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slab_has_six_quads() {
        let m = Model::slab(
            "floor",
            Aabb::from_center_half_extents(Vec3::ZERO, Vec3::new(5.0, 0.1, 5.0)),
            [0.5, 0.5, 0.5, 1.0],
        );
        assert_eq!(m.vertices.len(), 24);
        assert_eq!(m.indices.len(), 36);
    }

    #[test]
    fn slab_vertices_stay_inside_bounds() {
        let bounds = Aabb::from_center_half_extents(Vec3::new(1.0, 2.0, 3.0), Vec3::splat(0.5));
        let m = Model::slab("box", bounds, [1.0; 4]);
        for v in &m.vertices {
            assert!(v.position[0] >= bounds.min.x - 1e-5 && v.position[0] <= bounds.max.x + 1e-5);
            assert!(v.position[1] >= bounds.min.y - 1e-5 && v.position[1] <= bounds.max.y + 1e-5);
            assert!(v.position[2] >= bounds.min.z - 1e-5 && v.position[2] <= bounds.max.z + 1e-5);
        }
    }
}
