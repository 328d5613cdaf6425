use glam::Vec3;
use hmd_scene::Aabb;

/// Horizontal clearance kept from collision volumes.
pub const PLAYER_RADIUS: f32 = 0.3;

fn inside(point: Vec3, volume: &Aabb) -> bool {
    point.x >= volume.min.x
        && point.x <= volume.max.x
        && point.y >= volume.min.y
        && point.y <= volume.max.y
        && point.z >= volume.min.z
        && point.z <= volume.max.z
}

fn blocked(point: Vec3, volumes: &[Aabb]) -> bool {
    volumes
        .iter()
        .any(|v| inside(point, &v.expanded(PLAYER_RADIUS)))
}

/// Apply a horizontal displacement against collision volumes, resolving the
/// X and Z axes independently so a blocked axis slides along the other.
pub fn slide_horizontal(position: Vec3, displacement: Vec3, volumes: &[Aabb]) -> Vec3 {
    let mut resolved = position;

    let step_x = Vec3::new(displacement.x, 0.0, 0.0);
    if !blocked(resolved + step_x, volumes) {
        resolved += step_x;
    }

    let step_z = Vec3::new(0.0, 0.0, displacement.z);
    if !blocked(resolved + step_z, volumes) {
        resolved += step_z;
    }

    resolved
}

/// Snap the eye to `eye_height` above the highest ground volume under the
/// current footprint. Without ground below, height is left alone.
pub fn snap_to_ground(position: Vec3, eye_height: f32, ground: &[Aabb]) -> Vec3 {
    let floor = ground
        .iter()
        .filter(|v| v.contains_xz(position.x, position.z) && v.max.y <= position.y)
        .map(|v| v.max.y)
        .fold(None, |best: Option<f32>, top| {
            Some(best.map_or(top, |b| b.max(top)))
        });

    match floor {
        Some(top) => Vec3::new(position.x, top + eye_height, position.z),
        None => position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall() -> Vec<Aabb> {
        // A wall along the X axis at z = 2.
        vec![Aabb::new(Vec3::new(-10.0, 0.0, 2.0), Vec3::new(10.0, 4.0, 2.5))]
    }

    #[test]
    fn free_movement_is_unchanged() {
        let p = slide_horizontal(Vec3::new(0.0, 1.6, 0.0), Vec3::new(0.5, 0.0, 0.5), &[]);
        assert!((p - Vec3::new(0.5, 1.6, 0.5)).length() < 1e-6);
    }

    #[test]
    fn blocked_axis_slides_along_the_wall() {
        let start = Vec3::new(0.0, 1.6, 1.5);
        // Push diagonally into the wall: z is blocked, x still moves.
        let p = slide_horizontal(start, Vec3::new(0.4, 0.0, 0.4), &wall());
        assert!((p.x - 0.4).abs() < 1e-6);
        assert!((p.z - 1.5).abs() < 1e-6);
    }

    #[test]
    fn ground_snap_picks_the_highest_volume_underfoot() {
        let ground = vec![
            Aabb::new(Vec3::new(-10.0, -0.2, -10.0), Vec3::new(10.0, 0.0, 10.0)),
            Aabb::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 0.4, 1.0)),
        ];
        let on_platform = snap_to_ground(Vec3::new(0.0, 1.8, 0.0), 1.6, &ground);
        assert!((on_platform.y - 2.0).abs() < 1e-6);

        let on_floor = snap_to_ground(Vec3::new(5.0, 1.8, 5.0), 1.6, &ground);
        assert!((on_floor.y - 1.6).abs() < 1e-6);
    }

    #[test]
    fn no_ground_leaves_height_alone() {
        let p = snap_to_ground(Vec3::new(0.0, 1.23, 0.0), 1.6, &[]);
        assert!((p.y - 1.23).abs() < 1e-6);
    }
}
