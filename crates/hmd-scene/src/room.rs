use crate::geom::Aabb;
use crate::model::Model;
use crate::{LoadedScene, SceneError, SceneSource};
use glam::Vec3;
use std::path::Path;

/// Built-in procedural scene: a flat-shaded room assembled from slabs.
///
/// Stands in for the external description loader so the demo runs without
/// asset files. The path is still probed so LOD discovery and load-failure
/// handling behave as with real files; higher LOD indices (from the
/// `name1.ext` suffix) shed the interior detail slabs.
pub struct SlabRoomSource;

const ROOM_HALF: f32 = 10.0;
const WALL_HEIGHT: f32 = 4.0;
const WALL_THICKNESS: f32 = 0.5;

impl SceneSource for SlabRoomSource {
    fn load(&self, path: &Path) -> Result<LoadedScene, SceneError> {
        // Mirror real-loader semantics: a missing file is a load failure.
        std::fs::metadata(path).map_err(|source| SceneError::Open {
            path: path.display().to_string(),
            source,
        })?;

        let detail = lod_suffix(path) == 0;
        Ok(build_room(detail))
    }
}

/// Numeric LOD suffix on the file stem ("room2.xml" -> 2, "room.xml" -> 0).
fn lod_suffix(path: &Path) -> u32 {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let digits: String = stem
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.chars().rev().collect::<String>().parse().unwrap_or(0)
}

fn build_room(detail: bool) -> LoadedScene {
    let mut models = Vec::new();
    let mut collision = Vec::new();
    let mut ground = Vec::new();

    let floor = Aabb::new(
        Vec3::new(-ROOM_HALF, -0.2, -ROOM_HALF),
        Vec3::new(ROOM_HALF, 0.0, ROOM_HALF),
    );
    models.push(Model::slab("floor", floor, [0.42, 0.4, 0.38, 1.0]));
    ground.push(floor);

    let ceiling = Aabb::new(
        Vec3::new(-ROOM_HALF, WALL_HEIGHT, -ROOM_HALF),
        Vec3::new(ROOM_HALF, WALL_HEIGHT + 0.2, ROOM_HALF),
    );
    models.push(Model::slab("ceiling", ceiling, [0.55, 0.55, 0.6, 1.0]));

    let walls = [
        ("wall_n", Vec3::new(0.0, 0.0, -ROOM_HALF), Vec3::new(ROOM_HALF, WALL_HEIGHT, WALL_THICKNESS)),
        ("wall_s", Vec3::new(0.0, 0.0, ROOM_HALF), Vec3::new(ROOM_HALF, WALL_HEIGHT, WALL_THICKNESS)),
        ("wall_w", Vec3::new(-ROOM_HALF, 0.0, 0.0), Vec3::new(WALL_THICKNESS, WALL_HEIGHT, ROOM_HALF)),
        ("wall_e", Vec3::new(ROOM_HALF, 0.0, 0.0), Vec3::new(WALL_THICKNESS, WALL_HEIGHT, ROOM_HALF)),
    ];
    for (name, center, half) in walls {
        let bounds = Aabb::from_center_half_extents(
            center + Vec3::new(0.0, WALL_HEIGHT * 0.5, 0.0),
            Vec3::new(half.x, WALL_HEIGHT * 0.5, half.z),
        );
        models.push(Model::slab(name, bounds, [0.6, 0.5, 0.4, 1.0]));
        collision.push(bounds);
    }

    if detail {
        for (i, (x, z)) in [(-4.0, -4.0), (4.0, -4.0), (-4.0, 4.0), (4.0, 4.0)]
            .into_iter()
            .enumerate()
        {
            let bounds = Aabb::from_center_half_extents(
                Vec3::new(x, WALL_HEIGHT * 0.5, z),
                Vec3::new(0.4, WALL_HEIGHT * 0.5, 0.4),
            );
            models.push(Model::slab(&format!("pillar_{i}"), bounds, [0.5, 0.45, 0.42, 1.0]));
            collision.push(bounds);
        }

        // A raised platform the ground snap can step onto.
        let platform = Aabb::new(Vec3::new(-2.0, 0.0, -8.0), Vec3::new(2.0, 0.4, -6.0));
        models.push(Model::slab("platform", platform, [0.45, 0.5, 0.45, 1.0]));
        ground.push(platform);
        collision.push(platform);
    }

    LoadedScene {
        models,
        collision,
        ground,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detailed_room_has_more_content_than_coarse() {
        let full = build_room(true);
        let coarse = build_room(false);
        assert!(full.models.len() > coarse.models.len());
        assert!(full.collision.len() > coarse.collision.len());
        // Both keep the four walls.
        assert_eq!(coarse.collision.len(), 4);
    }

    #[test]
    fn lod_suffix_parses_trailing_digits() {
        assert_eq!(lod_suffix(Path::new("/tmp/room.xml")), 0);
        assert_eq!(lod_suffix(Path::new("/tmp/room1.xml")), 1);
        assert_eq!(lod_suffix(Path::new("/tmp/room12.xml")), 12);
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let err = SlabRoomSource
            .load(Path::new("/nonexistent/room.xml"))
            .unwrap_err();
        assert!(matches!(err, SceneError::Open { .. }));
    }
}
