//! World content: renderable models, collision volumes, the scene-source
//! loading seam and the FPS-driven level-of-detail controller.

pub mod geom;
pub mod lod;
pub mod model;
mod room;

pub use geom::Aabb;
pub use model::{Model, SceneVertex};
pub use room::SlabRoomSource;

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to open scene file {path}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed scene description: {0}")]
    Malformed(String),
}

/// Everything a scene description yields: renderables plus the collision
/// and ground volumes locomotion resolves against.
#[derive(Debug)]
pub struct LoadedScene {
    pub models: Vec<Model>,
    pub collision: Vec<Aabb>,
    pub ground: Vec<Aabb>,
}

/// Loader seam. The description format (XML in the original assets) is a
/// collaborator concern; the pipeline only needs `load` to either fully
/// populate or fail without side effects.
pub trait SceneSource {
    fn load(&self, path: &Path) -> Result<LoadedScene, SceneError>;
}

/// The renderable scene. Swapped atomically on LOD changes: `replace` fully
/// clears before repopulating, so a render pass never sees a partial load.
#[derive(Default)]
pub struct Scene {
    pub models: Vec<Model>,
    revision: u64,
}

impl Scene {
    pub fn clear(&mut self) {
        self.models.clear();
        self.revision += 1;
    }

    pub fn replace(&mut self, models: Vec<Model>) {
        self.clear();
        self.models = models;
        self.revision += 1;
        tracing::debug!(models = self.models.len(), "scene repopulated");
    }

    /// Toggle visibility of collision-bound debug models.
    pub fn toggle_collision_bounds(&mut self) {
        for model in &mut self.models {
            if model.is_collision_bound {
                model.visible = !model.visible;
            }
        }
        self.revision += 1;
    }

    /// Bumped on every content change; renderers key GPU uploads off it.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
