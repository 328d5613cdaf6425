use std::fs::File;
use std::path::{Path, PathBuf};

/// Frame rate below which a frame counts as "low".
pub const LOW_FPS_LIMIT: u32 = 40;
/// Consecutive low-FPS frames before an automatic demotion fires.
pub const LOW_FPS_TRIGGER_FRAMES: u32 = 200;

/// Level-of-detail selection over an ordered list of scene files.
///
/// Index 0 is the full-detail base file; higher indices are coarser
/// variants discovered at startup. Automatic demotion is driven by a
/// consecutive-low-FPS counter; manual raise/drop bypass it.
pub struct LodController {
    paths: Vec<PathBuf>,
    current: usize,
    low_fps_frames: u32,
}

impl LodController {
    /// Discover the LOD chain for `base`: probe `name1.ext`, `name2.ext`, …
    /// until a file fails to open. The list is fixed for the session.
    pub fn discover(base: &Path) -> Self {
        let mut paths = vec![base.to_path_buf()];

        let stem = base.file_stem().and_then(|s| s.to_str());
        let ext = base.extension().and_then(|s| s.to_str());
        if let (Some(stem), Some(ext)) = (stem, ext) {
            let dir = base.parent().unwrap_or_else(|| Path::new(""));
            for index in 1.. {
                let candidate = dir.join(format!("{stem}{index}.{ext}"));
                if File::open(&candidate).is_err() {
                    break;
                }
                paths.push(candidate);
            }
        }

        tracing::info!(levels = paths.len(), base = %base.display(), "LOD chain discovered");
        Self {
            paths,
            current: 0,
            low_fps_frames: 0,
        }
    }

    /// Build from an explicit path list (coarsest last).
    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        assert!(!paths.is_empty());
        Self {
            paths,
            current: 0,
            low_fps_frames: 0,
        }
    }

    pub fn current(&self) -> &Path {
        &self.paths[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn level_count(&self) -> usize {
        self.paths.len()
    }

    /// Feed the latest per-second FPS reading, once per rendered frame.
    /// Returns true when the consecutive low-FPS frame counter hits the
    /// trigger; the counter resets either way the streak ends.
    pub fn on_frame(&mut self, fps: u32) -> bool {
        if fps < LOW_FPS_LIMIT {
            self.low_fps_frames += 1;
        } else {
            self.low_fps_frames = 0;
        }
        if self.low_fps_frames >= LOW_FPS_TRIGGER_FRAMES {
            self.low_fps_frames = 0;
            return true;
        }
        false
    }

    /// Demote to the next coarser file, if any. Returns the new path.
    pub fn drop_level(&mut self) -> Option<&Path> {
        if self.current + 1 < self.paths.len() {
            self.current += 1;
            tracing::info!(index = self.current, "LOD dropped");
            Some(&self.paths[self.current])
        } else {
            None
        }
    }

    /// Promote to the next finer file, if any. Returns the new path.
    pub fn raise_level(&mut self) -> Option<&Path> {
        if self.current > 0 {
            self.current -= 1;
            tracing::info!(index = self.current, "LOD raised");
            Some(&self.paths[self.current])
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> LodController {
        LodController::from_paths(vec![
            PathBuf::from("base.xml"),
            PathBuf::from("base1.xml"),
            PathBuf::from("base2.xml"),
        ])
    }

    #[test]
    fn low_fps_streak_triggers_exactly_once_at_threshold() {
        let mut lod = controller();
        for _ in 0..LOW_FPS_TRIGGER_FRAMES - 1 {
            assert!(!lod.on_frame(30));
        }
        assert!(lod.on_frame(30));
        // Counter was reset; the streak starts over.
        assert!(!lod.on_frame(30));
    }

    #[test]
    fn good_frame_resets_the_streak() {
        let mut lod = controller();
        for _ in 0..LOW_FPS_TRIGGER_FRAMES - 1 {
            lod.on_frame(10);
        }
        assert!(!lod.on_frame(60));
        // Needs a full fresh streak again.
        for _ in 0..LOW_FPS_TRIGGER_FRAMES - 1 {
            assert!(!lod.on_frame(39));
        }
        assert!(lod.on_frame(39));
    }

    #[test]
    fn drop_twice_raise_once_lands_on_middle_file() {
        let mut lod = controller();
        assert!(lod.drop_level().is_some());
        assert!(lod.drop_level().is_some());
        // Already at the coarsest.
        assert!(lod.drop_level().is_none());
        assert_eq!(lod.current_index(), 2);
        assert!(lod.raise_level().is_some());
        assert_eq!(lod.current_index(), 1);
        assert_eq!(lod.current(), Path::new("base1.xml"));
    }

    #[test]
    fn raise_at_base_is_a_no_op() {
        let mut lod = controller();
        assert!(lod.raise_level().is_none());
        assert_eq!(lod.current_index(), 0);
    }

    #[test]
    fn discovery_probes_sequential_suffixes() {
        let dir = std::env::temp_dir().join(format!("hmd_lod_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["scene.xml", "scene1.xml", "scene2.xml", "scene4.xml"] {
            std::fs::write(dir.join(name), b"<scene/>").unwrap();
        }

        let lod = LodController::discover(&dir.join("scene.xml"));
        // scene3.xml is missing, so discovery stops at scene2.
        assert_eq!(lod.level_count(), 3);
        assert_eq!(lod.current(), dir.join("scene.xml"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
