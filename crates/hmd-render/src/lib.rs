//! Stereo frame rendering: the [`RenderDevice`] seam, the pass orchestrator
//! and a wgpu implementation with radial-distortion post-processing.

mod device;
mod orchestrator;
mod pipeline;
mod target;

pub use device::WgpuRenderDevice;
pub use orchestrator::{render_frame, FrameParams};

use glam::Mat4;
use hmd_scene::Scene;
use hmd_stereo::EyeRenderParams;

/// Post-processing applied when eye passes reach the surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PostProcess {
    /// Straight copy of the scene target.
    None,
    /// Per-eye radial lens-distortion warp.
    Distortion,
}

/// Calibration grid overlay drawn on top of the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridMode {
    Off,
    /// Grid centered on the eye viewport.
    Screen,
    /// Grid centered on the lens center.
    Lens,
}

impl GridMode {
    pub fn cycled(self) -> Self {
        match self {
            GridMode::Off => GridMode::Screen,
            GridMode::Screen => GridMode::Lens,
            GridMode::Lens => GridMode::Off,
        }
    }
}

/// Renderer seam. One frame is a sequence of eye passes between
/// `begin_pass`/`finish_pass` pairs, composited to the surface by `present`.
///
/// The orchestrator drives these in a fixed order; implementations may
/// assume `apply_eye` precedes the draw calls of its pass.
pub trait RenderDevice {
    fn begin_pass(&mut self, post: PostProcess) -> anyhow::Result<()>;
    fn apply_eye(&mut self, params: &EyeRenderParams);
    /// Clear the current eye's region of the scene target.
    fn clear(&mut self);
    fn set_depth_enabled(&mut self, enabled: bool);
    /// Draw the scene with the given combined (view-adjusted) view matrix.
    fn render_scene(&mut self, scene: &Scene, view: Mat4);
    /// Draw the calibration grid with the eye's 2D overlay transform.
    fn render_grid(&mut self, transform: Mat4, mode: GridMode);
    fn finish_pass(&mut self);
    /// Composite eye passes to the surface and present it.
    fn present(&mut self) -> anyhow::Result<()>;
    /// Block until the GPU has consumed the submitted frame.
    fn force_flush(&mut self);
    fn set_distortion_clear_color(&mut self, color: [f32; 4]);
    /// Supersampling factor for the offscreen scene target.
    fn set_scene_render_scale(&mut self, scale: f32);
}
