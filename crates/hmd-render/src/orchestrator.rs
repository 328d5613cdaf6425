use crate::{GridMode, PostProcess, RenderDevice};
use glam::Mat4;
use hmd_scene::Scene;
use hmd_stereo::{StereoEye, StereoMode, StereoViewConfig};

/// Per-frame inputs the orchestrator threads through the device. The view
/// matrix is composed once upstream; eye passes only multiply in their
/// view-adjust translation.
pub struct FrameParams<'a> {
    pub scene: &'a Scene,
    pub view: Mat4,
    pub post: PostProcess,
    pub grid: GridMode,
}

/// Run one frame: one center pass, or left then right strictly in that
/// order, followed by present and a GPU flush.
pub fn render_frame(
    device: &mut dyn RenderDevice,
    config: &StereoViewConfig,
    frame: &FrameParams<'_>,
) -> anyhow::Result<()> {
    let eyes: &[StereoEye] = match config.stereo_mode() {
        StereoMode::None => &[StereoEye::Center],
        StereoMode::LeftRight => &[StereoEye::Left, StereoEye::Right],
    };

    for &eye in eyes {
        let params = config.eye_render_params(eye);
        device.begin_pass(frame.post)?;
        device.apply_eye(&params);
        device.clear();
        device.set_depth_enabled(true);
        device.render_scene(frame.scene, params.view_adjust * frame.view);
        if frame.grid != GridMode::Off {
            device.set_depth_enabled(false);
            device.render_grid(config.overlay_transform(eye), frame.grid);
        }
        device.finish_pass();
    }

    device.present()?;
    device.force_flush();
    Ok(())
}
