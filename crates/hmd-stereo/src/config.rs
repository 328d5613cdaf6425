use crate::distortion::DistortionParams;
use crate::hmd::HmdSpec;
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// How the frame is split between eyes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StereoMode {
    /// One full-viewport pass with a centered eye.
    None,
    /// Two sequential passes, left half then right half.
    LeftRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StereoEye {
    Center,
    Left,
    Right,
}

/// Pixel rectangle within the render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Viewport {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn aspect(&self) -> f32 {
        self.w as f32 / self.h as f32
    }
}

/// Everything one render pass needs for one eye. Recomputed every frame
/// from [`StereoViewConfig`]; never stored across frames.
#[derive(Debug, Clone, Copy)]
pub struct EyeRenderParams {
    pub eye: StereoEye,
    pub viewport: Viewport,
    pub projection: Mat4,
    /// Translation that shifts the world by half the IPD toward this eye.
    /// Identity for the center eye.
    pub view_adjust: Mat4,
    pub distortion: DistortionParams,
}

/// Snapshot of the tunable fields, used by the save/restore toggle and by
/// config persistence. Restoring a snapshot reproduces a bit-identical
/// derived distortion scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewSnapshot {
    pub distortion_k: [f32; 4],
    pub eye_to_screen_distance: f32,
    pub aspect_multiplier: f32,
    pub interpupillary_distance: f32,
}

/// Outcome of the single-slot save/restore toggle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SnapshotToggle {
    /// The slot was empty; current settings were stashed.
    Saved,
    /// The slot held a snapshot; it was applied (and the slot now holds
    /// the settings that were active just before).
    Restored(ViewSnapshot),
}

/// Live-tunable stereo viewing configuration.
///
/// Every derived value (aspect, vertical FOV, distortion scale, projection
/// center offset) is a pure function of the tunable fields and is recomputed
/// inside every setter, so reads never observe stale state.
#[derive(Debug, Clone)]
pub struct StereoViewConfig {
    hmd: HmdSpec,
    mode: StereoMode,
    full_viewport: Viewport,
    aspect_multiplier: f32,
    interpupillary_distance: f32,
    distortion_k: [f32; 4],
    /// Point on the viewport edge the warped image is fit to; (0,0) disables
    /// fitting (scale stays 1).
    fit_point: (f32, f32),
    area_2d_fov: f32,
    saved: Option<ViewSnapshot>,

    // Derived; see recompute().
    aspect: f32,
    y_fov: f32,
    distortion: DistortionParams,
    projection_center_offset: f32,
}

impl StereoViewConfig {
    pub fn new(hmd: HmdSpec, full_viewport: Viewport) -> Self {
        let fit_point = if hmd.is_wide() { (-1.0, 0.0) } else { (0.0, 1.0) };
        let mut config = Self {
            interpupillary_distance: hmd.interpupillary_distance,
            distortion_k: hmd.distortion_k,
            hmd,
            mode: StereoMode::LeftRight,
            full_viewport,
            aspect_multiplier: 1.0,
            fit_point,
            area_2d_fov: 85f32.to_radians(),
            saved: None,
            aspect: 1.0,
            y_fov: 1.0,
            distortion: DistortionParams {
                k: [1.0, 0.0, 0.0, 0.0],
                x_center_offset: 0.0,
                scale: 1.0,
            },
            projection_center_offset: 0.0,
        };
        config.recompute();
        config
    }

    // --- Tunable field access. Every setter re-derives. ---

    pub fn hmd(&self) -> &HmdSpec {
        &self.hmd
    }

    pub fn stereo_mode(&self) -> StereoMode {
        self.mode
    }

    pub fn set_stereo_mode(&mut self, mode: StereoMode) {
        self.mode = mode;
        self.recompute();
    }

    pub fn full_viewport(&self) -> Viewport {
        self.full_viewport
    }

    pub fn set_full_viewport(&mut self, viewport: Viewport) {
        self.full_viewport = viewport;
        self.recompute();
    }

    pub fn eye_to_screen_distance(&self) -> f32 {
        self.hmd.eye_to_screen_distance
    }

    pub fn set_eye_to_screen_distance(&mut self, esd: f32) {
        self.hmd.eye_to_screen_distance = esd;
        self.recompute();
    }

    pub fn aspect_multiplier(&self) -> f32 {
        self.aspect_multiplier
    }

    pub fn set_aspect_multiplier(&mut self, multiplier: f32) {
        self.aspect_multiplier = multiplier;
        self.recompute();
    }

    pub fn ipd(&self) -> f32 {
        self.interpupillary_distance
    }

    pub fn set_ipd(&mut self, ipd: f32) {
        self.interpupillary_distance = ipd;
        self.recompute();
    }

    pub fn distortion_k(&self, index: usize) -> f32 {
        self.distortion_k[index]
    }

    pub fn set_distortion_k(&mut self, index: usize, value: f32) {
        self.distortion_k[index] = value;
        self.recompute();
    }

    pub fn distortion_fit_point(&self) -> (f32, f32) {
        self.fit_point
    }

    /// Set the fit point in viewport coordinates. (0,0) is the special
    /// "no fit" case that forces scale = 1.
    pub fn set_distortion_fit_point(&mut self, x: f32, y: f32) {
        self.fit_point = (x, y);
        self.recompute();
    }

    pub fn set_2d_area_fov(&mut self, fov: f32) {
        self.area_2d_fov = fov;
        self.recompute();
    }

    // --- Derived values. ---

    /// Effective aspect ratio: raw per-eye viewport aspect times the
    /// decoupled multiplier.
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn y_fov(&self) -> f32 {
        self.y_fov
    }

    pub fn y_fov_degrees(&self) -> f32 {
        self.y_fov.to_degrees()
    }

    pub fn distortion_scale(&self) -> f32 {
        self.distortion.scale
    }

    pub fn distortion(&self) -> DistortionParams {
        self.distortion
    }

    /// Per-eye parameters for one render pass.
    pub fn eye_render_params(&self, eye: StereoEye) -> EyeRenderParams {
        let vp = self.full_viewport;
        let projection_center = Mat4::perspective_rh(self.y_fov, self.aspect, 0.01, 2000.0);
        let half_ipd = self.interpupillary_distance * 0.5;
        let offset = self.projection_center_offset;

        match eye {
            StereoEye::Center => EyeRenderParams {
                eye,
                viewport: vp,
                projection: projection_center,
                view_adjust: Mat4::IDENTITY,
                distortion: self.distortion,
            },
            StereoEye::Left => EyeRenderParams {
                eye,
                viewport: Viewport::new(vp.x, vp.y, vp.w / 2, vp.h),
                projection: Mat4::from_translation(Vec3::new(offset, 0.0, 0.0))
                    * projection_center,
                view_adjust: Mat4::from_translation(Vec3::new(half_ipd, 0.0, 0.0)),
                distortion: self.distortion,
            },
            StereoEye::Right => EyeRenderParams {
                eye,
                viewport: Viewport::new(vp.x + vp.w / 2, vp.y, vp.w / 2, vp.h),
                projection: Mat4::from_translation(Vec3::new(-offset, 0.0, 0.0))
                    * projection_center,
                view_adjust: Mat4::from_translation(Vec3::new(-half_ipd, 0.0, 0.0)),
                distortion: self.distortion.mirrored(),
            },
        }
    }

    /// Orthographic transform for 2D overlay content in one eye, mapping
    /// [-1,1] to the configured 2D FOV area with the per-eye lens shift.
    pub fn overlay_transform(&self, eye: StereoEye) -> Mat4 {
        let area = (self.area_2d_fov * 0.5).tan() * self.hmd.eye_to_screen_distance;
        let half_screen = self.hmd.v_screen_size * 0.5;
        let scale = (area / half_screen).min(1.0);
        let shift = match eye {
            StereoEye::Center => 0.0,
            StereoEye::Left => self.projection_center_offset,
            StereoEye::Right => -self.projection_center_offset,
        };
        Mat4::from_translation(Vec3::new(shift, 0.0, 0.0))
            * Mat4::from_scale(Vec3::new(scale, scale, 1.0))
    }

    // --- Save/restore toggle. ---

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            distortion_k: self.distortion_k,
            eye_to_screen_distance: self.hmd.eye_to_screen_distance,
            aspect_multiplier: self.aspect_multiplier,
            interpupillary_distance: self.interpupillary_distance,
        }
    }

    pub fn apply_snapshot(&mut self, snapshot: ViewSnapshot) {
        self.distortion_k = snapshot.distortion_k;
        self.hmd.eye_to_screen_distance = snapshot.eye_to_screen_distance;
        self.aspect_multiplier = snapshot.aspect_multiplier;
        self.interpupillary_distance = snapshot.interpupillary_distance;
        self.recompute();
    }

    /// Alternating single-slot save/restore: an empty slot stashes the
    /// current settings; a full slot is applied and replaced with the
    /// settings that were active just before.
    pub fn toggle_saved(&mut self) -> SnapshotToggle {
        let current = self.snapshot();
        match self.saved.replace(current) {
            Some(saved) => {
                self.apply_snapshot(saved);
                tracing::debug!("view snapshot restored");
                SnapshotToggle::Restored(saved)
            }
            None => {
                tracing::debug!("view snapshot saved");
                SnapshotToggle::Saved
            }
        }
    }

    /// Re-derive aspect, distortion offset/scale, FOV and projection offset.
    fn recompute(&mut self) {
        let vp = self.full_viewport;
        let mut aspect = vp.aspect();
        if self.mode == StereoMode::LeftRight {
            aspect *= 0.5;
        }
        aspect *= self.aspect_multiplier;
        self.aspect = aspect;

        // Lens centers sit lens_separation apart; express their shift from
        // the per-eye viewport centers in viewport units.
        let lens_shift =
            self.hmd.h_screen_size * 0.25 - self.hmd.lens_separation_distance * 0.5;
        let x_center_offset = 4.0 * lens_shift / self.hmd.h_screen_size;

        let (fit_x, fit_y) = self.fit_point;
        let scale = if fit_x.abs() < 1e-4 && fit_y.abs() < 1e-4 {
            1.0
        } else {
            // Solve for the scale that maps the fit point, measured from the
            // lens center, through the distortion polynomial.
            let stereo_aspect = 0.5 * vp.w as f32 / vp.h as f32;
            let dx = fit_x - x_center_offset;
            let dy = fit_y / stereo_aspect;
            let fit_radius = (dx * dx + dy * dy).sqrt();
            let probe = DistortionParams {
                k: self.distortion_k,
                x_center_offset,
                scale: 1.0,
            };
            probe.distortion_fn(fit_radius) / fit_radius
        };

        self.distortion = DistortionParams {
            k: self.distortion_k,
            x_center_offset,
            scale,
        };

        // Vertical FOV through the lens: half the physical screen height,
        // magnified by the distortion scale, seen from the eye relief.
        let perceived_half_screen = self.hmd.v_screen_size * 0.5 * scale;
        self.y_fov = 2.0 * (perceived_half_screen / self.hmd.eye_to_screen_distance).atan();

        self.projection_center_offset = x_center_offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StereoViewConfig {
        StereoViewConfig::new(HmdSpec::default(), Viewport::new(0, 0, 1280, 800))
    }

    #[test]
    fn wide_panel_fits_to_horizontal_edge() {
        let c = config();
        // Default spec is a 7" panel.
        assert_eq!(c.distortion_fit_point(), (-1.0, 0.0));
        assert!(c.distortion_scale() > 1.0);
    }

    #[test]
    fn zero_fit_point_disables_scaling() {
        let mut c = config();
        c.set_distortion_fit_point(0.0, 0.0);
        assert_eq!(c.distortion_scale(), 1.0);
    }

    #[test]
    fn distortion_scale_is_idempotent_and_tracks_mutation() {
        let mut c = config();
        let s0 = c.distortion_scale();
        assert_eq!(c.distortion_scale(), s0);

        c.set_distortion_k(1, c.distortion_k(1) + 0.1);
        let s1 = c.distortion_scale();
        assert!(s1 > s0);
        assert_eq!(c.distortion_scale(), s1);

        // Reverting the field reproduces the original derived value.
        c.set_distortion_k(1, c.distortion_k(1) - 0.1);
        assert_eq!(c.distortion_scale(), s0);
    }

    #[test]
    fn fov_recomputes_when_esd_changes() {
        let mut c = config();
        let fov_near = c.y_fov_degrees();
        c.set_eye_to_screen_distance(c.eye_to_screen_distance() + 0.01);
        // Moving the eye away narrows the FOV.
        assert!(c.y_fov_degrees() < fov_near);
    }

    #[test]
    fn aspect_multiplier_is_decoupled_from_viewport() {
        let mut c = config();
        let raw = c.aspect() / c.aspect_multiplier();
        c.set_aspect_multiplier(1.25);
        assert!((c.aspect() - raw * 1.25).abs() < 1e-6);
        // Viewport untouched.
        assert_eq!(c.full_viewport(), Viewport::new(0, 0, 1280, 800));
    }

    #[test]
    fn stereo_mode_halves_effective_aspect() {
        let mut c = config();
        let stereo = c.aspect();
        c.set_stereo_mode(StereoMode::None);
        assert!((c.aspect() - stereo * 2.0).abs() < 1e-6);
    }

    #[test]
    fn eye_viewports_split_the_frame() {
        let c = config();
        let left = c.eye_render_params(StereoEye::Left);
        let right = c.eye_render_params(StereoEye::Right);
        assert_eq!(left.viewport, Viewport::new(0, 0, 640, 800));
        assert_eq!(right.viewport, Viewport::new(640, 0, 640, 800));
        let center = c.eye_render_params(StereoEye::Center);
        assert_eq!(center.viewport, c.full_viewport());
        assert_eq!(center.view_adjust, Mat4::IDENTITY);
    }

    #[test]
    fn view_adjust_offsets_half_ipd_in_opposite_directions() {
        let c = config();
        let left = c.eye_render_params(StereoEye::Left);
        let right = c.eye_render_params(StereoEye::Right);
        let half = c.ipd() * 0.5;
        assert!((left.view_adjust.w_axis.x - half).abs() < 1e-6);
        assert!((right.view_adjust.w_axis.x + half).abs() < 1e-6);
        // Lens center offset mirrors between eyes.
        assert_eq!(
            left.distortion.x_center_offset,
            -right.distortion.x_center_offset
        );
    }

    #[test]
    fn snapshot_toggle_alternates_save_and_restore() {
        let mut c = config();
        let original = c.snapshot();

        assert_eq!(c.toggle_saved(), SnapshotToggle::Saved);

        c.set_distortion_k(0, 1.1);
        c.set_ipd(0.07);
        let modified = c.snapshot();

        match c.toggle_saved() {
            SnapshotToggle::Restored(s) => assert_eq!(s, original),
            other => panic!("expected restore, got {other:?}"),
        }
        assert_eq!(c.snapshot(), original);

        // Second toggle brings back the modified settings.
        match c.toggle_saved() {
            SnapshotToggle::Restored(s) => assert_eq!(s, modified),
            other => panic!("expected restore, got {other:?}"),
        }
        assert_eq!(c.snapshot(), modified);
    }

    #[test]
    fn serialized_snapshot_restore_reproduces_bit_identical_scale() {
        let mut c = config();
        c.set_distortion_k(2, 0.31);
        c.set_eye_to_screen_distance(0.043);
        let scale = c.distortion_scale();
        let text = toml::to_string(&c.snapshot()).unwrap();

        // Perturb everything, then restore from the serialized form.
        c.set_distortion_k(2, 0.5);
        c.set_eye_to_screen_distance(0.05);
        c.set_aspect_multiplier(0.9);
        let snapshot: ViewSnapshot = toml::from_str(&text).unwrap();
        c.apply_snapshot(snapshot);

        assert_eq!(c.distortion_scale().to_bits(), scale.to_bits());
    }
}
