use serde::{Deserialize, Serialize};

/// Physical screens wider than this (meters) fit the distortion to the
/// horizontal viewport edge; smaller panels fit to the vertical edge.
pub const WIDE_SCREEN_SIZE: f32 = 0.140;

/// Physical geometry and optics of an HMD panel.
///
/// All distances are in meters. The defaults describe a 7" 1280x800
/// dual-lens panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HmdSpec {
    pub h_resolution: u32,
    pub v_resolution: u32,
    /// Physical width of the full panel.
    pub h_screen_size: f32,
    /// Physical height of the panel.
    pub v_screen_size: f32,
    /// Vertical position of lens centers from the panel bottom.
    pub v_screen_center: f32,
    /// Distance from the eye to the panel surface.
    pub eye_to_screen_distance: f32,
    /// Distance between the two lens centers.
    pub lens_separation_distance: f32,
    /// Configured user interpupillary distance.
    pub interpupillary_distance: f32,
    /// Radial distortion coefficients (even powers of the radius).
    pub distortion_k: [f32; 4],
}

impl Default for HmdSpec {
    fn default() -> Self {
        Self {
            h_resolution: 1280,
            v_resolution: 800,
            h_screen_size: 0.14976,
            v_screen_size: 0.0936,
            v_screen_center: 0.0468,
            eye_to_screen_distance: 0.041,
            lens_separation_distance: 0.0635,
            interpupillary_distance: 0.064,
            distortion_k: [1.0, 0.22, 0.24, 0.0],
        }
    }
}

impl HmdSpec {
    /// Whether this panel is wide enough to fit distortion horizontally.
    pub fn is_wide(&self) -> bool {
        self.h_screen_size > WIDE_SCREEN_SIZE
    }
}
