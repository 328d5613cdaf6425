//! Stereo viewing parameters: HMD panel spec, radial distortion model and
//! the live-tunable view configuration with per-eye derived render params.

mod config;
mod distortion;
mod hmd;

pub use config::{
    EyeRenderParams, SnapshotToggle, StereoEye, StereoMode, StereoViewConfig, ViewSnapshot,
    Viewport,
};
pub use distortion::DistortionParams;
pub use hmd::{HmdSpec, WIDE_SCREEN_SIZE};
