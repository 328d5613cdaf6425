use hmd_stereo::HmdSpec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the scene description file; numeric-suffix variants next to
    /// it are picked up as coarser detail levels.
    pub scene_path: PathBuf,
    /// Window size when no HMD-shaped output is available.
    pub window_size: (u32, u32),
    /// Panel and optics description of the target HMD.
    pub hmd: HmdSpec,
    /// IMU configuration.
    pub imu: ImuConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let hmd = HmdSpec::default();
        Self {
            scene_path: PathBuf::from("assets/world.xml"),
            window_size: (hmd.h_resolution, hmd.v_resolution),
            hmd,
            imu: ImuConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImuConfig {
    /// Madgwick filter beta parameter (convergence speed). Higher = more responsive, less smooth.
    pub madgwick_beta: f32,
    /// Number of stationary samples for gyro bias calibration.
    pub calibration_samples: u32,
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            madgwick_beta: 0.1,
            calibration_samples: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_through_toml() {
        let mut config = AppConfig::default();
        config.hmd.distortion_k = [1.0, 0.25, 0.21, 0.0];
        config.imu.madgwick_beta = 0.05;

        let text = toml::to_string_pretty(&config).unwrap();
        let back: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.scene_path, config.scene_path);
        assert_eq!(back.hmd.distortion_k, config.hmd.distortion_k);
        assert_eq!(back.imu.madgwick_beta, config.imu.madgwick_beta);
    }
}
