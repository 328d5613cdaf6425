use crate::types::{Orientation, RawImuSample};
use ahrs::{Ahrs, Madgwick};
use glam::{Quat, Vec3};
use nalgebra::Vector3;

/// Sensor fusion on top of the Madgwick AHRS filter.
///
/// Raw gyro + accelerometer samples go in; a drift-corrected orientation
/// quaternion comes out. The first samples are spent measuring gyro bias
/// while the device is assumed stationary.
pub struct OrientationFusion {
    filter: Madgwick<f64>,
    gyro_bias: Vec3,
    calibration: CalibrationState,
    /// Yaw treated as "forward"; updated by reset().
    yaw_reference: f32,
}

enum CalibrationState {
    Collecting { samples: Vec<Vec3>, target: usize },
    Calibrated,
}

impl OrientationFusion {
    pub fn new(beta: f32, calibration_samples: u32) -> Self {
        // The filter needs a nominal sample period; IMUs in this class
        // deliver roughly 1kHz.
        let sample_dt = 1.0 / 1000.0;
        Self {
            filter: Madgwick::new(sample_dt, beta as f64),
            gyro_bias: Vec3::ZERO,
            calibration: CalibrationState::Collecting {
                samples: Vec::with_capacity(calibration_samples as usize),
                target: calibration_samples as usize,
            },
            yaw_reference: 0.0,
        }
    }

    /// Feed one raw sample. Returns the updated orientation once the bias
    /// calibration phase is over.
    pub fn update(&mut self, sample: &RawImuSample) -> Option<Orientation> {
        match &mut self.calibration {
            CalibrationState::Collecting { samples, target } => {
                samples.push(sample.gyro);
                if samples.len() >= *target {
                    let sum: Vec3 = samples.iter().copied().sum();
                    self.gyro_bias = sum / samples.len() as f32;
                    self.calibration = CalibrationState::Calibrated;
                    tracing::info!(
                        bias_x = self.gyro_bias.x,
                        bias_y = self.gyro_bias.y,
                        bias_z = self.gyro_bias.z,
                        "gyro bias calibration complete"
                    );
                }
                None
            }
            CalibrationState::Calibrated => {
                let corrected = sample.gyro - self.gyro_bias;
                let gyro = Vector3::new(corrected.x as f64, corrected.y as f64, corrected.z as f64);
                let accel = Vector3::new(
                    sample.accel.x as f64,
                    sample.accel.y as f64,
                    sample.accel.z as f64,
                );

                if self.filter.update_imu(&gyro, &accel).is_err() {
                    return None;
                }
                Some(self.orientation())
            }
        }
    }

    /// Latest fused orientation relative to the yaw reference. Safe to call
    /// at any frequency; reads no mutable state.
    pub fn orientation(&self) -> Orientation {
        self.absolute().recentered(self.yaw_reference)
    }

    /// Recenter: the current heading becomes the new forward. Pitch and
    /// roll calibration are preserved.
    pub fn reset(&mut self) {
        let (yaw, _, _) = self.absolute().yaw_pitch_roll();
        self.yaw_reference = yaw;
        tracing::info!(yaw_reference = yaw, "orientation reset");
    }

    pub fn is_calibrated(&self) -> bool {
        matches!(self.calibration, CalibrationState::Calibrated)
    }

    fn absolute(&self) -> Orientation {
        let q = self.filter.quat;
        Orientation {
            quaternion: Quat::from_xyzw(
                q.coords[0] as f32,
                q.coords[1] as f32,
                q.coords[2] as f32,
                q.coords[3] as f32,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calibration_consumes_leading_samples() {
        let mut fusion = OrientationFusion::new(0.1, 3);
        let still = RawImuSample {
            gyro: Vec3::new(0.01, -0.02, 0.0),
            accel: Vec3::new(0.0, 9.81, 0.0),
        };
        assert!(fusion.update(&still).is_none());
        assert!(fusion.update(&still).is_none());
        assert!(!fusion.is_calibrated());
        // Third sample completes calibration; output starts on the next.
        assert!(fusion.update(&still).is_none());
        assert!(fusion.is_calibrated());
        assert!(fusion.update(&still).is_some());
    }

    #[test]
    fn orientation_read_is_idempotent() {
        let fusion = OrientationFusion::new(0.1, 0);
        let a = fusion.orientation();
        let b = fusion.orientation();
        assert_eq!(a.quaternion, b.quaternion);
    }
}
