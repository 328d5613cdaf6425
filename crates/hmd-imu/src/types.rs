use glam::{Mat3, Quat, Vec3};

/// Raw inertial reading delivered by a sensor device.
#[derive(Debug, Clone, Copy)]
pub struct RawImuSample {
    /// Gyroscope angular velocity (rad/s).
    pub gyro: Vec3,
    /// Accelerometer linear acceleration (m/s^2).
    pub accel: Vec3,
}

/// Fused head orientation.
#[derive(Debug, Clone, Copy)]
pub struct Orientation {
    /// Drift-corrected unit quaternion.
    pub quaternion: Quat,
}

impl Default for Orientation {
    fn default() -> Self {
        Self {
            quaternion: Quat::IDENTITY,
        }
    }
}

impl Orientation {
    /// Decompose into (yaw, pitch, roll) for the body-frame rotation order
    /// `RotY(yaw) * RotX(pitch) * RotZ(roll)`.
    ///
    /// Extracting angles instead of consuming the quaternion directly lets
    /// additional yaw from mouse/gamepad compose with the sensor yaw.
    pub fn yaw_pitch_roll(&self) -> (f32, f32, f32) {
        let m = Mat3::from_quat(self.quaternion.normalize());

        // m.col(c)[r] is row r of column c.
        let sin_pitch = (-m.z_axis.y).clamp(-1.0, 1.0);
        let pitch = sin_pitch.asin();

        if sin_pitch.abs() > 0.9999 {
            // Gimbal: yaw and roll collapse onto one axis.
            let yaw = (-m.x_axis.z).atan2(m.x_axis.x);
            (yaw, pitch, 0.0)
        } else {
            let yaw = m.z_axis.x.atan2(m.z_axis.z);
            let roll = m.x_axis.y.atan2(m.y_axis.y);
            (yaw, pitch, roll)
        }
    }

    /// This orientation with `reference_yaw` subtracted, so the referenced
    /// heading becomes the new forward. Pitch and roll are untouched.
    pub fn recentered(&self, reference_yaw: f32) -> Orientation {
        Orientation {
            quaternion: Quat::from_rotation_y(-reference_yaw) * self.quaternion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn from_ypr(yaw: f32, pitch: f32, roll: f32) -> Orientation {
        Orientation {
            quaternion: Quat::from_rotation_y(yaw)
                * Quat::from_rotation_x(pitch)
                * Quat::from_rotation_z(roll),
        }
    }

    #[test]
    fn euler_round_trip() {
        let cases = [
            (0.0, 0.0, 0.0),
            (0.7, 0.0, 0.0),
            (0.0, -0.4, 0.0),
            (0.0, 0.0, 0.3),
            (1.2, -0.5, 0.2),
            (-2.0, 0.9, -0.6),
        ];
        for (yaw, pitch, roll) in cases {
            let (y, p, r) = from_ypr(yaw, pitch, roll).yaw_pitch_roll();
            assert!((y - yaw).abs() < 1e-4, "yaw {y} != {yaw}");
            assert!((p - pitch).abs() < 1e-4, "pitch {p} != {pitch}");
            assert!((r - roll).abs() < 1e-4, "roll {r} != {roll}");
        }
    }

    #[test]
    fn recentering_zeroes_yaw_and_keeps_pitch() {
        let o = from_ypr(1.1, -0.35, 0.12);
        let (yaw, _, _) = o.yaw_pitch_roll();
        let (y, p, r) = o.recentered(yaw).yaw_pitch_roll();
        assert!(y.abs() < 1e-4);
        assert!((p + 0.35).abs() < 1e-4);
        assert!((r - 0.12).abs() < 1e-4);
    }

    #[test]
    fn near_vertical_pitch_stays_finite() {
        let o = from_ypr(0.4, FRAC_PI_2 * 0.999, 0.0);
        let (_, p, _) = o.yaw_pitch_roll();
        assert!(p.is_finite());
        assert!((p - FRAC_PI_2 * 0.999).abs() < 1e-2);
    }
}
