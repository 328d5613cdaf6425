use crate::player::Player;
use glam::{Mat3, Mat4, Vec3};

/// Per-axis magnitude below which a positional-tracker reading is treated
/// as noise and zeroed.
pub const CONTROLLER_DEADZONE: f32 = 0.005;

/// Neck-model offset from the body origin to the eye centre, in the
/// rotated head frame.
#[derive(Clone, Copy, Debug)]
pub struct HeadModelOffset {
    pub vertical: f32,
    pub forward: f32,
}

impl Default for HeadModelOffset {
    fn default() -> Self {
        Self {
            vertical: 0.15,
            forward: 0.09,
        }
    }
}

/// Positional-tracker displacement in the head frame, metres.
#[derive(Clone, Copy, Debug, Default)]
pub struct ControllerOffset {
    pub forward: f32,
    pub right: f32,
    pub up: f32,
}

impl ControllerOffset {
    /// Zero each axis independently when it sits inside the deadzone.
    pub fn deadzone_filtered(forward: f32, right: f32, up: f32) -> Self {
        let pass = |v: f32| if v.abs() < CONTROLLER_DEADZONE { 0.0 } else { v };
        Self {
            forward: pass(forward),
            right: pass(right),
            up: pass(up),
        }
    }
}

/// Compose the centre-eye view matrix from the body pose.
///
/// The neck model pivots the eye around the body origin so looking down
/// moves the eye forward; the vertical component is then removed again so
/// standing height comes from the body position alone.
pub fn compute_view(
    player: &Player,
    head: &HeadModelOffset,
    controller: Option<ControllerOffset>,
) -> Mat4 {
    let rotation = Mat3::from_rotation_y(player.yaw)
        * Mat3::from_rotation_x(player.pitch)
        * Mat3::from_rotation_z(player.roll);

    let up = rotation * Vec3::Y;
    let forward = rotation * Vec3::NEG_Z;

    let mut eye = player.position + rotation * Vec3::new(0.0, head.vertical, -head.forward);
    eye.y -= head.vertical;

    if let Some(offset) = controller {
        let right = rotation * Vec3::X;
        eye += forward * offset.forward + right * offset.right + up * offset.up;
    }

    Mat4::look_at_rh(eye, eye + forward, up)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Mat4, b: Mat4) -> bool {
        a.to_cols_array()
            .iter()
            .zip(b.to_cols_array().iter())
            .all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn level_pose_matches_plain_lookat_shifted_forward() {
        let player = Player::new();
        let head = HeadModelOffset::default();
        let view = compute_view(&player, &head, None);

        // With zero pitch/roll the neck model only pushes the eye forward.
        let eye = player.position + Vec3::new(0.0, 0.0, -head.forward);
        let expected = Mat4::look_at_rh(eye, eye + Vec3::NEG_Z, Vec3::Y);
        assert!(approx(view, expected));
    }

    #[test]
    fn eye_height_is_invariant_under_pitch() {
        let mut player = Player::new();
        let head = HeadModelOffset::default();

        let level = compute_view(&player, &head, None);
        player.pitch = 0.8;
        let pitched = compute_view(&player, &head, None);

        // Recover the eye position from each view matrix; height must match.
        let eye_level = level.inverse().transform_point3(Vec3::ZERO);
        let eye_pitched = pitched.inverse().transform_point3(Vec3::ZERO);
        assert!((eye_level.y - eye_pitched.y).abs() < 1e-4);
        // But the eye did swing forward.
        assert!((eye_level.z - eye_pitched.z).abs() > 1e-3);
    }

    #[test]
    fn view_is_deterministic_for_a_fixed_pose() {
        let mut player = Player::new();
        player.yaw = 1.2;
        player.pitch = -0.3;
        player.roll = 0.05;
        let head = HeadModelOffset::default();
        let a = compute_view(&player, &head, None);
        let b = compute_view(&player, &head, None);
        assert_eq!(a.to_cols_array(), b.to_cols_array());
    }

    #[test]
    fn deadzone_zeroes_each_axis_independently() {
        let o = ControllerOffset::deadzone_filtered(0.001, -0.02, 0.004);
        assert_eq!(o.forward, 0.0);
        assert_eq!(o.right, -0.02);
        assert_eq!(o.up, 0.0);
    }

    #[test]
    fn controller_offset_moves_the_eye_in_the_head_frame() {
        let player = Player::new();
        let head = HeadModelOffset::default();
        let offset = ControllerOffset {
            forward: 0.0,
            right: 0.0,
            up: 0.1,
        };
        let base = compute_view(&player, &head, None);
        let raised = compute_view(&player, &head, Some(offset));
        let eye_base = base.inverse().transform_point3(Vec3::ZERO);
        let eye_raised = raised.inverse().transform_point3(Vec3::ZERO);
        assert!((eye_raised.y - eye_base.y - 0.1).abs() < 1e-4);
    }
}
