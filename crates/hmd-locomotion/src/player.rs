use crate::collision;
use glam::{Vec2, Vec3};
use hmd_scene::Aabb;

/// Walking speed in metres per second.
pub const MOVE_SPEED: f32 = 3.0;
/// Speed multiplier while the fast modifier is held.
pub const FAST_MULTIPLIER: f32 = 5.0;
/// Pitch never quite reaches straight up/down, keeping the view basis stable.
pub const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 * 0.98;

const MOUSE_SENSITIVITY: f32 = 1.0;

/// Body-relative movement direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveDirection {
    Forward,
    Back,
    Left,
    Right,
}

/// Which key group asserted a direction. Each group owns one bit so
/// releasing one group's key never cancels the other group's hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveSource {
    Keyboard,
    Arrows,
}

impl MoveSource {
    fn bit(self) -> u8 {
        match self {
            MoveSource::Keyboard => 1,
            MoveSource::Arrows => 2,
        }
    }
}

/// Body pose and locomotion state. Yaw accumulates from every input;
/// pitch and roll belong to the sensor whenever one is attached.
pub struct Player {
    pub position: Vec3,
    pub eye_height: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    last_sensor_yaw: f32,
    forward: u8,
    back: u8,
    left: u8,
    right: u8,
    gamepad_move: Vec2,
    gamepad_rotate: Vec2,
}

const START_POSITION: Vec3 = Vec3::new(10.0, 1.6, 10.0);

impl Default for Player {
    fn default() -> Self {
        Self {
            position: START_POSITION,
            eye_height: 1.6,
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            last_sensor_yaw: 0.0,
            forward: 0,
            back: 0,
            left: 0,
            right: 0,
            gamepad_move: Vec2::ZERO,
            gamepad_rotate: Vec2::ZERO,
        }
    }
}

impl Player {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return to the start position without touching orientation.
    pub fn reset_position(&mut self) {
        self.position = START_POSITION;
        tracing::info!("player position reset");
    }

    pub fn on_move_key(&mut self, direction: MoveDirection, source: MoveSource, pressed: bool) {
        let flags = match direction {
            MoveDirection::Forward => &mut self.forward,
            MoveDirection::Back => &mut self.back,
            MoveDirection::Left => &mut self.left,
            MoveDirection::Right => &mut self.right,
        };
        if pressed {
            *flags |= source.bit();
        } else {
            *flags &= !source.bit();
        }
    }

    /// Mouse look. Yaw always applies; pitch only without a sensor, since
    /// the sensor owns pitch while attached.
    pub fn on_look_delta(&mut self, dx: f32, dy: f32, sensor_attached: bool) {
        self.yaw -= MOUSE_SENSITIVITY * dx / 360.0;
        if !sensor_attached {
            self.pitch -= MOUSE_SENSITIVITY * dy / 360.0;
            self.pitch = self.pitch.clamp(-MAX_PITCH, MAX_PITCH);
        }
    }

    /// Analog sticks. The move stick is squared (sign preserved) for fine
    /// control near the centre; the rotate stick is linear with a x2 gain.
    pub fn on_gamepad(&mut self, left_x: f32, left_y: f32, right_x: f32, right_y: f32) {
        let square = |v: f32| v * v.abs();
        self.gamepad_move = Vec2::new(square(left_x), square(left_y));
        self.gamepad_rotate = Vec2::new(2.0 * right_x, 2.0 * right_y);
    }

    /// Fold a sensor orientation into the body pose. Yaw is composed as a
    /// delta from the previous sample so turns add to yaw accumulated from
    /// other inputs instead of overwriting it.
    pub fn apply_sensor(&mut self, yaw: f32, pitch: f32, roll: f32) {
        self.yaw += yaw - self.last_sensor_yaw;
        self.last_sensor_yaw = yaw;
        self.pitch = pitch;
        self.roll = roll;
    }

    /// Advance the body pose by `dt` seconds against the scene volumes.
    pub fn tick(
        &mut self,
        dt: f32,
        collision_volumes: &[Aabb],
        ground: &[Aabb],
        fast: bool,
        sensor_attached: bool,
    ) {
        // Stick look: yaw always, pitch only without a sensor.
        self.yaw -= self.gamepad_rotate.x * dt;
        if !sensor_attached {
            self.pitch -= self.gamepad_rotate.y * dt;
            self.pitch = self.pitch.clamp(-MAX_PITCH, MAX_PITCH);
        }

        let mut local = Vec3::ZERO;
        if self.forward != 0 {
            local.z -= 1.0;
        }
        if self.back != 0 {
            local.z += 1.0;
        }
        if self.left != 0 {
            local.x -= 1.0;
        }
        if self.right != 0 {
            local.x += 1.0;
        }
        if local == Vec3::ZERO {
            local = Vec3::new(self.gamepad_move.x, 0.0, -self.gamepad_move.y);
        } else {
            local = local.normalize();
        }

        if local != Vec3::ZERO {
            let speed = MOVE_SPEED * if fast { FAST_MULTIPLIER } else { 1.0 };
            let world = glam::Mat3::from_rotation_y(self.yaw) * local;
            let displacement = Vec3::new(world.x, 0.0, world.z) * speed * dt;
            self.position =
                collision::slide_horizontal(self.position, displacement, collision_volumes);
        }

        self.position = collision::snap_to_ground(self.position, self.eye_height, ground);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_yaw_composes_as_a_delta() {
        let mut player = Player::new();
        player.apply_sensor(0.1, 0.0, 0.0);
        // Mouse turn between sensor samples.
        player.on_look_delta(-36.0, 0.0, true);
        let after_mouse = player.yaw;
        player.apply_sensor(0.3, 0.0, 0.0);
        // Sensor contributes its delta on top of the mouse turn.
        assert!((player.yaw - (after_mouse + 0.2)).abs() < 1e-6);
    }

    #[test]
    fn sensor_owns_pitch_while_attached() {
        let mut player = Player::new();
        player.apply_sensor(0.0, 0.4, 0.0);
        player.on_look_delta(0.0, 500.0, true);
        assert!((player.pitch - 0.4).abs() < 1e-6);

        player.on_look_delta(0.0, 36.0, false);
        assert!(player.pitch < 0.4);
    }

    #[test]
    fn mouse_pitch_clamps_short_of_vertical() {
        let mut player = Player::new();
        player.on_look_delta(0.0, -100_000.0, false);
        assert!((player.pitch - MAX_PITCH).abs() < 1e-6);
        player.on_look_delta(0.0, 200_000.0, false);
        assert!((player.pitch + MAX_PITCH).abs() < 1e-6);
    }

    #[test]
    fn key_groups_combine_with_or() {
        let mut player = Player::new();
        player.on_move_key(MoveDirection::Forward, MoveSource::Keyboard, true);
        player.on_move_key(MoveDirection::Forward, MoveSource::Arrows, true);
        player.on_move_key(MoveDirection::Forward, MoveSource::Keyboard, false);
        // Arrow key still held.
        let before = player.position;
        player.tick(0.1, &[], &[], false, false);
        assert!(player.position != before);

        player.on_move_key(MoveDirection::Forward, MoveSource::Arrows, false);
        let stopped = player.position;
        player.tick(0.1, &[], &[], false, false);
        assert_eq!(player.position, stopped);
    }

    #[test]
    fn diagonal_movement_is_not_faster() {
        let mut player = Player::new();
        player.on_move_key(MoveDirection::Forward, MoveSource::Keyboard, true);
        player.on_move_key(MoveDirection::Right, MoveSource::Keyboard, true);
        let start = player.position;
        player.tick(1.0, &[], &[], false, false);
        let travelled = (player.position - start).length();
        assert!((travelled - MOVE_SPEED).abs() < 1e-4);
    }

    #[test]
    fn fast_modifier_scales_speed() {
        let mut slow = Player::new();
        slow.on_move_key(MoveDirection::Forward, MoveSource::Keyboard, true);
        let start = slow.position;
        slow.tick(0.5, &[], &[], false, false);
        let base = (slow.position - start).length();

        let mut fast = Player::new();
        fast.on_move_key(MoveDirection::Forward, MoveSource::Keyboard, true);
        fast.tick(0.5, &[], &[], true, false);
        let boosted = (fast.position - start).length();
        assert!((boosted - base * FAST_MULTIPLIER).abs() < 1e-4);
    }

    #[test]
    fn gamepad_move_axes_are_squared() {
        let mut player = Player::new();
        player.on_gamepad(0.5, 0.0, 0.0, 0.0);
        let start = player.position;
        player.tick(1.0, &[], &[], false, false);
        let travelled = (player.position - start).length();
        assert!((travelled - MOVE_SPEED * 0.25).abs() < 1e-4);
    }

    #[test]
    fn gamepad_rotate_axes_are_linear_with_double_gain() {
        let mut player = Player::new();
        player.on_gamepad(0.0, 0.0, 0.5, 0.0);
        player.tick(1.0, &[], &[], false, false);
        assert!((player.yaw + 1.0).abs() < 1e-6);
    }
}
