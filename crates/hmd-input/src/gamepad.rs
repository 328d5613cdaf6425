/// One gamepad reading, raw axes in [-1, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GamepadState {
    pub left_x: f32,
    pub left_y: f32,
    pub right_x: f32,
    pub right_y: f32,
}

/// Polled gamepad backend. `Ok(None)` means no fresh state this frame.
pub trait GamepadSource: Send {
    fn poll(&mut self) -> anyhow::Result<Option<GamepadState>>;
}

/// Backend used when no gamepad is present.
pub struct NoGamepad;

impl GamepadSource for NoGamepad {
    fn poll(&mut self) -> anyhow::Result<Option<GamepadState>> {
        Ok(None)
    }
}
