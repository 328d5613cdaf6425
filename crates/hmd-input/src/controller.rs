use glam::Vec3;

/// Polled positional tracker reporting a head-frame displacement in
/// metres: x right, y up, z forward. `Ok(None)` means no reading this
/// frame; deadzone filtering happens at the view compositor.
pub trait PositionalController: Send {
    fn poll(&mut self) -> anyhow::Result<Option<Vec3>>;
}

/// Backend used when no tracker is present.
pub struct NoController;

impl PositionalController for NoController {
    fn poll(&mut self) -> anyhow::Result<Option<Vec3>> {
        Ok(None)
    }
}
