use hmd_locomotion::player::FAST_MULTIPLIER;
use hmd_locomotion::Player;
use hmd_stereo::StereoViewConfig;

/// View parameter a held key adjusts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdjustTarget {
    EyeToScreenDistance,
    AspectMultiplier,
    Ipd,
    EyeHeight,
    DistortionK(usize),
}

impl AdjustTarget {
    /// Change per second while the key is held, unmodified.
    pub fn rate(self) -> f32 {
        match self {
            AdjustTarget::EyeToScreenDistance => 0.01,
            AdjustTarget::AspectMultiplier => 0.01,
            AdjustTarget::Ipd => 0.0025,
            AdjustTarget::EyeHeight => 0.5,
            AdjustTarget::DistortionK(_) => 0.03,
        }
    }
}

/// A target together with the direction a particular key drives it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdjustBinding {
    pub target: AdjustTarget,
    pub direction: f32,
}

impl AdjustBinding {
    pub fn up(target: AdjustTarget) -> Self {
        Self {
            target,
            direction: 1.0,
        }
    }

    pub fn down(target: AdjustTarget) -> Self {
        Self {
            target,
            direction: -1.0,
        }
    }
}

/// Holds at most one active adjustment. A new press replaces the current
/// one; releasing a key only clears the binding it asserted, so releasing
/// a stale key never cancels a newer hold.
#[derive(Default)]
pub struct AdjustmentRouter {
    active: Option<AdjustBinding>,
    fast: bool,
}

impl AdjustmentRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, binding: AdjustBinding) {
        self.active = Some(binding);
    }

    pub fn release(&mut self, binding: AdjustBinding) {
        if self.active == Some(binding) {
            self.active = None;
        }
    }

    pub fn set_fast(&mut self, fast: bool) {
        self.fast = fast;
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Apply the active adjustment for a `dt`-second slice. Returns the
    /// status line to show, or `None` when nothing is held.
    pub fn tick(
        &mut self,
        dt: f32,
        config: &mut StereoViewConfig,
        player: &mut Player,
    ) -> Option<String> {
        let binding = self.active?;
        let multiplier = if self.fast { FAST_MULTIPLIER } else { 1.0 };
        let amount = binding.target.rate() * dt * binding.direction * multiplier;
        tracing::trace!(target = ?binding.target, amount, "adjustment applied");
        Some(apply_adjustment(binding.target, amount, config, player))
    }
}

/// Apply a signed delta to one view parameter and describe the result.
pub fn apply_adjustment(
    target: AdjustTarget,
    amount: f32,
    config: &mut StereoViewConfig,
    player: &mut Player,
) -> String {
    match target {
        AdjustTarget::EyeToScreenDistance => {
            config.set_eye_to_screen_distance(config.eye_to_screen_distance() + amount);
            format!(
                "Eye distance {:.1} mm, FOV {:.1} deg",
                config.eye_to_screen_distance() * 1000.0,
                config.y_fov_degrees()
            )
        }
        AdjustTarget::AspectMultiplier => {
            config.set_aspect_multiplier(config.aspect_multiplier() + amount);
            format!("Aspect multiplier {:.3}", config.aspect_multiplier())
        }
        AdjustTarget::Ipd => {
            config.set_ipd(config.ipd() + amount);
            format!("IPD {:.1} mm", config.ipd() * 1000.0)
        }
        AdjustTarget::EyeHeight => {
            player.eye_height += amount;
            player.position.y = player.eye_height.max(0.0);
            format!("Eye height {:.2} m", player.eye_height)
        }
        AdjustTarget::DistortionK(index) => {
            config.set_distortion_k(index, config.distortion_k(index) + amount);
            format!("K{} {:.4}", index, config.distortion_k(index))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmd_stereo::{HmdSpec, Viewport};

    fn config() -> StereoViewConfig {
        StereoViewConfig::new(HmdSpec::default(), Viewport::new(0, 0, 1280, 800))
    }

    #[test]
    fn one_second_hold_moves_esd_by_exactly_one_rate() {
        let mut cfg = config();
        let mut player = Player::new();
        let mut router = AdjustmentRouter::new();
        let before = cfg.eye_to_screen_distance();

        router.press(AdjustBinding::up(AdjustTarget::EyeToScreenDistance));
        let message = router.tick(1.0, &mut cfg, &mut player);
        assert!(message.is_some());
        assert!((cfg.eye_to_screen_distance() - (before + 0.01)).abs() < 1e-7);
    }

    #[test]
    fn fast_modifier_multiplies_the_rate() {
        let mut cfg = config();
        let mut player = Player::new();
        let mut router = AdjustmentRouter::new();
        let before = cfg.ipd();

        router.press(AdjustBinding::down(AdjustTarget::Ipd));
        router.set_fast(true);
        router.tick(1.0, &mut cfg, &mut player);
        assert!((cfg.ipd() - (before - 0.0025 * FAST_MULTIPLIER)).abs() < 1e-7);
    }

    #[test]
    fn newest_press_wins_and_stale_release_is_ignored() {
        let mut cfg = config();
        let mut player = Player::new();
        let mut router = AdjustmentRouter::new();

        let esd = AdjustBinding::up(AdjustTarget::EyeToScreenDistance);
        let ipd = AdjustBinding::up(AdjustTarget::Ipd);
        router.press(esd);
        router.press(ipd);
        // Releasing the replaced key must not cancel the newer hold.
        router.release(esd);
        assert!(router.is_active());

        let before_ipd = cfg.ipd();
        let before_esd = cfg.eye_to_screen_distance();
        router.tick(1.0, &mut cfg, &mut player);
        assert!((cfg.ipd() - (before_ipd + 0.0025)).abs() < 1e-7);
        assert_eq!(cfg.eye_to_screen_distance(), before_esd);

        router.release(ipd);
        assert!(!router.is_active());
        assert!(router.tick(1.0, &mut cfg, &mut player).is_none());
    }

    #[test]
    fn eye_height_adjusts_the_player_not_the_view_config() {
        let mut cfg = config();
        let mut player = Player::new();
        let before = player.eye_height;
        apply_adjustment(AdjustTarget::EyeHeight, 0.25, &mut cfg, &mut player);
        assert!((player.eye_height - (before + 0.25)).abs() < 1e-6);
        assert!((player.position.y - player.eye_height).abs() < 1e-6);
    }

    #[test]
    fn distortion_k_adjustment_recomputes_the_scale() {
        let mut cfg = config();
        let mut player = Player::new();
        let before = cfg.distortion_scale();
        apply_adjustment(AdjustTarget::DistortionK(1), 0.1, &mut cfg, &mut player);
        assert!(cfg.distortion_scale() != before);
    }
}
