/// Radial lens-distortion parameters for one render frame.
///
/// The warp function is the fourth-order even polynomial
/// `f(r) = r * (k0 + k1*r^2 + k2*r^4 + k3*r^6)`, evaluated in
/// lens-centered viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistortionParams {
    pub k: [f32; 4],
    /// Horizontal offset of the lens center from the per-eye viewport
    /// center, in viewport units. Negated for the right eye.
    pub x_center_offset: f32,
    /// Scale that keeps the warped image inside the physical display.
    pub scale: f32,
}

impl DistortionParams {
    /// Evaluate the distortion polynomial at radius `r`.
    pub fn distortion_fn(&self, r: f32) -> f32 {
        let [k0, k1, k2, k3] = self.k;
        let r_sq = r * r;
        r * (k0 + k1 * r_sq + k2 * r_sq * r_sq + k3 * r_sq * r_sq * r_sq)
    }

    /// Parameters for the opposite eye: the lens center mirrors around the
    /// viewport center.
    pub fn mirrored(&self) -> Self {
        Self {
            x_center_offset: -self.x_center_offset,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(k: [f32; 4]) -> DistortionParams {
        DistortionParams {
            k,
            x_center_offset: 0.0,
            scale: 1.0,
        }
    }

    #[test]
    fn identity_coefficients_leave_radius_unchanged() {
        let d = params([1.0, 0.0, 0.0, 0.0]);
        assert!((d.distortion_fn(0.5) - 0.5).abs() < 1e-6);
        assert!((d.distortion_fn(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn higher_coefficients_expand_the_edge() {
        let d = params([1.0, 0.22, 0.24, 0.0]);
        // At r=1 the polynomial sums the coefficients directly.
        assert!((d.distortion_fn(1.0) - 1.46).abs() < 1e-5);
        // Distortion grows with radius.
        assert!(d.distortion_fn(0.8) / 0.8 < d.distortion_fn(1.0) / 1.0);
    }

    #[test]
    fn mirrored_negates_only_the_center_offset() {
        let d = DistortionParams {
            k: [1.0, 0.2, 0.1, 0.0],
            x_center_offset: 0.15,
            scale: 1.3,
        };
        let m = d.mirrored();
        assert_eq!(m.x_center_offset, -0.15);
        assert_eq!(m.k, d.k);
        assert_eq!(m.scale, d.scale);
    }
}
