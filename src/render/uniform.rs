use bytemuck::{Pod, Zeroable};
use glam::Vec2;

/// Square color before opacity is applied (straight alpha).
pub const SQUARE_COLOR: [f32; 4] = [0.20, 0.45, 0.85, 1.0];

/// Uniform block for the fade shader. Stride = 48 bytes, matches
/// `FadeParams` in `fade.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FadeUniform {
    pub screen_size: [f32; 2],
    pub center: [f32; 2],
    pub half_size: [f32; 2],
    pub opacity: f32,
    pub _pad: f32,
    pub color: [f32; 4],
}

impl FadeUniform {
    /// Square of side `size` centered on a `screen` sized surface.
    pub fn centered(screen: Vec2, size: f32, opacity: f32) -> Self {
        let screen = screen.max(Vec2::ONE);
        let center = screen * 0.5;
        let half = Vec2::splat(size * 0.5).min(center);

        Self {
            screen_size: screen.into(),
            center: center.into(),
            half_size: half.into(),
            opacity: opacity.clamp(0.0, 1.0),
            _pad: 0.0,
            color: SQUARE_COLOR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_shader() {
        assert_eq!(std::mem::size_of::<FadeUniform>(), 48);
    }

    #[test]
    fn centered_square() {
        let u = FadeUniform::centered(Vec2::new(640.0, 480.0), 160.0, 0.5);
        assert_eq!(u.center, [320.0, 240.0]);
        assert_eq!(u.half_size, [80.0, 80.0]);
        assert_eq!(u.opacity, 0.5);
    }

    #[test]
    fn square_shrinks_to_fit_tiny_window() {
        let u = FadeUniform::centered(Vec2::new(100.0, 60.0), 160.0, 2.0);
        assert_eq!(u.half_size, [50.0, 30.0]);
        assert_eq!(u.opacity, 1.0);
    }
}
