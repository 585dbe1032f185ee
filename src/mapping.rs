//! Linear remapping between coordinate spaces.
//!
//! Two spaces meet here: the window, whose origin is the top-left corner,
//! and the field, whose origin is the bottom-left corner. [`remap_point`]
//! reconciles them by flipping the vertical axis. [`remap_scalar`] is also
//! used to turn integer control values into field parameters.

use glam::Vec2;

/// Axis-aligned rectangle with exclusive right and bottom edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    /// Rectangle at `(x, y)` with the given size.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            left: x,
            top: y,
            right: x + width,
            bottom: y + height,
        }
    }

    /// Rectangle anchored at the origin.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// Map `x` from `[src_lo, src_hi]` onto `[dst_lo, dst_hi]`.
///
/// Values outside the source range extrapolate linearly. The source range
/// must not be empty; no check is made.
#[inline]
pub fn remap_scalar(x: f32, src_lo: f32, src_hi: f32, dst_lo: f32, dst_hi: f32) -> f32 {
    dst_lo + (x - src_lo) * (dst_hi - dst_lo) / (src_hi - src_lo)
}

/// Map a point from `src` onto `dst`, flipping the vertical axis.
///
/// The bottom edge of `src` lands on the top edge of `dst` and vice versa.
pub fn remap_point(point: Vec2, src: Rect, dst: Rect) -> Vec2 {
    Vec2::new(
        remap_scalar(point.x, src.left, src.right, dst.left, dst.right),
        remap_scalar(point.y, src.bottom, src.top, dst.top, dst.bottom),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_remap_scalar_charge_range() {
        assert_eq!(remap_scalar(0.0, 0.0, 100.0, 1.0, 100.0), 1.0);
        assert_eq!(remap_scalar(100.0, 0.0, 100.0, 1.0, 100.0), 100.0);

        let mut previous = f32::MIN;
        for c in 0..=100 {
            let charge = remap_scalar(c as f32, 0.0, 100.0, 1.0, 100.0);
            assert!(charge >= previous, "charge decreased at control {}", c);
            previous = charge;
        }
    }

    #[test]
    fn test_remap_scalar_limit_range() {
        assert_relative_eq!(remap_scalar(0.0, 0.0, 100.0, 0.001, 0.5), 0.001);
        assert_relative_eq!(remap_scalar(100.0, 0.0, 100.0, 0.001, 0.5), 0.5);

        let mut previous = f32::MIN;
        for c in 0..=100 {
            let limit = remap_scalar(c as f32, 0.0, 100.0, 0.001, 0.5);
            assert!(limit >= previous);
            previous = limit;
        }
    }

    #[test]
    fn test_remap_scalar_extrapolates() {
        assert_eq!(remap_scalar(200.0, 0.0, 100.0, 0.0, 10.0), 20.0);
        assert_eq!(remap_scalar(-50.0, 0.0, 100.0, 0.0, 10.0), -5.0);
    }

    #[test]
    fn test_remap_point_flips_vertical() {
        let rect = Rect::from_size(800, 600);

        assert_eq!(remap_point(Vec2::ZERO, rect, rect), Vec2::new(0.0, 600.0));
        assert_eq!(remap_point(Vec2::new(800.0, 600.0), rect, rect), Vec2::new(800.0, 0.0));
        assert_eq!(remap_point(Vec2::new(400.0, 300.0), rect, rect), Vec2::new(400.0, 300.0));
    }

    #[test]
    fn test_remap_point_scales() {
        let window = Rect::from_size(1600, 1200);
        let field = Rect::from_size(800, 600);

        let p = remap_point(Vec2::new(400.0, 300.0), window, field);
        assert_relative_eq!(p.x, 200.0);
        assert_relative_eq!(p.y, 450.0);
    }

    #[test]
    fn test_remap_point_round_trip() {
        let a = Rect::new(10.0, 20.0, 640.0, 480.0);
        let b = Rect::new(-5.0, 0.0, 800.0, 600.0);

        for &(x, y) in &[(0.0, 0.0), (10.0, 20.0), (333.3, 101.7), (650.0, 500.0), (-40.0, 900.0)] {
            let p = Vec2::new(x, y);
            let back = remap_point(remap_point(p, a, b), b, a);
            assert_relative_eq!(back.x, p.x, epsilon = 1e-3);
            assert_relative_eq!(back.y, p.y, epsilon = 1e-3);
        }
    }
}
