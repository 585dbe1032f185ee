//! Field emitters.
//!
//! The registry holds every point that contributes potential to the field, in
//! field-space pixels. Static grid points come first, in construction order,
//! followed by a single pointer-driven point that always occupies the last
//! slot. The sequence is never empty.

use glam::{IVec2, Vec2};

use crate::mapping::{remap_point, Rect};

/// An emitter position in field space.
///
/// Uploaded to the kernel as `vec2<i32>`.
pub type SourcePoint = IVec2;

/// Spacing of the static grid, in field pixels.
pub const DEFAULT_GRID_STRIDE: u32 = 100;

/// Ordered set of field emitters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRegistry {
    points: Vec<SourcePoint>,
}

impl SourceRegistry {
    /// A registry holding only the pointer slot.
    pub fn new() -> Self {
        Self {
            points: vec![SourcePoint::ZERO],
        }
    }

    /// Rebuild the static grid and reset the pointer.
    ///
    /// One point is placed at every multiple of `stride` in `[0, width]` ×
    /// `[0, height]`, iterating x in the outer loop and y in the inner loop.
    /// A default pointer point is appended last.
    ///
    /// # Panics
    ///
    /// Panics if `stride` is zero.
    pub fn initialize_grid(&mut self, width: u32, height: u32, stride: u32) {
        assert!(stride > 0, "grid stride must be positive");

        self.points.clear();
        for i in (0..=width).step_by(stride as usize) {
            for j in (0..=height).step_by(stride as usize) {
                self.points.push(SourcePoint::new(i as i32, j as i32));
            }
        }
        self.points.push(SourcePoint::ZERO);

        tracing::debug!(
            grid = self.points.len() - 1,
            width,
            height,
            stride,
            "source grid initialized"
        );
    }

    /// Move the pointer source to follow a window-space position.
    pub fn update_pointer(&mut self, window_pos: Vec2, window_rect: Rect, field_rect: Rect) {
        let mapped = remap_point(window_pos, window_rect, field_rect);
        if let Some(last) = self.points.last_mut() {
            *last = mapped.round().as_ivec2();
        }
    }

    /// Copy of the full sequence, grid first, pointer last.
    pub fn snapshot(&self) -> Vec<SourcePoint> {
        self.points.clone()
    }

    pub fn points(&self) -> &[SourcePoint] {
        &self.points
    }

    /// The static grid points, without the pointer.
    pub fn grid(&self) -> &[SourcePoint] {
        self.points
            .split_last()
            .map(|(_, grid)| grid)
            .unwrap_or_default()
    }

    /// The pointer-driven source.
    pub fn pointer(&self) -> SourcePoint {
        self.points.last().copied().unwrap_or_default()
    }

    /// Number of sources, pointer included.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; the pointer slot is always present.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
