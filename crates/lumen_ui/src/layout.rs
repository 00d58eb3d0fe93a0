//! Layout value types: anchors, corners, pivots and the resolved rect.
//!
//! Every constructor clamps. Invalid input never reaches the compositor.

use glam::{Vec2, Vec4};

/// Resolved rectangle of an element in its parent's space.
///
/// Stored as edges, bottom-left origin: `[left, bottom, right, top]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ElementRect {
    /// Left edge.
    pub left: f32,
    /// Bottom edge.
    pub bottom: f32,
    /// Right edge (never less than `left`).
    pub right: f32,
    /// Top edge (never less than `bottom`).
    pub top: f32,
}

impl ElementRect {
    /// A zero-sized rect at the origin.
    pub const ZERO: Self = Self {
        left: 0.0,
        bottom: 0.0,
        right: 0.0,
        top: 0.0,
    };

    /// Resolves a rect from the parent's size, anchors and corner offsets.
    ///
    /// Pure multiply-add, no division: a zero-size parent yields a finite
    /// rect. Inverted edges collapse to zero extent.
    #[must_use]
    pub fn resolve(parent_size: Vec2, anchor: Anchor, corners: Corners) -> Self {
        let left = parent_size.x * anchor.left + corners.left;
        let bottom = parent_size.y * anchor.bottom + corners.bottom;
        let right = parent_size.x * anchor.right + corners.right;
        let top = parent_size.y * anchor.top + corners.top;

        Self {
            left,
            bottom,
            right: right.max(left),
            top: top.max(bottom),
        }
    }

    /// Returns `right - left`.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Returns `top - bottom`.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    /// Returns the size as a vector.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width(), self.height())
    }

    /// Returns the bottom-left corner.
    #[must_use]
    pub const fn origin(&self) -> Vec2 {
        Vec2::new(self.left, self.bottom)
    }
}

/// Anchor fractions of the parent box: `[left, bottom, right, top]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    /// Left anchor line as a fraction of parent width.
    pub left: f32,
    /// Bottom anchor line as a fraction of parent height.
    pub bottom: f32,
    /// Right anchor line as a fraction of parent width.
    pub right: f32,
    /// Top anchor line as a fraction of parent height.
    pub top: f32,
}

impl Anchor {
    /// Stretch over the whole parent.
    pub const FILL: Self = Self {
        left: 0.0,
        bottom: 0.0,
        right: 1.0,
        top: 1.0,
    };

    /// Pinned to the parent's center.
    pub const CENTER: Self = Self {
        left: 0.5,
        bottom: 0.5,
        right: 0.5,
        top: 0.5,
    };

    /// Pinned to the parent's bottom-left corner.
    pub const BOTTOM_LEFT: Self = Self {
        left: 0.0,
        bottom: 0.0,
        right: 0.0,
        top: 0.0,
    };

    /// Creates anchors, clamping to `[0, 1]` and ordering each axis.
    #[must_use]
    pub fn new(left: f32, bottom: f32, right: f32, top: f32) -> Self {
        let clamped = Self {
            left: clamp_unit(left),
            bottom: clamp_unit(bottom),
            right: clamp_unit(right),
            top: clamp_unit(top),
        };
        let anchor = Self {
            right: clamped.right.max(clamped.left),
            top: clamped.top.max(clamped.bottom),
            ..clamped
        };
        if anchor != (Self { left, bottom, right, top }) {
            tracing::warn!(
                "anchor ({left}, {bottom}, {right}, {top}) clamped to ({}, {}, {}, {})",
                anchor.left,
                anchor.bottom,
                anchor.right,
                anchor.top
            );
        }
        anchor
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Self::BOTTOM_LEFT
    }
}

impl From<[f32; 4]> for Anchor {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Vec4> for Anchor {
    fn from(v: Vec4) -> Self {
        Self::new(v.x, v.y, v.z, v.w)
    }
}

/// Fixed unit offsets of each edge from its anchor line.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Corners {
    /// Offset of the left edge from the left anchor.
    pub left: f32,
    /// Offset of the bottom edge from the bottom anchor.
    pub bottom: f32,
    /// Offset of the right edge from the right anchor.
    pub right: f32,
    /// Offset of the top edge from the top anchor.
    pub top: f32,
}

impl Corners {
    /// No offsets.
    pub const ZERO: Self = Self {
        left: 0.0,
        bottom: 0.0,
        right: 0.0,
        top: 0.0,
    };

    /// Creates corner offsets. Non-finite values become `0`.
    #[must_use]
    pub fn new(left: f32, bottom: f32, right: f32, top: f32) -> Self {
        Self {
            left: finite_or_zero(left),
            bottom: finite_or_zero(bottom),
            right: finite_or_zero(right),
            top: finite_or_zero(top),
        }
    }

    /// Inset on every side, e.g. padding inside a stretched anchor.
    #[must_use]
    pub fn inset(amount: f32) -> Self {
        Self::new(amount, amount, -amount, -amount)
    }

    /// A `width x height` box centered on a point anchor.
    #[must_use]
    pub fn centered(width: f32, height: f32) -> Self {
        Self::new(-width * 0.5, -height * 0.5, width * 0.5, height * 0.5)
    }
}

impl From<[f32; 4]> for Corners {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Vec4> for Corners {
    fn from(v: Vec4) -> Self {
        Self::new(v.x, v.y, v.z, v.w)
    }
}

/// Point inside the element, as fractions of its size, that local
/// rotation and scale pivot around.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pivot {
    /// Fraction of width.
    pub x: f32,
    /// Fraction of height.
    pub y: f32,
}

impl Pivot {
    /// Element center.
    pub const CENTER: Self = Self { x: 0.5, y: 0.5 };

    /// Bottom-left corner.
    pub const BOTTOM_LEFT: Self = Self { x: 0.0, y: 0.0 };

    /// Creates a pivot, clamping to `[0, 1]`.
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        let pivot = Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
        };
        if pivot != (Self { x, y }) {
            tracing::warn!("pivot ({x}, {y}) clamped to ({}, {})", pivot.x, pivot.y);
        }
        pivot
    }

    /// Returns the pivot as a vector.
    #[must_use]
    pub const fn as_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl Default for Pivot {
    fn default() -> Self {
        Self::CENTER
    }
}

impl From<[f32; 2]> for Pivot {
    fn from(v: [f32; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl From<Vec2> for Pivot {
    fn from(v: Vec2) -> Self {
        Self::new(v.x, v.y)
    }
}

/// Clamps to `[0, 1]`; NaN becomes `0`.
fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        tracing::warn!("non-finite corner offset {v} replaced with 0");
        0.0
    }
}
