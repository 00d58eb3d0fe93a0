//! Input handling for UI.
//!
//! Normalizes mouse and touch into one pointer sample shape the router
//! consumes.

use glam::Vec2;

/// Mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left mouse button.
    Left,
    /// Right mouse button.
    Right,
    /// Middle mouse button (scroll wheel click).
    Middle,
}

/// Identifier of one pointer stream (the mouse, or one finger).
///
/// Touch ids keep the platform's full `u32` range in their own variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PointerId {
    /// The mouse.
    Mouse,
    /// A finger, keyed by the platform's touch id.
    Touch(u32),
}

/// Device a sample came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerSource {
    /// Mouse with the button involved.
    Mouse(MouseButton),
    /// Touch with the platform's touch id.
    Touch(u32),
}

/// What the pointer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    /// Pressed.
    Down,
    /// Released.
    Up,
    /// Moved.
    Move,
    /// Wheel scrolled.
    Scroll,
    /// Platform cancelled the gesture (e.g. touch cancel).
    Cancel,
}

/// A normalized pointer sample in device pixels (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    /// Device position.
    pub position: Vec2,
    /// Pointer stream.
    pub pointer: PointerId,
    /// Originating device.
    pub source: PointerSource,
    /// Wheel delta, only meaningful for [`PointerAction::Scroll`].
    pub wheel_delta: f32,
    /// What happened.
    pub action: PointerAction,
}

impl PointerSample {
    fn mouse(action: PointerAction, x: f32, y: f32, button: MouseButton) -> Self {
        Self {
            position: Vec2::new(x, y),
            pointer: PointerId::Mouse,
            source: PointerSource::Mouse(button),
            wheel_delta: 0.0,
            action,
        }
    }

    /// Left mouse button pressed at `(x, y)`.
    #[must_use]
    pub fn mouse_down(x: f32, y: f32) -> Self {
        Self::mouse(PointerAction::Down, x, y, MouseButton::Left)
    }

    /// Left mouse button released at `(x, y)`.
    #[must_use]
    pub fn mouse_up(x: f32, y: f32) -> Self {
        Self::mouse(PointerAction::Up, x, y, MouseButton::Left)
    }

    /// Mouse moved to `(x, y)`.
    #[must_use]
    pub fn mouse_move(x: f32, y: f32) -> Self {
        Self::mouse(PointerAction::Move, x, y, MouseButton::Left)
    }

    /// Mouse wheel scrolled by `delta` at `(x, y)`.
    #[must_use]
    pub fn mouse_wheel(x: f32, y: f32, delta: f32) -> Self {
        Self {
            wheel_delta: delta,
            ..Self::mouse(PointerAction::Scroll, x, y, MouseButton::Middle)
        }
    }

    /// Touch sample on pointer stream [`PointerId::Touch`].
    #[must_use]
    pub fn touch(action: PointerAction, touch_id: u32, x: f32, y: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            pointer: PointerId::Touch(touch_id),
            source: PointerSource::Touch(touch_id),
            wheel_delta: 0.0,
            action,
        }
    }

    /// Overrides the pointer id.
    #[must_use]
    pub const fn with_pointer(mut self, pointer: PointerId) -> Self {
        self.pointer = pointer;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_ids_never_collide_with_mouse() {
        let touch = PointerSample::touch(PointerAction::Down, 0, 1.0, 2.0);
        assert_ne!(touch.pointer, PointerId::Mouse);
        assert_eq!(touch.source, PointerSource::Touch(0));
    }

    #[test]
    fn test_touch_ids_distinct_at_range_end() {
        let a = PointerSample::touch(PointerAction::Down, u32::MAX - 1, 0.0, 0.0);
        let b = PointerSample::touch(PointerAction::Down, u32::MAX, 0.0, 0.0);
        assert_ne!(a.pointer, b.pointer);
        assert_eq!(b.pointer, PointerId::Touch(u32::MAX));
    }

    #[test]
    fn test_wheel_sample() {
        let wheel = PointerSample::mouse_wheel(5.0, 6.0, -2.0);
        assert_eq!(wheel.action, PointerAction::Scroll);
        assert_eq!(wheel.wheel_delta, -2.0);
        assert_eq!(wheel.pointer, PointerId::Mouse);
    }
}
