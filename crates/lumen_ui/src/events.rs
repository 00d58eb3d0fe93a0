//! Events emitted by layout nodes and the observer lists that receive them.
//!
//! Each layout node owns its own [`Listeners`]. There is no global bus:
//! dropping the node drops its listeners.

use glam::Vec2;
use lumen_scene::NodeId;

use crate::input::PointerId;

/// Kind of a routed pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerEventKind {
    /// Button or finger pressed on the node.
    Down,
    /// Button or finger released; delivered to the captured receiver.
    Up,
    /// Press and release completed a gesture on the node.
    Click,
    /// Pointer moved over the node (or while it holds capture).
    Move,
    /// Pointer started hovering the node.
    Enter,
    /// Pointer stopped hovering the node.
    Leave,
    /// Wheel scrolled over the node.
    Scroll,
}

/// A pointer event delivered to one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// What happened.
    pub kind: PointerEventKind,
    /// Receiving node.
    pub target: NodeId,
    /// Pointer that caused it.
    pub pointer: PointerId,
    /// Point in the target's local space (bottom-left origin).
    pub point: Vec2,
    /// Wheel amount for [`PointerEventKind::Scroll`], otherwise `0`.
    pub scroll: f32,
    /// True for releases synthesized by a forced cancellation.
    pub forced: bool,
}

impl PointerEvent {
    pub(crate) const fn new(kind: PointerEventKind, target: NodeId, pointer: PointerId, point: Vec2) -> Self {
        Self {
            kind,
            target,
            pointer,
            point,
            scroll: 0.0,
            forced: false,
        }
    }
}

/// Fired after a recompute changed a node's size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeEvent {
    /// Resized node.
    pub node: NodeId,
    /// New width.
    pub width: f32,
    /// New height.
    pub height: f32,
}

/// Handle returned by [`Listeners::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered observer list owned by the emitting object.
pub struct Listeners<E> {
    entries: Vec<(ListenerId, Box<dyn FnMut(&E)>)>,
    next_id: u64,
}

impl<E> Listeners<E> {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// Registers a handler. Handlers run in subscription order.
    pub fn subscribe(&mut self, handler: impl FnMut(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(handler)));
        id
    }

    /// Removes a handler. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    /// Invokes every handler with `event`.
    pub fn emit(&mut self, event: &E) {
        for (_, handler) in &mut self.entries {
            handler(event);
        }
    }
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners").field("len", &self.entries.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn test_subscribe_emit_unsubscribe() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut listeners: Listeners<u32> = Listeners::new();

        let sink = Rc::clone(&seen);
        let first = listeners.subscribe(move |v| sink.borrow_mut().push(*v));
        let sink = Rc::clone(&seen);
        listeners.subscribe(move |v| sink.borrow_mut().push(*v * 10));

        listeners.emit(&3);
        assert_eq!(*seen.borrow(), vec![3, 30]);

        assert!(listeners.unsubscribe(first));
        assert!(!listeners.unsubscribe(first));
        listeners.emit(&4);
        assert_eq!(*seen.borrow(), vec![3, 30, 40]);
    }
}
