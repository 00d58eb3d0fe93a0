//! Layout node: per-element anchor state plus the transforms the
//! compositor caches for it.
//!
//! ```text
//!   parent frame ──anchor──► rect origin ──toPivot──► pivot
//!                                                      │ local TRS
//!   model = screenToParent · toPivot · local · fromPivot
//!   world = screenToWorld · model
//! ```

use glam::{Mat4, Vec2, Vec3};
use lumen_scene::NodeId;

use crate::events::{Listeners, PointerEvent, ResizeEvent};
use crate::layout::{Anchor, Corners, ElementRect, Pivot};
use crate::screen::ScreenId;

/// Dirty bits of a layout node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutFlags(u8);

impl LayoutFlags {
    /// Anchor fractions changed, or the parent's size did.
    pub const ANCHOR_DIRTY: u8 = 1 << 0;
    /// Corner offsets changed.
    pub const CORNER_DIRTY: u8 = 1 << 1;
    /// Transform inputs other than the rect changed.
    pub const WORLD_DIRTY: u8 = 1 << 2;

    /// Flags of a freshly attached node: everything stale.
    pub const ALL_DIRTY: Self = Self(Self::ANCHOR_DIRTY | Self::CORNER_DIRTY | Self::WORLD_DIRTY);

    /// Returns true if the flag is set.
    #[inline]
    #[must_use]
    pub const fn has(self, flag: u8) -> bool {
        (self.0 & flag) != 0
    }

    /// Sets a flag.
    #[inline]
    pub fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }

    /// Clears every flag.
    #[inline]
    pub fn clear_all(&mut self) {
        self.0 = 0;
    }

    /// Returns true if any flag is set.
    #[inline]
    #[must_use]
    pub const fn any(self) -> bool {
        self.0 != 0
    }
}

/// Layout state attached to one scene node.
#[derive(Debug)]
pub struct LayoutNode {
    node: NodeId,
    pub(crate) screen: Option<ScreenId>,
    anchor: Anchor,
    corners: Corners,
    pivot: Pivot,
    rect: ElementRect,
    blocks_pointer: bool,
    mirrored: bool,
    anchor_transform: Mat4,
    to_pivot: Mat4,
    from_pivot: Mat4,
    local_model_transform: Mat4,
    screen_to_parent: Mat4,
    screen_to_world: Mat4,
    /// Anchor frame to world: `screenToWorld · screenToParent`.
    anchor_world_transform: Mat4,
    model_transform: Mat4,
    world_transform: Mat4,
    inverse_pivot_world_transform: Mat4,
    pub(crate) flags: LayoutFlags,
    pub(crate) draw_order: u32,
    pub(crate) resize_listeners: Listeners<ResizeEvent>,
    pub(crate) pointer_listeners: Listeners<PointerEvent>,
}

/// Inputs the compositor gathers for one recompute.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ComposeInputs {
    /// Size the anchors resolve against.
    pub parent_size: Vec2,
    /// Parent's model transform when the parent carries layout.
    pub parent_model: Option<Mat4>,
    /// Node's local TRS matrix.
    pub local: Mat4,
    /// Node's local scale, for the mirror check.
    pub local_scale: Vec3,
    /// Screen (or plain parent) transform prepended to the model.
    pub screen_to_world: Mat4,
}

impl LayoutNode {
    pub(crate) fn new(node: NodeId, screen: Option<ScreenId>) -> Self {
        Self {
            node,
            screen,
            anchor: Anchor::default(),
            corners: Corners::ZERO,
            pivot: Pivot::default(),
            rect: ElementRect::ZERO,
            blocks_pointer: true,
            mirrored: false,
            anchor_transform: Mat4::IDENTITY,
            to_pivot: Mat4::IDENTITY,
            from_pivot: Mat4::IDENTITY,
            local_model_transform: Mat4::IDENTITY,
            screen_to_parent: Mat4::IDENTITY,
            screen_to_world: Mat4::IDENTITY,
            anchor_world_transform: Mat4::IDENTITY,
            model_transform: Mat4::IDENTITY,
            world_transform: Mat4::IDENTITY,
            inverse_pivot_world_transform: Mat4::IDENTITY,
            flags: LayoutFlags::ALL_DIRTY,
            draw_order: 0,
            resize_listeners: Listeners::new(),
            pointer_listeners: Listeners::new(),
        }
    }

    /// Owning scene node.
    #[must_use]
    pub const fn node(&self) -> NodeId {
        self.node
    }

    /// Screen this node resolves against, if any.
    #[must_use]
    pub const fn screen(&self) -> Option<ScreenId> {
        self.screen
    }

    /// Anchor fractions.
    #[must_use]
    pub const fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub(crate) fn set_anchor(&mut self, anchor: Anchor) {
        if self.anchor != anchor {
            self.anchor = anchor;
            self.flags.set(LayoutFlags::ANCHOR_DIRTY);
        }
    }

    /// Corner offsets.
    #[must_use]
    pub const fn corners(&self) -> Corners {
        self.corners
    }

    pub(crate) fn set_corners(&mut self, corners: Corners) {
        if self.corners != corners {
            self.corners = corners;
            self.flags.set(LayoutFlags::CORNER_DIRTY);
        }
    }

    pub(crate) fn set_left(&mut self, left: f32) {
        let c = self.corners;
        self.set_corners(Corners::new(left, c.bottom, c.right, c.top));
    }

    pub(crate) fn set_bottom(&mut self, bottom: f32) {
        let c = self.corners;
        self.set_corners(Corners::new(c.left, bottom, c.right, c.top));
    }

    pub(crate) fn set_right(&mut self, right: f32) {
        let c = self.corners;
        self.set_corners(Corners::new(c.left, c.bottom, right, c.top));
    }

    pub(crate) fn set_top(&mut self, top: f32) {
        let c = self.corners;
        self.set_corners(Corners::new(c.left, c.bottom, c.right, top));
    }

    /// Pivot fractions.
    #[must_use]
    pub const fn pivot(&self) -> Pivot {
        self.pivot
    }

    pub(crate) fn set_pivot(&mut self, pivot: Pivot) {
        if self.pivot != pivot {
            self.pivot = pivot;
            self.flags.set(LayoutFlags::WORLD_DIRTY);
        }
    }

    /// True if the node can stop a pointer ray.
    #[must_use]
    pub const fn blocks_pointer(&self) -> bool {
        self.blocks_pointer
    }

    pub(crate) fn set_blocks_pointer(&mut self, blocks: bool) {
        self.blocks_pointer = blocks;
    }

    /// Resolved rect in the parent's frame.
    #[must_use]
    pub const fn rect(&self) -> ElementRect {
        self.rect
    }

    /// Resolved width.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.rect.width()
    }

    /// Resolved height.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.rect.height()
    }

    /// Resolved size.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.rect.size()
    }

    /// Translation to the rect's bottom-left corner.
    #[must_use]
    pub const fn anchor_transform(&self) -> Mat4 {
        self.anchor_transform
    }

    /// Translation from the rect origin to the pivot point.
    #[must_use]
    pub const fn to_pivot(&self) -> Mat4 {
        self.to_pivot
    }

    /// Inverse of [`Self::to_pivot`].
    #[must_use]
    pub const fn from_pivot(&self) -> Mat4 {
        self.from_pivot
    }

    /// Parent frame to local frame.
    #[must_use]
    pub const fn local_model_transform(&self) -> Mat4 {
        self.local_model_transform
    }

    /// Layout root frame to this node's anchor frame.
    #[must_use]
    pub const fn screen_to_parent(&self) -> Mat4 {
        self.screen_to_parent
    }

    /// Layout root frame to the screen's render space.
    #[must_use]
    pub const fn screen_to_world(&self) -> Mat4 {
        self.screen_to_world
    }

    /// Layout root frame to local frame.
    #[must_use]
    pub const fn model_transform(&self) -> Mat4 {
        self.model_transform
    }

    /// Local frame to the screen's render space.
    #[must_use]
    pub const fn world_transform(&self) -> Mat4 {
        self.world_transform
    }

    /// Render space back to the local frame, used for ray inversion.
    #[must_use]
    pub const fn inverse_pivot_world_transform(&self) -> Mat4 {
        self.inverse_pivot_world_transform
    }

    /// Render-order index assigned by the last draw-order sync.
    #[must_use]
    pub const fn draw_order(&self) -> u32 {
        self.draw_order
    }

    /// Current dirty bits.
    #[must_use]
    pub const fn flags(&self) -> LayoutFlags {
        self.flags
    }

    /// True for zero-size or mirrored nodes, which never stop a ray.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0 || self.mirrored
    }

    /// World position of the local position moved by `(dx, dy)`.
    #[must_use]
    pub fn offset_position(&self, local_position: Vec3, dx: f32, dy: f32) -> Vec3 {
        let p = local_position + Vec3::new(dx, dy, 0.0);
        self.anchor_world_transform.transform_point3(p)
    }

    /// Local position that puts the node's origin at `world`.
    ///
    /// Returns `None` if the anchor frame is singular.
    #[must_use]
    pub fn world_to_local_position(&self, world: Vec3) -> Option<Vec3> {
        let p = self.anchor_world_transform.inverse().transform_point3(world);
        p.is_finite().then_some(p)
    }

    /// Recomputes rect and transforms. Returns a resize event if the size
    /// changed.
    pub(crate) fn recompute(&mut self, inputs: &ComposeInputs) -> Option<ResizeEvent> {
        let old_size = self.rect.size();

        if self.flags.has(LayoutFlags::ANCHOR_DIRTY | LayoutFlags::CORNER_DIRTY) {
            self.rect = ElementRect::resolve(inputs.parent_size, self.anchor, self.corners);
            self.anchor_transform = Mat4::from_translation(self.rect.origin().extend(0.0));
        }

        let size = self.rect.size();
        let pivot_point = (size * self.pivot.as_vec2()).extend(0.0);
        self.to_pivot = Mat4::from_translation(pivot_point);
        self.from_pivot = Mat4::from_translation(-pivot_point);
        self.mirrored = inputs.local_scale.x < 0.0 || inputs.local_scale.y < 0.0;

        let pivoted_local = self.to_pivot * inputs.local * self.from_pivot;
        self.screen_to_parent = match inputs.parent_model {
            Some(parent_model) => parent_model * self.anchor_transform,
            None => self.anchor_transform,
        };
        self.model_transform = self.screen_to_parent * pivoted_local;
        self.local_model_transform = (self.anchor_transform * pivoted_local).inverse();
        self.screen_to_world = inputs.screen_to_world;
        self.anchor_world_transform = inputs.screen_to_world * self.screen_to_parent;
        self.world_transform = inputs.screen_to_world * self.model_transform;
        self.inverse_pivot_world_transform = self.world_transform.inverse();
        self.flags.clear_all();

        tracing::trace!("recomputed layout {} ({}x{})", self.node, size.x, size.y);

        (size != old_size).then_some(ResizeEvent {
            node: self.node,
            width: size.x,
            height: size.y,
        })
    }
}
