//! Render snapshot.
//!
//! Flattens resolved layout into GPU-ready items, one per enabled layout
//! node. Screens are kept contiguous and stacked back to front:
//!
//! ```text
//!   world screens ──► camera screens ──► overlays     (layer)
//!     lower priority first, then creation order       (within a layer)
//!       draw order                                    (within a screen)
//! ```

use crate::element::LayoutNode;
use crate::screen::{ScreenContext, ScreenType};

/// One layout node as the renderer sees it.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RenderItem {
    /// World transform, column-major.
    pub world: [[f32; 4]; 4],
    /// Resolved width and height.
    pub size: [f32; 2],
    /// Draw order within the screen.
    pub draw_order: u32,
    /// [`ScreenType::as_u32`] of the owning screen.
    pub screen_type: u32,
    /// Raw id of the owning screen.
    pub screen: u32,
    /// Router priority of the owning screen.
    pub priority: i32,
}

impl RenderItem {
    /// Snapshots a layout node.
    #[must_use]
    pub fn from_layout(layout: &LayoutNode, screen: &ScreenContext) -> Self {
        Self {
            world: layout.world_transform().to_cols_array_2d(),
            size: layout.size().to_array(),
            draw_order: layout.draw_order(),
            screen_type: screen.screen_type().as_u32(),
            screen: screen.id().raw(),
            priority: screen.priority(),
        }
    }

    /// Back-to-front sort key.
    fn sort_key(&self) -> (u32, i32, u32, u32) {
        let layer = match self.screen_type {
            t if t == ScreenType::Overlay.as_u32() => 2,
            t if t == ScreenType::Camera.as_u32() => 1,
            _ => 0,
        };
        (layer, self.priority, self.screen, self.draw_order)
    }
}

/// Collects render items for one frame.
#[derive(Debug, Default)]
pub struct RenderList {
    items: Vec<RenderItem>,
}

impl RenderList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::with_capacity(256),
        }
    }

    /// Clears the list for a new frame.
    pub fn begin_frame(&mut self) {
        self.items.clear();
    }

    /// Adds an item.
    pub fn push(&mut self, item: RenderItem) {
        self.items.push(item);
    }

    /// Sorts back to front and returns the items.
    pub fn end_frame(&mut self) -> &[RenderItem] {
        self.items.sort_by_key(RenderItem::sort_key);
        &self.items
    }

    /// Raw bytes of the sorted items, ready for upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.items)
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if no items were pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
