//! # Transform Compositor
//!
//! Owns every [`LayoutNode`] and [`ScreenContext`] and plugs into the scene
//! graph as its [`TransformSync`] hook. Layout-bearing nodes are synced
//! through [`Compositor::sync`]; everything else keeps the plain strategy.
//!
//! ## Per-node recompute
//!
//! ```text
//!   rect          = parentSize · anchor + corners
//!   anchor        = translate(rect.left, rect.bottom)
//!   toPivot       = translate(size · pivot)
//!   screenToParent= parent.model · anchor   (parent has layout)
//!                 = anchor                  (layout root)
//!   model         = screenToParent · toPivot · local · fromPivot
//!   world         = screenToWorld · model
//! ```
//!
//! Work is lazy: screen changes only raise dirty bits, and the graph's
//! pre-order walk decides what actually recomputes.

use std::collections::{BTreeMap, HashMap};

use glam::{Mat4, Vec2};
use lumen_scene::{NodeId, PlainSync, SceneGraph, SceneNode, TransformSync};

use crate::config::ScreenConfig;
use crate::element::{ComposeInputs, LayoutFlags, LayoutNode};
use crate::error::{UiError, UiResult};
use crate::events::ResizeEvent;
use crate::screen::{CameraView, ScaleMode, ScreenContext, ScreenId, ScreenType};

/// Layout and screen storage plus the layout sync strategy.
#[derive(Debug, Default)]
pub struct Compositor {
    layouts: HashMap<NodeId, LayoutNode>,
    /// Ordered by id, which is creation order.
    screens: BTreeMap<ScreenId, ScreenContext>,
    screen_roots: HashMap<NodeId, ScreenId>,
    next_screen: u32,
    /// Resize notifications raised since the last drain.
    resized: Vec<ResizeEvent>,
}

impl Compositor {
    /// Creates an empty compositor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------------
    // Screens
    // ---------------------------------------------------------------------

    /// Creates a screen carried by `root`.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::ScreenAlreadyAttached`] if `root` already carries one.
    pub(crate) fn add_screen(&mut self, root: NodeId, config: &ScreenConfig) -> UiResult<ScreenId> {
        if self.screen_roots.contains_key(&root) {
            return Err(UiError::ScreenAlreadyAttached(root));
        }
        let id = ScreenId(self.next_screen);
        self.next_screen += 1;
        self.screens.insert(id, ScreenContext::from_config(id, root, config));
        self.screen_roots.insert(root, id);
        tracing::debug!("screen '{}' ({:?}) attached to node {}", config.name, config.screen_type, root);
        Ok(id)
    }

    /// Removes a screen. Its dependents fall back to screen-less layout.
    pub(crate) fn remove_screen(&mut self, id: ScreenId) -> Option<ScreenContext> {
        let screen = self.screens.remove(&id)?;
        self.screen_roots.remove(&screen.root());
        for node in screen.dependents() {
            if let Some(layout) = self.layouts.get_mut(node) {
                layout.screen = None;
                layout.flags = LayoutFlags::ALL_DIRTY;
            }
        }
        Some(screen)
    }

    /// Gets a screen.
    #[must_use]
    pub fn screen(&self, id: ScreenId) -> Option<&ScreenContext> {
        self.screens.get(&id)
    }

    fn screen_mut(&mut self, id: ScreenId) -> UiResult<&mut ScreenContext> {
        self.screens.get_mut(&id).ok_or(UiError::ScreenNotFound(id))
    }

    /// Iterates screens in creation order.
    pub fn screens(&self) -> impl Iterator<Item = &ScreenContext> {
        self.screens.values()
    }

    /// Screen carried by `node` itself.
    #[must_use]
    pub fn screen_on(&self, node: NodeId) -> Option<ScreenId> {
        self.screen_roots.get(&node).copied()
    }

    /// Nearest screen at or above `node`.
    #[must_use]
    pub fn find_screen(&self, graph: &SceneGraph, node: NodeId) -> Option<ScreenId> {
        std::iter::once(node)
            .chain(graph.ancestors(node))
            .find_map(|n| self.screen_on(n))
    }

    /// Updates a screen's resolution and marks its dependents anchor-dirty.
    ///
    /// Nothing is recomputed until the next sync.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::ScreenNotFound`] for unknown ids.
    pub fn resize_screen(&mut self, id: ScreenId, width: f32, height: f32) -> UiResult<()> {
        let screen = self.screen_mut(id)?;
        if screen.set_resolution(Vec2::new(width, height)) {
            tracing::debug!("screen '{}' resized to {}x{}", screen.name(), width, height);
            self.mark_dependents(id, LayoutFlags::ANCHOR_DIRTY);
        }
        Ok(())
    }

    /// Sets the reference resolution used by blend scaling.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::ScreenNotFound`] for unknown ids.
    pub fn set_reference_resolution(&mut self, id: ScreenId, width: f32, height: f32) -> UiResult<()> {
        if self.screen_mut(id)?.set_reference_resolution(Vec2::new(width, height)) {
            self.mark_dependents(id, LayoutFlags::ANCHOR_DIRTY);
        }
        Ok(())
    }

    /// Sets the scale mode and blend.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::ScreenNotFound`] for unknown ids.
    pub fn set_scale_mode(&mut self, id: ScreenId, mode: ScaleMode, blend: f32) -> UiResult<()> {
        let screen = self.screen_mut(id)?;
        let changed = screen.set_scale_mode(mode) | screen.set_scale_blend(blend);
        if changed {
            self.mark_dependents(id, LayoutFlags::ANCHOR_DIRTY);
        }
        Ok(())
    }

    /// Switches a screen's regime and forces its subtree to retransform.
    ///
    /// Returns true if the type changed.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::ScreenNotFound`] for unknown ids.
    pub(crate) fn set_screen_type(&mut self, id: ScreenId, screen_type: ScreenType) -> UiResult<bool> {
        let screen = self.screen_mut(id)?;
        if !screen.set_screen_type(screen_type) {
            return Ok(false);
        }
        tracing::debug!("screen '{}' switched to {:?}", screen.name(), screen_type);
        // Overlay and 3D regimes resolve roots against different sizes.
        self.mark_dependents(id, LayoutFlags::ANCHOR_DIRTY | LayoutFlags::WORLD_DIRTY);
        Ok(true)
    }

    /// Publishes the camera used by camera and world screens.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::ScreenNotFound`] for unknown ids.
    pub fn set_camera(&mut self, id: ScreenId, camera: Option<CameraView>) -> UiResult<()> {
        let screen = self.screen_mut(id)?;
        let affects_layout = screen.screen_type() == ScreenType::Camera;
        screen.set_camera(camera);
        if affects_layout {
            self.mark_dependents(id, LayoutFlags::WORLD_DIRTY);
        }
        Ok(())
    }

    /// Enables or disables routing for a screen.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::ScreenNotFound`] for unknown ids.
    pub fn set_screen_enabled(&mut self, id: ScreenId, enabled: bool) -> UiResult<()> {
        self.screen_mut(id)?.set_enabled(enabled);
        Ok(())
    }

    fn mark_dependents(&mut self, id: ScreenId, flags: u8) {
        let Some(screen) = self.screens.get(&id) else {
            return;
        };
        for node in screen.dependents() {
            if let Some(layout) = self.layouts.get_mut(node) {
                layout.flags.set(flags);
            }
        }
    }

    /// Flags a screen for draw-order resync.
    pub(crate) fn mark_draw_order_dirty(&mut self, id: ScreenId) {
        if let Some(screen) = self.screens.get_mut(&id) {
            screen.mark_draw_order_dirty();
        }
    }

    // ---------------------------------------------------------------------
    // Layout nodes
    // ---------------------------------------------------------------------

    /// Gets a layout node.
    #[must_use]
    pub fn layout(&self, node: NodeId) -> Option<&LayoutNode> {
        self.layouts.get(&node)
    }

    /// Gets a layout node mutably.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoLayout`] if `node` has no layout.
    pub(crate) fn layout_mut(&mut self, node: NodeId) -> UiResult<&mut LayoutNode> {
        self.layouts.get_mut(&node).ok_or(UiError::NoLayout(node))
    }

    /// Iterates every layout node.
    pub fn layouts(&self) -> impl Iterator<Item = &LayoutNode> {
        self.layouts.values()
    }

    /// Number of layout nodes.
    #[must_use]
    pub fn layout_count(&self) -> usize {
        self.layouts.len()
    }

    /// Attaches layout state to `node` and routes its sync through the
    /// compositor.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::LayoutAlreadyAttached`] on double attach and
    /// scene errors for stale ids.
    pub(crate) fn attach(&mut self, graph: &mut SceneGraph, node: NodeId) -> UiResult<&mut LayoutNode> {
        graph.node(node)?;
        if self.layouts.contains_key(&node) {
            return Err(UiError::LayoutAlreadyAttached(node));
        }
        graph.attach_hook(node)?;

        let screen = self.find_screen(graph, node);
        if let Some(screen) = screen.and_then(|s| self.screens.get_mut(&s)) {
            screen.register(node);
        }
        self.mark_children_anchor_dirty(graph, node);
        tracing::trace!("layout attached to node {} (screen {:?})", node, screen);
        Ok(self.layouts.entry(node).or_insert_with(|| LayoutNode::new(node, screen)))
    }

    /// Detaches layout state and restores plain sync. A screen carried by
    /// the same node stays in place.
    pub(crate) fn detach(&mut self, graph: &mut SceneGraph, node: NodeId) -> Option<LayoutNode> {
        let layout = self.remove_layout(node)?;
        self.mark_children_anchor_dirty(graph, node);
        if graph.detach_hook(node).is_err() {
            tracing::warn!("detached layout from missing node {}", node);
        }
        Some(layout)
    }

    /// Drops layout and any screen carried by a node that left the graph.
    /// Returns the removed screen, if there was one.
    pub(crate) fn forget(&mut self, node: NodeId) -> Option<ScreenId> {
        let screen = self.screen_on(node);
        if let Some(screen) = screen {
            self.remove_screen(screen);
        }
        self.remove_layout(node);
        screen
    }

    /// Children re-resolve their rects against a changed parent size.
    fn mark_children_anchor_dirty(&mut self, graph: &SceneGraph, node: NodeId) {
        for child in graph.children(node) {
            if let Some(layout) = self.layouts.get_mut(child) {
                layout.flags.set(LayoutFlags::ANCHOR_DIRTY);
            }
        }
    }

    fn remove_layout(&mut self, node: NodeId) -> Option<LayoutNode> {
        let layout = self.layouts.remove(&node)?;
        if let Some(screen) = layout.screen.and_then(|s| self.screens.get_mut(&s)) {
            screen.deregister(node);
        }
        Some(layout)
    }

    /// Re-resolves the screen of every layout node in `root`'s subtree,
    /// e.g. after a reparent.
    pub(crate) fn rescreen(&mut self, graph: &SceneGraph, root: NodeId) {
        for node in graph.iter_subtree(root) {
            if !self.layouts.contains_key(&node) {
                continue;
            }
            let found = self.find_screen(graph, node);
            let Some(layout) = self.layouts.get_mut(&node) else {
                continue;
            };
            let previous = layout.screen;
            layout.screen = found;
            layout.flags.set(LayoutFlags::ANCHOR_DIRTY | LayoutFlags::WORLD_DIRTY);

            if previous != found {
                if let Some(old) = previous.and_then(|s| self.screens.get_mut(&s)) {
                    old.deregister(node);
                }
                if let Some(new) = found.and_then(|s| self.screens.get_mut(&s)) {
                    new.register(node);
                }
            } else if let Some(screen) = found {
                self.mark_draw_order_dirty(screen);
            }
        }
    }

    /// Takes the resize notifications raised by recent syncs.
    pub(crate) fn drain_resized(&mut self) -> Vec<ResizeEvent> {
        std::mem::take(&mut self.resized)
    }

    // ---------------------------------------------------------------------
    // Draw order
    // ---------------------------------------------------------------------

    /// Renumbers every dirty screen in depth-first pre-order.
    ///
    /// Only enabled, layout-bearing nodes of the screen are numbered, from
    /// `1` upward. Disabled subtrees keep their previous numbers. Returns
    /// the number of screens resynced.
    pub fn sync_draw_order(&mut self, graph: &SceneGraph) -> usize {
        let mut synced = 0;
        for screen in self.screens.values_mut() {
            if !screen.is_draw_order_dirty() {
                continue;
            }
            screen.begin_draw_order();
            let mut stack = vec![screen.root()];
            while let Some(id) = stack.pop() {
                let Some(node) = graph.get(id) else {
                    continue;
                };
                if !node.is_enabled() {
                    continue;
                }
                if let Some(layout) = self.layouts.get_mut(&id) {
                    if layout.screen == Some(screen.id()) {
                        layout.draw_order = screen.next_draw_order();
                    }
                }
                stack.extend(node.children().iter().rev().copied());
            }
            screen.finish_draw_order();
            tracing::debug!("synced draw order for screen '{}'", screen.name());
            synced += 1;
        }
        synced
    }

    fn compose_inputs(&mut self, graph: &SceneGraph, id: NodeId) -> Option<ComposeInputs> {
        let node = graph.get(id)?;
        let screen_id = self.layouts.get(&id).and_then(LayoutNode::screen);
        let is_screen_root = self.screen_roots.contains_key(&id);
        let parent_layout = node
            .parent()
            .and_then(|p| self.layouts.get(&p))
            .filter(|p| !is_screen_root && p.screen == screen_id);

        let parent_model = parent_layout.map(LayoutNode::model_transform);
        let parent_size = parent_layout.map(LayoutNode::size);
        let parent_screen_to_world = parent_layout.map(LayoutNode::screen_to_world);

        let (parent_size, screen_to_world) = match screen_id.and_then(|s| self.screens.get_mut(&s)) {
            Some(screen) => {
                let root = screen.root();
                screen.set_root_world(screen_placement(graph, root, self.layouts.contains_key(&root)));
                let to_world = screen.screen_to_world().unwrap_or_else(|| {
                    tracing::debug!("screen '{}' has no projection yet", screen.name());
                    Mat4::IDENTITY
                });
                (parent_size.unwrap_or_else(|| screen.layout_size()), to_world)
            }
            None => {
                let plain_parent = node
                    .parent()
                    .and_then(|p| graph.get(p))
                    .map_or(Mat4::IDENTITY, SceneNode::world_transform);
                (
                    parent_size.unwrap_or(Vec2::ZERO),
                    parent_screen_to_world.unwrap_or(plain_parent),
                )
            }
        };

        Some(ComposeInputs {
            parent_size,
            parent_model,
            local: node.local_transform(),
            local_scale: node.local_scale(),
            screen_to_world,
        })
    }
}

/// Where a world screen sits: the screen node's parent world, followed by
/// the node's own local transform unless its layout composes that itself.
///
/// Never reads the screen node's cached world, which for a layout-bearing
/// node is this compositor's own output.
fn screen_placement(graph: &SceneGraph, root: NodeId, root_has_layout: bool) -> Mat4 {
    let Some(node) = graph.get(root) else {
        return Mat4::IDENTITY;
    };
    let parent_world = node
        .parent()
        .and_then(|p| graph.get(p))
        .map_or(Mat4::IDENTITY, SceneNode::world_transform);
    if root_has_layout {
        parent_world
    } else {
        parent_world * node.local_transform()
    }
}

impl TransformSync for Compositor {
    fn needs_sync(&self, graph: &SceneGraph, id: NodeId) -> bool {
        graph.get(id).is_some_and(SceneNode::is_dirty)
            || self.layouts.get(&id).is_some_and(|l| l.flags.any())
    }

    fn sync(&mut self, graph: &mut SceneGraph, id: NodeId) {
        if !self.layouts.contains_key(&id) {
            PlainSync.sync(graph, id);
            return;
        }
        let Some(inputs) = self.compose_inputs(graph, id) else {
            return;
        };

        let Some(layout) = self.layouts.get_mut(&id) else {
            return;
        };
        let resized = layout.recompute(&inputs);
        let world = layout.world_transform();
        if let Some(event) = resized {
            layout.resize_listeners.emit(&event);
            self.resized.push(event);
            self.mark_children_anchor_dirty(graph, id);
        }
        graph.set_world_transform(id, world);
    }
}
