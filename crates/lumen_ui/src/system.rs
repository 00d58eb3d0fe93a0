//! # UI System
//!
//! Facade owning the scene graph, the compositor and the router, and
//! running one frame in a fixed order:
//!
//! ```text
//!   update()
//!     1. layout      graph.sync_hierarchy(compositor)   dirty nodes only
//!     2. input       queued samples ──► router ──► listeners
//!     3. draw order  dirty screens renumbered
//! ```
//!
//! Input is queued by [`UiSystem::pointer`] and [`UiSystem::focus_lost`] and
//! never routed mid-frame, so hit testing always sees resolved transforms.

use glam::{Mat4, Quat, Vec2, Vec3};
use lumen_scene::{NodeId, SceneGraph, SyncStats};

use crate::compositor::Compositor;
use crate::config::{RouterConfig, ScreenConfig, UiConfig};
use crate::element::LayoutNode;
use crate::error::{UiError, UiResult};
use crate::events::{ListenerId, PointerEvent, ResizeEvent};
use crate::input::PointerSample;
use crate::layout::{Anchor, Corners, Pivot};
use crate::render::{RenderItem, RenderList};
use crate::router::{Hit, PointerRouter};
use crate::screen::{CameraView, ScaleMode, ScreenContext, ScreenId, ScreenType};

#[derive(Debug, Clone, Copy)]
enum QueuedInput {
    Sample(PointerSample),
    FocusLost,
}

/// What one [`UiSystem::update`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Layout sync statistics.
    pub layout: SyncStats,
    /// Size changes from this frame's layout pass.
    pub resized: Vec<ResizeEvent>,
    /// Routed pointer events, in delivery order.
    pub events: Vec<PointerEvent>,
    /// Screens whose draw order was renumbered.
    pub draw_order_screens: usize,
}

/// The UI layer: layout, screens and pointer routing over one scene graph.
#[derive(Debug)]
pub struct UiSystem {
    graph: SceneGraph,
    compositor: Compositor,
    router: PointerRouter,
    queue: Vec<QueuedInput>,
    /// Events raised outside dispatch (e.g. leave on disable).
    pending: Vec<PointerEvent>,
    render: RenderList,
}

impl UiSystem {
    /// Creates an empty system.
    #[must_use]
    pub fn new(router: RouterConfig) -> Self {
        Self {
            graph: SceneGraph::new(),
            compositor: Compositor::new(),
            router: PointerRouter::new(router),
            queue: Vec::with_capacity(64),
            pending: Vec::new(),
            render: RenderList::new(),
        }
    }

    /// Creates a system with the configured screens as root nodes.
    ///
    /// # Errors
    ///
    /// Propagates scene errors from creating the screen nodes.
    pub fn from_config(config: &UiConfig) -> UiResult<Self> {
        let mut system = Self::new(config.router);
        for screen in &config.screens {
            system.spawn_screen(None, screen)?;
        }
        tracing::info!("UI system created with {} screen(s)", config.screens.len());
        Ok(system)
    }

    /// Scene graph, read-only.
    #[must_use]
    pub const fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Compositor, read-only.
    #[must_use]
    pub const fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Router, read-only.
    #[must_use]
    pub const fn router(&self) -> &PointerRouter {
        &self.router
    }

    /// Layout state of a node.
    #[must_use]
    pub fn layout(&self, node: NodeId) -> Option<&LayoutNode> {
        self.compositor.layout(node)
    }

    /// A screen by id.
    #[must_use]
    pub fn screen(&self, id: ScreenId) -> Option<&ScreenContext> {
        self.compositor.screen(id)
    }

    // ---------------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------------

    /// Spawns a plain scene node.
    ///
    /// # Errors
    ///
    /// Returns a scene error if `parent` is stale.
    pub fn spawn(&mut self, name: &str, parent: Option<NodeId>) -> UiResult<NodeId> {
        Ok(self.graph.spawn(name, parent)?)
    }

    /// Spawns a node carrying a new screen.
    ///
    /// # Errors
    ///
    /// Returns a scene error if `parent` is stale.
    pub fn spawn_screen(&mut self, parent: Option<NodeId>, config: &ScreenConfig) -> UiResult<(NodeId, ScreenId)> {
        let node = self.graph.spawn(config.name.as_str(), parent)?;
        let screen = self.attach_screen(node, config)?;
        Ok((node, screen))
    }

    /// Attaches a screen to an existing node. Layout already below it
    /// switches over to the new screen.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::ScreenAlreadyAttached`] on double attach.
    pub fn attach_screen(&mut self, node: NodeId, config: &ScreenConfig) -> UiResult<ScreenId> {
        self.graph.node(node)?;
        let screen = self.compositor.add_screen(node, config)?;
        self.router.set_screen_type(screen, config.screen_type);
        self.compositor.rescreen(&self.graph, node);
        Ok(screen)
    }

    /// Spawns a node with layout attached.
    ///
    /// # Errors
    ///
    /// Returns a scene error if `parent` is stale.
    pub fn spawn_element(&mut self, name: &str, parent: Option<NodeId>) -> UiResult<NodeId> {
        let node = self.graph.spawn(name, parent)?;
        self.compositor.attach(&mut self.graph, node)?;
        Ok(node)
    }

    /// Attaches layout to an existing node.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::LayoutAlreadyAttached`] on double attach.
    pub fn attach_layout(&mut self, node: NodeId) -> UiResult<()> {
        self.compositor.attach(&mut self.graph, node)?;
        Ok(())
    }

    /// Detaches layout, restoring plain transform sync for the node.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoLayout`] if the node has none.
    pub fn detach_layout(&mut self, node: NodeId) -> UiResult<()> {
        self.compositor
            .detach(&mut self.graph, node)
            .ok_or(UiError::NoLayout(node))?;
        self.router.forget(&[node]);
        Ok(())
    }

    /// Removes a node and its subtree, dropping layout, screens and any
    /// router state that referenced them.
    ///
    /// # Errors
    ///
    /// Returns a scene error if `node` is stale.
    pub fn remove_node(&mut self, node: NodeId) -> UiResult<()> {
        let removed = self.graph.despawn(node)?;
        for &dead in &removed {
            if let Some(screen) = self.compositor.forget(dead) {
                self.router.remove_screen(screen);
            }
        }
        self.router.forget(&removed);
        tracing::debug!("removed {} node(s) rooted at {}", removed.len(), node);
        Ok(())
    }

    /// Moves a node under a new parent and re-resolves its screen.
    ///
    /// # Errors
    ///
    /// Returns scene errors for stale ids or cycles.
    pub fn reparent(&mut self, node: NodeId, parent: Option<NodeId>) -> UiResult<()> {
        let old_screen = self.compositor.find_screen(&self.graph, node);
        self.graph.reparent(node, parent)?;
        self.compositor.rescreen(&self.graph, node);
        if let Some(screen) = old_screen {
            self.compositor.mark_draw_order_dirty(screen);
        }
        Ok(())
    }

    /// Enables or disables a node. Disabling emits `leave` for every
    /// pointer hovering inside it, delivered on the next update.
    ///
    /// # Errors
    ///
    /// Returns a scene error if `node` is stale.
    pub fn set_enabled(&mut self, node: NodeId, enabled: bool) -> UiResult<()> {
        let was = self.graph.node(node)?.is_enabled();
        self.graph.set_enabled(node, enabled)?;
        if was == enabled {
            return Ok(());
        }
        if let Some(screen) = self.compositor.find_screen(&self.graph, node) {
            self.compositor.mark_draw_order_dirty(screen);
        }
        if !enabled {
            self.router
                .node_disabled(&self.graph, &self.compositor, node, &mut self.pending);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Local transform
    // ---------------------------------------------------------------------

    /// Sets a node's local position.
    ///
    /// # Errors
    ///
    /// Returns a scene error if `node` is stale.
    pub fn set_local_position(&mut self, node: NodeId, position: Vec3) -> UiResult<()> {
        Ok(self.graph.set_local_position(node, position)?)
    }

    /// Sets a node's local rotation.
    ///
    /// # Errors
    ///
    /// Returns a scene error if `node` is stale.
    pub fn set_local_rotation(&mut self, node: NodeId, rotation: Quat) -> UiResult<()> {
        Ok(self.graph.set_local_rotation(node, rotation)?)
    }

    /// Sets a node's local scale.
    ///
    /// # Errors
    ///
    /// Returns a scene error if `node` is stale.
    pub fn set_local_scale(&mut self, node: NodeId, scale: Vec3) -> UiResult<()> {
        Ok(self.graph.set_local_scale(node, scale)?)
    }

    /// World transform of a node, syncing the path to it first.
    ///
    /// # Errors
    ///
    /// Returns a scene error if `node` is stale.
    pub fn world_transform(&mut self, node: NodeId) -> UiResult<Mat4> {
        Ok(self.graph.sync_node(node, &mut self.compositor)?)
    }

    /// World point of the node's local position moved by `(dx, dy)`.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoLayout`] if the node has no layout.
    pub fn offset_position(&mut self, node: NodeId, dx: f32, dy: f32) -> UiResult<Vec3> {
        self.graph.sync_node(node, &mut self.compositor)?;
        let local = self.graph.node(node)?.local_position();
        let layout = self.compositor.layout(node).ok_or(UiError::NoLayout(node))?;
        Ok(layout.offset_position(local, dx, dy))
    }

    /// Moves a node so its origin lands on `world`.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoLayout`] if the node has no layout.
    pub fn set_world_position(&mut self, node: NodeId, world: Vec3) -> UiResult<()> {
        self.graph.sync_node(node, &mut self.compositor)?;
        let layout = self.compositor.layout(node).ok_or(UiError::NoLayout(node))?;
        match layout.world_to_local_position(world) {
            Some(local) => self.graph.set_local_position(node, local)?,
            None => tracing::warn!("node {} has a singular anchor frame; position unchanged", node),
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Layout
    // ---------------------------------------------------------------------

    /// Sets anchor fractions.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoLayout`] if the node has no layout.
    pub fn set_anchor(&mut self, node: NodeId, anchor: impl Into<Anchor>) -> UiResult<()> {
        self.compositor.layout_mut(node)?.set_anchor(anchor.into());
        Ok(())
    }

    /// Sets all four corner offsets.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoLayout`] if the node has no layout.
    pub fn set_corners(&mut self, node: NodeId, corners: impl Into<Corners>) -> UiResult<()> {
        self.compositor.layout_mut(node)?.set_corners(corners.into());
        Ok(())
    }

    /// Sets the left corner offset.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoLayout`] if the node has no layout.
    pub fn set_left(&mut self, node: NodeId, left: f32) -> UiResult<()> {
        self.compositor.layout_mut(node)?.set_left(left);
        Ok(())
    }

    /// Sets the bottom corner offset.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoLayout`] if the node has no layout.
    pub fn set_bottom(&mut self, node: NodeId, bottom: f32) -> UiResult<()> {
        self.compositor.layout_mut(node)?.set_bottom(bottom);
        Ok(())
    }

    /// Sets the right corner offset.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoLayout`] if the node has no layout.
    pub fn set_right(&mut self, node: NodeId, right: f32) -> UiResult<()> {
        self.compositor.layout_mut(node)?.set_right(right);
        Ok(())
    }

    /// Sets the top corner offset.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoLayout`] if the node has no layout.
    pub fn set_top(&mut self, node: NodeId, top: f32) -> UiResult<()> {
        self.compositor.layout_mut(node)?.set_top(top);
        Ok(())
    }

    /// Sets the pivot.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoLayout`] if the node has no layout.
    pub fn set_pivot(&mut self, node: NodeId, pivot: impl Into<Pivot>) -> UiResult<()> {
        self.compositor.layout_mut(node)?.set_pivot(pivot.into());
        Ok(())
    }

    /// Makes a node opaque or transparent to pointer rays.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoLayout`] if the node has no layout.
    pub fn set_blocks_pointer(&mut self, node: NodeId, blocks: bool) -> UiResult<()> {
        self.compositor.layout_mut(node)?.set_blocks_pointer(blocks);
        Ok(())
    }

    /// Registers a resize observer on a node.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoLayout`] if the node has no layout.
    pub fn on_resize(&mut self, node: NodeId, handler: impl FnMut(&ResizeEvent) + 'static) -> UiResult<ListenerId> {
        Ok(self.compositor.layout_mut(node)?.resize_listeners.subscribe(handler))
    }

    /// Unregisters a resize observer. Returns false if it was not found.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoLayout`] if the node has no layout.
    pub fn off_resize(&mut self, node: NodeId, id: ListenerId) -> UiResult<bool> {
        Ok(self.compositor.layout_mut(node)?.resize_listeners.unsubscribe(id))
    }

    /// Registers a pointer observer on a node.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoLayout`] if the node has no layout.
    pub fn on_pointer(&mut self, node: NodeId, handler: impl FnMut(&PointerEvent) + 'static) -> UiResult<ListenerId> {
        Ok(self.compositor.layout_mut(node)?.pointer_listeners.subscribe(handler))
    }

    /// Unregisters a pointer observer. Returns false if it was not found.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::NoLayout`] if the node has no layout.
    pub fn off_pointer(&mut self, node: NodeId, id: ListenerId) -> UiResult<bool> {
        Ok(self.compositor.layout_mut(node)?.pointer_listeners.unsubscribe(id))
    }

    // ---------------------------------------------------------------------
    // Screens
    // ---------------------------------------------------------------------

    /// Resizes a screen. Dependents are only marked dirty.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::ScreenNotFound`] for unknown ids.
    pub fn resize(&mut self, screen: ScreenId, width: f32, height: f32) -> UiResult<()> {
        self.compositor.resize_screen(screen, width, height)
    }

    /// Sets the reference resolution for blend scaling.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::ScreenNotFound`] for unknown ids.
    pub fn set_reference_resolution(&mut self, screen: ScreenId, width: f32, height: f32) -> UiResult<()> {
        self.compositor.set_reference_resolution(screen, width, height)
    }

    /// Sets the scale mode and blend.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::ScreenNotFound`] for unknown ids.
    pub fn set_scale_mode(&mut self, screen: ScreenId, mode: ScaleMode, blend: f32) -> UiResult<()> {
        self.compositor.set_scale_mode(screen, mode, blend)
    }

    /// Switches a screen's regime and the router's ray construction.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::ScreenNotFound`] for unknown ids.
    pub fn set_screen_type(&mut self, screen: ScreenId, screen_type: ScreenType) -> UiResult<()> {
        if self.compositor.set_screen_type(screen, screen_type)? {
            self.router.set_screen_type(screen, screen_type);
        }
        Ok(())
    }

    /// Publishes (or clears) the camera of a screen.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::ScreenNotFound`] for unknown ids.
    pub fn set_camera(&mut self, screen: ScreenId, camera: Option<CameraView>) -> UiResult<()> {
        self.compositor.set_camera(screen, camera)
    }

    /// Enables or disables pointer routing on a screen.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::ScreenNotFound`] for unknown ids.
    pub fn set_screen_enabled(&mut self, screen: ScreenId, enabled: bool) -> UiResult<()> {
        self.compositor.set_screen_enabled(screen, enabled)
    }

    // ---------------------------------------------------------------------
    // Input and frame
    // ---------------------------------------------------------------------

    /// Queues a pointer sample for the next update.
    pub fn pointer(&mut self, sample: PointerSample) {
        self.queue.push(QueuedInput::Sample(sample));
    }

    /// Queues a forced release of every captured pointer.
    pub fn focus_lost(&mut self) {
        self.queue.push(QueuedInput::FocusLost);
    }

    /// Topmost accepting node under a device point, against the last
    /// resolved layout.
    #[must_use]
    pub fn pick(&self, device: Vec2) -> Option<Hit> {
        self.router.pick(&self.graph, &self.compositor, device)
    }

    /// Runs one frame: layout, then input, then draw order.
    pub fn update(&mut self) -> FrameReport {
        let layout = self.graph.sync_hierarchy(&mut self.compositor);
        let resized = self.compositor.drain_resized();

        let mut events = std::mem::take(&mut self.pending);
        for input in std::mem::take(&mut self.queue) {
            match input {
                QueuedInput::Sample(sample) => {
                    self.router.dispatch(&self.graph, &self.compositor, &sample, &mut events);
                }
                QueuedInput::FocusLost => self.router.cancel_all(&self.compositor, &mut events),
            }
        }
        for event in &events {
            tracing::trace!("{:?} -> node {}", event.kind, event.target);
            if let Ok(layout) = self.compositor.layout_mut(event.target) {
                layout.pointer_listeners.emit(event);
            }
        }

        let draw_order_screens = self.compositor.sync_draw_order(&self.graph);
        FrameReport {
            layout,
            resized,
            events,
            draw_order_screens,
        }
    }

    /// Snapshot of every enabled layout node on a screen, sorted back to
    /// front: world, camera, then overlay screens, each screen's nodes
    /// contiguous and in draw order.
    pub fn render_items(&mut self) -> &[RenderItem] {
        self.render.begin_frame();
        for layout in self.compositor.layouts() {
            let Some(screen) = layout.screen().and_then(|s| self.compositor.screen(s)) else {
                continue;
            };
            if self.graph.is_enabled_in_hierarchy(layout.node()) {
                self.render.push(RenderItem::from_layout(layout, screen));
            }
        }
        self.render.end_frame()
    }
}

impl Default for UiSystem {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::events::PointerEventKind;

    fn overlay() -> (UiSystem, NodeId) {
        let mut ui = UiSystem::default();
        let (root, _) = ui
            .spawn_screen(None, &ScreenConfig::overlay("hud", 800.0, 600.0))
            .unwrap();
        (ui, root)
    }

    #[test]
    fn test_listeners_receive_routed_events() {
        let (mut ui, root) = overlay();
        let button = ui.spawn_element("button", Some(root)).unwrap();
        ui.set_corners(button, [0.0, 0.0, 100.0, 100.0]).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        ui.on_pointer(button, move |e| sink.borrow_mut().push(e.kind)).unwrap();

        ui.update();
        ui.pointer(PointerSample::mouse_down(50.0, 550.0));
        ui.pointer(PointerSample::mouse_up(50.0, 550.0));
        ui.update();

        assert_eq!(
            *seen.borrow(),
            vec![
                PointerEventKind::Enter,
                PointerEventKind::Down,
                PointerEventKind::Up,
                PointerEventKind::Click
            ]
        );
    }

    #[test]
    fn test_input_waits_for_update() {
        let (mut ui, root) = overlay();
        let button = ui.spawn_element("button", Some(root)).unwrap();
        ui.set_anchor(button, Anchor::FILL).unwrap();

        ui.pointer(PointerSample::mouse_down(10.0, 10.0));
        assert!(ui.router().captured(crate::input::PointerId::Mouse).is_none());

        // Layout resolves before the queued down is routed.
        let report = ui.update();
        assert_eq!(report.events.iter().filter(|e| e.kind == PointerEventKind::Down).count(), 1);
        assert_eq!(report.resized.len(), 1);
    }

    #[test]
    fn test_remove_node_cleans_up() {
        let (mut ui, root) = overlay();
        let panel = ui.spawn_element("panel", Some(root)).unwrap();
        let child = ui.spawn_element("child", Some(panel)).unwrap();
        ui.set_anchor(panel, Anchor::FILL).unwrap();
        ui.update();

        ui.pointer(PointerSample::mouse_down(10.0, 10.0));
        ui.update();
        assert!(ui.router().captured(crate::input::PointerId::Mouse).is_some());

        ui.remove_node(panel).unwrap();
        assert!(ui.layout(panel).is_none());
        assert!(ui.layout(child).is_none());
        assert!(ui.router().captured(crate::input::PointerId::Mouse).is_none());

        let screen = ui.compositor().screen_on(root).unwrap();
        assert!(ui.screen(screen).unwrap().dependents().is_empty());
    }

    #[test]
    fn test_world_position_round_trip() {
        let (mut ui, root) = overlay();
        let panel = ui.spawn_element("panel", Some(root)).unwrap();
        ui.set_corners(panel, [100.0, 100.0, 200.0, 200.0]).unwrap();

        let target = ui.offset_position(panel, 10.0, 20.0).unwrap();
        ui.set_world_position(panel, target).unwrap();
        let local = ui.graph().node(panel).unwrap().local_position();
        assert!((local - Vec3::new(10.0, 20.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_render_items_skip_disabled() {
        let (mut ui, root) = overlay();
        let a = ui.spawn_element("a", Some(root)).unwrap();
        let b = ui.spawn_element("b", Some(root)).unwrap();
        ui.update();
        assert_eq!(ui.render_items().len(), 2);

        ui.set_enabled(a, false).unwrap();
        ui.update();
        let expected = ui.layout(b).unwrap().draw_order();
        assert_eq!(expected, 1);
        let items = ui.render_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].draw_order, expected);
    }
}
