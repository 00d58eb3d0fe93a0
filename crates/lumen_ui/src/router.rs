//! # Pointer Router
//!
//! Turns pointer samples into rays, finds the topmost accepting layout
//! node and runs the per-pointer gesture state machine.
//!
//! ## Hit test
//!
//! ```text
//!   screens by priority ──► ray per screen ──► walk from screen root
//!       node outcome:  FAIL          prune the subtree
//!                      PASS_THROUGH  never accepts, children still tested
//!                      ACCEPT        accepts unless a child accepts first
//!       children: last sibling first (drawn on top)
//! ```
//!
//! ## Gesture state (per pointer)
//!
//! ```text
//!   Idle ──down(hit)──► Pressed(captured) ──up(anywhere)──► Idle  + up, click
//!                            │
//!                            └──cancel / focus lost──► Idle  + forced up
//!                                                      (next real up swallowed)
//! ```

use std::collections::{BTreeMap, HashMap};

use glam::Vec2;
use lumen_scene::{NodeId, SceneGraph};

use crate::compositor::Compositor;
use crate::config::RouterConfig;
use crate::element::LayoutNode;
use crate::events::{PointerEvent, PointerEventKind};
use crate::input::{PointerAction, PointerId, PointerSample, PointerSource};
use crate::ray::{Ray, RayStrategy};
use crate::screen::{ScreenId, ScreenType};

/// Outcome of testing one node against a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitTest {
    /// Ray lands inside the node at this local point.
    Accept(Vec2),
    /// Ray misses; the node's subtree is skipped.
    Fail,
    /// Node is transparent to rays; its children are still tested.
    PassThrough,
}

impl HitTest {
    /// Tests a layout node against a ray in its screen's render space.
    #[must_use]
    pub fn evaluate(layout: &LayoutNode, ray: &Ray) -> Self {
        if layout.is_degenerate() || !layout.blocks_pointer() {
            return Self::PassThrough;
        }
        match ray.intersect_local(&layout.inverse_pivot_world_transform()) {
            Some(p) if (0.0..=layout.width()).contains(&p.x) && (0.0..=layout.height()).contains(&p.y) => {
                Self::Accept(p)
            }
            _ => Self::Fail,
        }
    }
}

/// Result of a successful pick.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// Screen the hit was found on.
    pub screen: ScreenId,
    /// Deepest accepting node.
    pub target: NodeId,
    /// Local point on the target.
    pub point: Vec2,
    /// Every accepting node on the way down, deepest first. Starts with the
    /// target.
    pub path: Vec<(NodeId, Vec2)>,
}

/// Gesture bookkeeping for one pointer id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointerGesture {
    /// Node that accepted the initial down.
    pub captured: Option<NodeId>,
    /// True between an accepted down and its release.
    pub pressed: bool,
    /// Nodes currently hovered, deepest first.
    pub hover: Vec<NodeId>,
    /// Last device position seen.
    pub last_position: Vec2,
    /// Set by a forced release; swallows the next real up.
    pub suppress_up: bool,
}

/// Routes pointer samples to layout nodes.
#[derive(Debug, Default)]
pub struct PointerRouter {
    config: RouterConfig,
    gestures: BTreeMap<PointerId, PointerGesture>,
    strategies: HashMap<ScreenId, RayStrategy>,
}

impl PointerRouter {
    /// Creates a router.
    #[must_use]
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            gestures: BTreeMap::new(),
            strategies: HashMap::new(),
        }
    }

    /// Router limits.
    #[must_use]
    pub const fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Gesture state of a pointer, if tracked.
    #[must_use]
    pub fn gesture(&self, pointer: PointerId) -> Option<&PointerGesture> {
        self.gestures.get(&pointer)
    }

    /// Node currently captured by a pointer.
    #[must_use]
    pub fn captured(&self, pointer: PointerId) -> Option<NodeId> {
        self.gestures.get(&pointer).and_then(|g| g.captured)
    }

    /// Number of tracked pointers.
    #[must_use]
    pub fn tracked_pointers(&self) -> usize {
        self.gestures.len()
    }

    /// Selects the ray construction used for a screen from now on.
    pub fn set_screen_type(&mut self, screen: ScreenId, screen_type: ScreenType) {
        let strategy = RayStrategy::from(screen_type);
        if self.strategies.insert(screen, strategy) != Some(strategy) {
            tracing::debug!("screen {:?} now builds rays with {:?}", screen, strategy);
        }
    }

    /// Forgets a removed screen.
    pub fn remove_screen(&mut self, screen: ScreenId) {
        self.strategies.remove(&screen);
    }

    fn strategy(strategies: &HashMap<ScreenId, RayStrategy>, compositor: &Compositor, screen: ScreenId) -> Option<RayStrategy> {
        strategies
            .get(&screen)
            .copied()
            .or_else(|| compositor.screen(screen).map(|s| RayStrategy::from(s.screen_type())))
    }

    /// Finds the topmost accepting node under `device` across all screens.
    #[must_use]
    pub fn pick(&self, graph: &SceneGraph, compositor: &Compositor, device: Vec2) -> Option<Hit> {
        let mut screens: Vec<_> = compositor
            .screens()
            .filter(|s| s.is_enabled() && graph.is_enabled_in_hierarchy(s.root()))
            .collect();
        // Stable: equal priorities keep creation order.
        screens.sort_by_key(|s| std::cmp::Reverse(s.priority()));

        for screen in screens {
            let Some(strategy) = Self::strategy(&self.strategies, compositor, screen.id()) else {
                continue;
            };
            let Some(ray) = Ray::build(strategy, screen, device) else {
                tracing::warn!("no pointer ray for screen '{}', treating as a miss", screen.name());
                continue;
            };
            if let Some(path) = hit_subtree(graph, compositor, screen.id(), &ray, screen.root()) {
                let (target, point) = path[0];
                return Some(Hit {
                    screen: screen.id(),
                    target,
                    point,
                    path,
                });
            }
        }
        None
    }

    /// Local point of `node` under `device`, if the ray reaches its plane.
    fn local_point(
        strategies: &HashMap<ScreenId, RayStrategy>,
        compositor: &Compositor,
        node: NodeId,
        device: Vec2,
    ) -> Option<Vec2> {
        let layout = compositor.layout(node)?;
        let screen_id = layout.screen()?;
        let screen = compositor.screen(screen_id)?;
        let strategy = Self::strategy(strategies, compositor, screen_id)?;
        Ray::build(strategy, screen, device)?.intersect_local(&layout.inverse_pivot_world_transform())
    }

    /// Routes one sample, appending the resulting events to `out`.
    pub fn dispatch(
        &mut self,
        graph: &SceneGraph,
        compositor: &Compositor,
        sample: &PointerSample,
        out: &mut Vec<PointerEvent>,
    ) {
        let pointer = sample.pointer;
        if !self.gestures.contains_key(&pointer) {
            if sample.action == PointerAction::Cancel {
                return;
            }
            if self.gestures.len() >= self.config.max_pointers {
                tracing::warn!(
                    "dropping sample for pointer {:?}: {} pointers already tracked",
                    pointer,
                    self.config.max_pointers
                );
                return;
            }
        }

        let hit = match sample.action {
            PointerAction::Cancel => None,
            _ => self.pick(graph, compositor, sample.position),
        };
        let strategies = &self.strategies;
        let gesture = self.gestures.entry(pointer).or_default();
        gesture.last_position = sample.position;
        let is_touch = matches!(sample.source, PointerSource::Touch(_));

        match sample.action {
            PointerAction::Down => {
                gesture.suppress_up = false;
                update_hover(strategies, compositor, gesture, pointer, hit.as_ref(), out);
                if let Some(hit) = &hit {
                    out.push(PointerEvent::new(PointerEventKind::Down, hit.target, pointer, hit.point));
                    if gesture.captured.is_none() {
                        gesture.captured = Some(hit.target);
                        gesture.pressed = true;
                    }
                }
            }
            PointerAction::Up => {
                if gesture.suppress_up {
                    gesture.suppress_up = false;
                    tracing::trace!("swallowed up for pointer {:?} after forced release", pointer);
                } else if let Some(captured) = gesture.captured.take() {
                    gesture.pressed = false;
                    let point = Self::local_point(strategies, compositor, captured, sample.position)
                        .unwrap_or(Vec2::ZERO);
                    out.push(PointerEvent::new(PointerEventKind::Up, captured, pointer, point));
                    out.push(PointerEvent::new(PointerEventKind::Click, captured, pointer, point));
                } else if let Some(hit) = &hit {
                    out.push(PointerEvent::new(PointerEventKind::Up, hit.target, pointer, hit.point));
                }
            }
            PointerAction::Move => {
                update_hover(strategies, compositor, gesture, pointer, hit.as_ref(), out);
                if let Some(hit) = &hit {
                    out.push(PointerEvent::new(PointerEventKind::Move, hit.target, pointer, hit.point));
                }
                if let Some(captured) = gesture.captured {
                    if hit.as_ref().map(|h| h.target) != Some(captured) {
                        let point = Self::local_point(strategies, compositor, captured, sample.position)
                            .unwrap_or(Vec2::ZERO);
                        out.push(PointerEvent::new(PointerEventKind::Move, captured, pointer, point));
                    }
                }
            }
            PointerAction::Scroll => {
                if let Some(hit) = &hit {
                    out.push(PointerEvent {
                        scroll: sample.wheel_delta,
                        ..PointerEvent::new(PointerEventKind::Scroll, hit.target, pointer, hit.point)
                    });
                }
            }
            PointerAction::Cancel => {
                force_release(strategies, compositor, pointer, gesture, out);
            }
        }

        // A lifted or cancelled finger stops hovering and frees its slot.
        if is_touch && matches!(sample.action, PointerAction::Up | PointerAction::Cancel) {
            update_hover(strategies, compositor, gesture, pointer, None, out);
            if gesture.captured.is_none() {
                self.gestures.remove(&pointer);
            }
        }
    }

    /// Forced release of every captured pointer, e.g. on focus loss.
    pub fn cancel_all(&mut self, compositor: &Compositor, out: &mut Vec<PointerEvent>) {
        let strategies = &self.strategies;
        for (&pointer, gesture) in &mut self.gestures {
            force_release(strategies, compositor, pointer, gesture, out);
        }
    }

    /// Emits `leave` for every hovered node inside `root`'s subtree, e.g.
    /// after it was disabled.
    pub fn node_disabled(
        &mut self,
        graph: &SceneGraph,
        compositor: &Compositor,
        root: NodeId,
        out: &mut Vec<PointerEvent>,
    ) {
        let strategies = &self.strategies;
        for (&pointer, gesture) in &mut self.gestures {
            let position = gesture.last_position;
            gesture.hover.retain(|&node| {
                if !graph.is_ancestor_or_self(root, node) {
                    return true;
                }
                let point = Self::local_point(strategies, compositor, node, position).unwrap_or(Vec2::ZERO);
                out.push(PointerEvent::new(PointerEventKind::Leave, node, pointer, point));
                false
            });
        }
    }

    /// Silently drops destroyed nodes from capture and hover state.
    pub fn forget(&mut self, nodes: &[NodeId]) {
        for gesture in self.gestures.values_mut() {
            gesture.hover.retain(|n| !nodes.contains(n));
            if gesture.captured.is_some_and(|c| nodes.contains(&c)) {
                gesture.captured = None;
                gesture.pressed = false;
            }
        }
    }
}

fn force_release(
    strategies: &HashMap<ScreenId, RayStrategy>,
    compositor: &Compositor,
    pointer: PointerId,
    gesture: &mut PointerGesture,
    out: &mut Vec<PointerEvent>,
) {
    let Some(captured) = gesture.captured.take() else {
        return;
    };
    gesture.pressed = false;
    gesture.suppress_up = true;
    let point = PointerRouter::local_point(strategies, compositor, captured, gesture.last_position)
        .unwrap_or(Vec2::ZERO);
    tracing::debug!("forced release of node {} for pointer {:?}", captured, pointer);
    out.push(PointerEvent {
        forced: true,
        ..PointerEvent::new(PointerEventKind::Up, captured, pointer, point)
    });
}

/// Diffs the hover set against the new hit path: `leave` deepest first,
/// then `enter` outermost first.
fn update_hover(
    strategies: &HashMap<ScreenId, RayStrategy>,
    compositor: &Compositor,
    gesture: &mut PointerGesture,
    pointer: PointerId,
    hit: Option<&Hit>,
    out: &mut Vec<PointerEvent>,
) {
    let path: &[(NodeId, Vec2)] = hit.map_or(&[], |h| h.path.as_slice());
    let position = gesture.last_position;

    for &node in &gesture.hover {
        if !path.iter().any(|&(n, _)| n == node) {
            let point = PointerRouter::local_point(strategies, compositor, node, position).unwrap_or(Vec2::ZERO);
            out.push(PointerEvent::new(PointerEventKind::Leave, node, pointer, point));
        }
    }
    for &(node, point) in path.iter().rev() {
        if !gesture.hover.contains(&node) {
            out.push(PointerEvent::new(PointerEventKind::Enter, node, pointer, point));
        }
    }
    gesture.hover = path.iter().map(|&(n, _)| n).collect();
}

/// Depth-first hit search. Returns the accepting path, deepest first.
fn hit_subtree(
    graph: &SceneGraph,
    compositor: &Compositor,
    screen: ScreenId,
    ray: &Ray,
    id: NodeId,
) -> Option<Vec<(NodeId, Vec2)>> {
    let node = graph.get(id)?;
    if !node.is_enabled() {
        return None;
    }
    let outcome = match compositor.layout(id) {
        Some(layout) if layout.screen() == Some(screen) => HitTest::evaluate(layout, ray),
        Some(_) => return None,
        None => HitTest::PassThrough,
    };
    if outcome == HitTest::Fail {
        return None;
    }

    // Pre-order numbering draws later siblings on top, so the last child is
    // topmost even before this frame's draw order has been assigned.
    let children = node
        .children()
        .iter()
        .rev()
        .copied()
        .filter(|&c| !matches!(compositor.screen_on(c), Some(s) if s != screen));

    for child in children {
        if let Some(mut path) = hit_subtree(graph, compositor, screen, ray, child) {
            if let HitTest::Accept(point) = outcome {
                path.push((id, point));
            }
            return Some(path);
        }
    }
    match outcome {
        HitTest::Accept(point) => Some(vec![(id, point)]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScreenConfig;
    use crate::layout::Corners;

    struct Fixture {
        graph: SceneGraph,
        compositor: Compositor,
        router: PointerRouter,
        root: NodeId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut graph = SceneGraph::new();
            let mut compositor = Compositor::new();
            let root = graph.spawn("screen", None).unwrap();
            compositor
                .add_screen(root, &ScreenConfig::overlay("hud", 800.0, 600.0))
                .unwrap();
            Self {
                graph,
                compositor,
                router: PointerRouter::new(RouterConfig::default()),
                root,
            }
        }

        fn element(&mut self, parent: NodeId, corners: Corners) -> NodeId {
            let id = self.graph.spawn("element", Some(parent)).unwrap();
            self.compositor.attach(&mut self.graph, id).unwrap().set_corners(corners);
            id
        }

        fn sync(&mut self) {
            self.graph.sync_hierarchy(&mut self.compositor);
            self.compositor.sync_draw_order(&self.graph);
        }

        fn send(&mut self, sample: PointerSample) -> Vec<PointerEvent> {
            let mut out = Vec::new();
            self.router.dispatch(&self.graph, &self.compositor, &sample, &mut out);
            out
        }
    }

    fn kinds(events: &[PointerEvent]) -> Vec<(PointerEventKind, NodeId)> {
        events.iter().map(|e| (e.kind, e.target)).collect()
    }

    #[test]
    fn test_topmost_sibling_wins() {
        let mut fx = Fixture::new();
        let back = fx.element(fx.root, Corners::new(0.0, 0.0, 200.0, 200.0));
        let front = fx.element(fx.root, Corners::new(100.0, 100.0, 300.0, 300.0));
        fx.sync();

        // Device y is flipped: layout (150, 150) is device (150, 450).
        let hit = fx.router.pick(&fx.graph, &fx.compositor, Vec2::new(150.0, 450.0)).unwrap();
        assert_eq!(hit.target, front);
        assert!((hit.point - Vec2::new(50.0, 50.0)).length() < 1e-3);

        let hit = fx.router.pick(&fx.graph, &fx.compositor, Vec2::new(50.0, 550.0)).unwrap();
        assert_eq!(hit.target, back);
    }

    #[test]
    fn test_fail_prunes_children() {
        let mut fx = Fixture::new();
        let parent = fx.element(fx.root, Corners::new(0.0, 0.0, 100.0, 100.0));
        // Child pokes outside its parent.
        let _child = fx.element(parent, Corners::new(150.0, 0.0, 250.0, 100.0));
        fx.sync();

        assert!(fx.router.pick(&fx.graph, &fx.compositor, Vec2::new(200.0, 550.0)).is_none());
    }

    #[test]
    fn test_non_blocking_node_passes_through() {
        let mut fx = Fixture::new();
        let group = fx.element(fx.root, Corners::new(0.0, 0.0, 400.0, 400.0));
        fx.compositor.layout_mut(group).unwrap().set_blocks_pointer(false);
        let button = fx.element(group, Corners::new(0.0, 0.0, 50.0, 50.0));
        fx.sync();

        let hit = fx.router.pick(&fx.graph, &fx.compositor, Vec2::new(10.0, 590.0)).unwrap();
        assert_eq!(hit.target, button);
        assert_eq!(hit.path.len(), 1);
        assert!(fx.router.pick(&fx.graph, &fx.compositor, Vec2::new(300.0, 300.0)).is_none());
    }

    #[test]
    fn test_hover_enter_and_leave() {
        let mut fx = Fixture::new();
        let panel = fx.element(fx.root, Corners::new(0.0, 0.0, 400.0, 400.0));
        let button = fx.element(panel, Corners::new(0.0, 0.0, 50.0, 50.0));
        fx.sync();

        let events = fx.send(PointerSample::mouse_move(10.0, 590.0));
        assert_eq!(
            kinds(&events),
            vec![
                (PointerEventKind::Enter, panel),
                (PointerEventKind::Enter, button),
                (PointerEventKind::Move, button),
            ]
        );

        let events = fx.send(PointerSample::mouse_move(300.0, 500.0));
        assert_eq!(
            kinds(&events),
            vec![(PointerEventKind::Leave, button), (PointerEventKind::Move, panel)]
        );
    }

    #[test]
    fn test_scroll_carries_amount() {
        let mut fx = Fixture::new();
        let panel = fx.element(fx.root, Corners::new(0.0, 0.0, 400.0, 400.0));
        fx.sync();

        let events = fx.send(PointerSample::mouse_wheel(10.0, 590.0, 3.0));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, PointerEventKind::Scroll);
        assert_eq!(events[0].target, panel);
        assert_eq!(events[0].scroll, 3.0);
    }

    #[test]
    fn test_max_pointers_drops_new_ids() {
        let mut fx = Fixture::new();
        fx.router = PointerRouter::new(RouterConfig { max_pointers: 1 });
        let _panel = fx.element(fx.root, Corners::new(0.0, 0.0, 400.0, 400.0));
        fx.sync();

        fx.send(PointerSample::mouse_move(10.0, 590.0));
        let events = fx.send(PointerSample::mouse_move(10.0, 590.0).with_pointer(PointerId::Touch(7)));
        assert!(events.is_empty());
        assert_eq!(fx.router.tracked_pointers(), 1);
    }

    #[test]
    fn test_forget_clears_capture() {
        let mut fx = Fixture::new();
        let panel = fx.element(fx.root, Corners::new(0.0, 0.0, 400.0, 400.0));
        fx.sync();

        fx.send(PointerSample::mouse_down(10.0, 590.0));
        assert_eq!(fx.router.captured(PointerId::Mouse), Some(panel));
        fx.router.forget(&[panel]);
        assert_eq!(fx.router.captured(PointerId::Mouse), None);
        assert!(fx.router.gesture(PointerId::Mouse).unwrap().hover.is_empty());
    }

    #[test]
    fn test_touch_up_frees_slot() {
        let mut fx = Fixture::new();
        let panel = fx.element(fx.root, Corners::new(0.0, 0.0, 400.0, 400.0));
        fx.sync();

        fx.send(PointerSample::touch(PointerAction::Down, 3, 10.0, 590.0));
        assert_eq!(fx.router.tracked_pointers(), 1);
        let events = fx.send(PointerSample::touch(PointerAction::Up, 3, 10.0, 590.0));
        assert_eq!(
            kinds(&events),
            vec![
                (PointerEventKind::Up, panel),
                (PointerEventKind::Click, panel),
                (PointerEventKind::Leave, panel),
            ]
        );
        assert_eq!(fx.router.tracked_pointers(), 0);
    }
}
