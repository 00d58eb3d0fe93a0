//! # Transform Sync Strategies
//!
//! The graph never knows how a node's world transform is built. It walks the
//! hierarchy top-down and asks a [`TransformSync`] strategy to do the work:
//!
//! ```text
//!   node.sync_mode == Plain   ──►  PlainSync      (parent.world · local)
//!   node.sync_mode == Hooked  ──►  caller's hook  (e.g. anchored UI layout)
//! ```
//!
//! Attaching a hook swaps the strategy for that node only; detaching restores
//! [`PlainSync`]. Nothing is patched on shared state.

use glam::Mat4;

use crate::graph::SceneGraph;
use crate::node::NodeId;

/// Strategy that brings one node's world transform up to date.
///
/// Called in pre-order, so every ancestor is already synced when a node is
/// visited. Implementations must be pure with respect to the graph: identical
/// inputs produce bit-identical transforms.
pub trait TransformSync {
    /// Returns true if `id` must be recomputed.
    ///
    /// The default checks the node's own dirty flags. Strategies with extra
    /// state (anchors, corners) extend this.
    fn needs_sync(&self, graph: &SceneGraph, id: NodeId) -> bool {
        graph.get(id).is_some_and(crate::SceneNode::is_dirty)
    }

    /// Recomputes the world transform of `id` and stores it with
    /// [`SceneGraph::set_world_transform`].
    fn sync(&mut self, graph: &mut SceneGraph, id: NodeId);
}

/// Default strategy: `world = parent.world * local`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainSync;

impl TransformSync for PlainSync {
    fn sync(&mut self, graph: &mut SceneGraph, id: NodeId) {
        let Some(node) = graph.get(id) else {
            return;
        };
        let parent_world = node
            .parent()
            .and_then(|p| graph.get(p))
            .map_or(Mat4::IDENTITY, crate::SceneNode::world_transform);
        let world = parent_world * node.local_transform();
        graph.set_world_transform(id, world);
    }
}

/// Statistics from one hierarchy walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Nodes visited.
    pub visited: usize,
    /// Nodes whose world transform was recomputed.
    pub recomputed: usize,
}
