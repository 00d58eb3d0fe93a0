//! Scene graph for hierarchical node management.

use glam::{Mat4, Quat, Vec3};

use crate::error::{SceneError, SceneResult};
use crate::node::{NodeId, SceneNode, SyncMode};
use crate::sync::{PlainSync, SyncStats, TransformSync};

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<SceneNode>,
}

/// Manages the node hierarchy.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    /// Free slot indices, reused LIFO.
    free: Vec<u32>,
    /// Parentless nodes in insertion order.
    roots: Vec<NodeId>,
    len: usize,
}

impl SceneGraph {
    /// Creates a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Creates a graph with room for `capacity` nodes before reallocating.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            roots: Vec::with_capacity(16),
            len: 0,
        }
    }

    /// Number of live nodes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True if the graph has no nodes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Creates a node under `parent`, or as a root when `parent` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] if `parent` is stale and
    /// [`SceneError::CapacityExceeded`] once every `u32` slot index is taken.
    pub fn spawn(&mut self, name: impl Into<String>, parent: Option<NodeId>) -> SceneResult<NodeId> {
        if let Some(p) = parent {
            if !self.contains(p) {
                return Err(SceneError::NodeNotFound(p));
            }
        }

        let node = SceneNode::new(name.into(), parent);
        let id = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId::new(index, slot.generation)
        } else {
            let index =
                u32::try_from(self.slots.len()).map_err(|_| SceneError::CapacityExceeded)?;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId::new(index, 0)
        };

        match parent {
            Some(p) => {
                if let Some(parent_node) = self.get_mut(p) {
                    parent_node.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        self.len += 1;
        tracing::trace!("spawned node {} under {:?}", id, parent);
        Ok(id)
    }

    /// Removes a node and its whole subtree.
    ///
    /// Returns the removed ids, children before their parents.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] if `id` is stale.
    pub fn despawn(&mut self, id: NodeId) -> SceneResult<Vec<NodeId>> {
        let parent = self.node(id)?.parent;
        self.unlink(id, parent);

        let mut removed = Vec::new();
        self.collect_post_order(id, &mut removed);
        for &dead in &removed {
            let slot = &mut self.slots[dead.index() as usize];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(dead.index());
            self.len -= 1;
        }
        tracing::trace!("despawned {} node(s) rooted at {}", removed.len(), id);
        Ok(removed)
    }

    fn collect_post_order(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for &child in self.children(id) {
            self.collect_post_order(child, out);
        }
        out.push(id);
    }

    fn unlink(&mut self, id: NodeId, parent: Option<NodeId>) {
        match parent {
            Some(p) => {
                if let Some(parent_node) = self.get_mut(p) {
                    parent_node.children.retain(|&c| c != id);
                }
            }
            None => self.roots.retain(|&r| r != id),
        }
    }

    /// Returns true if `id` refers to a live node.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Gets a node by id.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_ref()
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_mut()
    }

    /// Gets a node by id, failing on stale ids.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] if `id` is stale.
    pub fn node(&self, id: NodeId) -> SceneResult<&SceneNode> {
        self.get(id).ok_or(SceneError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> SceneResult<&mut SceneNode> {
        self.get_mut(id).ok_or(SceneError::NodeNotFound(id))
    }

    /// Returns all root nodes.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(SceneNode::parent)
    }

    /// Returns the children of a node (empty for stale ids).
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], SceneNode::children)
    }

    /// Iterates `id`'s ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        Ancestors {
            graph: self,
            next: self.parent(id),
        }
    }

    /// Returns true if `ancestor` is `id` or one of its ancestors.
    #[must_use]
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        id == ancestor || self.ancestors(id).any(|a| a == ancestor)
    }

    /// Moves a node under a new parent (or to the roots).
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for stale ids and
    /// [`SceneError::CycleDetected`] if `new_parent` lies inside `id`'s subtree.
    pub fn reparent(&mut self, id: NodeId, new_parent: Option<NodeId>) -> SceneResult<()> {
        let old_parent = self.node(id)?.parent;
        if let Some(p) = new_parent {
            self.node(p)?;
            if self.is_ancestor_or_self(id, p) {
                return Err(SceneError::CycleDetected { child: id, parent: p });
            }
        }
        if old_parent == new_parent {
            return Ok(());
        }

        self.unlink(id, old_parent);
        match new_parent {
            Some(p) => self.node_mut(p)?.children.push(id),
            None => self.roots.push(id),
        }
        let node = self.node_mut(id)?;
        node.parent = new_parent;
        node.dirty_world = true;
        Ok(())
    }

    /// Sets a node's own enabled flag.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] if `id` is stale.
    pub fn set_enabled(&mut self, id: NodeId, enabled: bool) -> SceneResult<()> {
        self.node_mut(id)?.enabled = enabled;
        Ok(())
    }

    /// True if the node and every ancestor are enabled.
    #[must_use]
    pub fn is_enabled_in_hierarchy(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(SceneNode::is_enabled)
            && self
                .ancestors(id)
                .all(|a| self.get(a).is_some_and(SceneNode::is_enabled))
    }

    /// Sets the local position.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] if `id` is stale.
    pub fn set_local_position(&mut self, id: NodeId, position: Vec3) -> SceneResult<()> {
        let node = self.node_mut(id)?;
        if node.position != position {
            node.position = position;
            node.dirty_local = true;
        }
        Ok(())
    }

    /// Sets the local rotation.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] if `id` is stale.
    pub fn set_local_rotation(&mut self, id: NodeId, rotation: Quat) -> SceneResult<()> {
        let node = self.node_mut(id)?;
        if node.rotation != rotation {
            node.rotation = rotation;
            node.dirty_local = true;
        }
        Ok(())
    }

    /// Sets the local scale. Negative components (mirroring) are allowed.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] if `id` is stale.
    pub fn set_local_scale(&mut self, id: NodeId, scale: Vec3) -> SceneResult<()> {
        let node = self.node_mut(id)?;
        if node.scale != scale {
            node.scale = scale;
            node.dirty_local = true;
        }
        Ok(())
    }

    /// Stores a freshly computed world transform. Intended for sync hooks.
    pub fn set_world_transform(&mut self, id: NodeId, world: Mat4) {
        if let Some(node) = self.get_mut(id) {
            node.world_transform = world;
        }
    }

    /// Routes this node's sync through the caller-supplied hook.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::AlreadyAttached`] if a hook is already attached.
    pub fn attach_hook(&mut self, id: NodeId) -> SceneResult<()> {
        let node = self.node_mut(id)?;
        if node.sync_mode == SyncMode::Hooked {
            return Err(SceneError::AlreadyAttached(id));
        }
        node.sync_mode = SyncMode::Hooked;
        node.dirty_world = true;
        Ok(())
    }

    /// Restores [`PlainSync`] for this node.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] if `id` is stale.
    pub fn detach_hook(&mut self, id: NodeId) -> SceneResult<()> {
        let node = self.node_mut(id)?;
        node.sync_mode = SyncMode::Plain;
        node.dirty_world = true;
        Ok(())
    }

    /// Returns all node ids in depth-first pre-order.
    pub fn iter_dfs(&self) -> impl Iterator<Item = NodeId> + '_ {
        DfsIterator {
            graph: self,
            stack: self.roots.iter().rev().copied().collect(),
        }
    }

    /// Returns `root` and its descendants in depth-first pre-order.
    pub fn iter_subtree(&self, root: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let stack = if self.contains(root) { vec![root] } else { Vec::new() };
        DfsIterator { graph: self, stack }
    }

    /// Brings every dirty node up to date, top-down.
    ///
    /// A node is recomputed iff it or an ancestor was dirty. Clean subtrees
    /// are visited but untouched.
    pub fn sync_hierarchy(&mut self, hook: &mut dyn TransformSync) -> SyncStats {
        let mut stats = SyncStats::default();
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            stats.visited += 1;
            if self.sync_one(id, hook) {
                stats.recomputed += 1;
            }
            stack.extend(self.children(id).iter().rev().copied());
        }
        stats
    }

    /// Lazily syncs the path from the root down to `id` and returns its
    /// world transform.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] if `id` is stale.
    pub fn sync_node(&mut self, id: NodeId, hook: &mut dyn TransformSync) -> SceneResult<Mat4> {
        self.node(id)?;
        let mut path: Vec<NodeId> = self.ancestors(id).collect();
        path.reverse();
        path.push(id);

        for node in path {
            self.sync_one(node, hook);
        }
        Ok(self.node(id)?.world_transform)
    }

    fn sync_one(&mut self, id: NodeId, hook: &mut dyn TransformSync) -> bool {
        let Some(node) = self.get_mut(id) else {
            return false;
        };
        node.refresh_local();

        let mut plain = PlainSync;
        let strategy: &mut dyn TransformSync = match node.sync_mode {
            SyncMode::Plain => &mut plain,
            SyncMode::Hooked => hook,
        };
        if !strategy.needs_sync(self, id) {
            return false;
        }
        strategy.sync(self, id);

        let Some(node) = self.get_mut(id) else {
            return true;
        };
        node.dirty_world = false;
        let children = std::mem::take(&mut node.children);
        for &child in &children {
            if let Some(child_node) = self.get_mut(child) {
                child_node.dirty_world = true;
            }
        }
        if let Some(node) = self.get_mut(id) {
            node.children = children;
        }
        true
    }
}

struct Ancestors<'a> {
    graph: &'a SceneGraph,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.graph.parent(id);
        Some(id)
    }
}

/// Depth-first iterator over the graph.
struct DfsIterator<'a> {
    graph: &'a SceneGraph,
    stack: Vec<NodeId>,
}

impl Iterator for DfsIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;

        // Push children in reverse order so they're processed left-to-right
        self.stack.extend(self.graph.children(id).iter().rev().copied());

        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every node it is asked to sync.
    #[derive(Default)]
    struct Recorder {
        synced: Vec<NodeId>,
    }

    impl TransformSync for Recorder {
        fn sync(&mut self, graph: &mut SceneGraph, id: NodeId) {
            self.synced.push(id);
            PlainSync.sync(graph, id);
        }
    }

    #[test]
    fn test_tree_hierarchy() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn("root", None).unwrap();
        let a = graph.spawn("a", Some(root)).unwrap();
        let b = graph.spawn("b", Some(root)).unwrap();
        let a1 = graph.spawn("a1", Some(a)).unwrap();

        assert_eq!(graph.children(root), &[a, b]);
        assert_eq!(graph.roots(), &[root]);
        assert_eq!(graph.iter_dfs().collect::<Vec<_>>(), vec![root, a, a1, b]);
        assert_eq!(graph.ancestors(a1).collect::<Vec<_>>(), vec![a, root]);
    }

    #[test]
    fn test_despawn_invalidates_ids() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn("root", None).unwrap();
        let a = graph.spawn("a", Some(root)).unwrap();
        let a1 = graph.spawn("a1", Some(a)).unwrap();

        let removed = graph.despawn(a).unwrap();
        assert_eq!(removed, vec![a1, a]);
        assert!(!graph.contains(a));
        assert!(graph.children(root).is_empty());

        // Slot reuse bumps the generation, so the old id stays dead.
        let fresh = graph.spawn("fresh", Some(root)).unwrap();
        assert!(!graph.contains(a1));
        assert!(!graph.contains(a));
        assert_ne!(fresh, a);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_reparent_rejects_cycles() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn("root", None).unwrap();
        let child = graph.spawn("child", Some(root)).unwrap();

        let err = graph.reparent(root, Some(child)).unwrap_err();
        assert_eq!(err, SceneError::CycleDetected { child: root, parent: child });

        graph.reparent(child, None).unwrap();
        assert_eq!(graph.roots(), &[root, child]);
    }

    #[test]
    fn test_enabled_in_hierarchy() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn("root", None).unwrap();
        let child = graph.spawn("child", Some(root)).unwrap();

        assert!(graph.is_enabled_in_hierarchy(child));
        graph.set_enabled(root, false).unwrap();
        assert!(!graph.is_enabled_in_hierarchy(child));
        assert!(graph.get(child).unwrap().is_enabled());
    }

    #[test]
    fn test_sync_only_touches_dirty_subtrees() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn("root", None).unwrap();
        let a = graph.spawn("a", Some(root)).unwrap();
        let b = graph.spawn("b", Some(root)).unwrap();
        let a1 = graph.spawn("a1", Some(a)).unwrap();
        for id in [root, a, b, a1] {
            graph.attach_hook(id).unwrap();
        }

        let mut hook = Recorder::default();
        let stats = graph.sync_hierarchy(&mut hook);
        assert_eq!(stats.recomputed, 4);

        hook.synced.clear();
        let stats = graph.sync_hierarchy(&mut hook);
        assert_eq!(stats.recomputed, 0);
        assert_eq!(stats.visited, 4);

        graph.set_local_position(a, Vec3::X).unwrap();
        graph.sync_hierarchy(&mut hook);
        assert_eq!(hook.synced, vec![a, a1]);
    }

    #[test]
    fn test_plain_sync_composes_parent() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn("root", None).unwrap();
        let child = graph.spawn("child", Some(root)).unwrap();
        graph.set_local_position(root, Vec3::new(10.0, 0.0, 0.0)).unwrap();
        graph.set_local_position(child, Vec3::new(0.0, 5.0, 0.0)).unwrap();

        let world = graph.sync_node(child, &mut PlainSync).unwrap();
        assert_eq!(world.transform_point3(Vec3::ZERO), Vec3::new(10.0, 5.0, 0.0));
    }

    #[test]
    fn test_attach_twice_fails() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn("root", None).unwrap();
        graph.attach_hook(root).unwrap();
        assert_eq!(graph.attach_hook(root), Err(SceneError::AlreadyAttached(root)));
        graph.detach_hook(root).unwrap();
        assert_eq!(graph.get(root).unwrap().sync_mode(), SyncMode::Plain);
    }
}
