//! # Scene Nodes
//!
//! Nodes are addressed by lightweight identifiers consisting of:
//! - An index into the graph's slot array
//! - A generation counter for safe slot reuse

use glam::{Mat4, Quat, Vec3};

/// Unique identifier for a scene node.
///
/// The ID is split into two parts:
/// - Lower 32 bits: Index into the slot array
/// - Upper 32 bits: Generation counter for detecting stale references
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Creates a new node ID from index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the index portion of the node ID.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion of the node ID.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Null/invalid node ID.
    pub const NULL: Self = Self(u64::MAX);

    /// Checks if this node ID is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::NULL
    }
}

impl std::fmt::Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            f.write_str("NodeId(null)")
        } else {
            write!(f, "NodeId({}v{})", self.index(), self.generation())
        }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

/// Which strategy recomputes a node's world transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// `parent.world * local`.
    #[default]
    Plain,
    /// Delegated to the hook passed into the sync walk.
    Hooked,
}

/// A node in the scene graph.
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Debug name.
    pub(crate) name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) enabled: bool,
    pub(crate) position: Vec3,
    pub(crate) rotation: Quat,
    pub(crate) scale: Vec3,
    pub(crate) local_transform: Mat4,
    pub(crate) world_transform: Mat4,
    /// Local TRS changed since the last sync.
    pub(crate) dirty_local: bool,
    /// World transform is stale.
    pub(crate) dirty_world: bool,
    pub(crate) sync_mode: SyncMode,
}

impl SceneNode {
    pub(crate) fn new(name: String, parent: Option<NodeId>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            enabled: true,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            local_transform: Mat4::IDENTITY,
            world_transform: Mat4::IDENTITY,
            dirty_local: true,
            dirty_world: true,
            sync_mode: SyncMode::Plain,
        }
    }

    /// Returns the debug name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parent, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns the children in insertion order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Returns the node's own enabled flag (ignores ancestors).
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Local position.
    #[must_use]
    pub const fn local_position(&self) -> Vec3 {
        self.position
    }

    /// Local rotation.
    #[must_use]
    pub const fn local_rotation(&self) -> Quat {
        self.rotation
    }

    /// Local scale.
    #[must_use]
    pub const fn local_scale(&self) -> Vec3 {
        self.scale
    }

    /// Local TRS matrix as of the last sync.
    #[must_use]
    pub const fn local_transform(&self) -> Mat4 {
        self.local_transform
    }

    /// Cached world transform as of the last sync.
    #[must_use]
    pub const fn world_transform(&self) -> Mat4 {
        self.world_transform
    }

    /// True if the local TRS or the world transform is stale.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty_local || self.dirty_world
    }

    /// Current sync strategy.
    #[must_use]
    pub const fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }

    /// Rebuilds the local matrix from TRS if it changed.
    pub(crate) fn refresh_local(&mut self) {
        if self.dirty_local {
            self.local_transform =
                Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position);
            self.dirty_local = false;
            self.dirty_world = true;
        }
    }
}
