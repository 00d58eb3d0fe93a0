//! # Scene Error Types

use thiserror::Error;

use crate::node::NodeId;

/// Errors that can occur when mutating the scene graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The id is stale or was never issued.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Reparenting would make a node its own ancestor.
    #[error("cannot parent {child} under {parent}: cycle")]
    CycleDetected {
        /// The node being moved.
        child: NodeId,
        /// The requested new parent.
        parent: NodeId,
    },

    /// Every slot index is in use.
    #[error("scene graph capacity exceeded")]
    CapacityExceeded,

    /// A sync hook is already attached to this node.
    #[error("node {0} already has a sync hook attached")]
    AlreadyAttached(NodeId),
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;
