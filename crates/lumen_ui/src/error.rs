//! # UI Error Types
//!
//! Only API misuse surfaces as an error. Geometric faults (degenerate sizes,
//! missing cameras, bad anchors) are clamped or treated as misses instead.

use std::path::PathBuf;

use lumen_scene::{NodeId, SceneError};
use thiserror::Error;

use crate::screen::ScreenId;

/// Errors that can occur in the UI layer.
#[derive(Error, Debug)]
pub enum UiError {
    /// Underlying scene graph rejected the operation.
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// Node exists but carries no layout state.
    #[error("node {0} has no layout attached")]
    NoLayout(NodeId),

    /// Layout is already attached to this node.
    #[error("node {0} already has a layout attached")]
    LayoutAlreadyAttached(NodeId),

    /// Node already carries a screen context.
    #[error("node {0} already carries a screen")]
    ScreenAlreadyAttached(NodeId),

    /// Screen id is unknown or was removed.
    #[error("screen not found: {0:?}")]
    ScreenNotFound(ScreenId),

    /// Configuration text could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] toml::de::Error),

    /// Configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    ConfigIo {
        /// File that failed.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

/// Result type for UI operations.
pub type UiResult<T> = Result<T, UiError>;
