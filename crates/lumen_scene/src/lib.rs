//! # Lumen Scene
//!
//! Minimal node graph the UI layer is embedded in:
//! - Generational node ids (stale handles never alias a new node)
//! - Parent/child hierarchy with enable/disable
//! - Local TRS with a cached world transform per node
//! - Lazy, top-down transform sync through a pluggable strategy
//!
//! ## Sync Model
//!
//! ```text
//!   set_local_*  ──► dirty_local ──► refresh_local ──► dirty_world
//!                                                         │
//!   sync_hierarchy (pre-order) ──► strategy.sync ◄────────┘
//!                                     │
//!                                     └──► children.dirty_world = true
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use lumen_scene::{PlainSync, SceneGraph};
//!
//! let mut graph = SceneGraph::new();
//! let root = graph.spawn("root", None)?;
//! let stats = graph.sync_hierarchy(&mut PlainSync);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod graph;
pub mod node;
pub mod sync;

pub use error::{SceneError, SceneResult};
pub use graph::SceneGraph;
pub use node::{NodeId, SceneNode, SyncMode};
pub use sync::{PlainSync, SyncStats, TransformSync};
