//! # Lumen UI
//!
//! Anchored layout and pointer routing on top of [`lumen_scene`]:
//! - Screen contexts: overlay, camera-relative billboard or world object
//! - Anchor/corner/pivot layout resolved lazily through the graph's sync hook
//! - Ray-based hit testing that inverts the exact transforms the renderer uses
//! - Per-pointer capture, hover and forced release
//!
//! ## Frame
//!
//! ```text
//!   pointer samples ──► queue
//!                         │
//!   update() ── layout sync ──► dispatch queue ──► listeners ──► draw order
//!                                                                    │
//!   render_items() ◄─────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use lumen_ui::{Anchor, PointerSample, ScreenConfig, UiSystem};
//!
//! let mut ui = UiSystem::default();
//! let (root, _) = ui.spawn_screen(None, &ScreenConfig::overlay("hud", 800.0, 600.0))?;
//! let panel = ui.spawn_element("panel", Some(root))?;
//! ui.set_anchor(panel, Anchor::FILL)?;
//!
//! ui.pointer(PointerSample::mouse_down(400.0, 300.0));
//! let report = ui.update();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod compositor;
pub mod config;
pub mod element;
pub mod error;
pub mod events;
pub mod input;
pub mod layout;
pub mod ray;
pub mod render;
pub mod router;
pub mod screen;
pub mod system;

pub use compositor::Compositor;
pub use config::{RouterConfig, ScreenConfig, UiConfig};
pub use element::{LayoutFlags, LayoutNode};
pub use error::{UiError, UiResult};
pub use events::{ListenerId, Listeners, PointerEvent, PointerEventKind, ResizeEvent};
pub use input::{MouseButton, PointerAction, PointerId, PointerSample, PointerSource};
pub use layout::{Anchor, Corners, ElementRect, Pivot};
pub use ray::{Ray, RayStrategy};
pub use render::{RenderItem, RenderList};
pub use router::{Hit, HitTest, PointerGesture, PointerRouter};
pub use screen::{CameraView, ScaleMode, ScreenContext, ScreenId, ScreenType};
pub use system::{FrameReport, UiSystem};
