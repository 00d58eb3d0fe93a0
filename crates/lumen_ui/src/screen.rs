//! Screen contexts: the coordinate regime shared by a layout subtree.
//!
//! ```text
//!   Overlay ── layout units ──► ortho(0..w, 0..h) ──► clip space
//!   Camera  ── layout units ──► scale · offset    ──► camera.world ──► world
//!   World   ── layout units ──► scale             ──► screen node  ──► world
//! ```

use glam::{Mat4, Vec2, Vec3};
use lumen_scene::NodeId;
use serde::{Deserialize, Serialize};

use crate::config::ScreenConfig;

/// Identifier of a screen context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScreenId(pub(crate) u32);

impl ScreenId {
    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Coordinate regime a screen renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenType {
    /// Fixed-pixel overlay drawn in clip space.
    #[default]
    Overlay,
    /// Billboard at a fixed distance in front of a camera.
    Camera,
    /// Ordinary 3D object placed by the screen node.
    World,
}

impl ScreenType {
    /// Stable numeric tag, used by the render snapshot.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::Overlay => 0,
            Self::Camera => 1,
            Self::World => 2,
        }
    }
}

/// How the layout resolution follows the device resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    /// One layout unit per device pixel.
    #[default]
    None,
    /// Scale by a blend of the horizontal and vertical ratios to the
    /// reference resolution.
    Blend,
}

/// Camera data published to camera and world screens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    /// Camera-to-world transform.
    pub world: Mat4,
    /// Projection matrix (glam convention, depth `0..1`).
    pub projection: Mat4,
    /// Device viewport size in pixels.
    pub viewport: Vec2,
}

impl CameraView {
    /// Creates a camera view.
    #[must_use]
    pub const fn new(world: Mat4, projection: Mat4, viewport: Vec2) -> Self {
        Self {
            world,
            projection,
            viewport,
        }
    }

    /// Right-handed perspective camera filling `viewport`.
    #[must_use]
    pub fn perspective(world: Mat4, fov_y: f32, viewport: Vec2, near: f32, far: f32) -> Self {
        let aspect = if viewport.y > 0.0 {
            viewport.x / viewport.y
        } else {
            1.0
        };
        Self::new(world, Mat4::perspective_rh(fov_y, aspect, near, far), viewport)
    }

    /// World-to-clip transform.
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.world.inverse()
    }

    /// Unprojects a device pixel at the given NDC depth (`0` near, `1` far).
    ///
    /// Returns `None` for an empty viewport or a singular projection.
    #[must_use]
    pub fn unproject(&self, device: Vec2, ndc_depth: f32) -> Option<Vec3> {
        if self.viewport.x <= 0.0 || self.viewport.y <= 0.0 {
            return None;
        }
        let ndc = Vec3::new(
            device.x / self.viewport.x * 2.0 - 1.0,
            1.0 - device.y / self.viewport.y * 2.0,
            ndc_depth,
        );
        let point = self.view_projection().inverse().project_point3(ndc);
        point.is_finite().then_some(point)
    }
}

/// Coordinate space definition shared by a layout subtree.
#[derive(Debug, Clone)]
pub struct ScreenContext {
    id: ScreenId,
    name: String,
    /// Scene node carrying this screen.
    root: NodeId,
    screen_type: ScreenType,
    resolution: Vec2,
    reference_resolution: Vec2,
    scale_mode: ScaleMode,
    scale_blend: f32,
    /// Router order, higher first.
    priority: i32,
    enabled: bool,
    /// Camera screens: distance of the screen plane in front of the camera.
    screen_distance: f32,
    /// World units per layout unit (camera and world screens).
    world_scale: f32,
    camera: Option<CameraView>,
    /// World transform of the screen node, refreshed every sync.
    root_world: Mat4,
    /// Layout nodes resolving against this screen.
    dependents: Vec<NodeId>,
    draw_order_counter: u32,
    draw_order_dirty: bool,
}

impl ScreenContext {
    /// Creates a screen from its configuration.
    #[must_use]
    pub fn from_config(id: ScreenId, root: NodeId, config: &ScreenConfig) -> Self {
        let mut screen = Self {
            id,
            name: config.name.clone(),
            root,
            screen_type: config.screen_type,
            resolution: Vec2::ZERO,
            reference_resolution: Vec2::ONE,
            scale_mode: config.scale_mode,
            scale_blend: 0.0,
            priority: config.priority,
            enabled: config.enabled,
            screen_distance: config.screen_distance.max(0.0),
            world_scale: if config.world_scale > 0.0 {
                config.world_scale
            } else {
                ScreenConfig::DEFAULT_WORLD_SCALE
            },
            camera: None,
            root_world: Mat4::IDENTITY,
            dependents: Vec::new(),
            draw_order_counter: 0,
            draw_order_dirty: true,
        };
        screen.set_resolution(Vec2::from(config.resolution));
        screen.set_reference_resolution(Vec2::from(config.reference_resolution));
        screen.set_scale_blend(config.scale_blend);
        screen
    }

    /// Screen id.
    #[must_use]
    pub const fn id(&self) -> ScreenId {
        self.id
    }

    /// Debug name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scene node carrying this screen.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Current coordinate regime.
    #[must_use]
    pub const fn screen_type(&self) -> ScreenType {
        self.screen_type
    }

    pub(crate) fn set_screen_type(&mut self, screen_type: ScreenType) -> bool {
        let changed = self.screen_type != screen_type;
        self.screen_type = screen_type;
        changed
    }

    /// Device resolution.
    #[must_use]
    pub const fn resolution(&self) -> Vec2 {
        self.resolution
    }

    /// Sets the resolution. Negative or non-finite components become `0`.
    pub(crate) fn set_resolution(&mut self, resolution: Vec2) -> bool {
        let sanitized = Vec2::new(sanitize_extent(resolution.x), sanitize_extent(resolution.y));
        if sanitized != resolution {
            tracing::warn!("screen '{}' resolution {resolution} clamped to {sanitized}", self.name);
        }
        let changed = sanitized != self.resolution;
        self.resolution = sanitized;
        changed
    }

    /// Reference resolution used by [`ScaleMode::Blend`].
    #[must_use]
    pub const fn reference_resolution(&self) -> Vec2 {
        self.reference_resolution
    }

    /// Sets the reference resolution. Components are clamped to at least `1`.
    pub(crate) fn set_reference_resolution(&mut self, reference: Vec2) -> bool {
        let sanitized = Vec2::new(
            sanitize_extent(reference.x).max(1.0),
            sanitize_extent(reference.y).max(1.0),
        );
        let changed = sanitized != self.reference_resolution;
        self.reference_resolution = sanitized;
        changed
    }

    /// Scale mode.
    #[must_use]
    pub const fn scale_mode(&self) -> ScaleMode {
        self.scale_mode
    }

    pub(crate) fn set_scale_mode(&mut self, mode: ScaleMode) -> bool {
        let changed = self.scale_mode != mode;
        self.scale_mode = mode;
        changed
    }

    /// Blend between horizontal (`0`) and vertical (`1`) scale ratios.
    #[must_use]
    pub const fn scale_blend(&self) -> f32 {
        self.scale_blend
    }

    pub(crate) fn set_scale_blend(&mut self, blend: f32) -> bool {
        let sanitized = if blend.is_nan() { 0.0 } else { blend.clamp(0.0, 1.0) };
        let changed = sanitized != self.scale_blend;
        self.scale_blend = sanitized;
        changed
    }

    /// Router priority, higher is tested first.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// True if the screen takes part in layout routing.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Distance of a camera screen in front of its camera.
    #[must_use]
    pub const fn screen_distance(&self) -> f32 {
        self.screen_distance
    }

    /// World units per layout unit.
    #[must_use]
    pub const fn world_scale(&self) -> f32 {
        self.world_scale
    }

    /// Camera currently published to this screen.
    #[must_use]
    pub const fn camera(&self) -> Option<&CameraView> {
        self.camera.as_ref()
    }

    pub(crate) fn set_camera(&mut self, camera: Option<CameraView>) {
        self.camera = camera;
    }

    pub(crate) fn set_root_world(&mut self, world: Mat4) -> bool {
        let changed = self.root_world != world;
        self.root_world = world;
        changed
    }

    /// Layout units per device pixel, inverted: device = layout * scale.
    #[must_use]
    pub fn scale_factor(&self) -> f32 {
        match self.scale_mode {
            ScaleMode::None => 1.0,
            ScaleMode::Blend => {
                let lx = self.resolution.x / self.reference_resolution.x;
                let ly = self.resolution.y / self.reference_resolution.y;
                lx * (1.0 - self.scale_blend) + ly * self.scale_blend
            }
        }
    }

    /// Size that tree roots anchor against.
    #[must_use]
    pub fn layout_size(&self) -> Vec2 {
        let scale = self.scale_factor();
        if scale > 0.0 {
            self.resolution / scale
        } else {
            Vec2::ZERO
        }
    }

    /// Transform from this screen's layout space into the render space
    /// of its regime.
    ///
    /// Returns `None` when the regime needs data that is missing: a camera
    /// for camera screens, or a non-empty layout size for overlays.
    #[must_use]
    pub fn screen_to_world(&self) -> Option<Mat4> {
        let size = self.layout_size();
        match self.screen_type {
            ScreenType::Overlay => {
                if size.x <= 0.0 || size.y <= 0.0 {
                    return None;
                }
                Some(Mat4::orthographic_rh(0.0, size.x, 0.0, size.y, -1.0, 1.0))
            }
            ScreenType::Camera => {
                let camera = self.camera.as_ref()?;
                let s = self.world_scale;
                let offset = Vec3::new(-size.x * s * 0.5, -size.y * s * 0.5, -self.screen_distance);
                Some(camera.world * Mat4::from_translation(offset) * Mat4::from_scale(Vec3::splat(s)))
            }
            ScreenType::World => Some(self.root_world * Mat4::from_scale(Vec3::splat(self.world_scale))),
        }
    }

    /// Maps a device pixel (top-left origin) to overlay clip space.
    #[must_use]
    pub fn device_to_clip(&self, device: Vec2) -> Option<Vec2> {
        if self.resolution.x <= 0.0 || self.resolution.y <= 0.0 {
            return None;
        }
        Some(Vec2::new(
            device.x / self.resolution.x * 2.0 - 1.0,
            1.0 - device.y / self.resolution.y * 2.0,
        ))
    }

    /// Layout nodes registered against this screen.
    #[must_use]
    pub fn dependents(&self) -> &[NodeId] {
        &self.dependents
    }

    pub(crate) fn register(&mut self, node: NodeId) {
        if !self.dependents.contains(&node) {
            self.dependents.push(node);
        }
        self.draw_order_dirty = true;
    }

    pub(crate) fn deregister(&mut self, node: NodeId) {
        self.dependents.retain(|&n| n != node);
        self.draw_order_dirty = true;
    }

    /// True if draw order must be re-synced before the next render.
    #[must_use]
    pub const fn is_draw_order_dirty(&self) -> bool {
        self.draw_order_dirty
    }

    pub(crate) fn mark_draw_order_dirty(&mut self) {
        self.draw_order_dirty = true;
    }

    pub(crate) fn begin_draw_order(&mut self) {
        self.draw_order_counter = 0;
    }

    pub(crate) fn next_draw_order(&mut self) -> u32 {
        self.draw_order_counter += 1;
        self.draw_order_counter
    }

    pub(crate) fn finish_draw_order(&mut self) {
        self.draw_order_dirty = false;
    }
}

fn sanitize_extent(v: f32) -> f32 {
    if v.is_finite() {
        v.max(0.0)
    } else {
        0.0
    }
}
