//! Pointer rays per screen regime.
//!
//! ```text
//!   Overlay        device ──► clip (x, y, 0) + forward z      (unbounded line)
//!   Camera/World   device ──► unproject(near) → unproject(far) (t >= 0)
//! ```
//!
//! Either way the ray is pulled into a node's local frame through its
//! inverse world transform and intersected with the local `z = 0` plane.

use glam::{Mat4, Vec2, Vec3};

use crate::screen::{ScreenContext, ScreenType};

/// How a screen turns device points into rays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayStrategy {
    /// Device point straight into clip space.
    Orthographic,
    /// Camera unprojection at near and far depth.
    Unproject,
}

impl From<ScreenType> for RayStrategy {
    fn from(screen_type: ScreenType) -> Self {
        match screen_type {
            ScreenType::Overlay => Self::Orthographic,
            ScreenType::Camera | ScreenType::World => Self::Unproject,
        }
    }
}

/// A pointer ray in a screen's render space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point.
    pub origin: Vec3,
    /// Direction, not normalized.
    pub direction: Vec3,
    /// Rays from a camera only hit in front of their origin.
    pub bounded: bool,
}

impl Ray {
    /// Builds the ray for `device` on `screen`.
    ///
    /// Returns `None` when the screen lacks the data the strategy needs
    /// (an empty resolution, or no camera).
    #[must_use]
    pub fn build(strategy: RayStrategy, screen: &ScreenContext, device: Vec2) -> Option<Self> {
        match strategy {
            RayStrategy::Orthographic => {
                let clip = screen.device_to_clip(device)?;
                Some(Self {
                    origin: clip.extend(0.0),
                    direction: Vec3::Z,
                    bounded: false,
                })
            }
            RayStrategy::Unproject => {
                let camera = screen.camera()?;
                let near = camera.unproject(device, 0.0)?;
                let far = camera.unproject(device, 1.0)?;
                let direction = far - near;
                (direction.length_squared() > 0.0).then_some(Self {
                    origin: near,
                    direction,
                    bounded: true,
                })
            }
        }
    }

    /// Intersects the ray with the local `z = 0` plane of the frame that
    /// `inverse_world` maps into. Returns the local 2D point.
    #[must_use]
    pub fn intersect_local(&self, inverse_world: &Mat4) -> Option<Vec2> {
        let origin = inverse_world.transform_point3(self.origin);
        let direction = inverse_world.transform_vector3(self.direction);
        if !origin.is_finite() || !direction.is_finite() || direction.z.abs() <= f32::EPSILON {
            return None;
        }
        let t = -origin.z / direction.z;
        if self.bounded && t < 0.0 {
            return None;
        }
        let hit = origin + direction * t;
        hit.is_finite().then(|| hit.truncate())
    }
}

#[cfg(test)]
mod tests {
    use lumen_scene::NodeId;

    use super::*;
    use crate::config::ScreenConfig;
    use crate::screen::ScreenId;

    #[test]
    fn test_overlay_ray_lands_on_layout_point() {
        let screen = ScreenContext::from_config(
            ScreenId(0),
            NodeId::new(0, 0),
            &ScreenConfig::overlay("hud", 800.0, 600.0),
        );
        let world = screen.screen_to_world().unwrap();
        let ray = Ray::build(RayStrategy::Orthographic, &screen, Vec2::new(400.0, 150.0)).unwrap();

        // Device y grows downward, layout y upward.
        let local = ray.intersect_local(&world.inverse()).unwrap();
        assert!((local - Vec2::new(400.0, 450.0)).length() < 1e-3);
    }

    #[test]
    fn test_bounded_ray_ignores_planes_behind() {
        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, 5.0),
            direction: Vec3::new(0.0, 0.0, 1.0),
            bounded: true,
        };
        assert!(ray.intersect_local(&Mat4::IDENTITY).is_none());

        let toward = Ray {
            direction: Vec3::new(0.0, 0.0, -1.0),
            ..ray
        };
        assert_eq!(toward.intersect_local(&Mat4::IDENTITY), Some(Vec2::ZERO));
    }

    #[test]
    fn test_parallel_ray_misses() {
        let ray = Ray {
            origin: Vec3::ZERO,
            direction: Vec3::X,
            bounded: false,
        };
        assert!(ray.intersect_local(&Mat4::IDENTITY).is_none());
    }

    #[test]
    fn test_camera_ray_needs_camera() {
        let screen = ScreenContext::from_config(
            ScreenId(0),
            NodeId::new(0, 0),
            &ScreenConfig::overlay("world", 800.0, 600.0).with_type(ScreenType::World),
        );
        assert!(Ray::build(RayStrategy::Unproject, &screen, Vec2::ZERO).is_none());
    }
}
