use glam::{EulerRot, Quat, Vec3};
use serde::Deserialize;

use crate::config::DEFAULT_SCALE;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: Vec3,
    pub rotation: Quat,
    pub translation: Vec3,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Axes {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Axes> for Vec3 {
    fn from(a: Axes) -> Self {
        Vec3::new(a.x, a.y, a.z)
    }
}

/// Optional placement fields shared by `init` asset entries and `place`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlacementParams {
    pub scale: Option<f32>,
    /// Euler angles in degrees.
    pub rotation: Option<Axes>,
    pub translation: Option<Axes>,
}

impl PlacementParams {
    /// Fill fields left unset from `defaults`.
    pub fn or(self, defaults: PlacementParams) -> Self {
        Self {
            scale: self.scale.or(defaults.scale),
            rotation: self.rotation.or(defaults.rotation),
            translation: self.translation.or(defaults.translation),
        }
    }

    /// World transform for an item placed at `marker`. The yaw is offset by
    /// the camera heading (radians) captured when the marker was resolved.
    pub fn resolve(&self, marker: Vec3, camera_yaw: f32) -> Transform {
        let scale = self.scale.unwrap_or(DEFAULT_SCALE);
        let rotation = self.rotation.unwrap_or_default();
        let offset: Vec3 = self.translation.unwrap_or_default().into();

        Transform {
            scale: Vec3::splat(scale),
            rotation: Quat::from_euler(
                EulerRot::YXZ,
                rotation.y.to_radians() + camera_yaw,
                rotation.x.to_radians(),
                rotation.z.to_radians(),
            ),
            translation: marker + offset,
        }
    }
}
