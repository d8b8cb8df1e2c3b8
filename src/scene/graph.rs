// Capability interfaces onto the external rendering / scene-graph engine.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use glam::Vec3;

use super::transform::Transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnchorId(pub u64);

/// Engine-defined identifier of one animation on one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackHandle(pub u64);

/// A detected real-world surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceAnchor {
    pub id: AnchorId,
    /// World-space center of the surface.
    pub position: Vec3,
}

/// Read-only view of the entity hierarchy.
pub trait EntityTree {
    fn children(&self, entity: EntityId) -> Vec<EntityId>;
    fn animations(&self, entity: EntityId) -> Vec<AnimationId>;
}

pub trait AnimationPlayer: EntityTree {
    fn play(&mut self, entity: EntityId, animation: AnimationId, repeat: bool) -> PlaybackHandle;
    fn stop(&mut self, handle: PlaybackHandle);
    /// Ask the engine to report natural completions on `entity` as
    /// `ArEvent::PlaybackCompleted`.
    fn subscribe_playback_completed(&mut self, entity: EntityId);
}

/// Everything the scene state machine calls into. Lives on the scene-owning
/// task; never shared.
pub trait SceneGraph: AnimationPlayer + Send {
    fn create_marker(&mut self, anchor: AnchorId, position: Vec3) -> EntityId;
    fn move_marker(&mut self, marker: EntityId, position: Vec3);
    fn destroy(&mut self, entity: EntityId);
    /// Ray from the viewport center against existing surface geometry.
    fn raycast_from_center(&mut self) -> Option<Vec3>;
    fn attach(&mut self, entity: EntityId, anchor: AnchorId, transform: Transform);
    fn detach(&mut self, entity: EntityId);
    fn set_coaching_overlay(&mut self, enabled: bool);
}

/// Turns a downloaded file into a loaded entity. Runs off the scene task.
#[async_trait]
pub trait AssetParser: Send + Sync {
    async fn parse(&self, name: &str, path: &Path) -> Result<EntityId>;
}
