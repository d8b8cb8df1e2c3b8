// Recording stand-ins for the rendering engine, shared by the scene tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use glam::Vec3;
use parking_lot::Mutex;

use ar_scene_engine::engine::registry::LoadTasks;
use ar_scene_engine::scene::graph::{
    AnchorId, AnimationId, AnimationPlayer, AssetParser, EntityId, EntityTree, PlaybackHandle,
    SceneGraph,
};
use ar_scene_engine::scene::transform::Transform;
use ar_scene_engine::source::locator::AssetLocator;

pub const MARKER_BASE: u64 = 1000;

#[derive(Default)]
pub struct SceneLog {
    pub ops: Vec<String>,
    pub live_markers: HashSet<EntityId>,
    pub marker_positions: HashMap<EntityId, Vec3>,
    pub attached: HashMap<EntityId, (AnchorId, Transform)>,
    pub coaching_overlay: Option<bool>,
    pub raycast: Option<Vec3>,
    pub children: HashMap<EntityId, Vec<EntityId>>,
    pub animations: HashMap<EntityId, Vec<AnimationId>>,
    pub played: Vec<(EntityId, AnimationId, bool)>,
    pub handles: Vec<PlaybackHandle>,
    pub stopped: Vec<PlaybackHandle>,
    pub subscriptions: Vec<EntityId>,
    next_id: u64,
}

#[derive(Clone, Default)]
pub struct FakeScene {
    pub log: Arc<Mutex<SceneLog>>,
}

impl EntityTree for FakeScene {
    fn children(&self, entity: EntityId) -> Vec<EntityId> {
        self.log.lock().children.get(&entity).cloned().unwrap_or_default()
    }

    fn animations(&self, entity: EntityId) -> Vec<AnimationId> {
        self.log.lock().animations.get(&entity).cloned().unwrap_or_default()
    }
}

impl AnimationPlayer for FakeScene {
    fn play(&mut self, entity: EntityId, animation: AnimationId, repeat: bool) -> PlaybackHandle {
        let mut log = self.log.lock();
        log.played.push((entity, animation, repeat));
        log.next_id += 1;
        let handle = PlaybackHandle(log.next_id);
        log.handles.push(handle);
        handle
    }

    fn stop(&mut self, handle: PlaybackHandle) {
        self.log.lock().stopped.push(handle);
    }

    fn subscribe_playback_completed(&mut self, entity: EntityId) {
        self.log.lock().subscriptions.push(entity);
    }
}

impl SceneGraph for FakeScene {
    fn create_marker(&mut self, anchor: AnchorId, position: Vec3) -> EntityId {
        let mut log = self.log.lock();
        log.next_id += 1;
        let marker = EntityId(MARKER_BASE + log.next_id);
        log.live_markers.insert(marker);
        log.marker_positions.insert(marker, position);
        log.ops.push(format!("marker {} on {}", marker.0, anchor.0));
        marker
    }

    fn move_marker(&mut self, marker: EntityId, position: Vec3) {
        self.log.lock().marker_positions.insert(marker, position);
    }

    fn destroy(&mut self, entity: EntityId) {
        let mut log = self.log.lock();
        log.live_markers.remove(&entity);
        log.ops.push(format!("destroy {}", entity.0));
    }

    fn raycast_from_center(&mut self) -> Option<Vec3> {
        self.log.lock().raycast
    }

    fn attach(&mut self, entity: EntityId, anchor: AnchorId, transform: Transform) {
        let mut log = self.log.lock();
        log.attached.insert(entity, (anchor, transform));
        log.ops.push(format!("attach {}", entity.0));
    }

    fn detach(&mut self, entity: EntityId) {
        let mut log = self.log.lock();
        log.attached.remove(&entity);
        log.ops.push(format!("detach {}", entity.0));
    }

    fn set_coaching_overlay(&mut self, enabled: bool) {
        self.log.lock().coaching_overlay = Some(enabled);
    }
}

/// Parses any file into a fixed entity per asset name; names listed in
/// `reject` fail.
#[derive(Default)]
pub struct FakeParser {
    pub entities: HashMap<String, EntityId>,
    pub reject: HashSet<String>,
    pub parsed: Mutex<Vec<(String, PathBuf)>>,
}

#[async_trait]
impl AssetParser for FakeParser {
    async fn parse(&self, name: &str, path: &Path) -> Result<EntityId> {
        self.parsed.lock().push((name.to_string(), path.to_path_buf()));
        if self.reject.contains(name) {
            return Err(anyhow!("unsupported payload"));
        }
        self.entities
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("no entity for {}", name))
    }
}

/// Records pipeline stage requests without running them.
#[derive(Clone, Default)]
pub struct RecordingTasks {
    pub downloads: Arc<Mutex<Vec<AssetLocator>>>,
    pub parses: Arc<Mutex<Vec<(String, PathBuf)>>>,
}

impl LoadTasks for RecordingTasks {
    fn spawn_download(&self, locator: AssetLocator) {
        self.downloads.lock().push(locator);
    }

    fn spawn_parse(&self, name: String, path: PathBuf) {
        self.parses.lock().push((name, path));
    }
}
