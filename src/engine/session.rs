// Scene lifecycle state machine: scanning, plane found, item placed.

use glam::Vec3;
use tracing::{debug, info, warn};

use super::animation::AnimationCoordinator;
use super::registry::{AssetRegistry, LoadOutcome};
use super::runtime::SceneEvent;
use crate::command::dispatcher::{AssetSpec, Command, PlaceCommand};
use crate::command::outbound::{AnimationStatus, EventSink, OutboundEvent};
use crate::scene::events::ArEvent;
use crate::scene::graph::{AnchorId, EntityId, SceneGraph, SurfaceAnchor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneState {
    NotReady,
    Scanning,
    PlaneFound,
    ItemPlaced,
}

#[derive(Debug, Clone, Copy)]
struct Marker {
    entity: EntityId,
    anchor: AnchorId,
}

/// Last resolved placement point and the camera heading at resolution time.
/// Outlives the marker entity so a placed item can be replaced in place.
#[derive(Debug, Clone, Copy)]
struct PlacementPoint {
    position: Vec3,
    camera_yaw: f32,
}

#[derive(Debug, Clone)]
struct PlacedItem {
    asset: String,
    entity: EntityId,
}

/// Single owner of scene state for one AR session. Not shared: every
/// mutation arrives through [`SceneSession::handle`] on the scene task.
pub struct SceneSession {
    scene: Box<dyn SceneGraph>,
    registry: AssetRegistry,
    animations: AnimationCoordinator,
    sink: EventSink,
    state: SceneState,
    /// Surface anchors in arrival order; the last is the most recent.
    anchors: Vec<SurfaceAnchor>,
    marker: Option<Marker>,
    point: Option<PlacementPoint>,
    placed: Option<PlacedItem>,
    camera_yaw: f32,
    paused: bool,
}

impl SceneSession {
    pub fn new(scene: Box<dyn SceneGraph>, registry: AssetRegistry, sink: EventSink) -> Self {
        Self {
            scene,
            registry,
            animations: AnimationCoordinator::new(),
            sink,
            state: SceneState::NotReady,
            anchors: Vec::new(),
            marker: None,
            point: None,
            placed: None,
            camera_yaw: 0.0,
            paused: false,
        }
    }

    pub fn state(&self) -> SceneState {
        self.state
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn has_marker(&self) -> bool {
        self.marker.is_some()
    }

    pub fn placed_asset(&self) -> Option<&str> {
        self.placed.as_ref().map(|p| p.asset.as_str())
    }

    pub fn handle(&mut self, event: SceneEvent) {
        match event {
            SceneEvent::Command(command) => self.on_command(command),
            SceneEvent::Ar(event) => self.on_ar_event(event),
            SceneEvent::DownloadFinished { name, result } => {
                if let Some(event) = self.registry.on_download_finished(&name, result) {
                    self.sink.emit(event);
                }
            }
            SceneEvent::ParseFinished { name, result } => {
                if let Some(event) = self.registry.on_parse_finished(&name, result) {
                    self.sink.emit(event);
                }
            }
        }
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Init {
                assets,
                coaching_overlay,
            } => self.init(assets, coaching_overlay),
            Command::Place(place) => self.place(place),
            Command::Play { repeat } => self.play(repeat),
        }
    }

    fn init(&mut self, assets: Vec<AssetSpec>, coaching_overlay: Option<bool>) {
        if let Some(enabled) = coaching_overlay {
            self.scene.set_coaching_overlay(enabled);
        }
        for spec in assets {
            let name = spec.locator.name.clone();
            if self.registry.request_load(spec) == LoadOutcome::AlreadyLoaded {
                self.sink.emit(OutboundEvent::Loaded { asset: name });
            }
        }
    }

    fn place(&mut self, command: PlaceCommand) {
        let Some(entity) = self.registry.loaded_entity(&command.asset) else {
            warn!("place {}: asset is not loaded", command.asset);
            return;
        };
        let Some(point) = self.point else {
            warn!("place {}: no placement point yet", command.asset);
            return;
        };
        let Some(anchor) = self.anchors.last().map(|a| a.id) else {
            warn!("place {}: no surface anchor", command.asset);
            return;
        };

        if let Some(previous) = self.placed.take() {
            debug!("detaching previously placed {}", previous.asset);
            self.animations.forget(&mut *self.scene, previous.entity);
            self.scene.detach(previous.entity);
        }

        let params = command.params.or(self.registry.defaults(&command.asset));
        let transform = params.resolve(point.position, point.camera_yaw);
        self.scene.attach(entity, anchor, transform);
        self.destroy_marker();

        info!("placed {} on {:?}", command.asset, anchor);
        self.placed = Some(PlacedItem {
            asset: command.asset.clone(),
            entity,
        });
        self.state = SceneState::ItemPlaced;
        self.sink.emit(OutboundEvent::Rendered {
            asset: command.asset.clone(),
        });

        if command.play {
            self.play_placed(command.repeat);
        }
    }

    fn play(&mut self, repeat: bool) {
        if self.placed.is_none() {
            warn!("play: nothing is placed");
            return;
        }
        self.play_placed(repeat);
    }

    fn play_placed(&mut self, repeat: bool) {
        let Some(item) = self.placed.clone() else {
            return;
        };
        let started = self
            .animations
            .play_all(&mut *self.scene, item.entity, &item.asset, repeat);
        if started > 0 {
            self.sink.emit(OutboundEvent::Animation {
                asset: item.asset,
                status: AnimationStatus::Started,
            });
        }
    }

    fn on_ar_event(&mut self, event: ArEvent) {
        match event {
            ArEvent::SessionStarted => {
                if self.state == SceneState::NotReady {
                    info!("session started, scanning for surfaces");
                    self.state = SceneState::Scanning;
                    self.try_create_marker();
                }
            }
            ArEvent::SessionPaused => self.paused = true,
            ArEvent::SessionResumed => self.paused = false,
            ArEvent::SessionFailed { message } => {
                warn!("AR session failed: {}", message);
                self.sink.emit(OutboundEvent::Error { message });
                self.reset();
            }
            ArEvent::SessionInterrupted => self.sink.emit(OutboundEvent::Interrupted),
            ArEvent::InterruptionEnded => self.sink.emit(OutboundEvent::InterruptionEnded),
            ArEvent::TrackingChanged { state, reason } => {
                self.sink.emit(OutboundEvent::Tracking { state, reason })
            }
            ArEvent::AnchorsAdded(anchors) => {
                if self.paused {
                    debug!("session paused, ignoring {} added anchors", anchors.len());
                    return;
                }
                self.anchors.extend(anchors);
                self.refresh_or_create_marker();
            }
            ArEvent::AnchorsRemoved(ids) => {
                if self.paused {
                    return;
                }
                self.anchors.retain(|a| !ids.contains(&a.id));
                self.on_anchors_removed();
            }
            ArEvent::FrameUpdated { camera_yaw } => {
                if self.paused {
                    return;
                }
                self.camera_yaw = camera_yaw;
                self.refresh_or_create_marker();
            }
            ArEvent::OverlayActivated => {
                self.sink.emit(OutboundEvent::OverlayShown);
                if self.state == SceneState::ItemPlaced {
                    debug!("guidance overlay reactivated, rescanning");
                    self.state = SceneState::Scanning;
                }
            }
            ArEvent::OverlayDeactivated => self.sink.emit(OutboundEvent::OverlayHidden),
            ArEvent::OverlayResetRequested => {
                self.sink.emit(OutboundEvent::OverlayReset);
                self.reset();
            }
            ArEvent::PlaybackCompleted { entity, handle } => {
                if let Some(asset) = self.animations.on_playback_completed(entity, handle) {
                    self.sink.emit(OutboundEvent::Animation {
                        asset,
                        status: AnimationStatus::Stopped,
                    });
                }
            }
        }
    }

    fn refresh_or_create_marker(&mut self) {
        match self.state {
            SceneState::PlaneFound => self.refresh_marker(),
            SceneState::Scanning => self.try_create_marker(),
            SceneState::NotReady | SceneState::ItemPlaced => {}
        }
    }

    /// Scanning -> PlaneFound once a surface exists and nothing is placed.
    fn try_create_marker(&mut self) {
        if self.state != SceneState::Scanning || self.marker.is_some() {
            return;
        }
        let Some(anchor) = self.anchors.last().copied() else {
            return;
        };

        let entity = self.scene.create_marker(anchor.id, anchor.position);
        self.marker = Some(Marker {
            entity,
            anchor: anchor.id,
        });
        self.point = Some(PlacementPoint {
            position: anchor.position,
            camera_yaw: self.camera_yaw,
        });
        self.state = SceneState::PlaneFound;
        info!("surface found, marker {:?} on {:?}", entity, anchor.id);
        self.sink.emit(OutboundEvent::Plane);
    }

    /// A raycast miss leaves the marker where it was.
    fn refresh_marker(&mut self) {
        let Some(marker) = self.marker else {
            return;
        };
        if let Some(position) = self.scene.raycast_from_center() {
            self.scene.move_marker(marker.entity, position);
            self.point = Some(PlacementPoint {
                position,
                camera_yaw: self.camera_yaw,
            });
        }
    }

    fn on_anchors_removed(&mut self) {
        if self.anchors.is_empty() {
            self.point = None;
            self.destroy_marker();
            // The placed entity stays attached until the next placement
            // detaches it, as after session loss.
            if matches!(self.state, SceneState::PlaneFound | SceneState::ItemPlaced) {
                info!("surface lost, back to scanning");
                self.state = SceneState::Scanning;
            }
            return;
        }

        // Marker's own surface went away; re-home it on the newest one.
        let orphaned = self
            .marker
            .map(|m| !self.anchors.iter().any(|a| a.id == m.anchor))
            .unwrap_or(false);
        if orphaned {
            self.destroy_marker();
            self.state = SceneState::Scanning;
            self.try_create_marker();
        }
    }

    /// Session loss: forget surfaces and the placed-item flag, keep scanning.
    /// The placed entity itself is detached by the next placement.
    fn reset(&mut self) {
        self.destroy_marker();
        self.anchors.clear();
        self.point = None;
        if self.state != SceneState::NotReady {
            self.state = SceneState::Scanning;
        }
    }

    fn destroy_marker(&mut self) {
        if let Some(marker) = self.marker.take() {
            self.scene.destroy(marker.entity);
        }
    }
}
