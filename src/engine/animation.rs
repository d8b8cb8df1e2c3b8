// Starts every playable animation under a placed item and tracks playback.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::scene::graph::{AnimationId, AnimationPlayer, EntityId, PlaybackHandle};

#[derive(Debug, Clone)]
struct Owner {
    root: EntityId,
    asset: String,
}

/// Observes entities handed to it; never decides placement.
#[derive(Default)]
pub struct AnimationCoordinator {
    handles: HashMap<(EntityId, AnimationId), PlaybackHandle>,
    subscribed: HashSet<EntityId>,
    owners: HashMap<EntityId, Owner>,
}

impl AnimationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Depth-first, parent before children. Every animation on every
    /// animated descendant of `root` is (re)started; `repeat` loops them.
    /// Returns the number of animations started.
    pub fn play_all<P: AnimationPlayer + ?Sized>(
        &mut self,
        player: &mut P,
        root: EntityId,
        asset: &str,
        repeat: bool,
    ) -> usize {
        let mut started = 0;
        let mut stack = vec![root];
        while let Some(entity) = stack.pop() {
            let animations = player.animations(entity);
            if !animations.is_empty() {
                self.owners.insert(
                    entity,
                    Owner {
                        root,
                        asset: asset.to_string(),
                    },
                );
                if self.subscribed.insert(entity) {
                    player.subscribe_playback_completed(entity);
                }
                for animation in animations {
                    if let Some(previous) = self.handles.remove(&(entity, animation)) {
                        player.stop(previous);
                    }
                    let handle = player.play(entity, animation, repeat);
                    self.handles.insert((entity, animation), handle);
                    started += 1;
                }
            }

            let mut children = player.children(entity);
            children.reverse();
            stack.extend(children);
        }
        debug!(
            "started {} animations under {:?} (repeat={})",
            started, root, repeat
        );
        started
    }

    /// Natural completion of `handle` on `entity`. Returns the owning asset
    /// name when the handle was one we started.
    pub fn on_playback_completed(
        &mut self,
        entity: EntityId,
        handle: PlaybackHandle,
    ) -> Option<String> {
        let key = self
            .handles
            .iter()
            .find(|((e, _), h)| *e == entity && **h == handle)
            .map(|(key, _)| *key)?;
        self.handles.remove(&key);
        self.owners.get(&entity).map(|o| o.asset.clone())
    }

    /// Stop and drop every playback started under `root`. Completion
    /// subscriptions stay registered.
    pub fn forget<P: AnimationPlayer + ?Sized>(&mut self, player: &mut P, root: EntityId) {
        let owned: HashSet<EntityId> = self
            .owners
            .iter()
            .filter(|(_, o)| o.root == root)
            .map(|(e, _)| *e)
            .collect();
        if owned.is_empty() {
            return;
        }

        self.handles.retain(|(entity, _), handle| {
            if owned.contains(entity) {
                player.stop(*handle);
                false
            } else {
                true
            }
        });
        self.owners.retain(|entity, _| !owned.contains(entity));
    }

    pub fn active_count(&self) -> usize {
        self.handles.len()
    }
}
