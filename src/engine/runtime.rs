// Scene task: drains the event inbox into the session, one event at a time.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::session::SceneSession;
use crate::command::dispatcher::Command;
use crate::error::FetchError;
use crate::scene::events::ArEvent;
use crate::scene::graph::EntityId;

/// Everything that can change scene state. Off-task completions are posted
/// here so they are applied on the scene task, in arrival order.
#[derive(Debug)]
pub enum SceneEvent {
    Command(Command),
    Ar(ArEvent),
    DownloadFinished {
        name: String,
        result: Result<PathBuf, FetchError>,
    },
    ParseFinished {
        name: String,
        result: anyhow::Result<EntityId>,
    },
}

pub struct SceneRuntime {
    session: SceneSession,
    inbox: mpsc::Receiver<SceneEvent>,
    shutdown: CancellationToken,
}

impl SceneRuntime {
    pub fn new(
        session: SceneSession,
        inbox: mpsc::Receiver<SceneEvent>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            session,
            inbox,
            shutdown,
        }
    }

    /// Run until cancelled. Returns the session so callers can inspect the
    /// final state.
    pub async fn run(mut self) -> SceneSession {
        info!("scene runtime started");
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("scene runtime cancelled");
                    break;
                }
                event = self.inbox.recv() => match event {
                    Some(event) => self.session.handle(event),
                    None => {
                        debug!("scene inbox closed");
                        break;
                    }
                },
            }
        }
        info!("scene runtime stopped in state {:?}", self.session.state());
        self.session
    }
}
