use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::scene::events::TrackingState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationStatus {
    Started,
    Stopped,
}

/// Events sent back to the remote content surface, serialized as
/// `{"event": "<name>", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum OutboundEvent {
    Loaded {
        asset: String,
    },
    Plane,
    Rendered {
        asset: String,
    },
    OverlayShown,
    OverlayHidden,
    OverlayReset,
    Tracking {
        state: TrackingState,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Interrupted,
    InterruptionEnded,
    Error {
        message: String,
    },
    Animation {
        asset: String,
        status: AnimationStatus,
    },
}

impl OutboundEvent {
    pub fn to_json(&self) -> String {
        // Only strings and unit variants; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Outbound half handed to the scene task.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<OutboundEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<OutboundEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: OutboundEvent) {
        debug!("emit {}", event.to_json());
        if self.tx.send(event).is_err() {
            warn!("outbound receiver dropped; event discarded");
        }
    }
}
