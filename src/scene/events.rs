use serde::Serialize;

use super::graph::{AnchorId, EntityId, PlaybackHandle, SurfaceAnchor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackingState {
    NotAvailable,
    Limited,
    Normal,
}

/// AR-session and engine callbacks, as values delivered to the scene task in
/// arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ArEvent {
    SessionStarted,
    SessionPaused,
    SessionResumed,
    SessionFailed { message: String },
    SessionInterrupted,
    InterruptionEnded,
    AnchorsAdded(Vec<SurfaceAnchor>),
    AnchorsRemoved(Vec<AnchorId>),
    FrameUpdated { camera_yaw: f32 },
    TrackingChanged {
        state: TrackingState,
        reason: Option<String>,
    },
    OverlayActivated,
    OverlayDeactivated,
    OverlayResetRequested,
    PlaybackCompleted {
        entity: EntityId,
        handle: PlaybackHandle,
    },
}
