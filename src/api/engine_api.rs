// Host-facing handle: builds the cache, transport and scene task, and owns their lifecycle.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::command::dispatcher::{dispatch, Command};
use crate::command::outbound::EventSink;
use crate::config::EngineConfig;
use crate::engine::cache::CacheStore;
use crate::engine::downloader::DownloadPipeline;
use crate::engine::registry::{AssetRegistry, TokioLoadTasks};
use crate::engine::runtime::{SceneEvent, SceneRuntime};
use crate::engine::session::SceneSession;
use crate::engine::stats::{PipelineStats, StatsSnapshot};
use crate::scene::events::ArEvent;
use crate::scene::graph::{AssetParser, SceneGraph};
use crate::source::http_source::HttpTransport;
use crate::source::traits::AssetTransport;

/// One AR session's engine. Must be started inside a tokio runtime.
pub struct ArEngine {
    inbox: mpsc::Sender<SceneEvent>,
    pipeline: Arc<DownloadPipeline>,
    shutdown: CancellationToken,
    runtime: JoinHandle<SceneSession>,
}

impl ArEngine {
    /// Start with the reqwest transport.
    pub fn start(
        config: &EngineConfig,
        scene: Box<dyn SceneGraph>,
        parser: Arc<dyn AssetParser>,
        sink: EventSink,
    ) -> Result<Self> {
        let transport = HttpTransport::new(Duration::from_secs(config.request_timeout_secs))?;
        Ok(Self::start_with_transport(
            config,
            Arc::new(transport),
            scene,
            parser,
            sink,
        ))
    }

    pub fn start_with_transport(
        config: &EngineConfig,
        transport: Arc<dyn AssetTransport>,
        scene: Box<dyn SceneGraph>,
        parser: Arc<dyn AssetParser>,
        sink: EventSink,
    ) -> Self {
        let cache = Arc::new(CacheStore::new(
            config.cache_root(),
            config.disk_capacity_bytes,
        ));
        let pipeline = Arc::new(DownloadPipeline::new(
            transport,
            cache,
            Arc::new(PipelineStats::new()),
        ));

        let (tx, rx) = mpsc::channel(config.inbox_capacity.max(1));
        let tasks = TokioLoadTasks::new(Arc::clone(&pipeline), parser, tx.clone());
        let session = SceneSession::new(scene, AssetRegistry::new(Box::new(tasks)), sink);

        let shutdown = CancellationToken::new();
        let runtime = tokio::spawn(SceneRuntime::new(session, rx, shutdown.clone()).run());
        info!(
            "ar engine started, cache at {}",
            config.cache_root().display()
        );

        Self {
            inbox: tx,
            pipeline,
            shutdown,
            runtime,
        }
    }

    /// Parse a raw bridge message and queue it. Malformed messages are
    /// logged and dropped; returns whether the command was accepted.
    pub async fn send_command(&self, raw: &str) -> bool {
        match dispatch(raw) {
            Some(command) => self.send(command).await,
            None => false,
        }
    }

    pub async fn send(&self, command: Command) -> bool {
        self.post(SceneEvent::Command(command)).await
    }

    pub async fn push_ar_event(&self, event: ArEvent) -> bool {
        self.post(SceneEvent::Ar(event)).await
    }

    /// For engine callbacks on threads outside the runtime. Fails when the
    /// inbox is full or closed.
    pub fn try_push_ar_event(&self, event: ArEvent) -> bool {
        match self.inbox.try_send(SceneEvent::Ar(event)) {
            Ok(()) => true,
            Err(e) => {
                warn!("dropping AR event: {}", e);
                false
            }
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.pipeline.stats().snapshot()
    }

    /// Stop the scene task and return its final session. Downloads and
    /// parses already in flight are not aborted; their results are dropped.
    pub async fn dispose(self) -> Option<SceneSession> {
        self.shutdown.cancel();
        match self.runtime.await {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("scene runtime ended abnormally: {}", e);
                None
            }
        }
    }

    async fn post(&self, event: SceneEvent) -> bool {
        if self.inbox.send(event).await.is_err() {
            warn!("scene runtime is gone; event dropped");
            return false;
        }
        true
    }
}
