// Named asset lifecycle: one download and one parse per name, ever.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::downloader::DownloadPipeline;
use super::runtime::SceneEvent;
use crate::command::dispatcher::AssetSpec;
use crate::command::outbound::OutboundEvent;
use crate::error::FetchError;
use crate::scene::graph::{AssetParser, EntityId};
use crate::scene::transform::PlacementParams;
use crate::source::locator::AssetLocator;

#[derive(Debug, Clone, PartialEq)]
pub enum AssetState {
    Requested,
    Downloading,
    /// Download done, engine parse in flight.
    Parsing { path: PathBuf },
    Loaded { path: PathBuf, entity: EntityId },
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct AssetRecord {
    pub locator: AssetLocator,
    pub defaults: PlacementParams,
    pub state: AssetState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// First request for the name; a download was started.
    Started,
    /// Already loaded; the caller re-announces it.
    AlreadyLoaded,
    /// In flight or permanently failed; nothing to do.
    Ignored,
    /// The name is bound to a different locator.
    Conflict,
}

/// Off-task work the registry kicks off. Results come back as `SceneEvent`s.
pub trait LoadTasks: Send {
    fn spawn_download(&self, locator: AssetLocator);
    fn spawn_parse(&self, name: String, path: PathBuf);
}

/// Runs pipeline stages on the tokio runtime and posts their results to the
/// scene inbox.
pub struct TokioLoadTasks {
    pipeline: Arc<DownloadPipeline>,
    parser: Arc<dyn AssetParser>,
    inbox: mpsc::Sender<SceneEvent>,
}

impl TokioLoadTasks {
    pub fn new(
        pipeline: Arc<DownloadPipeline>,
        parser: Arc<dyn AssetParser>,
        inbox: mpsc::Sender<SceneEvent>,
    ) -> Self {
        Self {
            pipeline,
            parser,
            inbox,
        }
    }
}

impl LoadTasks for TokioLoadTasks {
    fn spawn_download(&self, locator: AssetLocator) {
        let pipeline = Arc::clone(&self.pipeline);
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            let result = pipeline.fetch(&locator).await;
            let name = locator.name;
            if inbox
                .send(SceneEvent::DownloadFinished {
                    name: name.clone(),
                    result,
                })
                .await
                .is_err()
            {
                debug!("scene inbox closed, dropping download result for {}", name);
            }
        });
    }

    fn spawn_parse(&self, name: String, path: PathBuf) {
        let parser = Arc::clone(&self.parser);
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            let result = parser.parse(&name, &path).await;
            if inbox
                .send(SceneEvent::ParseFinished {
                    name: name.clone(),
                    result,
                })
                .await
                .is_err()
            {
                debug!("scene inbox closed, dropping parse result for {}", name);
            }
        });
    }
}

pub struct AssetRegistry {
    records: HashMap<String, AssetRecord>,
    tasks: Box<dyn LoadTasks>,
}

impl AssetRegistry {
    pub fn new(tasks: Box<dyn LoadTasks>) -> Self {
        Self {
            records: HashMap::new(),
            tasks,
        }
    }

    /// Idempotent per name. The first call binds the name to its locator for
    /// good and starts the download; later calls never start another one.
    pub fn request_load(&mut self, spec: AssetSpec) -> LoadOutcome {
        let name = spec.locator.name.clone();
        if let Some(record) = self.records.get(&name) {
            if record.locator.url != spec.locator.url {
                warn!(
                    "asset {} is bound to {}, ignoring request for {}",
                    name, record.locator.url, spec.locator.url
                );
                return LoadOutcome::Conflict;
            }
            return match record.state {
                AssetState::Loaded { .. } => LoadOutcome::AlreadyLoaded,
                _ => {
                    debug!("asset {} already requested ({:?})", name, record.state);
                    LoadOutcome::Ignored
                }
            };
        }

        info!("loading asset {} from {}", name, spec.locator.url);
        self.records.insert(
            name.clone(),
            AssetRecord {
                locator: spec.locator.clone(),
                defaults: spec.defaults,
                state: AssetState::Requested,
            },
        );
        self.tasks.spawn_download(spec.locator);
        self.set_state(&name, AssetState::Downloading);
        LoadOutcome::Started
    }

    /// Download stage finished. Hands the file to the parser or marks the
    /// name failed.
    pub fn on_download_finished(
        &mut self,
        name: &str,
        result: Result<PathBuf, FetchError>,
    ) -> Option<OutboundEvent> {
        if !matches!(self.state(name), Some(AssetState::Downloading)) {
            warn!("unexpected download completion for {}", name);
            return None;
        }
        match result {
            Ok(path) => {
                debug!("asset {} downloaded, parsing {}", name, path.display());
                self.set_state(name, AssetState::Parsing { path: path.clone() });
                self.tasks.spawn_parse(name.to_string(), path);
                None
            }
            Err(e) => Some(self.fail(name, format!("failed to download {}: {}", name, e))),
        }
    }

    pub fn on_parse_finished(
        &mut self,
        name: &str,
        result: anyhow::Result<EntityId>,
    ) -> Option<OutboundEvent> {
        let path = match self.state(name) {
            Some(AssetState::Parsing { path }) => path.clone(),
            _ => {
                warn!("unexpected parse completion for {}", name);
                return None;
            }
        };
        match result {
            Ok(entity) => {
                info!("asset {} loaded as {:?}", name, entity);
                self.set_state(name, AssetState::Loaded { path, entity });
                Some(OutboundEvent::Loaded {
                    asset: name.to_string(),
                })
            }
            Err(e) => Some(self.fail(name, format!("failed to parse {}: {:#}", name, e))),
        }
    }

    pub fn loaded_entity(&self, name: &str) -> Option<EntityId> {
        match self.state(name) {
            Some(AssetState::Loaded { entity, .. }) => Some(*entity),
            _ => None,
        }
    }

    pub fn defaults(&self, name: &str) -> PlacementParams {
        self.records
            .get(name)
            .map(|r| r.defaults)
            .unwrap_or_default()
    }

    pub fn record(&self, name: &str) -> Option<&AssetRecord> {
        self.records.get(name)
    }

    pub fn state(&self, name: &str) -> Option<&AssetState> {
        self.records.get(name).map(|r| &r.state)
    }

    fn set_state(&mut self, name: &str, state: AssetState) {
        if let Some(record) = self.records.get_mut(name) {
            record.state = state;
        }
    }

    fn fail(&mut self, name: &str, message: String) -> OutboundEvent {
        error!("{}", message);
        self.set_state(name, AssetState::Failed(message.clone()));
        OutboundEvent::Error { message }
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorded {
        downloads: Vec<String>,
        parses: Vec<(String, PathBuf)>,
    }

    struct RecordingTasks(Arc<Mutex<Recorded>>);

    impl LoadTasks for RecordingTasks {
        fn spawn_download(&self, locator: AssetLocator) {
            self.0.lock().downloads.push(locator.name);
        }

        fn spawn_parse(&self, name: String, path: PathBuf) {
            self.0.lock().parses.push((name, path));
        }
    }

    fn registry() -> (AssetRegistry, Arc<Mutex<Recorded>>) {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        (
            AssetRegistry::new(Box::new(RecordingTasks(recorded.clone()))),
            recorded,
        )
    }

    fn spec(name: &str, url: &str) -> AssetSpec {
        AssetSpec {
            locator: AssetLocator::parse(name, url).unwrap(),
            defaults: PlacementParams::default(),
        }
    }

    #[test]
    fn test_repeated_requests_start_one_download() {
        let (mut registry, recorded) = registry();
        assert_eq!(
            registry.request_load(spec("x", "https://cdn.test/x.usdz")),
            LoadOutcome::Started
        );
        for _ in 0..9 {
            assert_eq!(
                registry.request_load(spec("x", "https://cdn.test/x.usdz")),
                LoadOutcome::Ignored
            );
        }
        assert_eq!(recorded.lock().downloads, vec!["x".to_string()]);
        assert_eq!(registry.state("x"), Some(&AssetState::Downloading));
    }

    #[test]
    fn test_pipeline_order_to_loaded() {
        let (mut registry, recorded) = registry();
        registry.request_load(spec("shoe", "https://cdn.test/shoe.usdz"));

        let path = PathBuf::from("/cache/abc-shoe.usdz");
        assert_eq!(registry.on_download_finished("shoe", Ok(path.clone())), None);
        assert_eq!(recorded.lock().parses, vec![("shoe".to_string(), path.clone())]);
        assert_eq!(registry.loaded_entity("shoe"), None);

        let event = registry.on_parse_finished("shoe", Ok(EntityId(7)));
        assert_eq!(
            event,
            Some(OutboundEvent::Loaded {
                asset: "shoe".into()
            })
        );
        assert_eq!(registry.loaded_entity("shoe"), Some(EntityId(7)));
        assert_eq!(
            registry.request_load(spec("shoe", "https://cdn.test/shoe.usdz")),
            LoadOutcome::AlreadyLoaded
        );
        assert_eq!(recorded.lock().downloads.len(), 1);
    }

    #[test]
    fn test_parse_before_download_is_ignored() {
        let (mut registry, _) = registry();
        registry.request_load(spec("shoe", "https://cdn.test/shoe.usdz"));
        assert_eq!(registry.on_parse_finished("shoe", Ok(EntityId(1))), None);
        assert_eq!(registry.state("shoe"), Some(&AssetState::Downloading));
    }

    #[test]
    fn test_failure_is_permanent() {
        let (mut registry, recorded) = registry();
        registry.request_load(spec("shoe", "https://cdn.test/shoe.usdz"));
        let event = registry.on_download_finished("shoe", Err(FetchError::MissingValidator));
        assert!(matches!(event, Some(OutboundEvent::Error { .. })));
        assert!(matches!(registry.state("shoe"), Some(AssetState::Failed(_))));

        assert_eq!(
            registry.request_load(spec("shoe", "https://cdn.test/shoe.usdz")),
            LoadOutcome::Ignored
        );
        assert_eq!(
            registry.request_load(spec("shoe", "https://cdn.test/other.usdz")),
            LoadOutcome::Conflict
        );
        assert_eq!(recorded.lock().downloads.len(), 1);
    }

    #[test]
    fn test_parse_failure_marks_failed() {
        let (mut registry, _) = registry();
        registry.request_load(spec("shoe", "https://cdn.test/shoe.usdz"));
        registry.on_download_finished("shoe", Ok(PathBuf::from("/cache/a-shoe.usdz")));
        let event = registry.on_parse_finished("shoe", Err(anyhow::anyhow!("bad usdz")));
        assert!(matches!(event, Some(OutboundEvent::Error { message }) if message.contains("bad usdz")));
        assert_eq!(registry.loaded_entity("shoe"), None);
    }
}
