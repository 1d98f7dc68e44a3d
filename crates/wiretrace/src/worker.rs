//! Async request/response boundary around a [`WireEngine`].
//!
//! The engine lives on a dedicated thread and serves one job at a time. Each
//! request carries an id and the generation it was issued under; bumping the
//! generation with [`WorkerHandle::invalidate`] makes in-flight builds resolve
//! to [`EngineOutcome::Stale`] without touching the cache.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::{
    engine::{EngineCommand, EngineResponse, Prepared, WireEngine},
    error::{Result, WireError},
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EngineOutcome {
    Done { request: u64, response: EngineResponse },
    /// Issued under a generation that has since been invalidated
    Stale { request: u64 },
}

impl EngineOutcome {
    pub fn request(&self) -> u64 {
        match self {
            Self::Done { request, .. } | Self::Stale { request } => *request,
        }
    }

    pub fn into_response(self) -> Option<EngineResponse> {
        match self {
            Self::Done { response, .. } => Some(response),
            Self::Stale { .. } => None,
        }
    }

    /// Stale outcomes become [`WireError::Cancelled`].
    pub fn into_result(self) -> Result<EngineResponse> {
        match self {
            Self::Done { response, .. } => Ok(response),
            Self::Stale { request } => Err(WireError::Cancelled { id: request }),
        }
    }
}

struct Job {
    request: u64,
    generation: u64,
    command: EngineCommand,
    reply: oneshot::Sender<EngineOutcome>,
}

/// Cloneable handle to the engine thread. The thread exits once every
/// handle is dropped.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<Job>,
    generation: Arc<AtomicU64>,
    next_request: Arc<AtomicU64>,
    timeout: Duration,
}

impl WorkerHandle {
    pub fn spawn(engine: WireEngine) -> Result<Self> {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let generation = Arc::new(AtomicU64::new(0));

        let current = Arc::clone(&generation);
        thread::Builder::new()
            .name("wire-engine".into())
            .spawn(move || serve(engine, rx, current))?;

        Ok(Self {
            tx,
            generation,
            next_request: Arc::new(AtomicU64::new(1)),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Mark all outstanding work as stale. Returns the new generation.
    pub fn invalidate(&self) -> u64 {
        let next = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation = next, "worker generation bumped");
        next
    }

    /// Issue `command` under the current generation.
    pub async fn request(&self, command: EngineCommand) -> Result<EngineOutcome> {
        self.request_for(self.generation(), command).await
    }

    /// Issue `command` under an explicit generation, typically one captured
    /// when the caller's view state was set up.
    pub async fn request_for(&self, generation: u64, command: EngineCommand) -> Result<EngineOutcome> {
        let request = self.next_request.fetch_add(1, Ordering::Relaxed);
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Job { request, generation, command, reply })
            .await
            .map_err(|_| WireError::EngineClosed)?;

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(_)) => Err(WireError::EngineClosed),
            Err(_) => {
                warn!(request, timeout = ?self.timeout, "engine request timed out");
                Err(WireError::Timeout(self.timeout))
            }
        }
    }

    /// [`request`](Self::request) with every failure mode folded into `None`.
    pub async fn call(&self, command: EngineCommand) -> Option<EngineResponse> {
        match self.request(command).await {
            Ok(EngineOutcome::Done { response, .. }) => Some(response),
            Ok(EngineOutcome::Stale { request }) => {
                debug!(request, "discarding stale response");
                None
            }
            Err(e) => {
                debug!(error = %e, "engine call failed softly");
                None
            }
        }
    }
}

fn serve(mut engine: WireEngine, mut rx: mpsc::Receiver<Job>, generation: Arc<AtomicU64>) {
    while let Some(job) = rx.blocking_recv() {
        let Job { request, generation: issued, command, reply } = job;
        let stale = || generation.load(Ordering::SeqCst) != issued;

        let outcome = if stale() {
            EngineOutcome::Stale { request }
        } else if let EngineCommand::BuildGraph { id, image, options } = command {
            match engine.prepare(&id, &image, &options) {
                Ok(Prepared::Cached(summary)) => EngineOutcome::Done {
                    request,
                    response: EngineResponse::GraphBuilt(summary),
                },
                Ok(Prepared::Built(_)) if stale() => {
                    debug!(request, page = %id, "build finished under an old generation");
                    EngineOutcome::Stale { request }
                }
                Ok(Prepared::Built(pending)) => EngineOutcome::Done {
                    request,
                    response: EngineResponse::GraphBuilt(engine.commit(pending)),
                },
                Err(e) => EngineOutcome::Done {
                    request,
                    response: EngineResponse::Error { id, message: e.to_string() },
                },
            }
        } else {
            EngineOutcome::Done { request, response: engine.execute(command) }
        };

        // The caller may have timed out and dropped its receiver.
        if reply.send(outcome).is_err() {
            debug!(request, "reply receiver dropped");
        }
    }
    debug!("engine worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{BuildOptions, TraceOptions},
        types::{Point, RasterImage},
    };
    use image::{GrayImage, Luma};

    fn bar_page(size: u32) -> RasterImage {
        let mut gray = GrayImage::from_pixel(size, size, Luma([255]));
        for y in 49..=51 {
            for x in 10..=89 {
                gray.put_pixel(x, y, Luma([0]));
            }
        }
        RasterImage::from_gray(&gray)
    }

    fn build(id: &str, size: u32) -> EngineCommand {
        EngineCommand::BuildGraph {
            id: id.into(),
            image: bar_page(size),
            options: BuildOptions::default(),
        }
    }

    fn trace(id: &str) -> EngineCommand {
        EngineCommand::TracePath {
            id: id.into(),
            click: Point::new(40, 50),
            options: TraceOptions::default(),
        }
    }

    #[tokio::test]
    async fn build_then_trace() {
        let worker = WorkerHandle::spawn(WireEngine::default()).expect("spawn");

        let built = worker.request(build("p", 100)).await.expect("reply");
        assert!(matches!(
            built,
            EngineOutcome::Done { response: EngineResponse::GraphBuilt(ref s), .. } if s.edges == 1
        ));

        let traced = worker.call(trace("p")).await;
        let Some(EngineResponse::Path { path: Some(path), .. }) = traced else {
            panic!("expected a path, got {traced:?}");
        };
        assert!(path.len() >= 70);
    }

    #[tokio::test]
    async fn request_ids_increase() {
        let worker = WorkerHandle::spawn(WireEngine::default()).expect("spawn");
        let a = worker.request(trace("p")).await.expect("reply");
        let b = worker.request(trace("p")).await.expect("reply");
        assert!(b.request() > a.request());
    }

    #[tokio::test]
    async fn stale_build_leaves_cache_untouched() {
        let worker = WorkerHandle::spawn(WireEngine::default()).expect("spawn");
        let issued = worker.generation();
        assert_eq!(worker.invalidate(), issued + 1);

        let outcome = worker.request_for(issued, build("p", 100)).await.expect("reply");
        assert!(matches!(outcome, EngineOutcome::Stale { .. }));
        let request = outcome.request();
        assert!(outcome.clone().into_response().is_none());
        assert!(matches!(outcome.into_result(), Err(WireError::Cancelled { id }) if id == request));

        let traced = worker.call(trace("p")).await;
        assert_eq!(traced, Some(EngineResponse::Path { id: "p".into(), path: None }));
    }

    #[tokio::test]
    async fn timeout_is_soft_and_work_continues() {
        let worker = WorkerHandle::spawn(WireEngine::default())
            .expect("spawn")
            .with_timeout(Duration::from_millis(1));

        assert!(matches!(
            worker.request(build("big", 800)).await,
            Err(WireError::Timeout(_))
        ));

        // The abandoned build still lands in the cache.
        let patient = worker.clone().with_timeout(Duration::from_secs(30));
        let Some(EngineResponse::Path { path, .. }) = patient.call(trace("big")).await else {
            panic!("expected a path response");
        };
        assert!(path.is_some());
    }
}
