pub mod controller;
pub mod error;
pub mod exchange;
pub mod handle;
pub mod worker;

pub use controller::{run_broadcast, SessionController};
pub use error::SessionError;
pub use exchange::{run_exchange, WAVEFORM_BUCKETS};
pub use handle::{Reply, SessionHandle};
pub use worker::{AudioSettings, AudioWorker, WorkerMsg};

use converse_api::Backend;
use std::path::PathBuf;
use std::sync::Arc;

/// A running voice session: the audio worker thread plus the exchange
/// task, wired through a shared [`SessionHandle`].
pub struct VoiceSession {
    worker: AudioWorker,
    exchange_task: tokio::task::JoinHandle<()>,
    handle: SessionHandle,
}

impl VoiceSession {
    /// Must be called from within a tokio runtime.
    pub fn start(settings: AudioSettings, backend: Arc<dyn Backend>) -> Self {
        let handle = SessionHandle::new();
        let (clip_tx, clip_rx) = tokio::sync::mpsc::unbounded_channel();
        let worker = AudioWorker::spawn(settings, handle.clone(), clip_tx);
        let exchange_task = tokio::spawn(run_exchange(
            clip_rx,
            backend,
            handle.clone(),
            worker.sender(),
        ));
        Self {
            worker,
            exchange_task,
            handle,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn controller(
        &self,
        backend: Arc<dyn Backend>,
        save_dir: Option<PathBuf>,
    ) -> SessionController {
        SessionController::new(
            self.handle.clone(),
            backend,
            self.worker.sender(),
            save_dir,
        )
    }

    /// Stop the worker thread and wait for the exchange task to drain.
    pub async fn shutdown(mut self) {
        self.worker.shutdown();
        let _ = self.exchange_task.await;
    }
}
