use crate::handle::SessionHandle;
use crate::worker::WorkerMsg;
use converse_api::Backend;
use converse_core::{ChatState, SessionPhase, UiCommand};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;

/// Translates UI commands into backend calls and audio worker operations.
pub struct SessionController {
    handle: SessionHandle,
    backend: Arc<dyn Backend>,
    worker_tx: Sender<WorkerMsg>,
    save_dir: Option<PathBuf>,
}

impl SessionController {
    pub fn new(
        handle: SessionHandle,
        backend: Arc<dyn Backend>,
        worker_tx: Sender<WorkerMsg>,
        save_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            handle,
            backend,
            worker_tx,
            save_dir,
        }
    }

    /// Process commands until the channel closes or the user quits.
    pub async fn run(self, mut cmd_rx: UnboundedReceiver<UiCommand>) {
        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                UiCommand::RefreshCharacters => self.refresh().await,
                UiCommand::OpenCharacter(id) => self.open(id).await,
                UiCommand::StartRecording => {
                    let _ = self.worker_tx.send(WorkerMsg::StartRecording);
                }
                UiCommand::StopRecording => {
                    let _ = self.worker_tx.send(WorkerMsg::StopRecording);
                }
                UiCommand::PlayResponse => self.replay(),
                UiCommand::StopPlayback => {
                    let _ = self.worker_tx.send(WorkerMsg::StopPlayback);
                }
                UiCommand::SaveResponse => self.save(),
                UiCommand::Quit => break,
            }
        }
    }

    async fn refresh(&self) {
        match self.backend.list_characters().await {
            Ok(characters) => {
                tracing::info!("loaded {} characters", characters.len());
                self.handle.set_characters(characters);
            }
            Err(e) => self
                .handle
                .set_error(format!("could not load characters: {e}")),
        }
    }

    async fn open(&self, id: i64) {
        // Prefer the cached listing; fall back to fetching by id, which
        // also covers `chat <id>` before any listing happened.
        if let Some(character) = self.handle.characters().into_iter().find(|c| c.id == id) {
            self.activate(character);
            return;
        }
        match self.backend.get_character(id).await {
            Ok(character) => self.activate(character),
            Err(e) => self
                .handle
                .set_error(format!("could not load character {id}: {e}")),
        }
    }

    fn activate(&self, character: converse_core::Character) {
        tracing::info!("chatting with '{}'", character.name);
        self.handle.set_active_character(Some(character));
        self.handle.clear_reply();
        self.handle.clear_error();
    }

    fn replay(&self) {
        if self.handle.phase() != SessionPhase::Idle {
            return;
        }
        if let Some(reply) = self.handle.reply() {
            let _ = self.worker_tx.send(WorkerMsg::Play(reply.clip));
        }
    }

    fn save(&self) {
        let Some(dir) = &self.save_dir else {
            self.handle
                .set_error("saving is disabled: [session] save_dir is not configured");
            return;
        };
        let Some(reply) = self.handle.reply() else {
            return;
        };

        let character_id = self.handle.active_character().map(|c| c.id).unwrap_or(0);
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = dir.join(format!("reply-{character_id}-{stamp}.wav"));

        let written = std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&path, &reply.wav_bytes));
        match written {
            Ok(()) => tracing::info!("saved reply to {}", path.display()),
            Err(e) => self.handle.set_error(format!("could not save reply: {e}")),
        }
    }
}

/// Broadcast a state snapshot to the TUI at ~30 Hz until it closes.
pub async fn run_broadcast(state_tx: watch::Sender<ChatState>, handle: SessionHandle) {
    let mut interval = tokio::time::interval(Duration::from_millis(33));
    loop {
        interval.tick().await;
        if state_tx.send(handle.snapshot(true)).is_err() {
            break; // TUI closed
        }
    }
}
