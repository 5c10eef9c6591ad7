use async_trait::async_trait;
use converse_api::Backend;
use converse_codec::{encode_wav, PcmBuffer};
use converse_core::{ApiError, AudioClip, Character, SessionPhase, UiCommand};
use converse_session::{
    run_broadcast, run_exchange, Reply, SessionController, SessionHandle, WorkerMsg,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct FakeBackend {
    characters: Vec<Character>,
    /// Bytes returned from `exchange_audio`; `None` makes it fail with 500.
    reply_wav: Option<Vec<u8>>,
    uploads: Mutex<Vec<(i64, Vec<u8>)>>,
}

impl FakeBackend {
    fn new(characters: Vec<Character>, reply_wav: Option<Vec<u8>>) -> Self {
        Self {
            characters,
            reply_wav,
            uploads: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn list_characters(&self) -> Result<Vec<Character>, ApiError> {
        Ok(self.characters.clone())
    }

    async fn get_character(&self, id: i64) -> Result<Character, ApiError> {
        self.characters
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(ApiError::Status {
                status: 404,
                body: "character not found".to_string(),
            })
    }

    async fn create_character(&self, character: &Character) -> Result<Character, ApiError> {
        Ok(character.clone())
    }

    async fn exchange_audio(&self, id: i64, wav: Vec<u8>) -> Result<Vec<u8>, ApiError> {
        self.uploads.lock().unwrap().push((id, wav));
        match &self.reply_wav {
            Some(bytes) => Ok(bytes.clone()),
            None => Err(ApiError::Status {
                status: 500,
                body: "engine offline".to_string(),
            }),
        }
    }
}

fn ada() -> Character {
    Character {
        id: 7,
        name: "Ada".to_string(),
        prompt: "A curious mathematician".to_string(),
        profile_image_url: String::new(),
    }
}

fn reply_wav() -> Vec<u8> {
    let samples: Vec<f32> = (0..400).map(|i| ((i % 100) as f32 / 100.0) - 0.5).collect();
    let buf = PcmBuffer::new(8000, vec![samples]).unwrap();
    encode_wav(&buf).unwrap()
}

fn recording() -> AudioClip {
    AudioClip::new(vec![0.25; 4800], 48000, 1)
}

async fn recv_worker_msg(rx: &std::sync::mpsc::Receiver<WorkerMsg>) -> WorkerMsg {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if let Ok(msg) = rx.try_recv() {
            return msg;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for worker message",
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "condition never met");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_exchange_uploads_and_autoplays_reply() {
    let backend = Arc::new(FakeBackend::new(vec![ada()], Some(reply_wav())));
    let handle = SessionHandle::new();
    handle.set_active_character(Some(ada()));
    handle.set_phase(SessionPhase::Processing);

    let (clip_tx, clip_rx) = tokio::sync::mpsc::unbounded_channel();
    let (worker_tx, worker_rx) = std::sync::mpsc::channel();
    let task = tokio::spawn(run_exchange(
        clip_rx,
        backend.clone() as Arc<dyn Backend>,
        handle.clone(),
        worker_tx,
    ));

    clip_tx.send(recording()).unwrap();

    match recv_worker_msg(&worker_rx).await {
        WorkerMsg::Play(clip) => {
            assert_eq!(clip.sample_rate, 8000);
            assert_eq!(clip.channels, 1);
            assert_eq!(clip.frames(), 400);
        }
        other => panic!("expected Play, got {other:?}"),
    }

    let reply = handle.reply().expect("reply not stored");
    assert_eq!(reply.wav_bytes, reply_wav());
    assert_eq!(reply.waveform.len(), converse_session::WAVEFORM_BUCKETS);

    // The recording went up as a 48kHz mono 16-bit WAV.
    let uploads = backend.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    let (id, wav) = &uploads[0];
    assert_eq!(*id, 7);
    assert_eq!(wav.len(), 44 + 4800 * 2);
    assert_eq!(&wav[0..4], b"RIFF");

    drop(clip_tx);
    task.await.unwrap();
}

#[tokio::test]
async fn test_exchange_server_error_resets_to_idle() {
    let backend = Arc::new(FakeBackend::new(vec![ada()], None));
    let handle = SessionHandle::new();
    handle.set_active_character(Some(ada()));
    handle.set_phase(SessionPhase::Processing);

    let (clip_tx, clip_rx) = tokio::sync::mpsc::unbounded_channel();
    let (worker_tx, worker_rx) = std::sync::mpsc::channel();
    let task = tokio::spawn(run_exchange(
        clip_rx,
        backend as Arc<dyn Backend>,
        handle.clone(),
        worker_tx,
    ));

    clip_tx.send(recording()).unwrap();

    let h = handle.clone();
    wait_for(move || h.phase() == SessionPhase::Idle).await;
    let error = handle.last_error().unwrap();
    assert!(error.contains("500"), "unexpected error: {error}");
    assert!(handle.reply().is_none());
    assert!(worker_rx.try_recv().is_err(), "no playback on failure");

    drop(clip_tx);
    task.await.unwrap();
}

#[tokio::test]
async fn test_exchange_undecodable_reply_resets_to_idle() {
    let backend = Arc::new(FakeBackend::new(vec![ada()], Some(vec![0xAA; 32])));
    let handle = SessionHandle::new();
    handle.set_active_character(Some(ada()));
    handle.set_phase(SessionPhase::Processing);

    let (clip_tx, clip_rx) = tokio::sync::mpsc::unbounded_channel();
    let (worker_tx, _worker_rx) = std::sync::mpsc::channel();
    let task = tokio::spawn(run_exchange(
        clip_rx,
        backend as Arc<dyn Backend>,
        handle.clone(),
        worker_tx,
    ));

    clip_tx.send(recording()).unwrap();

    let h = handle.clone();
    wait_for(move || h.phase() == SessionPhase::Idle).await;
    assert!(handle.last_error().unwrap().contains("decode"));

    drop(clip_tx);
    task.await.unwrap();
}

#[tokio::test]
async fn test_exchange_without_character_fails() {
    let backend = Arc::new(FakeBackend::new(Vec::new(), Some(reply_wav())));
    let handle = SessionHandle::new();
    handle.set_phase(SessionPhase::Processing);

    let (clip_tx, clip_rx) = tokio::sync::mpsc::unbounded_channel();
    let (worker_tx, _worker_rx) = std::sync::mpsc::channel();
    let task = tokio::spawn(run_exchange(
        clip_rx,
        backend as Arc<dyn Backend>,
        handle.clone(),
        worker_tx,
    ));

    clip_tx.send(recording()).unwrap();

    let h = handle.clone();
    wait_for(move || h.last_error().is_some()).await;
    assert!(handle.last_error().unwrap().contains("no character selected"));
    assert_eq!(handle.phase(), SessionPhase::Idle);

    drop(clip_tx);
    task.await.unwrap();
}

#[tokio::test]
async fn test_controller_refresh_and_open() {
    let backend = Arc::new(FakeBackend::new(vec![ada()], None));
    let handle = SessionHandle::new();
    let (worker_tx, _worker_rx) = std::sync::mpsc::channel();
    let controller = SessionController::new(
        handle.clone(),
        backend as Arc<dyn Backend>,
        worker_tx,
        None,
    );

    let (cmd_tx, cmd_rx) = tokio::sync::mpsc::unbounded_channel();
    let task = tokio::spawn(controller.run(cmd_rx));

    cmd_tx.send(UiCommand::RefreshCharacters).unwrap();
    cmd_tx.send(UiCommand::OpenCharacter(7)).unwrap();
    cmd_tx.send(UiCommand::Quit).unwrap();
    task.await.unwrap();

    assert_eq!(handle.characters(), vec![ada()]);
    assert_eq!(handle.active_character().unwrap().id, 7);
}

#[tokio::test]
async fn test_controller_open_unknown_character_sets_error() {
    let backend = Arc::new(FakeBackend::new(vec![ada()], None));
    let handle = SessionHandle::new();
    let (worker_tx, _worker_rx) = std::sync::mpsc::channel();
    let controller = SessionController::new(
        handle.clone(),
        backend as Arc<dyn Backend>,
        worker_tx,
        None,
    );

    let (cmd_tx, cmd_rx) = tokio::sync::mpsc::unbounded_channel();
    let task = tokio::spawn(controller.run(cmd_rx));

    cmd_tx.send(UiCommand::OpenCharacter(999)).unwrap();
    cmd_tx.send(UiCommand::Quit).unwrap();
    task.await.unwrap();

    assert!(handle.active_character().is_none());
    assert!(handle.last_error().unwrap().contains("999"));
}

#[tokio::test]
async fn test_controller_forwards_recording_commands() {
    let backend = Arc::new(FakeBackend::new(Vec::new(), None));
    let handle = SessionHandle::new();
    let (worker_tx, worker_rx) = std::sync::mpsc::channel();
    let controller = SessionController::new(
        handle.clone(),
        backend as Arc<dyn Backend>,
        worker_tx,
        None,
    );

    let (cmd_tx, cmd_rx) = tokio::sync::mpsc::unbounded_channel();
    let task = tokio::spawn(controller.run(cmd_rx));

    cmd_tx.send(UiCommand::StartRecording).unwrap();
    cmd_tx.send(UiCommand::StopRecording).unwrap();
    cmd_tx.send(UiCommand::Quit).unwrap();
    task.await.unwrap();

    assert!(matches!(worker_rx.try_recv(), Ok(WorkerMsg::StartRecording)));
    assert!(matches!(worker_rx.try_recv(), Ok(WorkerMsg::StopRecording)));
}

#[tokio::test]
async fn test_controller_replay_only_when_idle_with_reply() {
    let backend = Arc::new(FakeBackend::new(Vec::new(), None));
    let handle = SessionHandle::new();
    let (worker_tx, worker_rx) = std::sync::mpsc::channel();
    let controller = SessionController::new(
        handle.clone(),
        backend as Arc<dyn Backend>,
        worker_tx,
        None,
    );

    let (cmd_tx, cmd_rx) = tokio::sync::mpsc::unbounded_channel();
    let task = tokio::spawn(controller.run(cmd_rx));

    // No reply yet: nothing forwarded.
    cmd_tx.send(UiCommand::PlayResponse).unwrap();

    handle.set_reply(Reply {
        wav_bytes: reply_wav(),
        clip: AudioClip::new(vec![0.0; 16], 8000, 1),
        waveform: Vec::new(),
    });
    cmd_tx.send(UiCommand::PlayResponse).unwrap();
    cmd_tx.send(UiCommand::Quit).unwrap();
    task.await.unwrap();

    match worker_rx.try_recv() {
        Ok(WorkerMsg::Play(clip)) => assert_eq!(clip.frames(), 16),
        other => panic!("expected one Play, got {other:?}"),
    }
    assert!(worker_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_controller_save_without_dir_sets_error() {
    let backend = Arc::new(FakeBackend::new(Vec::new(), None));
    let handle = SessionHandle::new();
    handle.set_reply(Reply {
        wav_bytes: vec![1, 2, 3],
        clip: AudioClip::new(Vec::new(), 8000, 1),
        waveform: Vec::new(),
    });
    let (worker_tx, _worker_rx) = std::sync::mpsc::channel();
    let controller = SessionController::new(
        handle.clone(),
        backend as Arc<dyn Backend>,
        worker_tx,
        None,
    );

    let (cmd_tx, cmd_rx) = tokio::sync::mpsc::unbounded_channel();
    let task = tokio::spawn(controller.run(cmd_rx));

    cmd_tx.send(UiCommand::SaveResponse).unwrap();
    cmd_tx.send(UiCommand::Quit).unwrap();
    task.await.unwrap();

    assert!(handle.last_error().unwrap().contains("save_dir"));
}

#[tokio::test]
async fn test_controller_save_writes_wav_file() {
    let dir = std::env::temp_dir().join("converse_save_test");
    let _ = std::fs::remove_dir_all(&dir);

    let backend = Arc::new(FakeBackend::new(Vec::new(), None));
    let handle = SessionHandle::new();
    handle.set_active_character(Some(ada()));
    handle.set_reply(Reply {
        wav_bytes: reply_wav(),
        clip: AudioClip::new(Vec::new(), 8000, 1),
        waveform: Vec::new(),
    });
    let (worker_tx, _worker_rx) = std::sync::mpsc::channel();
    let controller = SessionController::new(
        handle.clone(),
        backend as Arc<dyn Backend>,
        worker_tx,
        Some(dir.clone()),
    );

    let (cmd_tx, cmd_rx) = tokio::sync::mpsc::unbounded_channel();
    let task = tokio::spawn(controller.run(cmd_rx));

    cmd_tx.send(UiCommand::SaveResponse).unwrap();
    cmd_tx.send(UiCommand::Quit).unwrap();
    task.await.unwrap();

    let entries: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
    assert_eq!(entries.len(), 1);
    let path = entries[0].as_ref().unwrap().path();
    assert!(path.file_name().unwrap().to_string_lossy().starts_with("reply-7-"));
    assert_eq!(std::fs::read(&path).unwrap(), reply_wav());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_broadcast_publishes_snapshots() {
    let handle = SessionHandle::new();
    handle.set_characters(vec![ada()]);

    let (state_tx, mut state_rx) =
        tokio::sync::watch::channel(converse_core::ChatState::default());
    let task = tokio::spawn(run_broadcast(state_tx, handle.clone()));

    tokio::time::timeout(Duration::from_secs(2), state_rx.changed())
        .await
        .expect("no snapshot within 2s")
        .unwrap();
    let state = state_rx.borrow_and_update().clone();
    assert!(state.is_running);
    assert_eq!(state.characters, vec![ada()]);

    drop(state_rx);
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("broadcast did not stop")
        .unwrap();
}
