use converse_core::{AudioClip, Character, ChatState, SessionPhase};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

const PHASE_IDLE: u8 = 0;
const PHASE_RECORDING: u8 = 1;
const PHASE_PROCESSING: u8 = 2;
const PHASE_PLAYING: u8 = 3;

fn phase_to_u8(phase: SessionPhase) -> u8 {
    match phase {
        SessionPhase::Idle => PHASE_IDLE,
        SessionPhase::Recording => PHASE_RECORDING,
        SessionPhase::Processing => PHASE_PROCESSING,
        SessionPhase::Playing => PHASE_PLAYING,
    }
}

fn phase_from_u8(value: u8) -> SessionPhase {
    match value {
        PHASE_RECORDING => SessionPhase::Recording,
        PHASE_PROCESSING => SessionPhase::Processing,
        PHASE_PLAYING => SessionPhase::Playing,
        _ => SessionPhase::Idle,
    }
}

/// The last reply received from the service: raw bytes for saving, the
/// decoded clip for replay, and its display waveform.
#[derive(Debug, Clone)]
pub struct Reply {
    pub wav_bytes: Vec<u8>,
    pub clip: AudioClip,
    pub waveform: Vec<f32>,
}

struct Inner {
    phase: AtomicU8,
    record_secs: AtomicU64,
    characters: Mutex<Vec<Character>>,
    active_character: Mutex<Option<Character>>,
    reply: Mutex<Option<Reply>>,
    last_error: Mutex<Option<String>>,
}

/// Shared session state. The single phase value keeps the recording,
/// processing, and playing stages mutually exclusive; the TUI reads a
/// [`ChatState`] snapshot of everything at ~30 Hz.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Inner>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                phase: AtomicU8::new(PHASE_IDLE),
                record_secs: AtomicU64::new(0),
                characters: Mutex::new(Vec::new()),
                active_character: Mutex::new(None),
                reply: Mutex::new(None),
                last_error: Mutex::new(None),
            }),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        phase_from_u8(self.inner.phase.load(Ordering::Relaxed))
    }

    pub fn set_phase(&self, phase: SessionPhase) {
        self.inner.phase.store(phase_to_u8(phase), Ordering::Relaxed);
    }

    /// Move from `from` to `to` only if the session is still in `from`.
    pub fn try_transition(&self, from: SessionPhase, to: SessionPhase) -> bool {
        self.inner
            .phase
            .compare_exchange(
                phase_to_u8(from),
                phase_to_u8(to),
                Ordering::Relaxed,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    pub fn record_secs(&self) -> u64 {
        self.inner.record_secs.load(Ordering::Relaxed)
    }

    pub fn set_record_secs(&self, secs: u64) {
        self.inner.record_secs.store(secs, Ordering::Relaxed);
    }

    pub fn characters(&self) -> Vec<Character> {
        self.inner.characters.lock().unwrap().clone()
    }

    pub fn set_characters(&self, characters: Vec<Character>) {
        *self.inner.characters.lock().unwrap() = characters;
    }

    pub fn active_character(&self) -> Option<Character> {
        self.inner.active_character.lock().unwrap().clone()
    }

    pub fn set_active_character(&self, character: Option<Character>) {
        *self.inner.active_character.lock().unwrap() = character;
    }

    pub fn reply(&self) -> Option<Reply> {
        self.inner.reply.lock().unwrap().clone()
    }

    pub fn set_reply(&self, reply: Reply) {
        *self.inner.reply.lock().unwrap() = Some(reply);
    }

    pub fn clear_reply(&self) {
        *self.inner.reply.lock().unwrap() = None;
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.lock().unwrap().clone()
    }

    pub fn set_error(&self, message: impl Into<String>) {
        *self.inner.last_error.lock().unwrap() = Some(message.into());
    }

    pub fn clear_error(&self) {
        *self.inner.last_error.lock().unwrap() = None;
    }

    /// Every failure class ends the same way: the message is surfaced once
    /// and the session returns to idle.
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.set_error(message);
        self.set_record_secs(0);
        self.set_phase(SessionPhase::Idle);
    }

    pub fn snapshot(&self, is_running: bool) -> ChatState {
        let reply = self.reply();
        ChatState {
            characters: self.characters(),
            active_character: self.active_character(),
            phase: self.phase(),
            record_secs: self.record_secs(),
            response_bytes: reply.as_ref().map(|r| r.wav_bytes.len()).unwrap_or(0),
            waveform: reply.map(|r| r.waveform).unwrap_or_default(),
            last_error: self.last_error(),
            is_running,
        }
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}
