use crate::types::Character;

/// Health status for an audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamStatus {
    #[default]
    Ok,
    Error,
}

/// The stage a voice exchange is in. Stages are mutually exclusive: a
/// command that does not apply to the current phase is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Recording,
    Processing,
    Playing,
}

impl SessionPhase {
    pub fn label(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Recording => "recording",
            SessionPhase::Processing => "processing",
            SessionPhase::Playing => "playing",
        }
    }
}

/// Aggregate session state broadcast to the TUI via watch channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    pub characters: Vec<Character>,
    pub active_character: Option<Character>,
    pub phase: SessionPhase,
    pub record_secs: u64,
    /// Size of the last response body in bytes; 0 when none.
    pub response_bytes: usize,
    /// Bucketed amplitude profile of the last response, for display.
    pub waveform: Vec<f32>,
    pub last_error: Option<String>,
    pub is_running: bool,
}

/// Commands sent from TUI → session via mpsc channel.
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    RefreshCharacters,
    OpenCharacter(i64),
    StartRecording,
    StopRecording,
    PlayResponse,
    StopPlayback,
    SaveResponse,
    Quit,
}
