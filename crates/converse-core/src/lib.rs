pub mod config;
pub mod error;
pub mod types;
pub mod ui;

pub use config::AppConfig;
pub use error::{ApiError, AudioError, CodecError, ConfigError};
pub use types::{AudioClip, Character};
pub use ui::{ChatState, SessionPhase, StreamStatus, UiCommand};
