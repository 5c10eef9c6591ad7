use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to enumerate devices: {0}")]
    DeviceEnumeration(String),

    #[error("failed to build stream: {0}")]
    StreamBuild(String),

    #[error("stream error: {0}")]
    StreamError(String),
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error("clip has no channels")]
    NoChannels,

    #[error("channel planes have unequal lengths")]
    RaggedPlanes,

    #[error("interleaved sample count not divisible by channel count")]
    PartialFrame,

    #[error("failed to write WAV: {0}")]
    Encode(String),

    #[error("failed to decode audio: {0}")]
    Decode(String),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("server returned an empty response")]
    EmptyResponse,
}
