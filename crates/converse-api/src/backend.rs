use async_trait::async_trait;
use converse_core::{ApiError, Character};

/// The remote character service, seen from the client side.
///
/// [`CharacterClient`](crate::CharacterClient) is the HTTP implementation;
/// tests drive the session against scripted fakes instead.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch every character the service knows about.
    async fn list_characters(&self) -> Result<Vec<Character>, ApiError>;
    /// Fetch one character by id.
    async fn get_character(&self, id: i64) -> Result<Character, ApiError>;
    /// Register a new character; the service echoes the created record.
    async fn create_character(&self, character: &Character) -> Result<Character, ApiError>;
    /// Upload a recorded WAV and receive the spoken reply as raw WAV bytes.
    async fn exchange_audio(&self, id: i64, wav: Vec<u8>) -> Result<Vec<u8>, ApiError>;
}
