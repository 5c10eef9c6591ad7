use crate::error::SessionError;
use crate::handle::{Reply, SessionHandle};
use crate::worker::WorkerMsg;
use converse_api::Backend;
use converse_codec::{decode_wav, encode_wav, waveform, PcmBuffer};
use converse_core::AudioClip;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Buckets in the reply waveform shown by the TUI.
pub const WAVEFORM_BUCKETS: usize = 50;

/// Drives each finished recording through encode → upload → decode, then
/// hands the reply back to the audio worker for auto-play. Runs until the
/// clip channel closes.
pub async fn run_exchange(
    mut clip_rx: UnboundedReceiver<AudioClip>,
    backend: Arc<dyn Backend>,
    handle: SessionHandle,
    worker_tx: Sender<WorkerMsg>,
) {
    while let Some(clip) = clip_rx.recv().await {
        let Some(character) = handle.active_character() else {
            handle.fail("no character selected");
            continue;
        };

        match exchange(backend.as_ref(), character.id, clip).await {
            Ok(reply) => {
                let reply_clip = reply.clip.clone();
                handle.set_reply(reply);
                if worker_tx.send(WorkerMsg::Play(reply_clip)).is_err() {
                    handle.fail("audio worker is gone");
                }
            }
            Err(e) => handle.fail(e.to_string()),
        }
    }
    tracing::debug!("exchange task stopped");
}

async fn exchange(
    backend: &dyn Backend,
    character_id: i64,
    clip: AudioClip,
) -> Result<Reply, SessionError> {
    let pcm = PcmBuffer::from_clip(&clip)?;
    let wav = encode_wav(&pcm)?;

    tracing::info!(
        character_id,
        "uploading {:.1}s recording ({} bytes)",
        clip.duration_secs(),
        wav.len(),
    );
    let bytes = backend.exchange_audio(character_id, wav).await?;

    let reply_clip = decode_wav(&bytes)?;
    tracing::info!(
        character_id,
        "reply: {:.1}s at {} Hz",
        reply_clip.duration_secs(),
        reply_clip.sample_rate,
    );

    let profile = waveform(&reply_clip, WAVEFORM_BUCKETS);
    Ok(Reply {
        wav_bytes: bytes,
        clip: reply_clip,
        waveform: profile,
    })
}
