use converse_core::{AudioClip, AudioError, StreamStatus};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

const STATUS_OK: u8 = 0;
const STATUS_ERROR: u8 = 1;

// ── CaptureHandle ─────────────────────────────────────────────

/// Shared view of an in-progress recording. Cloneable; all clones observe
/// the same stream.
#[derive(Clone)]
pub struct CaptureHandle {
    recording: Arc<AtomicBool>,
    status: Arc<AtomicU8>,
    buffer: Arc<Mutex<Vec<f32>>>,
    sample_rate: u32,
    channels: u16,
}

impl CaptureHandle {
    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> StreamStatus {
        match self.status.load(Ordering::Relaxed) {
            STATUS_ERROR => StreamStatus::Error,
            _ => StreamStatus::Ok,
        }
    }

    pub fn frames_captured(&self) -> usize {
        let len = self.buffer.lock().map(|b| b.len()).unwrap_or(0);
        len / self.channels.max(1) as usize
    }

    /// Stop accepting samples and drain everything captured so far into a
    /// clip. The stream itself is released when the node is dropped.
    pub fn take_clip(&self) -> AudioClip {
        self.recording.store(false, Ordering::Relaxed);
        let samples = match self.buffer.lock() {
            Ok(mut buffer) => std::mem::take(&mut *buffer),
            Err(_) => Vec::new(),
        };
        AudioClip::new(samples, self.sample_rate, self.channels)
    }
}

// ── CaptureNode ───────────────────────────────────────────────

/// An open microphone stream appending interleaved f32 frames to a shared
/// buffer while the recording flag is set. Dropping the node releases the
/// device.
pub struct CaptureNode {
    _stream: Stream,
}

impl CaptureNode {
    pub fn new(
        device: &Device,
        sample_rate: u32,
        channels: u16,
        buffer_size: u32,
    ) -> Result<(Self, CaptureHandle), AudioError> {
        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Fixed(buffer_size),
        };

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);
        let recording = Arc::new(AtomicBool::new(true));
        let recording_flag = Arc::clone(&recording);
        let status = Arc::new(AtomicU8::new(STATUS_OK));
        let status_flag = Arc::clone(&status);

        let err_callback = move |err: cpal::StreamError| {
            tracing::error!("capture stream error: {}", err);
            status_flag.store(STATUS_ERROR, Ordering::Relaxed);
        };

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !recording_flag.load(Ordering::Relaxed) {
                        return;
                    }
                    if let Ok(mut sink) = sink.lock() {
                        sink.extend_from_slice(data);
                    }
                },
                err_callback,
                None,
            )
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        let handle = CaptureHandle {
            recording,
            status,
            buffer,
            sample_rate,
            channels,
        };
        Ok((Self { _stream: stream }, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_handle(channels: u16) -> CaptureHandle {
        CaptureHandle {
            recording: Arc::new(AtomicBool::new(true)),
            status: Arc::new(AtomicU8::new(STATUS_OK)),
            buffer: Arc::new(Mutex::new(Vec::new())),
            sample_rate: 48000,
            channels,
        }
    }

    #[test]
    fn test_handle_starts_recording() {
        let handle = make_handle(1);
        assert!(handle.is_recording());
        assert_eq!(handle.status(), StreamStatus::Ok);
    }

    #[test]
    fn test_take_clip_stops_recording() {
        let handle = make_handle(1);
        handle.buffer.lock().unwrap().extend_from_slice(&[0.1, 0.2]);
        let clip = handle.take_clip();
        assert!(!handle.is_recording());
        assert_eq!(clip.samples, vec![0.1, 0.2]);
        assert_eq!(clip.sample_rate, 48000);
        assert_eq!(clip.channels, 1);
    }

    #[test]
    fn test_take_clip_drains_buffer() {
        let handle = make_handle(1);
        handle.buffer.lock().unwrap().extend_from_slice(&[0.5; 8]);
        let first = handle.take_clip();
        assert_eq!(first.frames(), 8);
        let second = handle.take_clip();
        assert!(second.is_empty());
    }

    #[test]
    fn test_frames_captured_counts_frames_not_samples() {
        let handle = make_handle(2);
        handle.buffer.lock().unwrap().extend_from_slice(&[0.0; 10]);
        assert_eq!(handle.frames_captured(), 5);
    }

    #[test]
    fn test_clone_shares_buffer() {
        let h1 = make_handle(1);
        let h2 = h1.clone();
        h1.buffer.lock().unwrap().push(0.7);
        assert_eq!(h2.frames_captured(), 1);
        let clip = h2.take_clip();
        assert_eq!(clip.samples, vec![0.7]);
        assert!(!h1.is_recording());
    }

    #[test]
    fn test_paused_callback_discards_samples() {
        let handle = make_handle(1);
        handle.recording.store(false, Ordering::Relaxed);
        // Simulating the callback gate
        if handle.is_recording() {
            handle.buffer.lock().unwrap().push(1.0);
        }
        assert_eq!(handle.frames_captured(), 0);
    }
}
