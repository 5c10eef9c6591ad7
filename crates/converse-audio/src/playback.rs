use converse_core::{AudioClip, AudioError, StreamStatus};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const STATUS_OK: u8 = 0;
const STATUS_ERROR: u8 = 1;

// ── PlaybackHandle ────────────────────────────────────────────

#[derive(Clone)]
pub struct PlaybackHandle {
    active: Arc<AtomicBool>,
    remaining: Arc<AtomicUsize>,
    status: Arc<AtomicU8>,
}

impl PlaybackHandle {
    /// True while samples are still being delivered to the device.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Stop early; the stream keeps running but emits silence until the
    /// node is dropped.
    pub fn stop(&self) {
        self.active.store(false, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        !self.is_active()
    }

    /// Samples not yet handed to the device.
    pub fn samples_remaining(&self) -> usize {
        self.remaining.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> StreamStatus {
        match self.status.load(Ordering::Relaxed) {
            STATUS_ERROR => StreamStatus::Error,
            _ => StreamStatus::Ok,
        }
    }
}

// ── PlaybackNode ──────────────────────────────────────────────

/// An output stream draining a clip preloaded into a ring buffer. The
/// active flag clears itself once the final sample has been handed to the
/// device; dropping the node releases the stream.
pub struct PlaybackNode {
    _stream: Stream,
}

impl PlaybackNode {
    pub fn play(device: &Device, clip: &AudioClip) -> Result<(Self, PlaybackHandle), AudioError> {
        // The clip dictates rate and channel count, so the buffer size is
        // left to the host.
        let config = StreamConfig {
            channels: clip.channels,
            sample_rate: SampleRate(clip.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let rb = HeapRb::<f32>::new(clip.samples.len().max(1));
        let (mut producer, consumer) = rb.split();
        producer.push_slice(&clip.samples);

        let consumer = Arc::new(Mutex::new(consumer));
        let active = Arc::new(AtomicBool::new(!clip.is_empty()));
        let active_flag = Arc::clone(&active);
        let remaining = Arc::new(AtomicUsize::new(clip.samples.len()));
        let remaining_count = Arc::clone(&remaining);
        let status = Arc::new(AtomicU8::new(STATUS_OK));
        let status_flag = Arc::clone(&status);

        let err_callback = move |err: cpal::StreamError| {
            tracing::error!("playback stream error: {}", err);
            status_flag.store(STATUS_ERROR, Ordering::Relaxed);
        };

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !active_flag.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }
                    if let Ok(mut consumer) = consumer.lock() {
                        for sample in data.iter_mut() {
                            match consumer.try_pop() {
                                Some(v) => {
                                    *sample = v;
                                    remaining_count.fetch_sub(1, Ordering::Relaxed);
                                }
                                None => *sample = 0.0,
                            }
                        }
                        if remaining_count.load(Ordering::Relaxed) == 0 {
                            active_flag.store(false, Ordering::Relaxed);
                        }
                    } else {
                        // Mutex poisoned — fill with silence
                        data.fill(0.0);
                    }
                },
                err_callback,
                None,
            )
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        let handle = PlaybackHandle {
            active,
            remaining,
            status,
        };
        Ok((Self { _stream: stream }, handle))
    }
}
