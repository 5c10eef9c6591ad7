use crate::handle::SessionHandle;
use converse_audio::{CaptureHandle, CaptureNode, DeviceManager, PlaybackHandle, PlaybackNode};
use converse_core::{AppConfig, AudioClip, SessionPhase, StreamStatus};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;

const TICK: Duration = Duration::from_millis(50);

/// Operations executed on the audio worker thread.
#[derive(Debug)]
pub enum WorkerMsg {
    StartRecording,
    StopRecording,
    Play(AudioClip),
    StopPlayback,
    Shutdown,
}

/// Audio device settings the worker needs, lifted out of [`AppConfig`].
#[derive(Debug, Clone)]
pub struct AudioSettings {
    pub input_device: String,
    pub output_device: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_size: u32,
}

impl AudioSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            input_device: config.input.device_name.clone(),
            output_device: config.output.device_name.clone(),
            sample_rate: config.input.sample_rate,
            channels: config.input.channels,
            buffer_size: config.input.buffer_size,
        }
    }
}

/// Owns the cpal nodes on a dedicated thread; streams are `!Send`, so
/// every open and close happens here. Commands arrive over a channel and
/// the thread polls its nodes once per tick in between.
pub struct AudioWorker {
    thread: Option<std::thread::JoinHandle<()>>,
    msg_tx: Sender<WorkerMsg>,
}

impl AudioWorker {
    pub fn spawn(
        settings: AudioSettings,
        handle: SessionHandle,
        clip_tx: UnboundedSender<AudioClip>,
    ) -> Self {
        let (msg_tx, msg_rx) = std::sync::mpsc::channel();
        let thread = std::thread::spawn(move || {
            Worker::new(settings, handle, clip_tx).run(msg_rx);
        });
        Self {
            thread: Some(thread),
            msg_tx,
        }
    }

    pub fn sender(&self) -> Sender<WorkerMsg> {
        self.msg_tx.clone()
    }

    /// Ask the thread to stop and wait for it.
    pub fn shutdown(&mut self) {
        let _ = self.msg_tx.send(WorkerMsg::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

struct Worker {
    settings: AudioSettings,
    handle: SessionHandle,
    clip_tx: UnboundedSender<AudioClip>,
    devices: DeviceManager,
    capture: Option<(CaptureNode, CaptureHandle, Instant)>,
    playback: Option<(PlaybackNode, PlaybackHandle)>,
}

impl Worker {
    fn new(
        settings: AudioSettings,
        handle: SessionHandle,
        clip_tx: UnboundedSender<AudioClip>,
    ) -> Self {
        Self {
            settings,
            handle,
            clip_tx,
            devices: DeviceManager::new(),
            capture: None,
            playback: None,
        }
    }

    fn run(mut self, msg_rx: Receiver<WorkerMsg>) {
        tracing::debug!("audio worker started");
        loop {
            match msg_rx.recv_timeout(TICK) {
                Ok(WorkerMsg::StartRecording) => self.start_recording(),
                Ok(WorkerMsg::StopRecording) => self.stop_recording(),
                Ok(WorkerMsg::Play(clip)) => self.play(clip),
                Ok(WorkerMsg::StopPlayback) => self.stop_playback(),
                Ok(WorkerMsg::Shutdown) => break,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            self.poll_capture();
            self.poll_playback();
        }
        tracing::debug!("audio worker stopped");
    }

    fn start_recording(&mut self) {
        if self.handle.phase() != SessionPhase::Idle {
            tracing::debug!("record request ignored while {}", self.handle.phase().label());
            return;
        }

        self.handle.clear_error();
        self.handle.clear_reply();
        self.handle.set_record_secs(0);

        let opened = self
            .devices
            .get_input_device(&self.settings.input_device)
            .and_then(|device| {
                CaptureNode::new(
                    &device,
                    self.settings.sample_rate,
                    self.settings.channels,
                    self.settings.buffer_size,
                )
            });

        match opened {
            Ok((node, capture_handle)) => {
                tracing::info!(
                    "recording at {} Hz, {} ch",
                    self.settings.sample_rate,
                    self.settings.channels,
                );
                self.handle.set_phase(SessionPhase::Recording);
                self.capture = Some((node, capture_handle, Instant::now()));
            }
            Err(e) => self.handle.fail(format!("could not access microphone: {e}")),
        }
    }

    fn stop_recording(&mut self) {
        let Some((node, capture_handle, _)) = self.capture.take() else {
            return;
        };
        drop(node);

        let clip = capture_handle.take_clip();
        if clip.is_empty() {
            tracing::debug!("empty recording discarded");
            self.handle.set_record_secs(0);
            self.handle.set_phase(SessionPhase::Idle);
            return;
        }

        tracing::info!("captured {:.1}s of audio", clip.duration_secs());
        self.handle.set_phase(SessionPhase::Processing);
        if self.clip_tx.send(clip).is_err() {
            self.handle.fail("voice exchange pipeline is gone");
        }
    }

    fn play(&mut self, clip: AudioClip) {
        match self.handle.phase() {
            // Processing covers the auto-play of a fresh reply; Idle a replay.
            SessionPhase::Processing | SessionPhase::Idle => {}
            other => {
                tracing::debug!("play request ignored while {}", other.label());
                return;
            }
        }

        self.playback = None;
        let opened = self
            .devices
            .get_output_device(&self.settings.output_device)
            .and_then(|device| PlaybackNode::play(&device, &clip));

        match opened {
            Ok((node, playback_handle)) => {
                tracing::info!("playing {:.1}s reply", clip.duration_secs());
                self.handle.set_phase(SessionPhase::Playing);
                self.playback = Some((node, playback_handle));
            }
            Err(e) => self.handle.fail(format!("could not play reply: {e}")),
        }
    }

    fn stop_playback(&mut self) {
        if let Some((node, playback_handle)) = self.playback.take() {
            playback_handle.stop();
            drop(node);
            self.handle.try_transition(SessionPhase::Playing, SessionPhase::Idle);
        }
    }

    fn poll_capture(&mut self) {
        let failed = self
            .capture
            .as_ref()
            .map(|(_, handle, _)| handle.status() == StreamStatus::Error)
            .unwrap_or(false);
        if failed {
            self.capture = None;
            self.handle.fail("microphone stream failed");
            return;
        }
        if let Some((_, _, started)) = &self.capture {
            self.handle.set_record_secs(started.elapsed().as_secs());
        }
    }

    fn poll_playback(&mut self) {
        let (failed, finished) = match &self.playback {
            Some((_, playback_handle)) => (
                playback_handle.status() == StreamStatus::Error,
                playback_handle.is_finished(),
            ),
            None => return,
        };
        if failed {
            self.playback = None;
            self.handle.fail("playback stream failed");
        } else if finished {
            self.playback = None;
            self.handle.try_transition(SessionPhase::Playing, SessionPhase::Idle);
        }
    }
}
