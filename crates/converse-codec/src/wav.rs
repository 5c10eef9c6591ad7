use byteorder::{LittleEndian, WriteBytesExt};
use converse_core::{AudioClip, CodecError};
use std::io::{Cursor, Write};

/// Size of the canonical RIFF/WAVE header produced by [`encode_wav`].
pub const HEADER_LEN: usize = 44;

const FORMAT_PCM: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const FMT_CHUNK_LEN: u32 = 16;

/// Planar PCM audio: one `Vec<f32>` of samples per channel, all planes the
/// same length. Validated at construction so the encoder itself cannot fail
/// on shape.
#[derive(Debug, Clone)]
pub struct PcmBuffer {
    sample_rate: u32,
    planes: Vec<Vec<f32>>,
}

impl PcmBuffer {
    pub fn new(sample_rate: u32, planes: Vec<Vec<f32>>) -> Result<Self, CodecError> {
        if sample_rate == 0 {
            return Err(CodecError::InvalidSampleRate(sample_rate));
        }
        if planes.is_empty() {
            return Err(CodecError::NoChannels);
        }
        let frames = planes[0].len();
        if planes.iter().any(|p| p.len() != frames) {
            return Err(CodecError::RaggedPlanes);
        }
        Ok(Self {
            sample_rate,
            planes,
        })
    }

    /// Deinterleave a clip into per-channel planes.
    pub fn from_clip(clip: &AudioClip) -> Result<Self, CodecError> {
        if clip.channels == 0 {
            return Err(CodecError::NoChannels);
        }
        let channels = clip.channels as usize;
        if clip.samples.len() % channels != 0 {
            return Err(CodecError::PartialFrame);
        }
        let frames = clip.samples.len() / channels;
        let mut planes = vec![Vec::with_capacity(frames); channels];
        for frame in clip.samples.chunks_exact(channels) {
            for (plane, &sample) in planes.iter_mut().zip(frame) {
                plane.push(sample);
            }
        }
        Self::new(clip.sample_rate, planes)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.planes.len() as u16
    }

    pub fn frames(&self) -> usize {
        self.planes[0].len()
    }
}

/// Convert one float sample to 16-bit PCM: clamp to [-1, 1], scale
/// negatives by 32768 and non-negatives by 32767, truncate toward zero.
pub fn sample_to_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Write a canonical 16-bit PCM WAV file: the 44-byte RIFF/WAVE header
/// followed by interleaved little-endian samples. Output length is exactly
/// `44 + frames * channels * 2`.
pub fn write_wav<W: Write>(buf: &PcmBuffer, writer: &mut W) -> Result<(), CodecError> {
    let channels = buf.channels() as u32;
    let frames = buf.frames() as u32;
    let data_len = frames * channels * 2;
    let byte_rate = buf.sample_rate() * channels * 2;
    let block_align = (channels * 2) as u16;

    let w = |r: std::io::Result<()>| r.map_err(|e| CodecError::Encode(e.to_string()));

    w(writer.write_all(b"RIFF"))?;
    w(writer.write_u32::<LittleEndian>(36 + data_len))?;
    w(writer.write_all(b"WAVE"))?;
    w(writer.write_all(b"fmt "))?;
    w(writer.write_u32::<LittleEndian>(FMT_CHUNK_LEN))?;
    w(writer.write_u16::<LittleEndian>(FORMAT_PCM))?;
    w(writer.write_u16::<LittleEndian>(buf.channels()))?;
    w(writer.write_u32::<LittleEndian>(buf.sample_rate()))?;
    w(writer.write_u32::<LittleEndian>(byte_rate))?;
    w(writer.write_u16::<LittleEndian>(block_align))?;
    w(writer.write_u16::<LittleEndian>(BITS_PER_SAMPLE))?;
    w(writer.write_all(b"data"))?;
    w(writer.write_u32::<LittleEndian>(data_len))?;

    for frame in 0..buf.frames() {
        for plane in &buf.planes {
            w(writer.write_i16::<LittleEndian>(sample_to_i16(plane[frame])))?;
        }
    }

    Ok(())
}

/// Encode a PCM buffer into an in-memory WAV file.
pub fn encode_wav(buf: &PcmBuffer) -> Result<Vec<u8>, CodecError> {
    let data_len = buf.frames() * buf.planes.len() * 2;
    let mut out = Vec::with_capacity(HEADER_LEN + data_len);
    write_wav(buf, &mut out)?;
    Ok(out)
}

/// Decode a WAV file from memory into an interleaved clip. Accepts the
/// integer and float sample formats the service is known to return;
/// everything is normalized to f32 in [-1, 1].
pub fn decode_wav(bytes: &[u8]) -> Result<AudioClip, CodecError> {
    let mut reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| CodecError::Decode(e.to_string()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| CodecError::Decode(e.to_string()))?,
        (hound::SampleFormat::Int, bits @ 8..=32) => {
            let scale = (1i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| CodecError::Decode(e.to_string()))?
        }
        (format, bits) => {
            return Err(CodecError::UnsupportedFormat(format!(
                "{:?} at {} bits",
                format, bits
            )));
        }
    };

    Ok(AudioClip::new(samples, spec.sample_rate, spec.channels))
}
