pub mod wav;
pub mod waveform;

pub use wav::{decode_wav, encode_wav, sample_to_i16, write_wav, PcmBuffer, HEADER_LEN};
pub use waveform::waveform;
