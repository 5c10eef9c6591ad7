pub mod capture;
pub mod device;
pub mod playback;

pub use capture::{CaptureHandle, CaptureNode};
pub use device::DeviceManager;
pub use playback::{PlaybackHandle, PlaybackNode};
