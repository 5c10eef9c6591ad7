use converse_core::AudioError;
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

pub struct DeviceManager {
    host: Host,
}

impl DeviceManager {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    pub fn list_input_devices(&self) -> Result<Vec<(String, Device)>, AudioError> {
        let devices = self
            .host
            .input_devices()
            .map_err(|e| AudioError::DeviceEnumeration(e.to_string()))?;
        Ok(Self::with_names(devices))
    }

    pub fn list_output_devices(&self) -> Result<Vec<(String, Device)>, AudioError> {
        let devices = self
            .host
            .output_devices()
            .map_err(|e| AudioError::DeviceEnumeration(e.to_string()))?;
        Ok(Self::with_names(devices))
    }

    pub fn get_input_device(&self, name: &str) -> Result<Device, AudioError> {
        if name == "default" {
            return self
                .host
                .default_input_device()
                .ok_or_else(|| AudioError::DeviceNotFound("no default input device".to_string()));
        }
        Self::find(self.list_input_devices()?, name)
            .ok_or_else(|| AudioError::DeviceNotFound(format!("input device not found: {}", name)))
    }

    pub fn get_output_device(&self, name: &str) -> Result<Device, AudioError> {
        if name == "default" {
            return self
                .host
                .default_output_device()
                .ok_or_else(|| AudioError::DeviceNotFound("no default output device".to_string()));
        }
        Self::find(self.list_output_devices()?, name)
            .ok_or_else(|| AudioError::DeviceNotFound(format!("output device not found: {}", name)))
    }

    /// Human-readable default stream config, for device listings.
    pub fn input_summary(device: &Device) -> String {
        match device.default_input_config() {
            Ok(config) => format!(
                "{} Hz, {} ch, {:?}",
                config.sample_rate().0,
                config.channels(),
                config.sample_format(),
            ),
            Err(_) => "no default input config".to_string(),
        }
    }

    pub fn output_summary(device: &Device) -> String {
        match device.default_output_config() {
            Ok(config) => format!(
                "{} Hz, {} ch, {:?}",
                config.sample_rate().0,
                config.channels(),
                config.sample_format(),
            ),
            Err(_) => "no default output config".to_string(),
        }
    }

    fn with_names(devices: impl Iterator<Item = Device>) -> Vec<(String, Device)> {
        devices
            .map(|device| {
                let name = device.name().unwrap_or_else(|_| "unknown".to_string());
                (name, device)
            })
            .collect()
    }

    fn find(devices: Vec<(String, Device)>, name: &str) -> Option<Device> {
        devices
            .into_iter()
            .find(|(dev_name, _)| dev_name == name)
            .map(|(_, device)| device)
    }
}

impl Default for DeviceManager {
    fn default() -> Self {
        Self::new()
    }
}
