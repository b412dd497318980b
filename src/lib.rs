mod backend;
mod mode;

use log::{debug, info};
use pcap::{Active, Capture, Device, Direction, Error as PcapError};
use thiserror::Error;

pub use backend::CaptureBackend;
pub use mode::DeviceMode;

#[derive(Error, Debug)]
pub enum DeviceModeError {
    #[error("Pcap error: {0}")]
    Pcap(#[from] PcapError),

    #[error("Invalid device name: {0}")]
    InvalidDevice(String),

    #[error("Unsupported device mode {mode} on {backend}: cannot honor {unsupported}")]
    UnsupportedMode {
        mode: DeviceMode,
        unsupported: DeviceMode,
        backend: CaptureBackend,
    },

    #[error("Invalid device mode: {0:?}")]
    InvalidMode(String),
}

#[derive(Debug, Clone)]
pub struct DeviceOpenOptions {
    pub device_name: String,
    pub snaplen: i32,
    pub timeout_ms: i32,
    pub mode: DeviceMode,
}

impl Default for DeviceOpenOptions {
    fn default() -> Self {
        Self {
            device_name: String::new(),
            snaplen: 65535,
            timeout_ms: 1000,
            mode: DeviceMode::NORMAL, // 默认非混杂
        }
    }
}

pub struct DeviceOpener {
    options: DeviceOpenOptions,
}

impl DeviceOpener {
    pub fn new(options: DeviceOpenOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DeviceOpenOptions {
        &self.options
    }

    pub fn open(&self) -> Result<Capture<Active>, DeviceModeError> {
        open_device(&self.options)
    }
}

/// 按给定模式打开抓包设备。
///
/// 模式先按 libpcap 的能力校验，不支持的位直接报错，不会去碰设备。
pub fn open_device(options: &DeviceOpenOptions) -> Result<Capture<Active>, DeviceModeError> {
    let mode = options.mode;
    CaptureBackend::Libpcap.check(mode)?;

    // 检查设备是否存在
    let devices = Device::list()?;
    if !devices.iter().any(|d| d.name == options.device_name) {
        return Err(DeviceModeError::InvalidDevice(options.device_name.clone()));
    }

    debug!(
        "Opening {} with snaplen={}, timeout={}ms, mode={}",
        options.device_name, options.snaplen, options.timeout_ms, mode
    );

    let cap = Capture::from_device(&*options.device_name)?
        .snaplen(options.snaplen)
        .promisc(mode.is_promiscuous())
        .immediate_mode(mode.contains(DeviceMode::MAX_RESPONSIVENESS))
        .timeout(options.timeout_ms)
        .open()?;

    // 只抓入站方向，即丢弃本机发出的包
    if mode.contains(DeviceMode::NO_CAPTURE_LOCAL) {
        cap.direction(Direction::In)?;
    }

    info!("Opened device {} in mode {}", options.device_name, mode);
    Ok(cap)
}

/// 获取所有可用的网络设备
pub fn get_available_devices() -> Result<Vec<String>, DeviceModeError> {
    let devices = Device::list()?;
    let device_names: Vec<String> = devices.iter().map(|d| d.name.clone()).collect();
    Ok(device_names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_available_devices() {
        // 这个测试可能会因环境而异
        let devices = get_available_devices();
        assert!(devices.is_ok(), "Failed to get devices");
    }

    #[test]
    fn test_device_open_options_default() {
        let options = DeviceOpenOptions::default();
        assert!(options.device_name.is_empty());
        assert_eq!(options.snaplen, 65535);
        assert_eq!(options.timeout_ms, 1000);
        assert_eq!(options.mode, DeviceMode::NORMAL);
    }

    #[test]
    fn test_open_rejects_remote_flags_before_device_lookup() {
        let options = DeviceOpenOptions {
            device_name: "no-such-device".to_string(),
            mode: DeviceMode::PROMISCUOUS | DeviceMode::DATA_TX_UDP,
            ..Default::default()
        };

        match DeviceOpener::new(options).open() {
            Err(DeviceModeError::UnsupportedMode { unsupported, backend, .. }) => {
                assert_eq!(unsupported, DeviceMode::DATA_TX_UDP);
                assert_eq!(backend, CaptureBackend::Libpcap);
            }
            Err(e) => panic!("expected UnsupportedMode, got {}", e),
            Ok(_) => panic!("expected UnsupportedMode, device was opened"),
        }
    }

    #[test]
    fn test_open_unknown_device() {
        let options = DeviceOpenOptions {
            device_name: "no-such-device".to_string(),
            mode: DeviceMode::PROMISCUOUS | DeviceMode::NO_CAPTURE_LOCAL,
            ..Default::default()
        };

        match open_device(&options) {
            Err(DeviceModeError::InvalidDevice(name)) => assert_eq!(name, "no-such-device"),
            Err(e) => panic!("expected InvalidDevice, got {}", e),
            Ok(_) => panic!("expected InvalidDevice, device was opened"),
        }
    }

    #[test]
    fn test_unsupported_mode_message() {
        let err = CaptureBackend::Libpcap
            .check(DeviceMode::NO_CAPTURE_RPCAP)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported device mode no_capture_rpcap on libpcap: cannot honor no_capture_rpcap"
        );
    }
}
