use std::fmt;

use log::warn;

use crate::{DeviceMode, DeviceModeError};

/// 实际执行打开操作的原生抓包后端。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CaptureBackend {
    /// 基础 libpcap（通过 `pcap` crate）。
    ///
    /// 混杂模式走 `promisc`，`MAX_RESPONSIVENESS` 对应 immediate mode，
    /// `NO_CAPTURE_LOCAL` 通过只抓入站方向实现。远程抓包相关的位无法兑现。
    Libpcap,
    /// WinPcap/Npcap 的 `pcap_open()`，支持全部打开标志。
    RemoteCapture,
}

impl CaptureBackend {
    pub const fn supported_modes(self) -> DeviceMode {
        match self {
            CaptureBackend::Libpcap => DeviceMode::PROMISCUOUS
                .union(DeviceMode::NO_CAPTURE_LOCAL)
                .union(DeviceMode::MAX_RESPONSIVENESS),
            CaptureBackend::RemoteCapture => DeviceMode::all(),
        }
    }

    /// 请求中该后端无法兑现的位，包括未定义的位。
    pub const fn unsupported(self, mode: DeviceMode) -> DeviceMode {
        mode.difference(self.supported_modes())
    }

    pub const fn supports(self, mode: DeviceMode) -> bool {
        self.unsupported(mode).is_empty()
    }

    /// 校验模式，不支持时返回错误而不是悄悄截断。
    pub fn check(self, mode: DeviceMode) -> Result<(), DeviceModeError> {
        let unsupported = self.unsupported(mode);
        if unsupported.is_empty() {
            return Ok(());
        }

        warn!("{} rejected device mode {} (unsupported: {})", self, mode, unsupported);
        Err(DeviceModeError::UnsupportedMode {
            mode,
            unsupported,
            backend: self,
        })
    }
}

impl fmt::Display for CaptureBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureBackend::Libpcap => f.write_str("libpcap"),
            CaptureBackend::RemoteCapture => f.write_str("remote capture"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_libpcap_supported_modes() {
        let backend = CaptureBackend::Libpcap;
        assert!(backend.supports(DeviceMode::NORMAL));
        assert!(backend.supports(DeviceMode::PROMISCUOUS | DeviceMode::MAX_RESPONSIVENESS));
        assert!(backend.supports(DeviceMode::NO_CAPTURE_LOCAL));
        assert!(!backend.supports(DeviceMode::DATA_TX_UDP));
        assert!(!backend.supports(DeviceMode::NO_CAPTURE_RPCAP));
    }

    #[test]
    fn test_libpcap_reports_offending_bits() {
        let mode = DeviceMode::PROMISCUOUS | DeviceMode::DATA_TX_UDP | DeviceMode::NO_CAPTURE_RPCAP;
        match CaptureBackend::Libpcap.check(mode) {
            Err(DeviceModeError::UnsupportedMode {
                mode: requested,
                unsupported,
                backend,
            }) => {
                assert_eq!(requested, mode);
                assert_eq!(unsupported, DeviceMode::REMOTE_ONLY);
                assert_eq!(backend, CaptureBackend::Libpcap);
            }
            other => panic!("expected UnsupportedMode, got {:?}", other),
        }
    }

    #[test]
    fn test_remote_capture_accepts_all_flags() {
        let backend = CaptureBackend::RemoteCapture;
        assert!(backend.check(DeviceMode::all()).is_ok());
        assert!(backend.check(DeviceMode::NORMAL).is_ok());
    }

    #[test]
    fn test_undefined_bits_are_rejected() {
        let mode = DeviceMode::from(0x100);
        assert_eq!(CaptureBackend::RemoteCapture.unsupported(mode).bits(), 0x100);
        assert!(CaptureBackend::Libpcap.check(mode).is_err());
    }
}
