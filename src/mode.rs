//! 设备打开模式标志。
//!
//! 数值与底层抓包库的打开标志一致：libpcap 的 `promisc`，以及
//! WinPcap/Npcap `pcap_open()` 的 `PCAP_OPENFLAG_*`。
//!
//! libpcap 把这个整数存进 `pcap_opt->promisc` 并按布尔值处理，所以除
//! `NORMAL`/`PROMISCUOUS` 以外的位只有支持远程抓包扩展的后端才会区分。
//! 具体哪些位能被某个后端兑现见 [`crate::CaptureBackend`]。

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use crate::DeviceModeError;

bitflags! {
    /// 打开抓包设备时使用的模式，可以用 `|` 自由组合。
    ///
    /// 类型本身不做任何校验，`NORMAL` 与 `PROMISCUOUS` 互斥只是约定
    /// （第 0 位置位即混杂模式）。
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct DeviceMode: i32 {
        /// 非混杂模式，只接收发往本网卡的流量。
        const NORMAL = 0;

        /// 混杂模式：接收网卡看到的所有数据包，包括不是发给本机的。
        /// 在非交换网络上流量会明显增加，而且处于该模式的设备可以被
        /// 网络上的其他主机探测到。
        const PROMISCUOUS = 1;

        /// `PCAP_OPENFLAG_DATATX_UDP`：远程抓包的数据通道改用 UDP。
        /// 开销更小，但不保证所有包都能送达，拥塞时还可能加重拥塞。
        /// 对本地接口没有意义。
        const DATA_TX_UDP = 2;

        /// `PCAP_OPENFLAG_NOCAPTURE_RPCAP`：远程探针不抓取自己产生的
        /// RPCAP 流量。
        const NO_CAPTURE_RPCAP = 4;

        /// `PCAP_OPENFLAG_NOCAPTURE_LOCAL`：丢弃本机自己发出的数据包，
        /// 常用于网桥一类需要忽略自身发送流量的程序。
        const NO_CAPTURE_LOCAL = 8;

        /// `PCAP_OPENFLAG_MAX_RESPONSIVENESS`：包一到就交给用户，
        /// 不再等待攒够一批。系统调用更多，延迟更低。
        const MAX_RESPONSIVENESS = 16;
    }
}

// 名称表，Display 与 FromStr 共用
const NAMED_MODES: [(&str, DeviceMode); 5] = [
    ("promiscuous", DeviceMode::PROMISCUOUS),
    ("data_tx_udp", DeviceMode::DATA_TX_UDP),
    ("no_capture_rpcap", DeviceMode::NO_CAPTURE_RPCAP),
    ("no_capture_local", DeviceMode::NO_CAPTURE_LOCAL),
    ("max_responsiveness", DeviceMode::MAX_RESPONSIVENESS),
];

impl DeviceMode {
    /// 只对远程（rpcap）数据源有意义的位。
    pub const REMOTE_ONLY: DeviceMode = DeviceMode::DATA_TX_UDP.union(DeviceMode::NO_CAPTURE_RPCAP);

    pub const fn is_promiscuous(self) -> bool {
        self.contains(DeviceMode::PROMISCUOUS)
    }

    /// 返回请求中只适用于远程数据源的那部分标志。
    pub const fn remote_only(self) -> DeviceMode {
        self.intersection(DeviceMode::REMOTE_ONLY)
    }
}

impl Default for DeviceMode {
    fn default() -> Self {
        DeviceMode::NORMAL
    }
}

impl From<DeviceMode> for i32 {
    fn from(mode: DeviceMode) -> Self {
        mode.bits()
    }
}

impl From<i32> for DeviceMode {
    /// 未定义的位原样保留，交给打开设备的一方去拒绝。
    fn from(bits: i32) -> Self {
        DeviceMode::from_bits_retain(bits)
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("normal");
        }

        let mut first = true;
        let mut write_part = |f: &mut fmt::Formatter<'_>, part: &dyn fmt::Display| {
            if !first {
                f.write_str("|")?;
            }
            first = false;
            write!(f, "{}", part)
        };

        for (name, flag) in NAMED_MODES {
            if self.contains(flag) {
                write_part(f, &name)?;
            }
        }

        let unknown = self.difference(DeviceMode::all());
        if !unknown.is_empty() {
            write_part(f, &format_args!("{:#x}", unknown.bits()))?;
        }

        Ok(())
    }
}

impl FromStr for DeviceMode {
    type Err = DeviceModeError;

    /// 解析 `Display` 的输出格式。
    ///
    /// 不区分大小写，`-` 视同 `_`，分隔符可以是 `|`、`,` 或 `+`，
    /// 也接受十进制或 `0x` 开头的十六进制整数。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(DeviceModeError::InvalidMode(s.to_string()));
        }

        let mut mode = DeviceMode::NORMAL;
        for token in s.split(['|', ',', '+']) {
            let token = token.trim().to_ascii_lowercase().replace('-', "_");
            mode |= parse_token(&token).ok_or_else(|| DeviceModeError::InvalidMode(s.to_string()))?;
        }

        Ok(mode)
    }
}

fn parse_token(token: &str) -> Option<DeviceMode> {
    if token == "normal" {
        return Some(DeviceMode::NORMAL);
    }

    if let Some(hex) = token.strip_prefix("0x") {
        // Display 对负数输出补码形式，这里按 u32 读回
        return u32::from_str_radix(hex, 16)
            .ok()
            .map(|bits| DeviceMode::from_bits_retain(bits as i32));
    }

    if token.bytes().all(|b| b.is_ascii_digit()) {
        return token.parse::<i32>().ok().map(DeviceMode::from_bits_retain);
    }

    NAMED_MODES
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, flag)| *flag)
}
