use anyhow::{Context, Result};
use clap::Parser;
use pcap_device_mode::{DeviceMode, DeviceOpenOptions, DeviceOpener};
use serde::{Deserialize, Serialize};
use std::fs;

// 配置文件结构
#[derive(Debug, Deserialize, Serialize)]
struct OpenConfig {
    device_name: String,
    #[serde(default)]
    mode: Option<String>,
    snaplen: Option<i32>,
    timeout_ms: Option<i32>,
}

// 命令行参数定义
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 网络设备名称
    #[arg(short, long)]
    device_name: Option<String>,

    /// 打开模式，例如 "promiscuous|no_capture_local"
    #[arg(short, long)]
    mode: Option<String>,

    /// 捕获的数据包大小限制
    #[arg(short = 's', long)]
    snaplen: Option<i32>,

    /// 捕获超时时间(毫秒)
    #[arg(short = 't', long)]
    timeout_ms: Option<i32>,

    /// 收到多少个包后退出
    #[arg(short = 'n', long, default_value_t = 10)]
    count: usize,

    /// 配置文件路径
    #[arg(short, long)]
    config_file: Option<String>,
}

// 从配置文件加载配置
fn load_config_from_file(file_path: &str) -> Result<OpenConfig> {
    let config_str = fs::read_to_string(file_path)
        .with_context(|| format!("无法读取配置文件: {}", file_path))?;
    let config: OpenConfig = serde_json::from_str(&config_str)
        .with_context(|| format!("配置文件格式错误: {}", file_path))?;
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = match &args.config_file {
        Some(path) => Some(load_config_from_file(path)?),
        None => None,
    };

    // 命令行参数优先级高于配置文件
    let defaults = DeviceOpenOptions::default();
    let device_name = args
        .device_name
        .or_else(|| config.as_ref().map(|c| c.device_name.clone()))
        .ok_or_else(|| anyhow::anyhow!("必须提供网络设备名称，请使用--device-name参数或配置文件"))?;
    let mode = match args.mode.or_else(|| config.as_ref().and_then(|c| c.mode.clone())) {
        Some(text) => text
            .parse::<DeviceMode>()
            .with_context(|| format!("无法解析打开模式: {}", text))?,
        None => defaults.mode,
    };

    let options = DeviceOpenOptions {
        device_name,
        snaplen: args
            .snaplen
            .or_else(|| config.as_ref().and_then(|c| c.snaplen))
            .unwrap_or(defaults.snaplen),
        timeout_ms: args
            .timeout_ms
            .or_else(|| config.as_ref().and_then(|c| c.timeout_ms))
            .unwrap_or(defaults.timeout_ms),
        mode,
    };

    println!("设备名称: {}", options.device_name);
    println!("打开模式: {} ({})", options.mode, options.mode.bits());
    println!("快照长度: {}", options.snaplen);
    println!("超时时间: {}ms", options.timeout_ms);

    let opener = DeviceOpener::new(options);
    let mut cap = opener
        .open()
        .with_context(|| format!("无法打开设备: {}", opener.options().device_name))?;

    let mut received = 0;
    while received < args.count {
        match cap.next_packet() {
            Ok(packet) => {
                received += 1;
                println!("#{} {} 字节", received, packet.header.len);
            }
            Err(pcap::Error::TimeoutExpired) => continue,
            Err(e) => return Err(e).context("捕获失败"),
        }
    }

    Ok(())
}
