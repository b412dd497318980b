use pcap_device_mode::get_available_devices;

fn main() {
    match get_available_devices() {
        Ok(devices) => {
            println!("可用的网络设备列表:");
            for device in devices {
                println!("- {}", device);
            }
            println!();
            println!("打开设备时可用的模式: normal, promiscuous, no_capture_local, max_responsiveness");
        }
        Err(e) => eprintln!("获取设备列表失败: {}", e),
    }
}
