use candle_core::Device;
use tracing::{info, warn};

/// Metal when built with the `metal` feature and available, CPU otherwise.
/// `APP_DEVICE=cpu` forces the CPU.
pub fn select_device() -> Device {
    let forced_cpu = std::env::var("APP_DEVICE").map(|v| v.eq_ignore_ascii_case("cpu")).unwrap_or(false);
    if !forced_cpu {
        #[cfg(feature = "metal")]
        {
            match Device::new_metal(0) {
                Ok(dev) => { info!(device = "metal", "embedding device selected"); return dev; }
                Err(e) => warn!(error = %e, "metal unavailable, falling back to cpu"),
            }
        }
    }
    if forced_cpu { warn!("APP_DEVICE=cpu set, skipping accelerators"); }
    info!(device = "cpu", "embedding device selected");
    Device::Cpu
}
