//! Host resource sampling on an independent, time-driven cadence.
//!
//! CPU and memory come from `sysinfo` and work everywhere. GPU load,
//! temperature and power come from Tegra sysfs nodes and are simply
//! absent on platforms without them; the sampler never fails a run over
//! a missing sensor.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use metrics::{Aggregator, ResourceSample};
use sysinfo::{CpuExt, System, SystemExt};

const GPU_LOAD_PATH: &str = "/sys/devices/gpu.0/load";
const THERMAL_ZONE_PATH: &str = "/sys/devices/virtual/thermal/thermal_zone0/temp";
// VDD_IN on the Jetson Nano INA3221 rail, in milliwatts
const POWER_PATHS: &[&str] = &[
    "/sys/bus/i2c/drivers/ina3221x/6-0040/iio:device0/in_power0_input",
    "/sys/bus/i2c/drivers/ina3221x/0-0040/iio:device0/in_power0_input",
];

fn read_sysfs_f64(path: &str) -> Option<f64> {
    if !Path::new(path).exists() {
        return None;
    }
    fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
}

/// GPU utilization percentage; the load node reports tenths of a percent
pub fn read_gpu_load() -> Option<f64> {
    read_sysfs_f64(GPU_LOAD_PATH).map(|v| v / 10.0)
}

/// SoC temperature in degrees Celsius; the thermal zone reports millidegrees
pub fn read_gpu_temp() -> Option<f64> {
    read_sysfs_f64(THERMAL_ZONE_PATH).map(|v| v / 1000.0)
}

/// Board input power in watts, from whichever INA rail node exists
pub fn read_power_w() -> Option<f64> {
    POWER_PATHS
        .iter()
        .find_map(|p| read_sysfs_f64(p))
        .map(|mw| mw / 1000.0)
}

/// Takes one full resource reading. Keeps the `sysinfo` handle alive
/// between calls so CPU usage deltas have a previous reading to diff
/// against.
pub struct SystemProbe {
    system: System,
}

impl SystemProbe {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu();
        system.refresh_memory();
        Self { system }
    }

    pub fn sample(&mut self) -> ResourceSample {
        self.system.refresh_cpu();
        self.system.refresh_memory();

        let cpu_pct = Some(self.system.global_cpu_info().cpu_usage() as f64);
        let mem_pct = if self.system.total_memory() > 0 {
            Some(self.system.used_memory() as f64 / self.system.total_memory() as f64 * 100.0)
        } else {
            None
        };

        ResourceSample {
            cpu_pct,
            mem_pct,
            gpu_pct: read_gpu_load(),
            gpu_temp_c: read_gpu_temp(),
            power_w: read_power_w(),
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Background sampling thread. Writes only through the shared
/// aggregator's resource intake; stops at the next tick after `stop()`.
pub struct ResourceSampler {
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ResourceSampler {
    pub fn spawn(aggregator: Arc<Mutex<Aggregator>>, interval: Duration) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();

        let handle = thread::spawn(move || {
            let mut probe = SystemProbe::new();
            while flag.load(Ordering::SeqCst) {
                let sample = probe.sample();
                {
                    let mut agg = aggregator.lock().unwrap();
                    // A sample landing after finish() is dropped; the run
                    // is already frozen at that point.
                    let _ = agg.observe_resource_sample(sample);
                }
                thread::sleep(interval);
            }
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    pub fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ResourceSampler {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_reports_cpu_and_memory() {
        let mut probe = SystemProbe::new();
        let sample = probe.sample();
        assert!(sample.cpu_pct.is_some());
        if let Some(mem) = sample.mem_pct {
            assert!(mem >= 0.0 && mem <= 100.0);
        }
    }

    #[test]
    fn test_sampler_feeds_aggregator() {
        let agg = Arc::new(Mutex::new(Aggregator::new()));
        let sampler = ResourceSampler::spawn(agg.clone(), Duration::from_millis(20));
        thread::sleep(Duration::from_millis(80));
        sampler.stop();

        let snapshot = agg.lock().unwrap().snapshot();
        let cpu = snapshot.resources.cpu_pct.expect("cpu stats missing");
        assert!(cpu.count >= 1);
    }

    #[test]
    fn test_missing_sysfs_node_reads_none() {
        assert_eq!(read_sysfs_f64("/sys/does/not/exist"), None);
    }
}
