//! Host probe backed by the `sysinfo` crate
//!
//! Host queries build their own `sysinfo` handles per call. The process
//! query is the exception: per-process CPU usage is a delta between two
//! refreshes of the same `System`, so the probe keeps one across calls.
//! The CPU query blocks for the sampling window and must run on the
//! blocking pool.

use super::HostProbe;
use crate::error::ProbeError;
use crate::models::{
    CpuReading, DiskReading, MemoryReading, NetworkReading, Partition, ProcessReading,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sysinfo::{
    CpuRefreshKind, Disks, MemoryRefreshKind, Networks, ProcessRefreshKind, ProcessesToUpdate,
    RefreshKind, System,
};

#[derive(Debug, Clone)]
pub struct SysinfoProbe {
    /// Tracks this process between readings
    process_system: Arc<Mutex<System>>,
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            process_system: Arc::new(Mutex::new(System::new())),
        }
    }

    /// Host name used to label log events
    pub fn host_name() -> String {
        System::host_name().unwrap_or_else(|| "unknown".to_string())
    }
}

impl HostProbe for SysinfoProbe {
    fn cpu(&self, window: Duration) -> Result<CpuReading, ProbeError> {
        let mut system = System::new_with_specifics(
            RefreshKind::nothing().with_cpu(CpuRefreshKind::nothing().with_cpu_usage()),
        );
        if system.cpus().is_empty() {
            return Err(ProbeError::Unavailable("no cpu information".to_string()));
        }

        // Usage is a delta between two refreshes
        std::thread::sleep(window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL));
        system.refresh_cpu_usage();

        Ok(CpuReading {
            usage_percent: f64::from(system.global_cpu_usage()),
            logical_cores: system.cpus().len(),
        })
    }

    fn memory(&self) -> Result<MemoryReading, ProbeError> {
        let system = System::new_with_specifics(
            RefreshKind::nothing().with_memory(MemoryRefreshKind::nothing().with_ram()),
        );
        let total = system.total_memory();
        if total == 0 {
            return Err(ProbeError::Unavailable(
                "memory information not reported".to_string(),
            ));
        }

        Ok(MemoryReading {
            total,
            used: system.used_memory(),
            free: system.free_memory(),
            available: system.available_memory(),
        })
    }

    fn partitions(&self) -> Result<Vec<Partition>, ProbeError> {
        let disks = Disks::new_with_refreshed_list();
        Ok(disks
            .list()
            .iter()
            .map(|disk| {
                Partition::new(
                    disk.mount_point().to_string_lossy(),
                    disk.file_system().to_string_lossy(),
                )
            })
            .collect())
    }

    fn disk_usage(&self, mountpoint: &str) -> Result<DiskReading, ProbeError> {
        let disks = Disks::new_with_refreshed_list();
        let disk = disks
            .list()
            .iter()
            .find(|disk| disk.mount_point() == Path::new(mountpoint))
            .ok_or_else(|| ProbeError::NotFound(mountpoint.to_string()))?;

        let total = disk.total_space();
        if total == 0 {
            return Err(ProbeError::PermissionDenied(format!(
                "{mountpoint} reports no capacity"
            )));
        }
        let free = disk.available_space().min(total);

        Ok(DiskReading {
            total,
            used: total - free,
            free,
        })
    }

    fn network(&self) -> Result<NetworkReading, ProbeError> {
        let networks = Networks::new_with_refreshed_list();
        let reading = networks
            .iter()
            .fold(NetworkReading::default(), |acc, (_, data)| NetworkReading {
                bytes_sent: acc.bytes_sent.saturating_add(data.total_transmitted()),
                bytes_recv: acc.bytes_recv.saturating_add(data.total_received()),
                packets_sent: acc
                    .packets_sent
                    .saturating_add(data.total_packets_transmitted()),
                packets_recv: acc.packets_recv.saturating_add(data.total_packets_received()),
            });
        Ok(reading)
    }

    fn process(&self) -> Result<ProcessReading, ProbeError> {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| ProbeError::Unavailable(format!("current pid: {e}")))?;

        // The first reading after startup reports 0% CPU
        let mut system = self
            .process_system
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );

        let reading = match system.process(pid) {
            Some(process) => ProcessReading {
                memory_bytes: process.memory(),
                cpu_percent: f64::from(process.cpu_usage()),
                running: true,
                host_uptime_secs: System::uptime(),
            },
            None => ProcessReading {
                running: false,
                host_uptime_secs: System::uptime(),
                ..Default::default()
            },
        };
        Ok(reading)
    }
}
