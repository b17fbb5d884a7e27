//! In-memory probe with scripted readings (for testing)

use super::HostProbe;
use crate::error::ProbeError;
use crate::models::{
    CpuReading, DiskReading, MemoryReading, NetworkReading, Partition, ProcessReading,
};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What a scripted query does when called
#[derive(Debug, Clone)]
pub enum Scripted<T> {
    Ok(T),
    /// Fail with an I/O error of the given kind and message
    Fail(io::ErrorKind, String),
    /// Panic inside the probe, bypassing the sampler's error handling
    Panic(String),
}

impl<T: Clone> Scripted<T> {
    fn resolve(&self) -> Result<T, ProbeError> {
        match self {
            Scripted::Ok(value) => Ok(value.clone()),
            Scripted::Fail(io::ErrorKind::PermissionDenied, msg) => {
                Err(ProbeError::PermissionDenied(msg.clone()))
            }
            Scripted::Fail(io::ErrorKind::NotFound, msg) => Err(ProbeError::NotFound(msg.clone())),
            Scripted::Fail(kind, msg) => Err(ProbeError::Io(io::Error::new(*kind, msg.clone()))),
            Scripted::Panic(msg) => panic!("{}", msg),
        }
    }
}

#[derive(Debug, Clone)]
struct Script {
    cpu: Scripted<CpuReading>,
    memory: Scripted<MemoryReading>,
    partitions: Scripted<Vec<Partition>>,
    disks: HashMap<String, Scripted<DiskReading>>,
    network: Scripted<NetworkReading>,
    process: Scripted<ProcessReading>,
}

/// Probe returning fixed readings; each query can be re-scripted at runtime
#[derive(Debug)]
pub struct FixedProbe {
    script: Mutex<Script>,
    cpu_calls: AtomicU32,
}

impl Default for FixedProbe {
    fn default() -> Self {
        Self::healthy()
    }
}

impl FixedProbe {
    /// A host at 25% CPU, 50% memory, 40% disk on `/`, with some traffic
    pub fn healthy() -> Self {
        let gib = 1024 * 1024 * 1024;
        let mut disks = HashMap::new();
        disks.insert(
            "/".to_string(),
            Scripted::Ok(DiskReading {
                total: 100 * gib,
                used: 40 * gib,
                free: 60 * gib,
            }),
        );

        Self {
            script: Mutex::new(Script {
                cpu: Scripted::Ok(CpuReading {
                    usage_percent: 25.0,
                    logical_cores: 8,
                }),
                memory: Scripted::Ok(MemoryReading {
                    total: 16 * gib,
                    used: 8 * gib,
                    free: 4 * gib,
                    available: 8 * gib,
                }),
                partitions: Scripted::Ok(vec![
                    Partition::new("/", "ext4"),
                    Partition::new("/boot", "vfat"),
                ]),
                disks,
                network: Scripted::Ok(NetworkReading {
                    bytes_sent: 10 * 1024 * 1024,
                    bytes_recv: 20 * 1024 * 1024,
                    packets_sent: 1_000,
                    packets_recv: 2_000,
                }),
                process: Scripted::Ok(ProcessReading {
                    memory_bytes: 32 * 1024 * 1024,
                    cpu_percent: 1.5,
                    running: true,
                    host_uptime_secs: 3_600,
                }),
            }),
            cpu_calls: AtomicU32::new(0),
        }
    }

    fn edit(&self, f: impl FnOnce(&mut Script)) {
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut script);
    }

    fn read<T>(&self, f: impl FnOnce(&Script) -> T) -> T {
        let script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        f(&script)
    }

    pub fn set_cpu(&self, cpu: Scripted<CpuReading>) {
        self.edit(|s| s.cpu = cpu);
    }

    pub fn set_cpu_usage(&self, usage_percent: f64) {
        self.set_cpu(Scripted::Ok(CpuReading {
            usage_percent,
            logical_cores: 8,
        }));
    }

    pub fn set_memory(&self, memory: Scripted<MemoryReading>) {
        self.edit(|s| s.memory = memory);
    }

    /// Memory at the given percent of a 100-unit total
    pub fn set_memory_usage(&self, usage_percent: f64) {
        let total = 100 * 1024 * 1024;
        let used = (total as f64 * usage_percent / 100.0) as u64;
        self.set_memory(Scripted::Ok(MemoryReading {
            total,
            used,
            free: total - used,
            available: total - used,
        }));
    }

    pub fn set_partitions(&self, partitions: Scripted<Vec<Partition>>) {
        self.edit(|s| s.partitions = partitions);
    }

    pub fn set_disk(&self, mountpoint: &str, disk: Scripted<DiskReading>) {
        self.edit(|s| {
            s.disks.insert(mountpoint.to_string(), disk);
        });
    }

    /// Disk on `/` at the given percent
    pub fn set_disk_usage(&self, usage_percent: f64) {
        let total = 1000 * 1024 * 1024;
        let used = (total as f64 * usage_percent / 100.0) as u64;
        self.set_disk(
            "/",
            Scripted::Ok(DiskReading {
                total,
                used,
                free: total - used,
            }),
        );
    }

    pub fn set_network(&self, network: Scripted<NetworkReading>) {
        self.edit(|s| s.network = network);
    }

    pub fn set_process(&self, process: Scripted<ProcessReading>) {
        self.edit(|s| s.process = process);
    }

    /// Number of CPU queries made so far
    pub fn cpu_calls(&self) -> u32 {
        self.cpu_calls.load(Ordering::SeqCst)
    }
}

impl HostProbe for FixedProbe {
    fn cpu(&self, _window: Duration) -> Result<CpuReading, ProbeError> {
        self.cpu_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.read(|s| s.cpu.clone());
        scripted.resolve()
    }

    fn memory(&self) -> Result<MemoryReading, ProbeError> {
        let scripted = self.read(|s| s.memory.clone());
        scripted.resolve()
    }

    fn partitions(&self) -> Result<Vec<Partition>, ProbeError> {
        let scripted = self.read(|s| s.partitions.clone());
        scripted.resolve()
    }

    fn disk_usage(&self, mountpoint: &str) -> Result<DiskReading, ProbeError> {
        let scripted = self.read(|s| s.disks.get(mountpoint).cloned());
        match scripted {
            Some(scripted) => scripted.resolve(),
            None => Err(ProbeError::NotFound(mountpoint.to_string())),
        }
    }

    fn network(&self) -> Result<NetworkReading, ProbeError> {
        let scripted = self.read(|s| s.network.clone());
        scripted.resolve()
    }

    fn process(&self) -> Result<ProcessReading, ProbeError> {
        let scripted = self.read(|s| s.process.clone());
        scripted.resolve()
    }
}
