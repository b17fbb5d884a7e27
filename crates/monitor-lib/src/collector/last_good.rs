//! Probe decorator that falls back to the last successful reading

use super::HostProbe;
use crate::error::ProbeError;
use crate::models::{
    CpuReading, DiskReading, MemoryReading, NetworkReading, Partition, ProcessReading,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Default)]
struct Cache {
    cpu: Option<CpuReading>,
    memory: Option<MemoryReading>,
    partitions: Option<Vec<Partition>>,
    disks: HashMap<String, DiskReading>,
    network: Option<NetworkReading>,
    process: Option<ProcessReading>,
}

/// Wraps a probe and serves the last good reading when a query fails
///
/// Failures without a cached value are passed through unchanged.
#[derive(Debug)]
pub struct LastKnownGoodProbe<P> {
    inner: P,
    cache: Mutex<Cache>,
    consecutive_errors: AtomicU64,
}

impl<P: HostProbe> LastKnownGoodProbe<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: Mutex::new(Cache::default()),
            consecutive_errors: AtomicU64::new(0),
        }
    }

    /// Failures seen since the last successful query
    pub fn consecutive_errors(&self) -> u64 {
        self.consecutive_errors.load(Ordering::Relaxed)
    }

    fn with_fallback<T: Clone>(
        &self,
        query: &'static str,
        result: Result<T, ProbeError>,
        slot: impl Fn(&mut Cache) -> &mut Option<T>,
    ) -> Result<T, ProbeError> {
        // A poisoned cache only holds plain readings, so keep using it
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        match result {
            Ok(value) => {
                self.consecutive_errors.store(0, Ordering::Relaxed);
                *slot(&mut *cache) = Some(value.clone());
                Ok(value)
            }
            Err(e) => {
                let errors = self.consecutive_errors.fetch_add(1, Ordering::Relaxed) + 1;
                match slot(&mut *cache).clone() {
                    Some(cached) => {
                        warn!(
                            query = query,
                            error = %e,
                            consecutive_errors = errors,
                            "Serving last known good reading"
                        );
                        Ok(cached)
                    }
                    None => Err(e),
                }
            }
        }
    }
}

impl<P: HostProbe> HostProbe for LastKnownGoodProbe<P> {
    fn cpu(&self, window: Duration) -> Result<CpuReading, ProbeError> {
        self.with_fallback("cpu", self.inner.cpu(window), |c| &mut c.cpu)
    }

    fn memory(&self) -> Result<MemoryReading, ProbeError> {
        self.with_fallback("memory", self.inner.memory(), |c| &mut c.memory)
    }

    fn partitions(&self) -> Result<Vec<Partition>, ProbeError> {
        self.with_fallback("partitions", self.inner.partitions(), |c| {
            &mut c.partitions
        })
    }

    fn disk_usage(&self, mountpoint: &str) -> Result<DiskReading, ProbeError> {
        let result = self.inner.disk_usage(mountpoint);
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        match result {
            Ok(reading) => {
                self.consecutive_errors.store(0, Ordering::Relaxed);
                cache.disks.insert(mountpoint.to_string(), reading);
                Ok(reading)
            }
            Err(e) => {
                let errors = self.consecutive_errors.fetch_add(1, Ordering::Relaxed) + 1;
                match cache.disks.get(mountpoint) {
                    Some(cached) => {
                        warn!(
                            query = "disk_usage",
                            mountpoint = %mountpoint,
                            error = %e,
                            consecutive_errors = errors,
                            "Serving last known good reading"
                        );
                        Ok(*cached)
                    }
                    None => Err(e),
                }
            }
        }
    }

    fn network(&self) -> Result<NetworkReading, ProbeError> {
        self.with_fallback("network", self.inner.network(), |c| &mut c.network)
    }

    fn process(&self) -> Result<ProcessReading, ProbeError> {
        self.with_fallback("process", self.inner.process(), |c| &mut c.process)
    }
}
