//! Collector tests against a scripted probe
//!
//! These tests drive the sampling functions and the retrying collectors
//! without touching the real host.

#[cfg(test)]
mod sampler_tests {
    use crate::collector::{
        collect_cpu, collect_disk, collect_memory, collect_network, FixedProbe, Platform,
        Scripted, INTERNAL_ERROR_MESSAGE, NO_PARTITION_MESSAGE,
    };
    use crate::models::{CpuReading, DiskReading, NetworkReading, Partition, Sample};
    use std::io;
    use std::time::Duration;

    const WINDOW: Duration = Duration::from_millis(10);

    #[test]
    fn test_cpu_sample() {
        let probe = FixedProbe::healthy();
        let sample = collect_cpu(&probe, WINDOW);

        assert_eq!(sample.usage, 25.0);
        assert_eq!(sample.cores, 8);
        assert!(sample.error.is_none());
        assert!(sample.timestamp > 0.0);
    }

    #[test]
    fn test_cpu_usage_is_clamped() {
        let probe = FixedProbe::healthy();
        probe.set_cpu(Scripted::Ok(CpuReading {
            usage_percent: 140.0,
            logical_cores: 4,
        }));
        assert_eq!(collect_cpu(&probe, WINDOW).usage, 100.0);

        probe.set_cpu(Scripted::Ok(CpuReading {
            usage_percent: -5.0,
            logical_cores: 4,
        }));
        assert_eq!(collect_cpu(&probe, WINDOW).usage, 0.0);
    }

    #[test]
    fn test_cpu_failure_hides_raw_error() {
        let probe = FixedProbe::healthy();
        probe.set_cpu(Scripted::Fail(
            io::ErrorKind::Other,
            "read /proc/stat token=abc123".to_string(),
        ));

        let sample = collect_cpu(&probe, WINDOW);
        assert_eq!(sample.usage, -1.0);
        assert_eq!(sample.cores, 0);
        assert_eq!(sample.error.as_deref(), Some(INTERNAL_ERROR_MESSAGE));
    }

    #[test]
    fn test_memory_sample() {
        let probe = FixedProbe::healthy();
        let sample = collect_memory(&probe);

        // 16 GiB total, 8 GiB available
        assert_eq!(sample.usage, 50.0);
        assert_eq!(sample.total, 16 * 1024 * 1024 * 1024);
        assert!(sample.used <= sample.total);
    }

    #[test]
    fn test_memory_failure_is_zeroed_sentinel() {
        let probe = FixedProbe::healthy();
        probe.set_memory(Scripted::Fail(io::ErrorKind::Other, "meminfo".to_string()));

        let sample = collect_memory(&probe);
        assert!(sample.is_unavailable());
        assert_eq!((sample.total, sample.used, sample.free), (0, 0, 0));
        assert_eq!(sample.error.as_deref(), Some(INTERNAL_ERROR_MESSAGE));
    }

    #[test]
    fn test_disk_prefers_root() {
        let probe = FixedProbe::healthy();
        let sample = collect_disk(&probe, Platform::Posix);

        assert_eq!(sample.usage, 40.0);
        assert_eq!(sample.mountpoint.as_deref(), Some("/"));
    }

    #[test]
    fn test_disk_without_partitions() {
        let probe = FixedProbe::healthy();
        probe.set_partitions(Scripted::Ok(Vec::new()));

        let sample = collect_disk(&probe, Platform::Posix);
        assert!(sample.is_unavailable());
        assert_eq!(sample.error.as_deref(), Some(NO_PARTITION_MESSAGE));
        assert!(sample.mountpoint.is_none());
    }

    #[test]
    fn test_disk_falls_back_to_boot_path() {
        let probe = FixedProbe::healthy();
        probe.set_partitions(Scripted::Ok(vec![Partition::new("/data", "xfs")]));
        probe.set_disk(
            "/data",
            Scripted::Fail(io::ErrorKind::PermissionDenied, "/data".to_string()),
        );

        let sample = collect_disk(&probe, Platform::Posix);
        assert_eq!(sample.mountpoint.as_deref(), Some("/"));
        assert_eq!(sample.usage, 40.0);
    }

    #[test]
    fn test_disk_fallback_on_windows() {
        let probe = FixedProbe::healthy();
        probe.set_partitions(Scripted::Ok(vec![Partition::new("D:\\", "NTFS")]));
        probe.set_disk(
            "D:\\",
            Scripted::Fail(io::ErrorKind::PermissionDenied, "D:\\".to_string()),
        );
        probe.set_disk(
            "C:\\",
            Scripted::Ok(DiskReading {
                total: 200,
                used: 50,
                free: 150,
            }),
        );

        let sample = collect_disk(&probe, Platform::Windows);
        assert_eq!(sample.mountpoint.as_deref(), Some("C:\\"));
        assert_eq!(sample.usage, 25.0);
    }

    #[test]
    fn test_disk_fails_when_fallback_fails() {
        let probe = FixedProbe::healthy();
        probe.set_disk(
            "/",
            Scripted::Fail(io::ErrorKind::PermissionDenied, "/".to_string()),
        );

        let sample = collect_disk(&probe, Platform::Posix);
        assert!(sample.is_unavailable());
        assert_eq!(sample.error.as_deref(), Some(INTERNAL_ERROR_MESSAGE));
    }

    #[test]
    fn test_network_converts_to_mb() {
        let probe = FixedProbe::healthy();
        probe.set_network(Scripted::Ok(NetworkReading {
            bytes_sent: 3 * 1_048_576 + 524_288,
            bytes_recv: 0,
            packets_sent: 12,
            packets_recv: 34,
        }));

        let sample = collect_network(&probe);
        assert_eq!(sample.sent_mb, 3.5);
        assert_eq!(sample.received_mb, 0.0);
        assert_eq!(sample.packets_sent, 12);
        assert_eq!(sample.packets_recv, 34);
        assert!(!sample.is_unavailable());
    }

    #[test]
    fn test_network_failure_sentinel() {
        let probe = FixedProbe::healthy();
        probe.set_network(Scripted::Fail(io::ErrorKind::Other, "netlink".to_string()));

        let sample = collect_network(&probe);
        assert_eq!(sample.sent_mb, -1.0);
        assert_eq!(sample.received_mb, -1.0);
        assert!(sample.is_unavailable());
    }

    #[test]
    fn test_usage_always_sentinel_or_percent() {
        let probe = FixedProbe::healthy();
        for usage in [-10.0, 0.0, 33.33, 99.99, 100.0, 250.0] {
            probe.set_cpu_usage(usage);
            probe.set_memory_usage(usage.clamp(0.0, 100.0));
            let cpu = collect_cpu(&probe, WINDOW).usage;
            let ram = collect_memory(&probe).usage;
            for value in [cpu, ram] {
                assert!(value == -1.0 || (0.0..=100.0).contains(&value));
            }
        }
    }
}

#[cfg(test)]
mod collectors_tests {
    use crate::collector::{
        CollectorConfig, Collectors, FixedProbe, LastKnownGoodProbe, Platform, Scripted,
        HostProbe,
    };
    use crate::error::CollectError;
    use crate::models::{CpuReading, Sample};
    use crate::retry::RetryPolicy;
    use std::io;
    use std::sync::Arc;
    use std::time::Duration;

    fn fast_config() -> CollectorConfig {
        CollectorConfig {
            critical: RetryPolicy::critical(3, Duration::ZERO, true),
            normal: RetryPolicy::normal(2, Duration::ZERO),
            cpu_window: Duration::from_millis(1),
            platform: Platform::Posix,
        }
    }

    #[tokio::test]
    async fn test_collectors_return_samples() {
        let probe = Arc::new(FixedProbe::healthy());
        let collectors = Collectors::new(probe.clone(), fast_config());

        assert_eq!(collectors.cpu().await.unwrap().usage, 25.0);
        assert_eq!(collectors.memory().await.unwrap().usage, 50.0);
        assert_eq!(collectors.disk().await.unwrap().usage, 40.0);
        assert_eq!(collectors.network().await.unwrap().sent_mb, 10.0);
        assert_eq!(probe.cpu_calls(), 1);
    }

    #[tokio::test]
    async fn test_sentinel_samples_are_not_retried() {
        let probe = Arc::new(FixedProbe::healthy());
        probe.set_cpu(Scripted::Fail(io::ErrorKind::Other, "gone".to_string()));
        let collectors = Collectors::new(probe.clone(), fast_config());

        let sample = collectors.cpu().await.unwrap();
        assert!(sample.is_unavailable());
        assert_eq!(probe.cpu_calls(), 1);
    }

    #[tokio::test]
    async fn test_panicking_probe_exhausts_retries() {
        let probe = Arc::new(FixedProbe::healthy());
        probe.set_cpu(Scripted::Panic("resource exhausted".to_string()));
        let collectors = Collectors::new(probe.clone(), fast_config());

        let err = collectors.cpu().await.unwrap_err();
        assert!(matches!(err, CollectError::Panicked { collector: "cpu", .. }));
        assert_eq!(probe.cpu_calls(), 3);
    }

    #[test]
    fn test_last_known_good_passes_success_through() {
        let inner = FixedProbe::healthy();
        let probe = LastKnownGoodProbe::new(inner);

        let first = probe.cpu(Duration::ZERO).unwrap();
        assert_eq!(first.usage_percent, 25.0);
        assert_eq!(probe.consecutive_errors(), 0);
    }

    #[test]
    fn test_last_known_good_fallback_and_reset() {
        let inner = Arc::new(FixedProbe::healthy());
        let probe = LastKnownGoodProbe::new(SharedProbe(inner.clone()));

        // No cached value yet: the failure passes through
        inner.set_memory(Scripted::Fail(io::ErrorKind::Other, "x".to_string()));
        assert!(probe.memory().is_err());
        assert_eq!(probe.consecutive_errors(), 1);

        inner.set_cpu(Scripted::Ok(CpuReading {
            usage_percent: 61.0,
            logical_cores: 2,
        }));
        probe.cpu(Duration::ZERO).unwrap();
        assert_eq!(probe.consecutive_errors(), 0);

        inner.set_cpu(Scripted::Fail(io::ErrorKind::Other, "x".to_string()));
        let cached = probe.cpu(Duration::ZERO).unwrap();
        assert_eq!(cached.usage_percent, 61.0);
        assert_eq!(probe.consecutive_errors(), 1);
    }

    #[test]
    fn test_last_known_good_disk_per_mountpoint() {
        let inner = Arc::new(FixedProbe::healthy());
        let probe = LastKnownGoodProbe::new(SharedProbe(inner.clone()));

        let good = probe.disk_usage("/").unwrap();
        inner.set_disk("/", Scripted::Fail(io::ErrorKind::Other, "io".to_string()));
        assert_eq!(probe.disk_usage("/").unwrap(), good);
        assert!(probe.disk_usage("/other").is_err());
    }

    /// Lets a test keep re-scripting a probe that is owned by a decorator
    struct SharedProbe(Arc<FixedProbe>);

    impl HostProbe for SharedProbe {
        fn cpu(
            &self,
            window: Duration,
        ) -> Result<crate::models::CpuReading, crate::error::ProbeError> {
            self.0.cpu(window)
        }

        fn memory(&self) -> Result<crate::models::MemoryReading, crate::error::ProbeError> {
            self.0.memory()
        }

        fn partitions(&self) -> Result<Vec<crate::models::Partition>, crate::error::ProbeError> {
            self.0.partitions()
        }

        fn disk_usage(
            &self,
            mountpoint: &str,
        ) -> Result<crate::models::DiskReading, crate::error::ProbeError> {
            self.0.disk_usage(mountpoint)
        }

        fn network(&self) -> Result<crate::models::NetworkReading, crate::error::ProbeError> {
            self.0.network()
        }

        fn process(&self) -> Result<crate::models::ProcessReading, crate::error::ProbeError> {
            self.0.process()
        }
    }
}
