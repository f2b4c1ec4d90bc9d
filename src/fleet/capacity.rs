//! # Advisory capacity estimation.
//!
//! [`CapacityEstimator`] turns raw host metrics into a suggested identity
//! ceiling: roughly 15 MB of RAM per bot, capped at 100 bots per core. The
//! estimate is advisory input to the operator; admission control never
//! enforces it.
//!
//! Host sampling itself is a collaborator ([`HostMetrics`]); the estimator
//! is pure computation over a sample.

use crate::error::FleetError;

/// Raw host figures supplied by the sampling collaborator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HostSample {
    /// Logical CPU core count.
    pub cpu_cores: usize,
    /// Total RAM in gigabytes.
    pub ram_gb: f64,
}

/// Advisory usage percentages, shown in operator reports when available.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HostUsage {
    pub cpu_pct: f64,
    pub ram_pct: f64,
    pub disk_pct: f64,
}

impl HostUsage {
    /// One-line rendering for reports.
    pub fn summary(&self) -> String {
        format!(
            "CPU: {:.1}% | RAM: {:.1}% | Disk: {:.1}%",
            self.cpu_pct, self.ram_pct, self.disk_pct
        )
    }
}

/// Host resource sampling collaborator.
pub trait HostMetrics: Send + Sync + 'static {
    /// Capacity inputs. `None` when sampling fails.
    fn sample(&self) -> Option<HostSample>;

    /// Advisory usage percentages. `None` when sampling fails.
    fn usage(&self) -> Option<HostUsage>;
}

/// Capacity estimate assembled for the operator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CapacityReport {
    pub cpu_cores: usize,
    pub ram_gb: f64,
    /// `min(ram_gb * 1024 / 15, cpu_cores * 100)`.
    pub estimated_capacity: usize,
    /// Current registry size.
    pub current: usize,
    /// Ceiling in effect.
    pub limit: usize,
    /// `limit - current`, clamped to 0.
    pub available: usize,
}

impl CapacityReport {
    /// True when the configured ceiling exceeds what the host can plausibly
    /// sustain.
    pub fn limit_exceeds_estimate(&self) -> bool {
        self.limit > self.estimated_capacity
    }
}

/// Pure advisory estimator over a [`HostMetrics`] collaborator.
pub struct CapacityEstimator<M> {
    metrics: M,
}

impl<M: HostMetrics> CapacityEstimator<M> {
    pub fn new(metrics: M) -> Self {
        Self { metrics }
    }

    /// Builds a capacity report for the given occupancy and ceiling.
    ///
    /// Fails with [`FleetError::MetricsUnavailable`] when the collaborator
    /// cannot supply a sample.
    pub fn estimate(&self, current: usize, limit: usize) -> Result<CapacityReport, FleetError> {
        let sample = self.metrics.sample().ok_or(FleetError::MetricsUnavailable)?;
        let ram_based = (sample.ram_gb * 1024.0 / 15.0) as usize;
        let cpu_based = sample.cpu_cores * 100;
        Ok(CapacityReport {
            cpu_cores: sample.cpu_cores,
            ram_gb: sample.ram_gb,
            estimated_capacity: ram_based.min(cpu_based),
            current,
            limit,
            available: limit.saturating_sub(current),
        })
    }

    /// Advisory usage line, if the collaborator can sample it.
    pub fn usage(&self) -> Option<HostUsage> {
        self.metrics.usage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<HostSample>);

    impl HostMetrics for Fixed {
        fn sample(&self) -> Option<HostSample> {
            self.0
        }
        fn usage(&self) -> Option<HostUsage> {
            None
        }
    }

    #[test]
    fn ram_bound_host() {
        // 1.5 GB RAM, 8 cores: RAM allows 102 bots, CPU allows 800.
        let est = CapacityEstimator::new(Fixed(Some(HostSample {
            cpu_cores: 8,
            ram_gb: 1.5,
        })));
        let report = est.estimate(10, 100).unwrap();
        assert_eq!(report.estimated_capacity, 102);
        assert_eq!(report.available, 90);
        assert!(!report.limit_exceeds_estimate());
    }

    #[test]
    fn cpu_bound_host() {
        // 64 GB RAM, 2 cores: RAM allows 4369, CPU allows 200.
        let est = CapacityEstimator::new(Fixed(Some(HostSample {
            cpu_cores: 2,
            ram_gb: 64.0,
        })));
        let report = est.estimate(0, 500).unwrap();
        assert_eq!(report.estimated_capacity, 200);
        assert!(report.limit_exceeds_estimate());
    }

    #[test]
    fn missing_sample_is_unavailable() {
        let est = CapacityEstimator::new(Fixed(None));
        assert!(matches!(
            est.estimate(0, 100),
            Err(FleetError::MetricsUnavailable)
        ));
    }
}
