//! Treatment plan and benchmark configuration
//!
//! A treatment is one fixed combination of profiling on/off and collector
//! reachability/latency. The canonical plan orders the treatments so that
//! each phase can reuse or tear down what the previous one provisioned.

use std::time::Duration;

/// Collector reachability/latency variant of one treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectorVariant {
    /// No collector is reachable; the network is gone too.
    Absent,
    /// Collector answers immediately.
    Fast,
    /// Collector delays every response.
    Slow,
}

impl CollectorVariant {
    /// Label embedded in benchmark-record lines for this variant.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Absent => "noserver",
            Self::Fast => "fast",
            Self::Slow => "slow",
        }
    }

    /// Value of the collector's response-mode selector, if the variant
    /// needs a collector at all.
    #[must_use]
    pub const fn response_mode(self) -> Option<&'static str> {
        match self {
            Self::Absent => None,
            Self::Fast => Some("fast"),
            Self::Slow => Some("slow"),
        }
    }

    /// Whether this variant pairs the target with a running collector.
    #[must_use]
    pub const fn requires_collector(self) -> bool {
        !matches!(self, Self::Absent)
    }
}

/// One experimental treatment: repeated timed runs under a fixed
/// profiling/collector combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Treatment {
    /// Human-readable phase name used in progress logs
    pub name: &'static str,
    /// Whether the profiling-enable flag is injected into the target
    pub profiling: bool,
    /// Collector variant the target runs against
    pub collector: CollectorVariant,
}

/// The canonical four-phase plan.
///
/// Order matters: the slow phase reuses the network of the fast phase with
/// a recreated collector, the no-server phase requires collector and
/// network to be gone, and the baseline needs nothing at all.
#[must_use]
pub fn canonical_plan() -> Vec<Treatment> {
    vec![
        Treatment {
            name: "profiled-fast",
            profiling: true,
            collector: CollectorVariant::Fast,
        },
        Treatment {
            name: "profiled-slow",
            profiling: true,
            collector: CollectorVariant::Slow,
        },
        Treatment {
            name: "profiled-noserver",
            profiling: true,
            collector: CollectorVariant::Absent,
        },
        Treatment {
            name: "baseline",
            profiling: false,
            collector: CollectorVariant::Absent,
        },
    ]
}

/// Immutable benchmark configuration, constructed once by the caller and
/// passed into the scheduler. Nothing in the engine reads package-level
/// constants, so tests can run with a tiny repetition count and a custom
/// plan.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Identifier scoping networks and image tags of this benchmark
    pub bench_id: String,
    /// Repetitions per treatment
    pub repetitions: usize,
    /// Significance level of the two-sample comparison
    pub alpha: f64,
    /// Port the collector's ingest endpoint listens on
    pub collector_port: u16,
    /// Optional bound on one timed run. `None` reproduces the observed
    /// behavior of waiting forever on a hung target.
    pub run_timeout: Option<Duration>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            bench_id: "agentmark".to_string(),
            repetitions: 5,
            alpha: 0.05,
            collector_port: 4040,
            run_timeout: None,
        }
    }
}

impl BenchConfig {
    /// Tag the collector image is built under.
    #[must_use]
    pub fn collector_image(&self) -> String {
        format!("{}/collector", self.bench_id)
    }

    /// Tag the target image is built under.
    #[must_use]
    pub fn target_image(&self) -> String {
        format!("{}/target", self.bench_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_plan_order() {
        let plan = canonical_plan();
        assert_eq!(plan.len(), 4);
        assert_eq!(plan[0].collector, CollectorVariant::Fast);
        assert_eq!(plan[1].collector, CollectorVariant::Slow);
        assert_eq!(plan[2].collector, CollectorVariant::Absent);
        assert!(plan[2].profiling);
        assert!(!plan[3].profiling);
    }

    #[test]
    fn test_variant_labels() {
        assert_eq!(CollectorVariant::Fast.label(), "fast");
        assert_eq!(CollectorVariant::Slow.label(), "slow");
        assert_eq!(CollectorVariant::Absent.label(), "noserver");
    }

    #[test]
    fn test_response_mode_only_for_reachable_variants() {
        assert_eq!(CollectorVariant::Fast.response_mode(), Some("fast"));
        assert_eq!(CollectorVariant::Slow.response_mode(), Some("slow"));
        assert_eq!(CollectorVariant::Absent.response_mode(), None);
    }

    #[test]
    fn test_image_tags_scoped_by_bench_id() {
        let config = BenchConfig::default();
        assert_eq!(config.collector_image(), "agentmark/collector");
        assert_eq!(config.target_image(), "agentmark/target");
    }
}
