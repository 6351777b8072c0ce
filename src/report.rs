//! Timing collection and benchmark-record rendering
//!
//! Each repetition contributes one wall-clock duration to its treatment's
//! [`SampleSeries`]. Completed series are rendered into benchmark-record
//! text, one line per sample:
//!
//! ```text
//! Benchmark<target>-<variant> 1 <duration_ns> ns/op
//! ```
//!
//! Lines are routed into one of two named groups, "no profiling" and
//! "profiling", by the treatment's profiling flag. Baseline samples are
//! replicated under every profiling-enabled variant label present in the
//! run, so the comparison can pair "baseline vs. fast", "baseline vs.
//! slow" and "baseline vs. noserver" by matching line labels.

use std::time::Duration;

use crate::plan::Treatment;

/// Name of the baseline group.
pub const GROUP_NO_PROFILING: &str = "no profiling";
/// Name of the treatment group.
pub const GROUP_PROFILING: &str = "profiling";

/// Ordered wall-clock samples of one treatment.
///
/// Sample index `i` always corresponds to repetition `i`; on a successful
/// run the length equals the configured repetition count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleSeries(Vec<Duration>);

impl SampleSeries {
    /// Empty series.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Append the sample of one completed repetition.
    pub fn push(&mut self, sample: Duration) {
        self.0.push(sample);
    }

    /// Number of recorded samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no repetition has completed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The recorded durations, in repetition order.
    #[must_use]
    pub fn durations(&self) -> &[Duration] {
        &self.0
    }
}

impl FromIterator<Duration> for SampleSeries {
    fn from_iter<T: IntoIterator<Item = Duration>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One treatment together with its completed samples.
#[derive(Debug, Clone)]
pub struct TreatmentOutcome {
    /// The treatment that was executed
    pub treatment: Treatment,
    /// Its recorded samples
    pub samples: SampleSeries,
}

/// Named collection of benchmark-record lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportGroup {
    name: String,
    text: String,
}

impl ReportGroup {
    /// Empty group with the given statistical-bucket name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: String::new(),
        }
    }

    /// Group over already-rendered benchmark-record text.
    #[must_use]
    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Bucket name, e.g. "no profiling".
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The accumulated benchmark-record text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of benchmark-record lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }

    fn append_series(&mut self, target: &str, label: &str, samples: &SampleSeries) {
        use std::fmt::Write;
        for duration in samples.durations() {
            let _ = writeln!(
                self.text,
                "{} 1 {} ns/op",
                benchmark_name(target, label),
                duration.as_nanos()
            );
        }
    }
}

/// Strip path separators and dots so a build-context path becomes a legal
/// benchmark identifier.
#[must_use]
pub fn sanitize_target_name(raw: &str) -> String {
    raw.replace(['.', '/', '\\'], "")
}

/// Benchmark-record configuration name for one target/variant pairing.
#[must_use]
pub fn benchmark_name(target: &str, label: &str) -> String {
    format!("Benchmark{target}-{label}")
}

/// Accumulates treatment outcomes into the two comparison groups.
///
/// One reporter spans the whole invocation: outcomes of several benchmarked
/// targets all land in the same two groups.
#[derive(Debug)]
pub struct Reporter {
    no_profiling: ReportGroup,
    profiling: ReportGroup,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter {
    /// Empty reporter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            no_profiling: ReportGroup::new(GROUP_NO_PROFILING),
            profiling: ReportGroup::new(GROUP_PROFILING),
        }
    }

    /// Render one target's outcomes into the groups.
    ///
    /// Profiled treatments are rendered under their own variant label.
    /// Baseline treatments are replicated under every profiled variant
    /// label of this target, in plan order, so every paired comparison
    /// has a baseline with a matching label.
    pub fn record_target(&mut self, target: &str, outcomes: &[TreatmentOutcome]) {
        let mut labels: Vec<&'static str> = Vec::new();
        for outcome in outcomes.iter().filter(|o| o.treatment.profiling) {
            let label = outcome.treatment.collector.label();
            if !labels.contains(&label) {
                labels.push(label);
            }
            self.profiling.append_series(target, label, &outcome.samples);
        }
        for outcome in outcomes.iter().filter(|o| !o.treatment.profiling) {
            for label in &labels {
                self.no_profiling.append_series(target, label, &outcome.samples);
            }
        }
    }

    /// The "no profiling" group.
    #[must_use]
    pub const fn no_profiling(&self) -> &ReportGroup {
        &self.no_profiling
    }

    /// The "profiling" group.
    #[must_use]
    pub const fn profiling(&self) -> &ReportGroup {
        &self.profiling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{CollectorVariant, Treatment};

    fn outcome(
        name: &'static str,
        profiling: bool,
        collector: CollectorVariant,
        millis: &[u64],
    ) -> TreatmentOutcome {
        TreatmentOutcome {
            treatment: Treatment {
                name,
                profiling,
                collector,
            },
            samples: millis.iter().map(|ms| Duration::from_millis(*ms)).collect(),
        }
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let outcomes = vec![outcome("profiled-fast", true, CollectorVariant::Fast, &[10, 11])];
        let mut a = Reporter::new();
        let mut b = Reporter::new();
        a.record_target("Fib", &outcomes);
        b.record_target("Fib", &outcomes);
        assert_eq!(a.profiling().text(), b.profiling().text());
    }

    #[test]
    fn test_profiled_line_format() {
        let mut reporter = Reporter::new();
        reporter.record_target(
            "Fib",
            &[outcome("profiled-fast", true, CollectorVariant::Fast, &[10])],
        );
        assert_eq!(reporter.profiling().text(), "BenchmarkFib-fast 1 10000000 ns/op\n");
        assert_eq!(reporter.no_profiling().line_count(), 0);
    }

    #[test]
    fn test_baseline_replicated_under_every_profiled_label() {
        let mut reporter = Reporter::new();
        reporter.record_target(
            "Fib",
            &[
                outcome("profiled-fast", true, CollectorVariant::Fast, &[10, 10, 10]),
                outcome("profiled-slow", true, CollectorVariant::Slow, &[12, 12, 12]),
                outcome("profiled-noserver", true, CollectorVariant::Absent, &[11, 11, 11]),
                outcome("baseline", false, CollectorVariant::Absent, &[9, 9, 9]),
            ],
        );
        // N=3 baseline samples, k=3 labels: 9 baseline lines.
        assert_eq!(reporter.no_profiling().line_count(), 9);
        for label in ["fast", "slow", "noserver"] {
            let expected = format!("BenchmarkFib-{label} 1 9000000 ns/op");
            let copies = reporter
                .no_profiling()
                .text()
                .lines()
                .filter(|line| *line == expected)
                .count();
            assert_eq!(copies, 3, "one full baseline copy per label ({label})");
        }
    }

    #[test]
    fn test_baseline_without_profiled_treatments_renders_nothing() {
        let mut reporter = Reporter::new();
        reporter.record_target(
            "Fib",
            &[outcome("baseline", false, CollectorVariant::Absent, &[9])],
        );
        assert_eq!(reporter.no_profiling().line_count(), 0);
    }

    #[test]
    fn test_sanitize_target_name() {
        assert_eq!(sanitize_target_name("./demos/fibonacci"), "demosfibonacci");
        assert_eq!(sanitize_target_name("fib.rs"), "fibrs");
    }
}
