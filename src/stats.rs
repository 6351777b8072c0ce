//! Two-sample statistical comparison of benchmark-record groups
//!
//! The two rendered groups ("no profiling" vs. "profiling") are parsed back
//! into named sample series, paired by identical configuration names, and
//! compared with a two-sided Mann–Whitney U test. The p-value is exact
//! (full rank-sum distribution) for small tie-free pools and falls back to
//! a normal approximation with tie and continuity corrections otherwise.
//!
//! Output is a delta table: per configuration, old/new time per op, the
//! percent change, and a significance verdict at the configured alpha.

use std::collections::BTreeMap;
use std::fmt;

use crate::report::ReportGroup;

/// Largest tie-free pool for which the exact rank-sum distribution is
/// computed; larger pools use the normal approximation.
const EXACT_LIMIT: usize = 40;

/// Fewest samples per side for a meaningful U test.
const MIN_SAMPLES: usize = 4;

/// Summary of one side of a paired configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Mean duration in nanoseconds
    pub mean_ns: f64,
    /// Largest deviation from the mean, as a percentage of it
    pub spread_pct: f64,
    /// Sample count
    pub n: usize,
}

impl Summary {
    fn of(samples: &[f64]) -> Self {
        let n = samples.len();
        #[allow(clippy::cast_precision_loss)]
        let mean = samples.iter().sum::<f64>() / n as f64;
        let spread = samples
            .iter()
            .map(|x| (x - mean).abs())
            .fold(0.0_f64, f64::max);
        let spread_pct = if mean > 0.0 { spread / mean * 100.0 } else { 0.0 };
        Self {
            mean_ns: mean,
            spread_pct,
            n,
        }
    }
}

/// One paired configuration in the delta table.
#[derive(Debug, Clone)]
pub struct ComparisonRow {
    /// Configuration name with the `Benchmark` prefix stripped
    pub name: String,
    /// Baseline side
    pub old: Summary,
    /// Treatment side
    pub new: Summary,
    /// Two-sided p-value; `None` when either side is too small to test
    pub p: Option<f64>,
    /// True when the delta is significant at the comparison's alpha
    pub significant: bool,
}

impl ComparisonRow {
    /// Percent change of the mean, new relative to old.
    #[must_use]
    pub fn delta_pct(&self) -> f64 {
        if self.old.mean_ns == 0.0 {
            0.0
        } else {
            (self.new.mean_ns - self.old.mean_ns) / self.old.mean_ns * 100.0
        }
    }
}

/// Result of comparing the two groups.
#[derive(Debug, Clone)]
pub struct Comparison {
    /// Significance level the verdicts were decided at
    pub alpha: f64,
    /// Paired rows in configuration-name order
    pub rows: Vec<ComparisonRow>,
}

/// Compare two benchmark-record groups at significance level `alpha`.
///
/// Only configurations present in both groups are paired; a configuration
/// missing from one side has nothing to compare against.
#[must_use]
pub fn compare(old: &ReportGroup, new: &ReportGroup, alpha: f64) -> Comparison {
    let old_series = parse_group(old.text());
    let new_series = parse_group(new.text());
    let mut rows = Vec::new();
    for (name, old_samples) in &old_series {
        let Some(new_samples) = new_series.get(name) else {
            continue;
        };
        let p = if old_samples.len() < MIN_SAMPLES || new_samples.len() < MIN_SAMPLES {
            None
        } else {
            Some(mann_whitney(old_samples, new_samples))
        };
        rows.push(ComparisonRow {
            name: name.strip_prefix("Benchmark").unwrap_or(name).to_string(),
            old: Summary::of(old_samples),
            new: Summary::of(new_samples),
            p,
            significant: p.is_some_and(|p| p < alpha),
        });
    }
    Comparison { alpha, rows }
}

/// Parse benchmark-record text into series keyed by configuration name.
///
/// Lines that do not match `<name> 1 <duration> ns/op` are ignored.
#[must_use]
pub fn parse_group(text: &str) -> BTreeMap<String, Vec<f64>> {
    let mut series: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if let [name, _iterations, value, "ns/op"] = fields[..] {
            if let Ok(ns) = value.parse::<f64>() {
                series.entry(name.to_string()).or_default().push(ns);
            }
        }
    }
    series
}

/// Two-sided Mann–Whitney U test.
///
/// Returns the probability of a rank assignment at least as extreme as the
/// observed one under the null hypothesis that both samples come from the
/// same distribution.
#[must_use]
pub fn mann_whitney(xs: &[f64], ys: &[f64]) -> f64 {
    assert!(!xs.is_empty() && !ys.is_empty(), "empty sample");
    let n1 = xs.len();
    let n2 = ys.len();
    let n = n1 + n2;

    // Pool, sort, and assign midranks.
    let mut pooled: Vec<(f64, bool)> = xs
        .iter()
        .map(|&v| (v, true))
        .chain(ys.iter().map(|&v| (v, false)))
        .collect();
    pooled.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut ranks = vec![0.0_f64; n];
    let mut tie_term = 0.0_f64;
    let mut has_ties = false;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && pooled[j + 1].0 == pooled[i].0 {
            j += 1;
        }
        let count = j - i + 1;
        #[allow(clippy::cast_precision_loss)]
        let midrank = (i + j + 2) as f64 / 2.0;
        for rank in ranks.iter_mut().take(j + 1).skip(i) {
            *rank = midrank;
        }
        if count > 1 {
            has_ties = true;
            #[allow(clippy::cast_precision_loss)]
            let t = count as f64;
            tie_term += t * t * t - t;
        }
        i = j + 1;
    }

    let rank_sum: f64 = pooled
        .iter()
        .zip(&ranks)
        .filter(|((_, first), _)| *first)
        .map(|(_, rank)| rank)
        .sum();

    if !has_ties && n <= EXACT_LIMIT {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        return exact_p(n1, n2, rank_sum.round() as usize);
    }
    approximate_p(n1, n2, rank_sum, tie_term)
}

/// Exact two-sided p-value from the full distribution of the rank sum of
/// the first group, computed by dynamic programming over subsets of the
/// untied ranks `1..=n1+n2`.
fn exact_p(n1: usize, n2: usize, rank_sum: usize) -> f64 {
    let n = n1 + n2;
    let max_sum = n * (n + 1) / 2;
    // counts[k][s]: subsets of size k with rank sum s. Counts stay well
    // inside f64's exact-integer range for n <= EXACT_LIMIT.
    let mut counts = vec![vec![0.0_f64; max_sum + 1]; n1 + 1];
    counts[0][0] = 1.0;
    for rank in 1..=n {
        for k in (1..=n1.min(rank)).rev() {
            for s in (rank..=max_sum).rev() {
                let carried = counts[k - 1][s - rank];
                if carried > 0.0 {
                    counts[k][s] += carried;
                }
            }
        }
    }
    let total: f64 = counts[n1].iter().sum();
    let lower: f64 = counts[n1][..=rank_sum.min(max_sum)].iter().sum();
    let upper: f64 = counts[n1][rank_sum.min(max_sum)..].iter().sum();
    (2.0 * (lower / total).min(upper / total)).min(1.0)
}

/// Normal approximation with tie and continuity corrections.
fn approximate_p(n1: usize, n2: usize, rank_sum: f64, tie_term: f64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let (n1f, n2f) = (n1 as f64, n2 as f64);
    let nf = n1f + n2f;
    let u = rank_sum - n1f * (n1f + 1.0) / 2.0;
    let mean = n1f * n2f / 2.0;
    let variance = n1f * n2f / 12.0 * ((nf + 1.0) - tie_term / (nf * (nf - 1.0)));
    if variance <= 0.0 {
        // Every pooled value identical; nothing distinguishes the groups.
        return 1.0;
    }
    let z = ((u - mean).abs() - 0.5).max(0.0) / variance.sqrt();
    erfc(z / std::f64::consts::SQRT_2)
}

/// Complementary error function, Abramowitz & Stegun 7.1.26.
/// Absolute error below 1.5e-7, ample for a significance verdict.
fn erfc(x: f64) -> f64 {
    let t = 1.0 / (1.0 + 0.327_591_1 * x.abs());
    let poly = t
        * (0.254_829_592
            + t * (-0.284_496_736 + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));
    let erf = 1.0 - poly * (-x * x).exp();
    let erf = if x < 0.0 { -erf } else { erf };
    1.0 - erf
}

/// Render a duration given in nanoseconds with a unit chosen by magnitude.
fn format_ns(ns: f64) -> String {
    let (value, unit) = if ns < 1e3 {
        (ns, "ns")
    } else if ns < 1e6 {
        (ns / 1e3, "µs")
    } else if ns < 1e9 {
        (ns / 1e6, "ms")
    } else {
        (ns / 1e9, "s")
    };
    if value >= 100.0 {
        format!("{value:.0}{unit}")
    } else if value >= 10.0 {
        format!("{value:.1}{unit}")
    } else {
        format!("{value:.2}{unit}")
    }
}

fn format_summary(summary: &Summary) -> String {
    format!(
        "{} ±{:2.0}%",
        format_ns(summary.mean_ns),
        summary.spread_pct
    )
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_width = self
            .rows
            .iter()
            .map(|row| row.name.len())
            .max()
            .unwrap_or(4)
            .max("name".len());
        writeln!(
            f,
            "{:<name_width$}  {:<12}  {:<12}  delta",
            "name", "old time/op", "new time/op"
        )?;
        for row in &self.rows {
            let verdict = match row.p {
                Some(p) if row.significant => format!(
                    "{:+.2}%  (p={:.3} n={}+{})",
                    row.delta_pct(),
                    p,
                    row.old.n,
                    row.new.n
                ),
                Some(p) => format!("~  (p={:.3} n={}+{})", p, row.old.n, row.new.n),
                None => format!("~  (need >={MIN_SAMPLES} samples per side)"),
            };
            writeln!(
                f,
                "{:<name_width$}  {:<12}  {:<12}  {verdict}",
                row.name,
                format_summary(&row.old),
                format_summary(&row.new)
            )?;
        }
        Ok(())
    }
}
