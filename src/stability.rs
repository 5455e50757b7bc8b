use indexmap::IndexMap;
use log::debug;

use crate::insights::StabilityMetrics;
use crate::models::Build;

/// Whether a failing streak is currently open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FixState {
    Stable,
    Failing { index: usize, timestamp: i64 },
}

/// Follows failing streaks and records how long they took to fix.
#[derive(Debug)]
struct FixTracker {
    state: FixState,
    fixes: usize,
    total_time_to_fix: i64,
    longest_time_to_fix: Option<i64>,
    total_builds_to_fix: usize,
}

impl FixTracker {
    fn new() -> Self {
        Self {
            state: FixState::Stable,
            fixes: 0,
            total_time_to_fix: 0,
            longest_time_to_fix: None,
            total_builds_to_fix: 0,
        }
    }

    fn record(&mut self, index: usize, build: &Build) {
        self.state = match (self.state, build.successful) {
            (FixState::Stable, false) => FixState::Failing {
                index,
                timestamp: build.timestamp,
            },
            (FixState::Failing { index: failed_at, timestamp }, true) => {
                let time_to_fix = build.timestamp.saturating_sub(timestamp);
                debug!("Build {} fixed a failure after {time_to_fix} ms", build.id);

                self.fixes += 1;
                self.total_builds_to_fix += index - failed_at;
                self.total_time_to_fix = self.total_time_to_fix.saturating_add(time_to_fix);
                self.longest_time_to_fix = self.longest_time_to_fix.max(Some(time_to_fix));
                FixState::Stable
            }
            (state, _) => state,
        };
    }
}

/// Computes stability metrics over builds ordered by start time.
///
/// Ties keep their input order. A failing streak still open at the end of the
/// window does not count as a fix.
pub fn calculate_stability(builds: &[Build]) -> StabilityMetrics {
    let mut sorted: Vec<&Build> = builds.iter().collect();
    sorted.sort_by_key(|build| build.timestamp);

    let mut durations = IndexMap::with_capacity(sorted.len());
    let mut results = IndexMap::with_capacity(sorted.len());
    let mut successful_durations = Vec::new();
    let mut tracker = FixTracker::new();

    for (index, build) in sorted.iter().enumerate() {
        debug!("Analysing build: {build:?}");

        #[allow(clippy::cast_precision_loss)]
        durations.insert(build.id.clone(), build.duration_ms as f64 / 1000.0);
        let code = if build.successful { "g" } else { "r" };
        results.insert(build.id.clone(), code.to_string());

        if build.successful {
            successful_durations.push(build.duration_ms);
        }

        tracker.record(index, build);
    }

    let total = sorted.len();
    let successful = successful_durations.len();
    let total_duration = successful_durations
        .iter()
        .fold(0_i64, |sum, duration| sum.saturating_add(*duration));
    #[allow(clippy::cast_possible_wrap)]
    let builds_to_fix = tracker.total_builds_to_fix as i64;
    #[allow(clippy::cast_precision_loss)]
    let longest_time_to_fix = tracker.longest_time_to_fix.unwrap_or(0) as f64;

    StabilityMetrics {
        builds: total,
        successful_builds: successful,
        failed_builds: total - successful,
        success_rate: calculate_success_rate(successful, total),
        avg_duration_seconds: average(total_duration, successful) / 1000.0,
        shortest_duration_seconds: seconds(successful_durations.iter().min().copied()),
        longest_duration_seconds: seconds(successful_durations.iter().max().copied()),
        avg_time_to_fix_ms: average(tracker.total_time_to_fix, tracker.fixes),
        longest_time_to_fix_ms: longest_time_to_fix,
        avg_builds_to_fix: average(builds_to_fix, tracker.fixes),
        durations,
        results,
    }
}

fn calculate_success_rate(successful: usize, total: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let rate = (successful as f64 / total.max(1) as f64) * 100.0;
    rate
}

fn average(sum: i64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let avg = sum as f64 / count as f64;
    avg
}

fn seconds(millis: Option<i64>) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    millis.map_or(0.0, |ms| ms as f64 / 1000.0)
}
