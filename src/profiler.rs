//! Timing for the fixed sections of a simulation step.
//!
//! A step always runs the same five sections - the four scheduling group
//! dispatches plus the activity rollover - so stats live in a fixed array
//! indexed by `StepSection` rather than a keyed map.
//!
//! Enable per-section timing with the `profile` feature:
//! ```bash
//! cargo test --release --features profile
//! ```
//!
//! `StressProfiler` measures whole steps from the outside and needs no
//! feature flag; the stress tests use it directly.

use crate::chunk::ChunkGroup;
use std::time::{Duration, Instant};

/// The timed sections of one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepSection {
    GroupA,
    GroupB,
    GroupC,
    GroupD,
    ActivityRollover,
}

impl StepSection {
    pub const COUNT: usize = 5;

    pub const ALL: [StepSection; Self::COUNT] = [
        StepSection::GroupA,
        StepSection::GroupB,
        StepSection::GroupC,
        StepSection::GroupD,
        StepSection::ActivityRollover,
    ];

    /// The section covering one scheduling group's dispatch.
    pub fn for_group(group: ChunkGroup) -> Self {
        match group {
            ChunkGroup::A => StepSection::GroupA,
            ChunkGroup::B => StepSection::GroupB,
            ChunkGroup::C => StepSection::GroupC,
            ChunkGroup::D => StepSection::GroupD,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StepSection::GroupA => "group A",
            StepSection::GroupB => "group B",
            StepSection::GroupC => "group C",
            StepSection::GroupD => "group D",
            StepSection::ActivityRollover => "activity rollover",
        }
    }

    #[inline]
    fn index(self) -> usize {
        match self {
            StepSection::GroupA => 0,
            StepSection::GroupB => 1,
            StepSection::GroupC => 2,
            StepSection::GroupD => 3,
            StepSection::ActivityRollover => 4,
        }
    }
}

/// Accumulated timing for one section.
#[derive(Debug, Default, Clone, Copy)]
pub struct SectionStats {
    pub total_time: Duration,
    pub call_count: u64,
    pub max_time: Duration,
}

/// Per-section step timing, owned by the scheduler.
///
/// Populated only while the `profile` feature is on; otherwise the step
/// counter advances and every section stays zero.
pub struct Profiler {
    sections: [SectionStats; StepSection::COUNT],
    current: Option<(StepSection, Instant)>,
    step_count: u64,
}

impl Profiler {
    pub fn new() -> Self {
        Self {
            sections: [SectionStats::default(); StepSection::COUNT],
            current: None,
            step_count: 0,
        }
    }

    /// Start timing a section. Call `end_section` to stop.
    pub fn begin_section(&mut self, section: StepSection) {
        self.current = Some((section, Instant::now()));
    }

    /// End the current section and record its duration. A stray call with no
    /// section open is ignored.
    pub fn end_section(&mut self) {
        if let Some((section, start)) = self.current.take() {
            let elapsed = start.elapsed();
            let stats = &mut self.sections[section.index()];
            stats.total_time += elapsed;
            stats.call_count += 1;
            stats.max_time = stats.max_time.max(elapsed);
        }
    }

    /// Mark the end of a simulation step.
    pub fn mark_step(&mut self) {
        self.step_count += 1;
    }

    /// Number of steps run since construction.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn get_section(&self, section: StepSection) -> &SectionStats {
        &self.sections[section.index()]
    }

    /// Print a per-section summary.
    pub fn print_summary(&self) {
        println!("\n=== Profiler Summary ({} steps) ===", self.step_count);
        let total: Duration = self.sections.iter().map(|s| s.total_time).sum();

        println!("{:<20} {:>10} {:>10} {:>10} {:>8}", "Section", "Total", "Avg/step", "Max", "% Time");
        println!("{}", "-".repeat(62));
        for section in StepSection::ALL {
            let stats = self.get_section(section);
            let avg_per_step = if self.step_count > 0 {
                stats.total_time / self.step_count as u32
            } else {
                Duration::ZERO
            };
            let pct = if total.as_nanos() > 0 {
                (stats.total_time.as_nanos() as f64 / total.as_nanos() as f64) * 100.0
            } else {
                0.0
            };
            println!(
                "{:<20} {:>10.2?} {:>10.2?} {:>10.2?} {:>7.1}%",
                section.label(),
                stats.total_time,
                avg_per_step,
                stats.max_time,
                pct
            );
        }
        println!("{}", "-".repeat(62));
        println!("{:<20} {:>10.2?}", "TOTAL", total);
        println!();
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Whole-step timing measured from outside the engine, for stress tests.
pub struct StressProfiler {
    pub total_time: Duration,
    steps: u64,
    max_step: Duration,
}

impl StressProfiler {
    pub fn new() -> Self {
        Self {
            total_time: Duration::ZERO,
            steps: 0,
            max_step: Duration::ZERO,
        }
    }

    /// Record one step's wall-clock time.
    pub fn record_step(&mut self, duration: Duration) {
        self.total_time += duration;
        self.steps += 1;
        self.max_step = self.max_step.max(duration);
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Print final summary.
    pub fn print_summary(&self, cell_count: usize) {
        let avg_step = if self.steps > 0 {
            self.total_time / self.steps as u32
        } else {
            Duration::ZERO
        };

        println!("\n=== Stress Test Summary ===");
        println!("Cells: {}", cell_count);
        println!("Steps: {}", self.steps);
        println!("Total time: {:?}", self.total_time);
        println!(
            "Avg per step: {:?} ({:.2} ms), max {:?}",
            avg_step,
            avg_step.as_secs_f64() * 1000.0,
            self.max_step
        );

        let steps_per_sec = if avg_step.as_secs_f64() > 0.0 {
            1.0 / avg_step.as_secs_f64()
        } else {
            0.0
        };
        println!("Effective steps/s: {:.1}", steps_per_sec);
    }
}

impl Default for StressProfiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_sections_accumulate() {
        let mut profiler = Profiler::new();

        for _ in 0..2 {
            profiler.begin_section(StepSection::GroupA);
            sleep(Duration::from_millis(2));
            profiler.end_section();
            profiler.begin_section(StepSection::ActivityRollover);
            profiler.end_section();
            profiler.mark_step();
        }

        assert_eq!(profiler.step_count(), 2);
        let group_a = profiler.get_section(StepSection::GroupA);
        assert_eq!(group_a.call_count, 2);
        assert!(group_a.total_time >= Duration::from_millis(4));
        assert!(group_a.max_time <= group_a.total_time);
        // Untouched sections stay zero.
        assert_eq!(profiler.get_section(StepSection::GroupB).call_count, 0);
    }

    #[test]
    fn test_stray_end_section_is_ignored() {
        let mut profiler = Profiler::new();
        profiler.end_section();
        for section in StepSection::ALL {
            assert_eq!(profiler.get_section(section).call_count, 0);
        }
    }

    #[test]
    fn test_section_for_group_is_distinct() {
        let sections: Vec<_> = ChunkGroup::ALL.iter().map(|&g| StepSection::for_group(g)).collect();
        for (i, a) in sections.iter().enumerate() {
            for b in &sections[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_stress_profiler_totals() {
        let mut stress = StressProfiler::new();
        stress.record_step(Duration::from_millis(3));
        stress.record_step(Duration::from_millis(5));
        assert_eq!(stress.steps(), 2);
        assert_eq!(stress.total_time, Duration::from_millis(8));
    }
}
