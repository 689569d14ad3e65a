use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct StepTiming {
    pub name: String,
    pub duration: Duration,
}

/// Durations of the named steps of one file's processing, in execution order.
#[derive(Debug, Default, Clone)]
pub struct PipelineTimings {
    steps: Vec<StepTiming>,
    step_map: HashMap<String, Duration>,
}

impl PipelineTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, name: impl Into<String>, duration: Duration) {
        let name = name.into();
        self.steps.push(StepTiming {
            name: name.clone(),
            duration,
        });
        *self.step_map.entry(name).or_insert(Duration::ZERO) += duration;
    }

    /// Runs `f` as a step named `name` and records how long it took.
    pub fn time<T>(&mut self, name: &str, f: impl FnOnce() -> T) -> T {
        let timer = Timer::start(name);
        let value = f();
        let (name, duration) = timer.stop();
        self.add_step(name, duration);
        value
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }

    pub fn get_step(&self, name: &str) -> Option<Duration> {
        self.step_map.get(name).copied()
    }

    pub fn steps(&self) -> &[StepTiming] {
        &self.steps
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// One indented line per step with its share of the total, then the total.
impl fmt::Display for PipelineTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total_duration();
        for step in &self.steps {
            let share = if total.is_zero() {
                0.0
            } else {
                step.duration.as_secs_f64() / total.as_secs_f64() * 100.0
            };
            writeln!(f, "  {:<20} {:>10.3} ms {:>6.1}%", step.name, millis(step.duration), share)?;
        }
        write!(f, "  {:<20} {:>10.3} ms", "total", millis(total))
    }
}

/// Measures one named step; see [`PipelineTimings::time`].
pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    pub fn stop(self) -> (String, Duration) {
        (self.name, self.start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_steps_accumulate() {
        let mut timings = PipelineTimings::new();
        timings.add_step("decode", Duration::from_millis(3));
        timings.add_step("encode", Duration::from_millis(5));
        timings.add_step("decode", Duration::from_millis(2));

        assert_eq!(timings.steps().len(), 3);
        assert_eq!(timings.get_step("decode"), Some(Duration::from_millis(5)));
        assert_eq!(timings.total_duration(), Duration::from_millis(10));
        assert_eq!(timings.get_step("missing"), None);
    }

    #[test]
    fn test_time_returns_closure_value() {
        let mut timings = PipelineTimings::new();
        let value = timings.time("compute", || 41 + 1);

        assert_eq!(value, 42);
        assert!(timings.get_step("compute").is_some());
    }

    #[test]
    fn test_summary_lists_every_step() {
        let mut timings = PipelineTimings::new();
        timings.add_step("backup", Duration::from_millis(1));
        timings.add_step("write_output", Duration::from_millis(1));

        let summary = timings.to_string();
        assert!(summary.contains("backup"));
        assert!(summary.contains("write_output"));
        assert!(summary.contains("total"));
    }
}
