use std::time::Duration;

/// Interpolation ticks per ramp: one per representable 8-bit level.
pub const STEP_COUNT: u16 = 256;

/// Linear interpolation of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionStep {
    /// 1-based channel id.
    pub channel: u16,
    /// Level at tick 0.
    pub start: f64,
    /// Level change per tick.
    pub per_step: f64,
}

impl TransitionStep {
    /// Interpolate `channel` from `start` to `end` over `step_count` ticks.
    pub fn new(channel: u16, start: u8, end: u8, step_count: u16) -> Self {
        let start = f64::from(start);
        Self {
            channel,
            start,
            per_step: (f64::from(end) - start) / f64::from(step_count.max(1)),
        }
    }

    /// Level after tick `n`, rounded to the nearest integer.
    pub fn value_at(&self, n: u16) -> i32 {
        (self.start + f64::from(n) * self.per_step).round() as i32
    }
}

/// Everything one run of the fade loop needs. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionPlan {
    steps: Vec<TransitionStep>,
    step_count: u16,
    duration: Duration,
}

impl TransitionPlan {
    pub fn new(steps: Vec<TransitionStep>, step_count: u16, duration: Duration) -> Self {
        Self {
            steps,
            step_count: step_count.max(1),
            duration,
        }
    }

    pub fn steps(&self) -> &[TransitionStep] {
        &self.steps
    }

    pub fn step_count(&self) -> u16 {
        self.step_count
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Wall-clock time allotted to each tick.
    pub fn step_budget(&self) -> Duration {
        self.duration / u32::from(self.step_count)
    }

    /// `(channel, level)` pairs for tick `n`.
    pub fn levels_at(&self, n: u16) -> impl Iterator<Item = (u16, i32)> + '_ {
        self.steps.iter().map(move |step| (step.channel, step.value_at(n)))
    }
}
