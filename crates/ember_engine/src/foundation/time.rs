//! Time management utilities

use std::time::Instant;

/// High-precision timer for frame timing
pub struct Timer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_frame: now,
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Update the timer (should be called once per frame)
    pub fn update(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.delta_time = elapsed.as_secs_f32();
        self.total_time += self.delta_time;
        self.last_frame = now;
        self.frame_count += 1;
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total elapsed time since timer creation
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Fixed-step accumulator driving physics sub-steps from variable frame times.
///
/// Each frame's delta is added to the accumulator; whole fixed steps are
/// consumed up to `max_substeps`. Whatever remains afterwards is clamped to at
/// most one fixed step, so a long stall slows the simulation down instead of
/// making every following frame pay for the backlog.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    fixed_step: f64,
    max_substeps: u32,
    accumulator: f64,
}

impl FixedTimestep {
    /// Create an accumulator for the given step length (seconds) and sub-step ceiling
    pub fn new(fixed_step: f32, max_substeps: u32) -> Self {
        Self {
            fixed_step: f64::from(fixed_step),
            max_substeps: max_substeps.max(1),
            accumulator: 0.0,
        }
    }

    /// Feed one frame's elapsed time and run `step` once per due sub-step.
    ///
    /// Returns the number of sub-steps executed. An error from `step` aborts
    /// the remaining sub-steps of this frame and is returned unchanged.
    pub fn advance<E, F>(&mut self, frame_delta: f32, mut step: F) -> Result<u32, E>
    where
        F: FnMut() -> Result<(), E>,
    {
        self.accumulator += f64::from(frame_delta.max(0.0));

        let mut substeps = 0;
        while self.accumulator >= self.fixed_step && substeps < self.max_substeps {
            step()?;
            self.accumulator -= self.fixed_step;
            substeps += 1;
        }

        if self.accumulator > self.fixed_step {
            log::debug!(
                "Physics falling behind: discarding {:.4}s after {} sub-steps",
                self.accumulator - self.fixed_step,
                substeps
            );
            self.accumulator = self.fixed_step;
        }

        Ok(substeps)
    }

    /// Time carried over to the next frame, in seconds
    pub fn leftover(&self) -> f32 {
        self.accumulator as f32
    }

    /// Interpolation factor between the last two physics states, in `[0, 1]`
    pub fn alpha(&self) -> f32 {
        (self.accumulator / self.fixed_step) as f32
    }

    /// The fixed step length in seconds
    pub fn fixed_step(&self) -> f32 {
        self.fixed_step as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_steps(stepper: &mut FixedTimestep, frame_delta: f32) -> u32 {
        let mut executed = 0;
        let reported = stepper
            .advance::<(), _>(frame_delta, || {
                executed += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(reported, executed);
        executed
    }

    #[test]
    fn test_long_frame_is_capped_at_max_substeps() {
        let mut stepper = FixedTimestep::new(1.0 / 60.0, 5);

        assert_eq!(count_steps(&mut stepper, 1.0), 5);
        assert!(stepper.leftover() <= 1.0 / 60.0 + f32::EPSILON);
    }

    #[test]
    fn test_short_frames_accumulate() {
        let mut stepper = FixedTimestep::new(1.0 / 60.0, 5);

        assert_eq!(count_steps(&mut stepper, 1.0 / 120.0), 0);
        assert_eq!(count_steps(&mut stepper, 1.0 / 100.0), 1);
    }

    #[test]
    fn test_two_steps_in_one_frame() {
        let mut stepper = FixedTimestep::new(0.01, 5);

        assert_eq!(count_steps(&mut stepper, 0.025), 2);
        assert!((stepper.leftover() - 0.005).abs() < 1e-5);
        assert!((stepper.alpha() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_step_error_stops_frame() {
        let mut stepper = FixedTimestep::new(0.01, 5);
        let mut calls = 0;

        let result = stepper.advance(0.05, || {
            calls += 1;
            if calls == 2 { Err("boom") } else { Ok(()) }
        });

        assert_eq!(result, Err("boom"));
        assert_eq!(calls, 2);
    }
}
