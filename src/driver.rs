//! Fixed-timestep frame driver
//!
//! Turns variable frame deltas into a sequence of update passes: as many
//! fixed passes as the accumulated time allows, then one dynamic pass. Every
//! pass of a frame is fed the same event buffer; the first pass to see an
//! event applies it and flags it as handled.

use tracing::{debug, trace};

use crate::events::InputEventBuffer;
use crate::state::UpdateType;
use crate::system::{InputSystem, UpdateStats};

/// What one call to [`FrameDriver::advance`] did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub fixed_steps: u32,
    /// Fixed steps skipped because the frame exceeded the step limit
    pub dropped_steps: u32,
    pub passes: Vec<(UpdateType, UpdateStats)>,
}

impl FrameReport {
    /// Sum of the counters of every pass
    pub fn totals(&self) -> UpdateStats {
        self.passes
            .iter()
            .fold(UpdateStats::default(), |mut total, (_, stats)| {
                total.events_processed += stats.events_processed;
                total.stale_dropped += stats.stale_dropped;
                total.format_mismatches += stats.format_mismatches;
                total.unknown_device += stats.unknown_device;
                total.truncated += stats.truncated;
                total.monitors_signalled += stats.monitors_signalled;
                total.timeouts_fired += stats.timeouts_fired;
                total.continuous_fired += stats.continuous_fired;
                total.notifications += stats.notifications;
                total
            })
    }
}

/// Drives update passes from frame time
#[derive(Debug, Clone)]
pub struct FrameDriver {
    /// Input time in seconds, advanced by scaled frame deltas
    time: f64,
    /// Time scale multiplier (1.0 = normal speed, 0.0 = frozen)
    time_scale: f64,
    /// Scaled time not yet consumed by fixed passes
    accumulator: f64,
    paused: bool,
    frame_count: u64,
}

impl FrameDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the time scale
    pub fn with_time_scale(mut self, scale: f64) -> Self {
        self.time_scale = scale.max(0.0);
        self
    }

    /// Builder method to set the paused state
    pub fn with_paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }

    /// Builder method to start at a given input time
    pub fn with_start_time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    /// Runs the passes for one frame and clears `events`
    ///
    /// While paused no pass runs and `events` is left untouched.
    pub fn advance(
        &mut self,
        system: &mut InputSystem,
        events: &mut InputEventBuffer,
        frame_delta: f64,
    ) -> FrameReport {
        let mut report = FrameReport::default();
        if self.paused {
            trace!("Frame driver paused");
            return report;
        }

        self.frame_count += 1;
        let step = f64::from(system.settings().fixed_timestep);
        let max_steps = system.settings().max_fixed_steps_per_frame;
        let frame_start = self.time;
        let scaled = frame_delta.max(0.0) * self.time_scale;
        self.accumulator += scaled;

        let fixed_live = system.buffers().is_allocated(UpdateType::Fixed);
        if fixed_live && step > 0.0 {
            while self.accumulator >= step {
                if report.fixed_steps >= max_steps {
                    let dropped = (self.accumulator / step).floor() as u32;
                    report.dropped_steps = dropped;
                    self.accumulator -= f64::from(dropped) * step;
                    debug!(dropped, "Frame exceeded the fixed step limit");
                    break;
                }
                self.accumulator -= step;
                report.fixed_steps += 1;
                let now = frame_start + f64::from(report.fixed_steps) * step;
                let stats = system.update(UpdateType::Fixed, events, now);
                report.passes.push((UpdateType::Fixed, stats));
            }
        }

        self.time = frame_start + scaled;
        let stats = system.update(UpdateType::Dynamic, events, self.time);
        report.passes.push((UpdateType::Dynamic, stats));
        events.clear();

        trace!(
            frame = self.frame_count,
            fixed_steps = report.fixed_steps,
            time = self.time,
            "Frame advanced"
        );
        report
    }

    /// Current input time in seconds
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale.max(0.0);
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self {
            time: 0.0,
            time_scale: 1.0,
            accumulator: 0.0,
            paused: false,
            frame_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputSettings;

    fn system() -> InputSystem {
        InputSystem::new(InputSettings {
            fixed_timestep: 0.02,
            max_fixed_steps_per_frame: 3,
            ..InputSettings::default()
        })
    }

    #[test]
    fn test_fixed_steps_follow_accumulator() {
        let mut system = system();
        let mut events = InputEventBuffer::new();
        let mut driver = FrameDriver::new();

        let report = driver.advance(&mut system, &mut events, 0.05);
        assert_eq!(report.fixed_steps, 2);
        assert_eq!(report.passes.len(), 3);
        assert_eq!(report.passes[2].0, UpdateType::Dynamic);
        assert!((driver.accumulator() - 0.01).abs() < 1e-6);

        let report = driver.advance(&mut system, &mut events, 0.015);
        assert_eq!(report.fixed_steps, 1);
        assert_eq!(system.update_count(UpdateType::Fixed), 3);
        assert_eq!(system.update_count(UpdateType::Dynamic), 2);
    }

    #[test]
    fn test_step_limit_drops_backlog() {
        let mut system = system();
        let mut events = InputEventBuffer::new();
        let mut driver = FrameDriver::new();

        let report = driver.advance(&mut system, &mut events, 0.5);
        assert_eq!(report.fixed_steps, 3);
        assert!((21..=22).contains(&report.dropped_steps));
        assert!(driver.accumulator() < 0.02 + 1e-9);
    }

    #[test]
    fn test_pause_and_time_scale() {
        let mut system = system();
        let mut events = InputEventBuffer::new();
        let mut driver = FrameDriver::new().with_paused(true);

        assert!(driver.advance(&mut system, &mut events, 1.0).passes.is_empty());
        assert_eq!(driver.time(), 0.0);

        driver.resume();
        driver.set_time_scale(0.5);
        driver.advance(&mut system, &mut events, 0.1);
        assert!((driver.time() - 0.05).abs() < 1e-9);
        assert_eq!(driver.frame_count(), 1);
    }
}
