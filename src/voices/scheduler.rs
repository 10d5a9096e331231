// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//


//! Envelope scheduling strategies.
//!
//! Graphs that can play value curves get exponential segments scheduled in one go.
//! Graphs that can't get linear onset ramps and a release driven step by step from
//! timers.

use std::fmt;

use crate::{
    envelope::generate_curve,
    graph::{AutomationParam, GraphError},
};

use super::timers::TimerAction;

/// Which strategy an engine chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerKind {
    NativeCurve,
    SteppedFade,
}

/// Timing and levels for the start of a note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Onset {
    /// Graph time the note starts.
    pub start: f64,
    pub peak: f32,
    pub sustain: f32,
    pub attack: f64,
    pub decay: f64,
}

impl Onset {
    /// Time the sustain level is reached.
    pub fn sustain_time(&self) -> f64 {
        self.start + self.attack + self.decay
    }
}

/// Result of applying one fade step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FadeProgress {
    Continue(f32),
    Complete,
}

/// Schedules gain envelopes on a voice's gain parameter.
pub trait EnvelopeScheduler: fmt::Debug {
    fn kind(&self) -> SchedulerKind;

    /// Schedules attack, decay and the sustain hold.
    fn schedule_onset(&self, gain: &mut AutomationParam, onset: &Onset)
        -> Result<(), GraphError>;

    /// Replaces whatever is scheduled after `now` with a release from `from` to silence
    /// over `seconds`. Returns the timers the caller must register.
    fn schedule_release(
        &self,
        gain: &mut AutomationParam,
        from: f32,
        now: f64,
        seconds: f64,
    ) -> Result<Vec<(f64, TimerAction)>, GraphError>;

    /// Applies one step of a timer-driven fade.
    fn fade_step(
        &self,
        _gain: &mut AutomationParam,
        _from: f32,
        _step: u32,
        _now: f64,
    ) -> FadeProgress {
        FadeProgress::Complete
    }

    /// Gain a finished fade is left at.
    fn fade_floor(&self) -> f32 {
        0.0
    }
}

/// Exponential curves played back by the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeCurveScheduler {
    points: usize,
    attack_steepness: f64,
    decay_steepness: f64,
    release_steepness: f64,
    /// Delay between the end of a release and cleanup, in seconds.
    safety_delay: f64,
}

impl NativeCurveScheduler {
    pub fn new(
        points: usize,
        attack_steepness: f64,
        decay_steepness: f64,
        release_steepness: f64,
        safety_delay: f64,
    ) -> NativeCurveScheduler {
        NativeCurveScheduler {
            points: points.max(1),
            attack_steepness,
            decay_steepness,
            release_steepness,
            safety_delay,
        }
    }
}

impl EnvelopeScheduler for NativeCurveScheduler {
    fn kind(&self) -> SchedulerKind {
        SchedulerKind::NativeCurve
    }

    fn schedule_onset(
        &self,
        gain: &mut AutomationParam,
        onset: &Onset,
    ) -> Result<(), GraphError> {
        if onset.attack > 0.0 {
            gain.set_value_at_time(0.0, onset.start);
            let curve = generate_curve(0.0, onset.peak, self.attack_steepness, self.points);
            gain.set_value_curve_at_time(&curve, onset.start, onset.attack)?;
        } else {
            gain.set_value_at_time(onset.peak, onset.start);
        }

        if onset.decay > 0.0 {
            let curve = generate_curve(
                onset.peak,
                onset.sustain,
                self.decay_steepness,
                self.points,
            );
            gain.set_value_curve_at_time(&curve, onset.start + onset.attack, onset.decay)?;
        }
        gain.set_value_at_time(onset.sustain, onset.sustain_time());
        Ok(())
    }

    fn schedule_release(
        &self,
        gain: &mut AutomationParam,
        from: f32,
        now: f64,
        seconds: f64,
    ) -> Result<Vec<(f64, TimerAction)>, GraphError> {
        gain.cancel_scheduled_values(now);
        gain.set_value_at_time(from, now);
        let curve = generate_curve(from, 0.0, self.release_steepness, self.points);
        gain.set_value_curve_at_time(&curve, now, seconds)?;
        gain.set_value_at_time(0.0, now + seconds);

        Ok(vec![(now + seconds + self.safety_delay, TimerAction::Cleanup)])
    }
}

/// Linear onset ramps and an exponential release applied in discrete steps.
#[derive(Debug, Clone, PartialEq)]
pub struct SteppedFadeScheduler {
    steps: u32,
    floor: f32,
    rate: f64,
    /// Seconds after which an unfinished fade is forced to complete.
    timeout: f64,
}

impl SteppedFadeScheduler {
    pub fn new(steps: u32, floor: f32, rate: f64, timeout: f64) -> SteppedFadeScheduler {
        SteppedFadeScheduler {
            steps: steps.max(1),
            floor,
            rate,
            timeout,
        }
    }

    /// Gain after `step` of the fade.
    pub fn step_value(&self, from: f32, step: u32) -> f32 {
        let progress = step.min(self.steps) as f64 / self.steps as f64;
        let value = from as f64 * (-progress * self.rate).exp();
        (value as f32).max(self.floor)
    }
}

impl EnvelopeScheduler for SteppedFadeScheduler {
    fn kind(&self) -> SchedulerKind {
        SchedulerKind::SteppedFade
    }

    fn schedule_onset(
        &self,
        gain: &mut AutomationParam,
        onset: &Onset,
    ) -> Result<(), GraphError> {
        if onset.attack > 0.0 {
            gain.set_value_at_time(0.0, onset.start);
            gain.linear_ramp_to_value_at_time(onset.peak, onset.start + onset.attack);
        } else {
            gain.set_value_at_time(onset.peak, onset.start);
        }

        if onset.decay > 0.0 {
            gain.linear_ramp_to_value_at_time(onset.sustain, onset.sustain_time());
        }
        gain.set_value_at_time(onset.sustain, onset.sustain_time());
        Ok(())
    }

    fn schedule_release(
        &self,
        gain: &mut AutomationParam,
        from: f32,
        now: f64,
        seconds: f64,
    ) -> Result<Vec<(f64, TimerAction)>, GraphError> {
        gain.cancel_scheduled_values(now);
        gain.set_value_at_time(from, now);

        let steps = self.steps;
        let mut timers: Vec<(f64, TimerAction)> = (1..=steps)
            .map(|step| {
                let due = now + seconds * step as f64 / steps as f64;
                (due, TimerAction::FadeStep(step))
            })
            .collect();
        timers.push((now + self.timeout, TimerAction::FadeTimeout));
        Ok(timers)
    }

    fn fade_step(
        &self,
        gain: &mut AutomationParam,
        from: f32,
        step: u32,
        now: f64,
    ) -> FadeProgress {
        if step >= self.steps {
            return FadeProgress::Complete;
        }
        let value = self.step_value(from, step);
        gain.set_value_at_time(value, now);
        FadeProgress::Continue(value)
    }

    fn fade_floor(&self) -> f32 {
        self.floor
    }
}
