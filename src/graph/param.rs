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

//! Scheduled parameter automation.
//!
//! Events are kept sorted by their time. Events at the same time keep insertion order.
//! A value is computed by walking the timeline: set events jump, ramps interpolate from
//! the previous event, and curves interpolate linearly between their points.

use super::GraphError;

/// One scheduled change.
#[derive(Debug, Clone, PartialEq)]
pub enum AutomationEvent {
    /// Jump to `value` at `time`.
    SetValue { value: f32, time: f64 },
    /// Ramp linearly from the previous event to `value`, arriving at `end_time`.
    LinearRamp { value: f32, end_time: f64 },
    /// Play `values` evenly spaced over `duration` seconds from `start_time`.
    ValueCurve {
        values: Vec<f32>,
        start_time: f64,
        duration: f64,
    },
}

impl AutomationEvent {
    /// The time the event is ordered by.
    pub fn time(&self) -> f64 {
        match self {
            AutomationEvent::SetValue { time, .. } => *time,
            AutomationEvent::LinearRamp { end_time, .. } => *end_time,
            AutomationEvent::ValueCurve { start_time, .. } => *start_time,
        }
    }

    /// The time the event stops affecting the value.
    fn end_time(&self) -> f64 {
        match self {
            AutomationEvent::ValueCurve {
                start_time,
                duration,
                ..
            } => start_time + duration,
            other => other.time(),
        }
    }
}

/// An automatable parameter, such as the gain of a voice.
#[derive(Debug, Clone, PartialEq)]
pub struct AutomationParam {
    default_value: f32,
    events: Vec<AutomationEvent>,
}

impl AutomationParam {
    pub fn new(default_value: f32) -> AutomationParam {
        AutomationParam {
            default_value,
            events: Vec::new(),
        }
    }

    /// The scheduled events, in time order.
    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    fn insert(&mut self, event: AutomationEvent) {
        let time = event.time();
        let index = self.events.partition_point(|e| e.time() <= time);
        self.events.insert(index, event);
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(AutomationEvent::SetValue {
            value,
            time: time.max(0.0),
        });
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, end_time: f64) {
        self.insert(AutomationEvent::LinearRamp {
            value,
            end_time: end_time.max(0.0),
        });
    }

    /// Schedules a value curve. Needs at least two finite values and a positive duration.
    pub fn set_value_curve_at_time(
        &mut self,
        values: &[f32],
        start_time: f64,
        duration: f64,
    ) -> Result<(), GraphError> {
        if values.len() < 2 {
            return Err(GraphError::InvalidCurve(format!(
                "needs at least 2 values, got {}",
                values.len()
            )));
        }
        if !(duration.is_finite() && duration > 0.0) {
            return Err(GraphError::InvalidCurve(format!(
                "duration must be positive, got {}",
                duration
            )));
        }
        if values.iter().any(|v| !v.is_finite()) || !start_time.is_finite() {
            return Err(GraphError::InvalidCurve("non-finite value".to_string()));
        }

        self.insert(AutomationEvent::ValueCurve {
            values: values.to_vec(),
            start_time: start_time.max(0.0),
            duration,
        });
        Ok(())
    }

    /// Removes every event at or after `time`, along with any curve still playing at
    /// `time`.
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        self.events
            .retain(|event| event.time() < time && event.end_time() <= time);
    }

    /// The value of the parameter at `time`.
    pub fn value_at(&self, time: f64) -> f32 {
        let mut value = self.default_value;
        let mut previous_time = 0.0;

        for event in &self.events {
            match event {
                AutomationEvent::SetValue { value: v, time: t } => {
                    if *t > time {
                        break;
                    }
                    value = *v;
                    previous_time = *t;
                }
                AutomationEvent::LinearRamp {
                    value: v,
                    end_time,
                } => {
                    if *end_time <= time {
                        value = *v;
                        previous_time = *end_time;
                        continue;
                    }
                    let span = end_time - previous_time;
                    if span <= 0.0 || time < previous_time {
                        break;
                    }
                    let progress = ((time - previous_time) / span) as f32;
                    return value + (v - value) * progress;
                }
                AutomationEvent::ValueCurve {
                    values,
                    start_time,
                    duration,
                } => {
                    if *start_time > time {
                        break;
                    }
                    let end = start_time + duration;
                    if time >= end {
                        value = values[values.len() - 1];
                        previous_time = end;
                        continue;
                    }
                    return curve_value(values, (time - start_time) / duration);
                }
            }
        }

        value
    }
}

/// Interpolates a curve at `position` in 0..1.
fn curve_value(values: &[f32], position: f64) -> f32 {
    let scaled = position * (values.len() - 1) as f64;
    let index = scaled.floor() as usize;
    if index + 1 >= values.len() {
        return values[values.len() - 1];
    }
    let fraction = (scaled - index as f64) as f32;
    values[index] + (values[index + 1] - values[index]) * fraction
}
