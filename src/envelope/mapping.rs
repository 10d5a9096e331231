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
use serde::{Deserialize, Serialize};

/// Largest raw ADSR parameter value.
pub const ADSR_MAX: u16 = 32767;

/// Length in seconds of a time segment at the maximum parameter value.
pub const MAX_SEGMENT_SECONDS: f64 = 30.0;

/// Raw ADSR parameters as stored in a preset. Attack, decay and release are times;
/// sustain is a level.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adsr {
    pub attack: u16,
    pub decay: u16,
    pub sustain: u16,
    pub release: u16,
}

impl Default for Adsr {
    /// Instant attack, full sustain, instant release.
    fn default() -> Self {
        Adsr {
            attack: 0,
            decay: 0,
            sustain: ADSR_MAX,
            release: 0,
        }
    }
}

impl Adsr {
    /// Creates ADSR values, clamping each parameter into 0..=32767.
    pub fn clamped(attack: i64, decay: i64, sustain: i64, release: i64) -> Self {
        let clamp = |v: i64| v.clamp(0, ADSR_MAX as i64) as u16;
        Adsr {
            attack: clamp(attack),
            decay: clamp(decay),
            sustain: clamp(sustain),
            release: clamp(release),
        }
    }
}

/// ADSR parameters mapped to physical units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvelopeTimes {
    pub attack_seconds: f64,
    pub decay_seconds: f64,
    /// Sustain level in 0.0..=1.0.
    pub sustain_level: f64,
    pub release_seconds: f64,
}

/// Maps a time parameter quadratically onto 0..=30 seconds, giving finer control at the
/// short end of the range.
fn time_seconds(value: u16) -> f64 {
    let normalized = value as f64 / ADSR_MAX as f64;
    normalized * normalized * MAX_SEGMENT_SECONDS
}

/// Maps raw ADSR parameters to seconds and a linear sustain level.
pub fn map_adsr(values: &Adsr) -> EnvelopeTimes {
    EnvelopeTimes {
        attack_seconds: time_seconds(values.attack),
        decay_seconds: time_seconds(values.decay),
        sustain_level: values.sustain as f64 / ADSR_MAX as f64,
        release_seconds: time_seconds(values.release),
    }
}
