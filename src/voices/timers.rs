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


//! Deferred envelope bookkeeping, due on the graph clock.

use super::voice::{EnvelopePhase, VoiceHandle};

/// What to do when a timer comes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Move the voice to the given phase.
    PhaseAdvance(EnvelopePhase),
    /// Apply step `n` of a stepped release fade.
    FadeStep(u32),
    /// Finish a stepped fade that hasn't completed on its own.
    FadeTimeout,
    /// Stop and disconnect the voice.
    Cleanup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Timer {
    pub id: TimerId,
    pub voice: VoiceHandle,
    /// Graph time in seconds.
    pub due: f64,
    pub action: TimerAction,
}

/// Pending timers, ordered by due time and then by creation.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    next_id: u64,
    timers: Vec<Timer>,
}

impl TimerRegistry {
    pub fn new() -> TimerRegistry {
        TimerRegistry::default()
    }

    pub fn schedule(&mut self, voice: VoiceHandle, due: f64, action: TimerAction) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let index = self.timers.partition_point(|t| t.due <= due);
        self.timers.insert(
            index,
            Timer {
                id,
                voice,
                due,
                action,
            },
        );
        id
    }

    /// Cancels every timer owned by a voice. Returns how many were cancelled.
    pub fn cancel_voice(&mut self, voice: VoiceHandle) -> usize {
        let before = self.timers.len();
        self.timers.retain(|t| t.voice != voice);
        before - self.timers.len()
    }

    pub fn cancel_all(&mut self) -> usize {
        let count = self.timers.len();
        self.timers.clear();
        count
    }

    /// Removes and returns every timer due at or before `now`, in firing order.
    pub fn take_due(&mut self, now: f64) -> Vec<Timer> {
        let due = self.timers.partition_point(|t| t.due <= now);
        self.timers.drain(..due).collect()
    }

    /// The pending timers owned by a voice.
    pub fn pending_for(&self, voice: VoiceHandle) -> impl Iterator<Item = &Timer> {
        self.timers.iter().filter(move |t| t.voice == voice)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
