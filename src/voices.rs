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

//! Polyphonic note playback with ADSR gain envelopes.
//!
//! The [`VoiceEngine`] owns every sounding voice and every pending timer. Envelope
//! segments are scheduled on the graph ahead of time; timers only do bookkeeping (phase
//! changes, stepped fades and cleanup) and fire from [`VoiceEngine::process`] against the
//! graph clock.

mod engine;
mod error;
mod scheduler;
mod timers;
mod voice;

pub use engine::{EngineStats, VoiceEngine, RENDER_QUANTUM};
pub use error::EngineError;
pub use scheduler::{
    EnvelopeScheduler, FadeProgress, NativeCurveScheduler, Onset, SchedulerKind,
    SteppedFadeScheduler,
};
pub use timers::{Timer, TimerAction, TimerId, TimerRegistry};
pub use voice::{EnvelopePhase, NoteOptions, PlayOptions, VoiceHandle, VoiceInfo};
