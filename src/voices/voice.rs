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


//! Voices and the options used to start them.

use std::fmt;

use crate::{
    config::PlayMode,
    envelope::{Adsr, EnvelopeTimes},
    graph::{LoopRegion, NodeId},
};

/// Identifies a voice for the lifetime of the engine that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceHandle(pub(super) u64);

impl VoiceHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for VoiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice-{}", self.0)
    }
}

/// Where a voice is in its envelope. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EnvelopePhase {
    Attack,
    Decay,
    Sustain,
    Release,
    Finished,
}

impl fmt::Display for EnvelopePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EnvelopePhase::Attack => "attack",
            EnvelopePhase::Decay => "decay",
            EnvelopePhase::Sustain => "sustain",
            EnvelopePhase::Release => "release",
            EnvelopePhase::Finished => "finished",
        })
    }
}

/// Options for a one-shot playback without an envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayOptions {
    /// Offset into the buffer, in seconds. Applies to the reversed buffer when `reverse`
    /// is set.
    pub start_time: f64,
    /// Maximum playing time in seconds. None plays to the end of the buffer.
    pub duration: Option<f64>,
    pub playback_rate: f64,
    pub gain_db: f32,
    /// Pan in -100..=100.
    pub pan: f32,
    pub reverse: bool,
}

impl Default for PlayOptions {
    fn default() -> Self {
        PlayOptions {
            start_time: 0.0,
            duration: None,
            playback_rate: 1.0,
            gain_db: 0.0,
            pan: 0.0,
            reverse: false,
        }
    }
}

/// Options for a note played with a gain envelope. Unset fields fall back to the engine
/// configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteOptions {
    pub adsr: Option<Adsr>,
    pub play_mode: Option<PlayMode>,
    pub velocity: Option<u8>,
    /// Pan in -100..=100.
    pub pan: f32,
    pub gain_db: f32,
    pub playback_rate: f64,
    /// Loop while the note is held.
    pub loop_enabled: bool,
    /// Keep looping through the release.
    pub loop_on_release: bool,
    /// Loop start in seconds. Defaults to the in point.
    pub loop_start: Option<f64>,
    /// Loop end in seconds. Defaults to the out point.
    pub loop_end: Option<f64>,
    /// First frame to play.
    pub in_frame: Option<usize>,
    /// Frame to stop at.
    pub out_frame: Option<usize>,
}

impl Default for NoteOptions {
    fn default() -> Self {
        NoteOptions {
            adsr: None,
            play_mode: None,
            velocity: None,
            pan: 0.0,
            gain_db: 0.0,
            playback_rate: 1.0,
            loop_enabled: false,
            loop_on_release: false,
            loop_start: None,
            loop_end: None,
            in_frame: None,
            out_frame: None,
        }
    }
}

/// Progress of a stepped release fade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct FadeState {
    pub(super) start_gain: f32,
    pub(super) completed: bool,
}

/// A sounding note.
#[derive(Debug, Clone)]
pub(super) struct Voice {
    pub(super) handle: VoiceHandle,
    pub(super) note: String,
    pub(super) node: NodeId,
    pub(super) phase: EnvelopePhase,
    pub(super) start_time: f64,
    pub(super) release_time: Option<f64>,
    pub(super) adsr: Adsr,
    pub(super) times: EnvelopeTimes,
    pub(super) velocity: u8,
    /// Last gain read from or written to the envelope.
    pub(super) gain: f32,
    pub(super) loop_enabled: bool,
    pub(super) loop_on_release: bool,
    pub(super) loop_region: LoopRegion,
    pub(super) playback_rate: f64,
    pub(super) fade: Option<FadeState>,
}

impl Voice {
    pub(super) fn info(&self) -> VoiceInfo {
        VoiceInfo {
            handle: self.handle,
            note: self.note.clone(),
            node: self.node,
            phase: self.phase,
            start_time: self.start_time,
            release_time: self.release_time,
            adsr: self.adsr,
            velocity: self.velocity,
            gain: self.gain,
            loop_enabled: self.loop_enabled,
            loop_on_release: self.loop_on_release,
            playback_rate: self.playback_rate,
        }
    }
}

/// A snapshot of a voice.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceInfo {
    pub handle: VoiceHandle,
    pub note: String,
    pub node: NodeId,
    pub phase: EnvelopePhase,
    /// Graph time the note started.
    pub start_time: f64,
    pub release_time: Option<f64>,
    pub adsr: Adsr,
    pub velocity: u8,
    pub gain: f32,
    pub loop_enabled: bool,
    pub loop_on_release: bool,
    pub playback_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_are_ordered() {
        assert!(EnvelopePhase::Attack < EnvelopePhase::Decay);
        assert!(EnvelopePhase::Decay < EnvelopePhase::Sustain);
        assert!(EnvelopePhase::Sustain < EnvelopePhase::Release);
        assert!(EnvelopePhase::Release < EnvelopePhase::Finished);
    }

    #[test]
    fn test_display() {
        assert_eq!(VoiceHandle(3).to_string(), "voice-3");
        assert_eq!(EnvelopePhase::Release.to_string(), "release");
    }
}
