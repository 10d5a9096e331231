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


//! Sampler preset preparation.
//!
//! [`voices`] plays samples through an [`graph::AudioGraph`] with per-note ADSR gain
//! envelopes. [`encoder`] writes samples out as WAV or AIFF with the loop points and root
//! note a sampler needs.

pub mod audio;
pub mod config;
pub mod encoder;
pub mod envelope;
pub mod graph;
#[cfg(test)]
mod testutil;
pub mod util;
pub mod voices;
