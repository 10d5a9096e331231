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

//! Envelope parameter mapping and segment curve generation.
//!
//! The hardware stores ADSR parameters as integers in 0..=32767. These are mapped to
//! seconds and levels here, and each envelope segment is rendered as an exponential
//! interpolation table that the audio graph plays back as gain automation.

mod curve;
mod mapping;

pub use curve::{generate_curve, DEFAULT_CURVE_POINTS};
pub use mapping::{map_adsr, Adsr, EnvelopeTimes, ADSR_MAX, MAX_SEGMENT_SECONDS};
