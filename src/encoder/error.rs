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
use crate::audio::{ConversionError, ExportFormat};

/// Export options that cannot be honoured. Raised before any conversion or allocation.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("{format} does not support {bit_depth}-bit samples")]
    UnsupportedBitDepth { format: ExportFormat, bit_depth: u16 },

    #[error("{format} does not support {bit_depth}-bit floating point samples")]
    UnsupportedFloat { format: ExportFormat, bit_depth: u16 },

    #[error("Unsupported sample rate {0}Hz (allowed: 11025, 22050, 44100)")]
    UnsupportedSampleRate(u32),

    #[error("Unsupported channel count {0} (allowed: 1, 2)")]
    UnsupportedChannelCount(u16),

    #[error("Root note {0} is outside the MIDI range 0-127")]
    InvalidRootNote(u8),

    #[error("Loop {start}..{end} must be non-empty and end within the sample's {frames} frames")]
    InvalidLoop { start: u32, end: u32, frames: usize },

    #[error("Cannot encode an empty buffer")]
    EmptyBuffer,
}

/// Errors surfaced by the sample encoders.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}
