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
use super::buffer::BufferError;

/// Error types for sample-rate and channel conversion
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Resampling failed: {0}Hz -> {1}Hz: {2}")]
    ResamplingFailed(u32, u32, String),

    #[error("Cannot remix {from} channels into {to}")]
    UnsupportedRemix { from: u16, to: u16 },

    #[error("Converted buffer is invalid: {0}")]
    InvalidBuffer(#[from] BufferError),
}

/// Error types for loading audio files into memory
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Audio file error: {0}")]
    AudioError(#[from] symphonia::core::errors::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("No audio track found in {0}")]
    NoAudioTrack(String),

    #[error("Sample rate not specified in {0}")]
    MissingSampleRate(String),

    #[error("Decoded audio is invalid: {0}")]
    InvalidBuffer(#[from] BufferError),
}
