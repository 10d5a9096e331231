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

//! Sample export: validation, format conversion and the WAV/AIFF writers.

pub mod aiff;
mod error;
pub mod extended;
mod pcm;
pub mod wav;
mod writer;

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::audio::{remix, resample, AudioBuffer, ExportFormat, ALLOWED_SAMPLE_RATES};

pub use error::{EncodeError, ValidationError};

/// MIDI note written when no root note is given.
pub const DEFAULT_ROOT_NOTE: u8 = 60;

fn default_bit_depth() -> u16 {
    16
}

/// How a sample should be exported.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExportOptions {
    #[serde(default)]
    pub format: ExportFormat,
    #[serde(default = "default_bit_depth")]
    pub bit_depth: u16,
    #[serde(default)]
    pub is_float: bool,
    /// Target sample rate. The buffer is resampled when this differs from its own rate.
    pub sample_rate: Option<u32>,
    /// Target channel count. The buffer is remixed when this differs from its own count.
    pub channels: Option<u16>,
    pub root_note: Option<u8>,
    /// Loop start, in frames of the source buffer.
    pub loop_start: Option<u32>,
    /// Loop end, in frames of the source buffer.
    pub loop_end: Option<u32>,
}

impl ExportOptions {
    /// 16-bit integer export in the given format with no conversion or metadata.
    pub fn new(format: ExportFormat) -> ExportOptions {
        ExportOptions {
            format,
            bit_depth: default_bit_depth(),
            is_float: false,
            sample_rate: None,
            channels: None,
            root_note: None,
            loop_start: None,
            loop_end: None,
        }
    }

    /// Returns the sampler metadata carried by these options.
    pub fn metadata(&self) -> SampleMetadata {
        SampleMetadata {
            root_note: self.root_note,
            loop_start: self.loop_start,
            loop_end: self.loop_end,
        }
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions::new(ExportFormat::default())
    }
}

/// Root note and loop points written into the `smpl` (WAV) or `MARK`/`INST` (AIFF) chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleMetadata {
    pub root_note: Option<u8>,
    pub loop_start: Option<u32>,
    pub loop_end: Option<u32>,
}

impl SampleMetadata {
    /// Sampler chunks are written when any field is set.
    pub fn is_present(&self) -> bool {
        self.root_note.is_some() || self.loop_start.is_some() || self.loop_end.is_some()
    }

    /// The root note, defaulting to middle C.
    pub fn unity_note(&self) -> u8 {
        self.root_note.unwrap_or(DEFAULT_ROOT_NOTE)
    }

    /// Loop start and end, defaulting to the whole sample.
    pub fn loop_points(&self, frames: usize) -> (u32, u32) {
        (
            self.loop_start.unwrap_or(0),
            self.loop_end.unwrap_or(frames as u32),
        )
    }

    /// Rescales explicit loop points for a sample rate change.
    fn rescaled(&self, ratio: f64) -> SampleMetadata {
        let scale = |frame: u32| (frame as f64 * ratio).round() as u32;
        SampleMetadata {
            root_note: self.root_note,
            loop_start: self.loop_start.map(scale),
            loop_end: self.loop_end.map(scale),
        }
    }
}

/// Checks export options against a buffer. Nothing is converted or allocated before this
/// passes.
pub fn validate(buffer: &AudioBuffer, options: &ExportOptions) -> Result<(), ValidationError> {
    let format = options.format;
    let bit_depth = options.bit_depth;
    if format.sample_format(bit_depth, options.is_float).is_none() {
        return Err(depth_error(format, bit_depth));
    }

    if let Some(rate) = options.sample_rate {
        if !ALLOWED_SAMPLE_RATES.contains(&rate) {
            return Err(ValidationError::UnsupportedSampleRate(rate));
        }
    }
    if let Some(channels) = options.channels {
        if !(1..=2).contains(&channels) {
            return Err(ValidationError::UnsupportedChannelCount(channels));
        }
    }
    if let Some(note) = options.root_note {
        if note > 127 {
            return Err(ValidationError::InvalidRootNote(note));
        }
    }
    if buffer.is_empty() {
        return Err(ValidationError::EmptyBuffer);
    }

    let frames = buffer.frame_count();
    let (start, end) = options.metadata().loop_points(frames);
    if start >= end || end as usize > frames {
        return Err(ValidationError::InvalidLoop { start, end, frames });
    }
    Ok(())
}

/// The error for a bit depth and float combination the format cannot write.
fn depth_error(format: ExportFormat, bit_depth: u16) -> ValidationError {
    if format.supported_bit_depths().contains(&bit_depth) {
        ValidationError::UnsupportedFloat { format, bit_depth }
    } else {
        ValidationError::UnsupportedBitDepth { format, bit_depth }
    }
}

/// Resamples and remixes the buffer as requested, rescaling loop points to the new rate.
fn prepare<'a>(
    buffer: &'a AudioBuffer,
    options: &ExportOptions,
) -> Result<(Cow<'a, AudioBuffer>, SampleMetadata), EncodeError> {
    let mut prepared = Cow::Borrowed(buffer);
    let mut metadata = options.metadata();

    if let Some(rate) = options.sample_rate {
        if rate != buffer.sample_rate() {
            debug!(from = buffer.sample_rate(), to = rate, "Resampling for export");
            metadata = metadata.rescaled(rate as f64 / buffer.sample_rate() as f64);
            prepared = Cow::Owned(resample(&prepared, rate)?);
        }
    }

    if let Some(channels) = options.channels {
        if channels != prepared.channel_count() {
            debug!(
                from = prepared.channel_count(),
                to = channels,
                "Remixing for export"
            );
            prepared = Cow::Owned(remix(&prepared, channels)?);
        }
    }

    Ok((prepared, metadata))
}

/// Encodes a buffer according to the export options.
///
/// Options are validated first; the buffer is then converted to the requested sample
/// rate and channel count and handed to the format's writer. The output is complete or
/// an error is returned, never a partial file.
pub fn encode(buffer: &AudioBuffer, options: &ExportOptions) -> Result<Vec<u8>, EncodeError> {
    validate(buffer, options)?;
    let (prepared, metadata) = prepare(buffer, options)?;

    let bytes = match options.format {
        ExportFormat::Wav => wav::encode(&prepared, options.bit_depth, &metadata)?,
        ExportFormat::Aiff => {
            aiff::encode(&prepared, options.bit_depth, options.is_float, &metadata)?
        }
    };

    info!(
        format = %options.format,
        bit_depth = options.bit_depth,
        float = options.is_float,
        sample_rate = prepared.sample_rate(),
        channels = prepared.channel_count(),
        bytes = bytes.len(),
        "Exported sample"
    );
    Ok(bytes)
}
