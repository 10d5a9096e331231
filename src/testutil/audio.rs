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
use std::{error::Error, fs::File, path::PathBuf, sync::Arc};

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::audio::AudioBuffer;

/// Writes planar samples to a WAV file, interleaving them frame by frame.
pub fn write_wav_with_bits<S: hound::Sample + Copy + 'static>(
    path: PathBuf,
    samples: Vec<Vec<S>>,
    sample_rate: u32,
    bits_per_sample: u16,
) -> Result<(), Box<dyn Error>> {
    let tempwav = File::create(path)?;

    // Determine sample format based on the type
    let sample_format = if std::any::TypeId::of::<S>() == std::any::TypeId::of::<f32>() {
        SampleFormat::Float
    } else if std::any::TypeId::of::<S>() == std::any::TypeId::of::<i32>()
        || std::any::TypeId::of::<S>() == std::any::TypeId::of::<i16>()
    {
        SampleFormat::Int
    } else {
        return Err("Unsupported sample format".into());
    };

    let num_channels = samples.len();
    assert!(num_channels <= u16::MAX.into(), "Too many channels!");
    let frames = samples.iter().map(Vec::len).min().unwrap_or(0);
    let mut writer = WavWriter::new(
        tempwav,
        WavSpec {
            channels: num_channels as u16,
            sample_rate,
            bits_per_sample,
            sample_format,
        },
    )?;

    for frame in 0..frames {
        for channel_samples in &samples {
            writer.write_sample(channel_samples[frame])?;
        }
    }
    writer.finalize()?;

    Ok(())
}

/// A mono buffer holding a constant value.
pub fn constant_buffer(value: f32, frames: usize, sample_rate: u32) -> Arc<AudioBuffer> {
    Arc::new(AudioBuffer::new(vec![vec![value; frames]], sample_rate).unwrap())
}

/// A mono ramp from -1 to 1, useful for checking sample packing.
pub fn ramp_buffer(frames: usize, sample_rate: u32) -> AudioBuffer {
    let step = 2.0 / (frames.max(2) - 1) as f32;
    let samples = (0..frames).map(|i| -1.0 + step * i as f32).collect();
    AudioBuffer::new(vec![samples], sample_rate).unwrap()
}
