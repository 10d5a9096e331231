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

//! Sample-rate and channel-count conversion of in-memory buffers prior to encoding.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

use super::buffer::AudioBuffer;
use super::error::ConversionError;

/// Input block size for the sinc resampler.
const INPUT_BLOCK_SIZE: usize = 1024;

/// Resamples the buffer to the target rate. Buffers already at the target rate are
/// returned unchanged.
pub fn resample(buffer: &AudioBuffer, target_rate: u32) -> Result<AudioBuffer, ConversionError> {
    let source_rate = buffer.sample_rate();
    if source_rate == target_rate {
        return Ok(buffer.clone());
    }
    if target_rate == 0 {
        return Err(ConversionError::ResamplingFailed(
            source_rate,
            target_rate,
            "target rate must be greater than 0".to_string(),
        ));
    }

    let num_channels = buffer.channel_count() as usize;
    let total_frames = buffer.frame_count();
    let ratio = target_rate as f64 / source_rate as f64;
    let expected_frames = (total_frames as f64 * ratio).round() as usize;

    if total_frames == 0 {
        return Ok(AudioBuffer::silent(
            buffer.channel_count(),
            0,
            target_rate,
        )?);
    }

    let sinc_params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        oversampling_factor: 128,
        interpolation: SincInterpolationType::Linear,
        window: WindowFunction::BlackmanHarris2,
    };
    let failed = |e: &dyn std::fmt::Display| {
        ConversionError::ResamplingFailed(source_rate, target_rate, e.to_string())
    };

    let mut resampler =
        SincFixedIn::<f32>::new(ratio, 1.0, sinc_params, INPUT_BLOCK_SIZE, num_channels)
            .map_err(|e| failed(&e))?;

    // The sinc filter delays its output; that many leading frames are discarded below.
    let delay = resampler.output_delay();
    let mut output: Vec<Vec<f32>> =
        vec![Vec::with_capacity(expected_frames + delay); num_channels];
    let input = buffer.channels();
    let mut position = 0;

    loop {
        let needed = resampler.input_frames_next();
        if position + needed > total_frames {
            break;
        }
        let chunk: Vec<&[f32]> = input
            .iter()
            .map(|ch| &ch[position..position + needed])
            .collect();
        let processed = resampler.process(&chunk, None).map_err(|e| failed(&e))?;
        append_planar(&mut output, processed);
        position += needed;
    }

    if position < total_frames {
        let chunk: Vec<&[f32]> = input.iter().map(|ch| &ch[position..]).collect();
        let processed = resampler
            .process_partial(Some(&chunk), None)
            .map_err(|e| failed(&e))?;
        append_planar(&mut output, processed);
    }

    // Flush the filter tail until the delayed output covers the whole input.
    while output.first().map(|c| c.len()).unwrap_or(0) < expected_frames + delay {
        let processed = resampler
            .process_partial::<Vec<f32>>(None, None)
            .map_err(|e| failed(&e))?;
        if processed.first().map(|c| c.is_empty()).unwrap_or(true) {
            break;
        }
        append_planar(&mut output, processed);
    }

    for channel in output.iter_mut() {
        let skip = delay.min(channel.len());
        channel.drain(..skip);
        channel.resize(expected_frames, 0.0);
    }

    debug!(
        source_rate,
        target_rate,
        source_frames = total_frames,
        target_frames = expected_frames,
        "Resampled buffer"
    );

    Ok(AudioBuffer::new(output, target_rate)?)
}

/// Remixes the buffer to the target channel count.
///
/// Supported: identity, mono to stereo (duplicated), and any count down to mono (averaged).
pub fn remix(buffer: &AudioBuffer, target_channels: u16) -> Result<AudioBuffer, ConversionError> {
    let source_channels = buffer.channel_count();
    if source_channels == target_channels {
        return Ok(buffer.clone());
    }

    let channels = match (source_channels, target_channels) {
        (1, 2) => {
            let mono = buffer.channels()[0].clone();
            vec![mono.clone(), mono]
        }
        (n, 1) if n > 1 => {
            let scale = 1.0 / n as f32;
            let mixed = (0..buffer.frame_count())
                .map(|frame| {
                    buffer
                        .channels()
                        .iter()
                        .map(|ch| ch[frame])
                        .sum::<f32>()
                        * scale
                })
                .collect();
            vec![mixed]
        }
        (from, to) => return Err(ConversionError::UnsupportedRemix { from, to }),
    };

    debug!(
        from = source_channels,
        to = target_channels,
        "Remixed buffer"
    );

    Ok(AudioBuffer::new(channels, buffer.sample_rate())?)
}

/// Appends resampler output (planar) to the accumulated output.
fn append_planar(output: &mut [Vec<f32>], processed: Vec<Vec<f32>>) {
    for (out, chunk) in output.iter_mut().zip(processed) {
        out.extend_from_slice(&chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::audio_test_utils::{calculate_rms, generate_sine};

    #[test]
    fn test_remix_mono_to_stereo() {
        let mono = AudioBuffer::new(vec![vec![0.5, -0.25, 1.0]], 44100).unwrap();
        let stereo = remix(&mono, 2).unwrap();
        assert_eq!(stereo.channel_count(), 2);
        assert_eq!(stereo.channel(0).unwrap(), &[0.5, -0.25, 1.0]);
        assert_eq!(stereo.channel(1).unwrap(), &[0.5, -0.25, 1.0]);
    }

    #[test]
    fn test_remix_stereo_to_mono_averages() {
        let stereo = AudioBuffer::new(vec![vec![1.0, 0.5], vec![0.0, -0.5]], 44100).unwrap();
        let mono = remix(&stereo, 1).unwrap();
        assert_eq!(mono.channel_count(), 1);
        assert_eq!(mono.channel(0).unwrap(), &[0.5, 0.0]);
    }

    #[test]
    fn test_remix_unsupported_upmix_fails() {
        let stereo = AudioBuffer::silent(2, 16, 44100).unwrap();
        match remix(&stereo, 4) {
            Err(ConversionError::UnsupportedRemix { from, to }) => {
                assert_eq!(from, 2);
                assert_eq!(to, 4);
            }
            other => panic!("expected unsupported remix, got {:?}", other),
        }

        let quad = AudioBuffer::silent(4, 16, 44100).unwrap();
        assert!(remix(&quad, 2).is_err());
        assert_eq!(remix(&quad, 1).unwrap().channel_count(), 1);
    }

    #[test]
    fn test_resample_identity_is_clone() {
        let buffer = AudioBuffer::new(vec![vec![0.1, 0.2, 0.3]], 22050).unwrap();
        assert_eq!(resample(&buffer, 22050).unwrap(), buffer);
    }

    #[test]
    fn test_resample_downsamples_length_and_energy() {
        let source_rate = 44100;
        let samples = generate_sine(440.0, 0.5, source_rate, 0.5);
        let buffer = AudioBuffer::new(vec![samples.clone()], source_rate).unwrap();

        let resampled = resample(&buffer, 22050).unwrap();
        assert_eq!(resampled.sample_rate(), 22050);
        assert_eq!(resampled.frame_count(), samples.len() / 2);

        // A 440Hz tone is well below both Nyquist limits, so the level should survive.
        let original_rms = calculate_rms(&samples);
        let resampled_rms = calculate_rms(&resampled.channel(0).unwrap()[1000..10000]);
        assert!(
            (original_rms - resampled_rms).abs() < 0.05,
            "rms {} vs {}",
            original_rms,
            resampled_rms
        );
    }

    #[test]
    fn test_resample_upsamples_stereo() {
        let left = generate_sine(220.0, 0.3, 11025, 0.2);
        let right = generate_sine(330.0, 0.3, 11025, 0.2);
        let buffer = AudioBuffer::new(vec![left.clone(), right], 11025).unwrap();

        let resampled = resample(&buffer, 44100).unwrap();
        assert_eq!(resampled.channel_count(), 2);
        assert_eq!(resampled.frame_count(), left.len() * 4);
    }

    #[test]
    fn test_resample_empty_buffer() {
        let buffer = AudioBuffer::silent(2, 0, 44100).unwrap();
        let resampled = resample(&buffer, 11025).unwrap();
        assert_eq!(resampled.sample_rate(), 11025);
        assert!(resampled.is_empty());
    }
}
