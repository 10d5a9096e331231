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

//! In-memory audio buffers.
//!
//! Samples are fully materialized and stored planar (one Vec per channel), which is
//! what both the renderer and the encoders want to iterate over.

use std::time::Duration;

/// Errors raised when constructing a buffer from raw sample data.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BufferError {
    #[error("Audio buffer must have at least one channel")]
    NoChannels,

    #[error("Channel {channel} has {actual} frames, expected {expected}")]
    MismatchedChannelLengths {
        channel: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Sample rate must be greater than 0")]
    ZeroSampleRate,

    #[error("{0} interleaved samples do not divide into {1} channels")]
    RaggedInterleaved(usize, u16),
}

/// A fully materialized, planar audio buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Per-channel samples. Every channel has the same length.
    channels: Vec<Vec<f32>>,
    /// Sample rate in Hz.
    sample_rate: u32,
}

impl AudioBuffer {
    /// Creates a buffer from planar channel data.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, BufferError> {
        if sample_rate == 0 {
            return Err(BufferError::ZeroSampleRate);
        }
        let expected = match channels.first() {
            Some(first) => first.len(),
            None => return Err(BufferError::NoChannels),
        };
        for (channel, samples) in channels.iter().enumerate() {
            if samples.len() != expected {
                return Err(BufferError::MismatchedChannelLengths {
                    channel,
                    expected,
                    actual: samples.len(),
                });
            }
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Creates a buffer from interleaved samples (L, R, L, R, ...).
    pub fn from_interleaved(
        interleaved: &[f32],
        channel_count: u16,
        sample_rate: u32,
    ) -> Result<Self, BufferError> {
        let num_channels = channel_count as usize;
        if num_channels == 0 {
            return Err(BufferError::NoChannels);
        }
        if interleaved.len() % num_channels != 0 {
            return Err(BufferError::RaggedInterleaved(
                interleaved.len(),
                channel_count,
            ));
        }

        let num_frames = interleaved.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(num_frames); num_channels];
        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, sample) in frame.iter().enumerate() {
                channels[ch].push(*sample);
            }
        }

        Self::new(channels, sample_rate)
    }

    /// Creates a silent buffer.
    pub fn silent(channel_count: u16, frames: usize, sample_rate: u32) -> Result<Self, BufferError> {
        Self::new(vec![vec![0.0; frames]; channel_count as usize], sample_rate)
    }

    /// Returns the number of channels.
    pub fn channel_count(&self) -> u16 {
        self.channels.len() as u16
    }

    /// Returns the number of frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Returns the sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns true if the buffer holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    /// Returns the playback duration at the native sample rate.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_seconds())
    }

    /// Returns the playback duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Returns the samples of a single channel.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(|c| c.as_slice())
    }

    /// Returns all channels.
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Consumes the buffer and returns its planar channel data.
    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }

    /// Returns a copy of this buffer played backwards.
    pub fn reversed(&self) -> AudioBuffer {
        AudioBuffer {
            channels: self
                .channels
                .iter()
                .map(|c| c.iter().rev().copied().collect())
                .collect(),
            sample_rate: self.sample_rate,
        }
    }

    /// Returns the samples interleaved frame by frame.
    pub fn to_interleaved(&self) -> Vec<f32> {
        let num_channels = self.channels.len();
        let mut interleaved = Vec::with_capacity(self.frame_count() * num_channels);
        for frame in 0..self.frame_count() {
            for channel in &self.channels {
                interleaved.push(channel[frame]);
            }
        }
        interleaved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_mismatched_lengths() {
        let result = AudioBuffer::new(vec![vec![0.0; 4], vec![0.0; 3]], 44100);
        assert_eq!(
            result,
            Err(BufferError::MismatchedChannelLengths {
                channel: 1,
                expected: 4,
                actual: 3
            })
        );
        assert_eq!(
            AudioBuffer::new(vec![], 44100),
            Err(BufferError::NoChannels)
        );
        assert_eq!(
            AudioBuffer::new(vec![vec![0.0]], 0),
            Err(BufferError::ZeroSampleRate)
        );
    }

    #[test]
    fn test_interleaved_conversion() {
        let buffer =
            AudioBuffer::from_interleaved(&[0.1, -0.1, 0.2, -0.2, 0.3, -0.3], 2, 48000).unwrap();
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frame_count(), 3);
        assert_eq!(buffer.channel(0).unwrap(), &[0.1, 0.2, 0.3]);
        assert_eq!(buffer.channel(1).unwrap(), &[-0.1, -0.2, -0.3]);
        assert_eq!(buffer.to_interleaved(), vec![0.1, -0.1, 0.2, -0.2, 0.3, -0.3]);

        assert!(AudioBuffer::from_interleaved(&[0.0; 5], 2, 48000).is_err());
    }

    #[test]
    fn test_reversed_and_duration() {
        let buffer = AudioBuffer::new(vec![vec![1.0, 2.0, 3.0, 4.0]], 4).unwrap();
        assert_eq!(buffer.reversed().channel(0).unwrap(), &[4.0, 3.0, 2.0, 1.0]);
        assert_eq!(buffer.duration(), Duration::from_secs(1));
        assert!(!buffer.is_empty());
        assert!(AudioBuffer::silent(1, 0, 44100).unwrap().is_empty());
    }
}
