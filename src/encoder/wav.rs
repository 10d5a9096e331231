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

//! RIFF/WAVE writer with an optional `smpl` chunk carrying the root note and one loop.

use tracing::debug;

use super::{
    error::ValidationError,
    pcm::{container_bytes, quantize, quantize_12_in_16},
    writer::ChunkWriter,
    EncodeError, SampleMetadata,
};
use crate::audio::{AudioBuffer, ExportFormat};

const WAVE_FORMAT_PCM: u16 = 1;
const FMT_CHUNK_SIZE: u32 = 16;
const SMPL_CHUNK_SIZE: u32 = 60;

/// Encodes a buffer as integer PCM WAV at the given bit depth (8, 12, 16 or 24).
///
/// The buffer is written as-is; resampling and remixing happen before this point.
pub fn encode(
    buffer: &AudioBuffer,
    bit_depth: u16,
    meta: &SampleMetadata,
) -> Result<Vec<u8>, EncodeError> {
    if !ExportFormat::Wav.supported_bit_depths().contains(&bit_depth) {
        return Err(ValidationError::UnsupportedBitDepth {
            format: ExportFormat::Wav,
            bit_depth,
        }
        .into());
    }
    if buffer.is_empty() {
        return Err(ValidationError::EmptyBuffer.into());
    }

    let channels = buffer.channel_count();
    let sample_rate = buffer.sample_rate();
    let frames = buffer.frame_count();
    let sample_bytes = container_bytes(bit_depth);
    let block_align = channels as usize * sample_bytes;
    let data_len = frames * block_align;
    let smpl_len = if meta.is_present() {
        8 + SMPL_CHUNK_SIZE as usize
    } else {
        0
    };
    let total = 12 + 8 + FMT_CHUNK_SIZE as usize + smpl_len + 8 + data_len + data_len % 2;

    let mut out = ChunkWriter::with_len(total);
    out.fourcc(b"RIFF");
    out.u32_le((total - 8) as u32);
    out.fourcc(b"WAVE");

    out.fourcc(b"fmt ");
    out.u32_le(FMT_CHUNK_SIZE);
    out.u16_le(WAVE_FORMAT_PCM);
    out.u16_le(channels);
    out.u32_le(sample_rate);
    out.u32_le(sample_rate * block_align as u32);
    out.u16_le(block_align as u16);
    // 12-bit samples live in a 16-bit container and are declared as such.
    out.u16_le(if bit_depth == 12 { 16 } else { bit_depth });

    if meta.is_present() {
        write_smpl(&mut out, sample_rate, frames, meta);
    }

    out.fourcc(b"data");
    out.u32_le(data_len as u32);
    for frame in 0..frames {
        for channel in buffer.channels() {
            write_sample(&mut out, channel[frame], bit_depth);
        }
    }
    out.pad_to_even(data_len);

    debug!(
        channels,
        sample_rate,
        bit_depth,
        frames,
        bytes = total,
        "Encoded WAV"
    );
    Ok(out.finish())
}

fn write_smpl(out: &mut ChunkWriter, sample_rate: u32, frames: usize, meta: &SampleMetadata) {
    let (loop_start, loop_end) = meta.loop_points(frames);

    out.fourcc(b"smpl");
    out.u32_le(SMPL_CHUNK_SIZE);
    out.u32_le(0); // manufacturer
    out.u32_le(0); // product
    out.u32_le((1_000_000_000f64 / sample_rate as f64).round() as u32);
    out.u32_le(meta.unity_note() as u32);
    out.u32_le(0); // pitch fraction
    out.u32_le(0); // SMPTE format
    out.u32_le(0); // SMPTE offset
    out.u32_le(1); // loop count
    out.u32_le(0); // sampler data

    out.u32_le(0); // cue point id
    out.u32_le(0); // forward loop
    out.u32_le(loop_start.saturating_sub(1));
    out.u32_le(loop_end.saturating_sub(1));
    out.u32_le(0); // fraction
    out.u32_le(0); // play count, 0 = infinite
}

fn write_sample(out: &mut ChunkWriter, sample: f32, bit_depth: u16) {
    match bit_depth {
        8 => out.u8((quantize(sample, 8) + 128) as u8),
        12 => out.bytes(&quantize_12_in_16(sample).to_le_bytes()),
        16 => out.bytes(&(quantize(sample, 16) as i16).to_le_bytes()),
        _ => {
            let value = quantize(sample, 24) as i32;
            out.bytes(&value.to_le_bytes()[..3]);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::testutil::{
        audio::ramp_buffer,
        chunks::{find, le_u16, le_u32, riff_chunks},
    };

    fn metadata(root: Option<u8>, start: Option<u32>, end: Option<u32>) -> SampleMetadata {
        SampleMetadata {
            root_note: root,
            loop_start: start,
            loop_end: end,
        }
    }

    #[test]
    fn test_header_layout() {
        let buffer = AudioBuffer::new(vec![vec![0.0; 10], vec![0.0; 10]], 44100).unwrap();
        let bytes = encode(&buffer, 16, &SampleMetadata::default()).unwrap();

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(le_u32(&bytes, 4) as usize, bytes.len() - 8);
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(bytes.len(), 44 + 40);

        let chunks = riff_chunks(&bytes);
        let ids: Vec<_> = chunks.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![*b"fmt ", *b"data"]);

        let fmt = find(&chunks, b"fmt ").unwrap();
        assert_eq!(fmt.size, 16);
        assert_eq!(le_u16(fmt.data, 0), 1);
        assert_eq!(le_u16(fmt.data, 2), 2);
        assert_eq!(le_u32(fmt.data, 4), 44100);
        assert_eq!(le_u32(fmt.data, 8), 44100 * 4);
        assert_eq!(le_u16(fmt.data, 12), 4);
        assert_eq!(le_u16(fmt.data, 14), 16);
    }

    #[test]
    fn test_smpl_loop_points_off_by_one() {
        let buffer = AudioBuffer::new(vec![vec![0.1; 1000]], 44100).unwrap();
        let bytes = encode(&buffer, 16, &metadata(Some(60), Some(100), Some(500))).unwrap();

        let chunks = riff_chunks(&bytes);
        let ids: Vec<_> = chunks.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![*b"fmt ", *b"smpl", *b"data"]);

        let smpl = find(&chunks, b"smpl").unwrap();
        assert_eq!(smpl.size, 60);
        assert_eq!(le_u32(smpl.data, 8), 22676);
        assert_eq!(le_u32(smpl.data, 12), 60);
        assert_eq!(le_u32(smpl.data, 28), 1);
        assert_eq!(le_u32(smpl.data, 44), 99);
        assert_eq!(le_u32(smpl.data, 48), 499);
    }

    #[test]
    fn test_smpl_defaults() {
        let buffer = AudioBuffer::new(vec![vec![0.1; 300]], 22050).unwrap();
        let bytes = encode(&buffer, 16, &metadata(None, None, Some(200))).unwrap();
        let chunks = riff_chunks(&bytes);
        let smpl = find(&chunks, b"smpl").unwrap();
        assert_eq!(le_u32(smpl.data, 12), 60);
        assert_eq!(le_u32(smpl.data, 44), 0);
        assert_eq!(le_u32(smpl.data, 48), 199);

        let bytes = encode(&buffer, 16, &metadata(Some(72), None, None)).unwrap();
        let chunks = riff_chunks(&bytes);
        let smpl = find(&chunks, b"smpl").unwrap();
        assert_eq!(le_u32(smpl.data, 12), 72);
        assert_eq!(le_u32(smpl.data, 48), 299);
    }

    #[test]
    fn test_eight_bit_is_unsigned() {
        let buffer = AudioBuffer::new(vec![vec![-1.0, 0.0, 1.0, 2.0]], 11025).unwrap();
        let bytes = encode(&buffer, 8, &SampleMetadata::default()).unwrap();
        let chunks = riff_chunks(&bytes);
        let data = find(&chunks, b"data").unwrap();
        assert_eq!(data.data, &[0, 128, 255, 255]);
    }

    #[test]
    fn test_odd_data_is_padded() {
        let buffer = AudioBuffer::new(vec![vec![0.0; 3]], 11025).unwrap();
        let bytes = encode(&buffer, 8, &SampleMetadata::default()).unwrap();
        assert_eq!(bytes.len(), 44 + 3 + 1);
        assert_eq!(le_u32(&bytes, 40), 3);
        assert_eq!(le_u32(&bytes, 4) as usize, bytes.len() - 8);
        assert_eq!(*bytes.last().unwrap(), 0);
    }

    #[test]
    fn test_twelve_bit_low_nibble_zero() {
        let buffer = ramp_buffer(64, 44100);
        let bytes = encode(&buffer, 12, &SampleMetadata::default()).unwrap();
        let chunks = riff_chunks(&bytes);
        let fmt = find(&chunks, b"fmt ").unwrap();
        assert_eq!(le_u16(fmt.data, 14), 16);
        let data = find(&chunks, b"data").unwrap();
        for pair in data.data.chunks(2) {
            assert_eq!(pair[0] & 0x0F, 0);
        }
    }

    #[test]
    fn test_twenty_four_bit_packing() {
        let buffer = AudioBuffer::new(vec![vec![1.0, -1.0, 0.0]], 44100).unwrap();
        let bytes = encode(&buffer, 24, &SampleMetadata::default()).unwrap();
        let chunks = riff_chunks(&bytes);
        let data = find(&chunks, b"data").unwrap();
        assert_eq!(data.size, 9);
        assert_eq!(&data.data[0..3], &[0xFF, 0xFF, 0x7F]);
        assert_eq!(&data.data[3..6], &[0x00, 0x00, 0x80]);
        assert_eq!(&data.data[6..9], &[0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_hound_reads_output() {
        let left: Vec<f32> = (0..256).map(|i| (i as f32 / 256.0) - 0.5).collect();
        let right: Vec<f32> = left.iter().map(|s| -s).collect();
        let buffer = AudioBuffer::new(vec![left.clone(), right], 44100).unwrap();
        let bytes = encode(&buffer, 16, &metadata(Some(48), Some(10), Some(200))).unwrap();

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.bits_per_sample, 16);
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 512);
        for (i, expected) in left.iter().enumerate() {
            let decoded = samples[i * 2] as f32 / 32768.0;
            assert!((decoded - expected).abs() < 1e-3);
            assert_eq!(samples[i * 2 + 1], quantize(-expected, 16) as i16);
        }
    }

    #[test]
    fn test_rejects_bad_depth() {
        let buffer = AudioBuffer::new(vec![vec![0.0; 4]], 44100).unwrap();
        assert!(matches!(
            encode(&buffer, 10, &SampleMetadata::default()),
            Err(EncodeError::Validation(ValidationError::UnsupportedBitDepth { .. }))
        ));
        assert!(matches!(
            encode(&buffer, 32, &SampleMetadata::default()),
            Err(EncodeError::Validation(ValidationError::UnsupportedBitDepth { .. }))
        ));
    }
}
