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

//! AIFF and AIFC writer.
//!
//! Integer PCM is written as plain AIFF. Floating point samples need a compression type,
//! so they are written as AIFC with a `FVER` chunk and a `fl32`/`fl64` tag in `COMM`.
//! Loop metadata becomes a `MARK` chunk with two markers and an `INST` chunk whose sustain
//! loop references them.

use tracing::debug;

use super::{
    depth_error,
    error::ValidationError,
    extended::encode_extended,
    pcm::{container_bytes, quantize, quantize_12_in_16},
    writer::{pstring_len, ChunkWriter},
    EncodeError, SampleMetadata,
};
use crate::audio::{AudioBuffer, ExportFormat, SampleFormat};

/// AIFC version 1 timestamp.
const AIFC_VERSION: u32 = 0xA280_5140;
const COMM_BASE_SIZE: usize = 18;
const INST_CHUNK_SIZE: u32 = 20;

const START_MARKER_ID: u16 = 1;
const END_MARKER_ID: u16 = 2;
const START_MARKER_NAME: &str = "start";
const END_MARKER_NAME: &str = "end";

const LOOP_MODE_OFF: i16 = 0;
const LOOP_MODE_FORWARD: i16 = 1;

struct Compression {
    tag: &'static [u8; 4],
    name: &'static str,
}

fn compression(bit_depth: u16) -> Compression {
    if bit_depth == 64 {
        Compression {
            tag: b"fl64",
            name: "64-bit floating point",
        }
    } else {
        Compression {
            tag: b"fl32",
            name: "32-bit floating point",
        }
    }
}

/// Encodes a buffer as AIFF (integer PCM) or AIFC (floating point).
///
/// Integer depths are 8, 12, 16 and 24 bits. 32 and 64-bit samples are always written as
/// floating point.
pub fn encode(
    buffer: &AudioBuffer,
    bit_depth: u16,
    is_float: bool,
    meta: &SampleMetadata,
) -> Result<Vec<u8>, EncodeError> {
    let sample_format = ExportFormat::Aiff
        .sample_format(bit_depth, is_float)
        .ok_or_else(|| depth_error(ExportFormat::Aiff, bit_depth))?;
    if buffer.is_empty() {
        return Err(ValidationError::EmptyBuffer.into());
    }

    let is_aifc = sample_format == SampleFormat::Float;
    let compression = compression(bit_depth);
    let channels = buffer.channel_count();
    let frames = buffer.frame_count();
    let data_len = frames * channels as usize * container_bytes(bit_depth);

    let fver_len = if is_aifc { 8 + 4 } else { 0 };
    let comm_size = if is_aifc {
        COMM_BASE_SIZE + 4 + pstring_len(compression.name)
    } else {
        COMM_BASE_SIZE
    };
    let mark_size = 2 + 2 * (2 + 4) + pstring_len(START_MARKER_NAME) + pstring_len(END_MARKER_NAME);
    let metadata_len = if meta.is_present() {
        8 + mark_size + 8 + INST_CHUNK_SIZE as usize
    } else {
        0
    };
    let ssnd_size = 8 + data_len;
    let total = 12 + fver_len + 8 + comm_size + metadata_len + 8 + ssnd_size + ssnd_size % 2;

    let mut out = ChunkWriter::with_len(total);
    out.fourcc(b"FORM");
    out.u32_be((total - 8) as u32);
    out.fourcc(if is_aifc { b"AIFC" } else { b"AIFF" });

    if is_aifc {
        out.fourcc(b"FVER");
        out.u32_be(4);
        out.u32_be(AIFC_VERSION);
    }

    out.fourcc(b"COMM");
    out.u32_be(comm_size as u32);
    out.u16_be(channels);
    out.u32_be(frames as u32);
    out.u16_be(bit_depth);
    out.bytes(&encode_extended(buffer.sample_rate() as f64));
    if is_aifc {
        out.fourcc(compression.tag);
        out.pstring(compression.name);
    }

    if meta.is_present() {
        let (loop_start, loop_end) = meta.loop_points(frames);

        out.fourcc(b"MARK");
        out.u32_be(mark_size as u32);
        out.u16_be(2);
        out.u16_be(START_MARKER_ID);
        out.u32_be(loop_start);
        out.pstring(START_MARKER_NAME);
        out.u16_be(END_MARKER_ID);
        out.u32_be(loop_end);
        out.pstring(END_MARKER_NAME);

        out.fourcc(b"INST");
        out.u32_be(INST_CHUNK_SIZE);
        out.u8(meta.unity_note());
        out.u8(0); // detune
        out.u8(0); // low note
        out.u8(127); // high note
        out.u8(1); // low velocity
        out.u8(127); // high velocity
        out.i16_be(0); // gain
        out.i16_be(LOOP_MODE_FORWARD);
        out.u16_be(START_MARKER_ID);
        out.u16_be(END_MARKER_ID);
        out.i16_be(LOOP_MODE_OFF);
        out.u16_be(0);
        out.u16_be(0);
    }

    out.fourcc(b"SSND");
    out.u32_be(ssnd_size as u32);
    out.u32_be(0); // offset
    out.u32_be(0); // block size
    for frame in 0..frames {
        for channel in buffer.channels() {
            write_sample(&mut out, channel[frame], bit_depth, sample_format);
        }
    }
    out.pad_to_even(ssnd_size);

    debug!(
        channels,
        sample_rate = buffer.sample_rate(),
        bit_depth,
        format = %sample_format,
        frames,
        bytes = total,
        "Encoded {}",
        if is_aifc { "AIFC" } else { "AIFF" }
    );
    Ok(out.finish())
}

fn write_sample(out: &mut ChunkWriter, sample: f32, bit_depth: u16, format: SampleFormat) {
    match (format, bit_depth) {
        (SampleFormat::Float, 64) => out.bytes(&(sample as f64).to_be_bytes()),
        (SampleFormat::Float, _) => out.bytes(&sample.to_be_bytes()),
        (SampleFormat::Int, 8) => out.u8(quantize(sample, 8) as i8 as u8),
        (SampleFormat::Int, 12) => out.i16_be(quantize_12_in_16(sample)),
        (SampleFormat::Int, 16) => out.i16_be(quantize(sample, 16) as i16),
        (SampleFormat::Int, _) => {
            let value = quantize(sample, 24) as i32;
            out.bytes(&value.to_be_bytes()[1..]);
        }
    }
}
