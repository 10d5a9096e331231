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

//! Loads audio files (WAV, AIFF, FLAC, MP3, ...) entirely into memory.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, info};

use super::buffer::AudioBuffer;
use super::error::DecodeError;
use crate::util::filename_display;

/// Decodes the whole file at `path` into an [AudioBuffer].
pub fn load_file(path: &Path) -> Result<AudioBuffer, DecodeError> {
    // Include the path in IO errors so the user sees which file failed.
    let file = File::open(path).map_err(|e| {
        DecodeError::IoError(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();
    let probed = get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;
    let mut format_reader = probed.format;

    let file_name = filename_display(path).to_string();
    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeError::NoAudioTrack(file_name.clone()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let sample_rate = params
        .sample_rate
        .ok_or_else(|| DecodeError::MissingSampleRate(file_name.clone()))?;

    let decoder_opts: DecoderOptions = Default::default();
    let mut decoder = get_codecs().make(&params, &decoder_opts)?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut channel_count = params.channels.map(|c| c.count() as u16).unwrap_or(0);

    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupt packets are skipped rather than aborting the whole load.
                debug!(file = file_name, error = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if channel_count == 0 {
            channel_count = decoded.spec().channels.count() as u16;
        }
        let mut sample_buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
        sample_buffer.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(sample_buffer.samples());
    }

    let buffer = AudioBuffer::from_interleaved(&interleaved, channel_count.max(1), sample_rate)?;

    info!(
        file = file_name,
        channels = buffer.channel_count(),
        sample_rate,
        frames = buffer.frame_count(),
        duration_ms = buffer.duration().as_millis(),
        "Loaded audio file"
    );

    Ok(buffer)
}
