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

use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use ::config::{Config, File};
use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sampleforge::{
    audio::{load_file, AudioBuffer, BufferError, ExportFormat},
    config::{EngineConfig, PlayMode},
    encoder::{self, ExportOptions},
    graph::OfflineGraph,
    util::filename_display,
    voices::{NoteOptions, VoiceEngine},
};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Prepares samples for sampler presets."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Converts an audio file into a preset sample.
    Encode {
        /// The file to convert.
        input: PathBuf,
        /// Where to write the sample.
        output: PathBuf,
        /// A YAML export profile. Flags given on the command line override it.
        #[arg(short, long)]
        profile: Option<PathBuf>,
        /// The output format (wav or aiff). Defaults to the output file's extension.
        #[arg(short, long)]
        format: Option<ExportFormat>,
        /// Bits per sample.
        #[arg(short, long)]
        bit_depth: Option<u16>,
        /// Write floating point samples (AIFF only).
        #[arg(long)]
        float: bool,
        /// Resample to 11025, 22050 or 44100 Hz.
        #[arg(short = 'r', long)]
        sample_rate: Option<u32>,
        /// Remix to 1 or 2 channels.
        #[arg(short, long)]
        channels: Option<u16>,
        /// The MIDI note the sample plays back unshifted at.
        #[arg(long)]
        root_note: Option<u8>,
        /// Loop start, in frames.
        #[arg(long)]
        loop_start: Option<u32>,
        /// Loop end, in frames.
        #[arg(long)]
        loop_end: Option<u32>,
    },
    /// Plays a single note through the voice engine and writes what it sounds like.
    Render {
        /// The sample to play.
        input: PathBuf,
        /// Where to write the rendered audio (WAV or AIFF).
        output: PathBuf,
        /// The voice engine configuration.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// How long the note is held.
        #[arg(short = 'l', long, default_value = "1s")]
        note_length: String,
        /// How long to keep rendering after the release.
        #[arg(short, long, default_value = "1s")]
        tail: String,
        /// Note velocity, 0 to 127.
        #[arg(short, long)]
        velocity: Option<u8>,
        /// Play mode (poly, mono or legato).
        #[arg(short, long)]
        mode: Option<PlayMode>,
        /// Playback rate; 2.0 plays an octave up.
        #[arg(long, default_value_t = 1.0)]
        rate: f64,
        /// Pan, -100 to 100.
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        pan: f32,
        /// Loop while the note is held.
        #[arg(long = "loop")]
        looping: bool,
        /// Keep looping through the release.
        #[arg(long)]
        loop_on_release: bool,
        /// Output sample rate (11025, 22050 or 44100).
        #[arg(short = 'r', long, default_value_t = 44100)]
        sample_rate: u32,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            input,
            output,
            profile,
            format,
            bit_depth,
            float,
            sample_rate,
            channels,
            root_note,
            loop_start,
            loop_end,
        } => {
            let mut options = match profile {
                Some(profile) => load_profile(&profile)?,
                None => ExportOptions::new(ExportFormat::from_path(&output)?),
            };
            if let Some(format) = format {
                options.format = format;
            }
            if let Some(bit_depth) = bit_depth {
                options.bit_depth = bit_depth;
            }
            options.is_float |= float;
            options.sample_rate = sample_rate.or(options.sample_rate);
            options.channels = channels.or(options.channels);
            options.root_note = root_note.or(options.root_note);
            options.loop_start = loop_start.or(options.loop_start);
            options.loop_end = loop_end.or(options.loop_end);

            let buffer = load_file(&input)?;
            let bytes = encoder::encode(&buffer, &options)?;
            fs::write(&output, &bytes)?;

            println!(
                "Wrote {} ({} bytes, {} {}-bit)",
                filename_display(&output),
                bytes.len(),
                options.format,
                options.bit_depth
            );
        }
        Commands::Render {
            input,
            output,
            config,
            note_length,
            tail,
            velocity,
            mode,
            rate,
            pan,
            looping,
            loop_on_release,
            sample_rate,
        } => {
            let engine_config = match config {
                Some(path) => EngineConfig::deserialize(&path)?,
                None => EngineConfig::new(),
            };
            let note_length = parse_duration(&note_length)?;
            let tail = parse_duration(&tail)?;
            let buffer = Arc::new(load_file(&input)?);

            let mut engine = VoiceEngine::new(OfflineGraph::new(sample_rate), &engine_config)?;
            let options = NoteOptions {
                play_mode: mode,
                velocity,
                pan,
                playback_rate: rate,
                loop_enabled: looping,
                loop_on_release,
                ..Default::default()
            };
            let handle =
                engine.play_with_note_envelope(buffer, filename_display(&input), &options)?;
            let held = engine.render_seconds(note_length.as_secs_f64())?;
            engine.release_note(handle, false);
            let released = engine.render_seconds(tail.as_secs_f64())?;
            engine.shutdown();

            let rendered = append(held, released)?;
            let bytes = encoder::encode(
                &rendered,
                &ExportOptions::new(ExportFormat::from_path(&output)?),
            )?;
            fs::write(&output, &bytes)?;

            info!(
                input = filename_display(&input),
                output = filename_display(&output),
                seconds = rendered.duration_seconds(),
                "Rendered note"
            );
        }
    }

    Ok(())
}

/// Loads an export profile from a YAML file.
fn load_profile(path: &Path) -> Result<ExportOptions, ::config::ConfigError> {
    Config::builder()
        .add_source(File::from(path))
        .build()?
        .try_deserialize::<ExportOptions>()
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    DurationString::from_string(value.to_string())
        .map(Duration::from)
        .map_err(|e| e.to_string())
}

/// Joins two buffers with the same layout end to end.
fn append(first: AudioBuffer, second: AudioBuffer) -> Result<AudioBuffer, BufferError> {
    let sample_rate = first.sample_rate();
    let channels = first
        .into_channels()
        .into_iter()
        .zip(second.into_channels())
        .map(|(mut head, tail)| {
            head.extend(tail);
            head
        })
        .collect();
    AudioBuffer::new(channels, sample_rate)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_load_profile() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "format: aiff\nbit_depth: 24\nroot_note: 48\nloop_end: 1000").unwrap();

        let options = load_profile(file.path()).unwrap();
        assert_eq!(options.format, ExportFormat::Aiff);
        assert_eq!(options.bit_depth, 24);
        assert_eq!(options.root_note, Some(48));
        assert_eq!(options.loop_start, None);
        assert_eq!(options.loop_end, Some(1000));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_append() {
        let first = AudioBuffer::new(vec![vec![1.0, 2.0], vec![3.0, 4.0]], 44100).unwrap();
        let second = AudioBuffer::new(vec![vec![5.0], vec![6.0]], 44100).unwrap();
        let joined = append(first, second).unwrap();
        assert_eq!(joined.frame_count(), 3);
        assert_eq!(joined.channel(0).unwrap(), &[1.0, 2.0, 5.0]);
        assert_eq!(joined.channel(1).unwrap(), &[3.0, 4.0, 6.0]);
    }
}
