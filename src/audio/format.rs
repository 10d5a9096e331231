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

use std::{fmt, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

/// Sample rates an exported sample may be converted to.
pub const ALLOWED_SAMPLE_RATES: [u32; 3] = [11025, 22050, 44100];

/// Bit depths the WAV encoder can write.
pub const WAV_BIT_DEPTHS: [u16; 4] = [8, 12, 16, 24];

/// Bit depths the AIFF encoder can write.
pub const AIFF_BIT_DEPTHS: [u16; 6] = [8, 12, 16, 24, 32, 64];

/// Sample format enumeration for encoded audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Integer samples (e.g., 8-bit, 16-bit, 24-bit)
    Int,
    /// Floating point samples (32-bit or 64-bit)
    Float,
}

impl SampleFormat {
    /// Convert to string representation
    pub fn as_str(self) -> &'static str {
        match self {
            SampleFormat::Float => "float",
            SampleFormat::Int => "int",
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Container format of an exported sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// RIFF/WAVE, little-endian PCM.
    #[default]
    Wav,
    /// AIFF (integer PCM) or AIFC (floating point), big-endian.
    Aiff,
}

/// Error returned when a format name or extension is not recognized.
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("Unsupported export format: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for ExportFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wav" | "wave" => Ok(ExportFormat::Wav),
            "aif" | "aiff" | "aifc" => Ok(ExportFormat::Aiff),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

impl ExportFormat {
    /// Guesses the export format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, UnknownFormat> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| UnknownFormat(path.display().to_string()))?;
        ExportFormat::from_str(extension)
    }

    /// Convert to string representation
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Wav => "wav",
            ExportFormat::Aiff => "aiff",
        }
    }

    /// Returns the bit depths this format can be written at.
    pub fn supported_bit_depths(self) -> &'static [u16] {
        match self {
            ExportFormat::Wav => &WAV_BIT_DEPTHS,
            ExportFormat::Aiff => &AIFF_BIT_DEPTHS,
        }
    }

    /// Returns the sample format used for the given bit depth and float request, or None
    /// if the combination cannot be written. AIFF 32 and 64-bit samples are always floating
    /// point.
    pub fn sample_format(self, bit_depth: u16, is_float: bool) -> Option<SampleFormat> {
        if !self.supported_bit_depths().contains(&bit_depth) {
            return None;
        }
        match (self, bit_depth, is_float) {
            (ExportFormat::Wav, _, true) => None,
            (ExportFormat::Aiff, 32 | 64, _) => Some(SampleFormat::Float),
            (ExportFormat::Aiff, _, true) => None,
            _ => Some(SampleFormat::Int),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_export_format_from_str() {
        assert_eq!(ExportFormat::from_str("wav").unwrap(), ExportFormat::Wav);
        assert_eq!(ExportFormat::from_str("WAV").unwrap(), ExportFormat::Wav);
        assert_eq!(ExportFormat::from_str("aif").unwrap(), ExportFormat::Aiff);
        assert_eq!(ExportFormat::from_str("aifc").unwrap(), ExportFormat::Aiff);
        assert!(ExportFormat::from_str("flac").is_err());
        assert!(ExportFormat::from_str("").is_err());
    }

    #[test]
    fn test_export_format_from_path() {
        assert_eq!(
            ExportFormat::from_path(&PathBuf::from("kick.aiff")).unwrap(),
            ExportFormat::Aiff
        );
        assert_eq!(
            ExportFormat::from_path(&PathBuf::from("/tmp/snare.wav")).unwrap(),
            ExportFormat::Wav
        );
        assert!(ExportFormat::from_path(&PathBuf::from("noext")).is_err());
    }

    #[test]
    fn test_sample_format_for_depths() {
        assert_eq!(
            ExportFormat::Wav.sample_format(16, false),
            Some(SampleFormat::Int)
        );
        assert_eq!(ExportFormat::Wav.sample_format(32, true), None);
        assert_eq!(ExportFormat::Wav.sample_format(16, true), None);
        assert_eq!(ExportFormat::Wav.sample_format(10, false), None);

        assert_eq!(
            ExportFormat::Aiff.sample_format(32, true),
            Some(SampleFormat::Float)
        );
        assert_eq!(
            ExportFormat::Aiff.sample_format(64, true),
            Some(SampleFormat::Float)
        );
        assert_eq!(
            ExportFormat::Aiff.sample_format(32, false),
            Some(SampleFormat::Float)
        );
        assert_eq!(
            ExportFormat::Aiff.sample_format(64, false),
            Some(SampleFormat::Float)
        );
        assert_eq!(
            ExportFormat::Aiff.sample_format(24, false),
            Some(SampleFormat::Int)
        );
        assert_eq!(ExportFormat::Aiff.sample_format(16, true), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ExportFormat::Aiff), "aiff");
        assert_eq!(format!("{}", SampleFormat::Float), "float");
    }
}
