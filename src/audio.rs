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

//! In-memory audio: buffers, file loading and format conversion.

pub mod buffer;
pub mod convert;
pub mod decode;
pub mod error;
pub mod format;

pub use buffer::{AudioBuffer, BufferError};
pub use convert::{remix, resample};
pub use decode::load_file;
pub use error::{ConversionError, DecodeError};
pub use format::{ExportFormat, SampleFormat, ALLOWED_SAMPLE_RATES};
