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

//! Fixed-size output buffer for chunked container formats.
//!
//! Encoders compute the complete file size up front and allocate once; the writer then
//! only appends. Writing past the computed size is a layout bug, not a runtime condition.

/// An append-only byte buffer allocated at its final size.
pub(crate) struct ChunkWriter {
    bytes: Vec<u8>,
    expected_len: usize,
}

impl ChunkWriter {
    /// Allocates a writer for exactly `len` bytes.
    pub fn with_len(len: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(len),
            expected_len: len,
        }
    }

    pub fn fourcc(&mut self, id: &[u8; 4]) {
        self.bytes.extend_from_slice(id);
    }

    pub fn bytes(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    pub fn u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn u16_le(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn u32_le(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn u16_be(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    pub fn i16_be(&mut self, value: i16) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    pub fn u32_be(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes a Pascal string: length byte, the bytes, and a pad byte if the total is odd.
    pub fn pstring(&mut self, value: &str) {
        self.bytes.push(value.len() as u8);
        self.bytes.extend_from_slice(value.as_bytes());
        if (1 + value.len()) % 2 == 1 {
            self.bytes.push(0);
        }
    }

    /// Writes a zero pad byte when `len` is odd.
    pub fn pad_to_even(&mut self, len: usize) {
        if len % 2 == 1 {
            self.bytes.push(0);
        }
    }

    /// Returns the finished buffer.
    pub fn finish(self) -> Vec<u8> {
        debug_assert_eq!(
            self.bytes.len(),
            self.expected_len,
            "encoded size does not match precomputed layout"
        );
        self.bytes
    }
}

/// Size on disk of a Pascal string, including its pad byte.
pub(crate) fn pstring_len(value: &str) -> usize {
    let len = 1 + value.len();
    len + len % 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pstring_padding() {
        let mut writer = ChunkWriter::with_len(6 + 4 + 2);
        writer.pstring("start");
        writer.pstring("end");
        writer.pstring("");
        assert_eq!(
            writer.finish(),
            vec![5, b's', b't', b'a', b'r', b't', 3, b'e', b'n', b'd', 0, 0]
        );
        assert_eq!(pstring_len("start"), 6);
        assert_eq!(pstring_len("end"), 4);
        assert_eq!(pstring_len("ab"), 4);
        assert_eq!(pstring_len(""), 2);
    }

    #[test]
    fn test_endianness() {
        let mut writer = ChunkWriter::with_len(12);
        writer.u16_le(0x0102);
        writer.u16_be(0x0102);
        writer.u32_le(0x01020304);
        writer.u32_be(0x01020304);
        assert_eq!(
            writer.finish(),
            vec![0x02, 0x01, 0x01, 0x02, 0x04, 0x03, 0x02, 0x01, 0x01, 0x02, 0x03, 0x04]
        );
    }
}
