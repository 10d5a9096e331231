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

//! Minimal readers for the chunked containers the encoders produce.

/// A chunk found in a RIFF or IFF file.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk<'a> {
    pub id: [u8; 4],
    pub size: u32,
    pub data: &'a [u8],
}

fn walk(bytes: &[u8], big_endian: bool) -> Vec<Chunk<'_>> {
    let mut chunks = Vec::new();
    let mut pos = 12;
    while pos + 8 <= bytes.len() {
        let id = [bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]];
        let raw = [bytes[pos + 4], bytes[pos + 5], bytes[pos + 6], bytes[pos + 7]];
        let size = if big_endian {
            u32::from_be_bytes(raw)
        } else {
            u32::from_le_bytes(raw)
        };
        let start = pos + 8;
        let end = (start + size as usize).min(bytes.len());
        chunks.push(Chunk {
            id,
            size,
            data: &bytes[start..end],
        });
        pos = start + size as usize + (size as usize % 2);
    }
    chunks
}

/// Lists the chunks of a little-endian RIFF file, after the 12-byte header.
pub fn riff_chunks(bytes: &[u8]) -> Vec<Chunk<'_>> {
    walk(bytes, false)
}

/// Lists the chunks of a big-endian IFF (AIFF/AIFC) file, after the 12-byte header.
pub fn iff_chunks(bytes: &[u8]) -> Vec<Chunk<'_>> {
    walk(bytes, true)
}

/// Finds a chunk by id.
pub fn find<'a>(chunks: &'a [Chunk<'a>], id: &[u8; 4]) -> Option<&'a Chunk<'a>> {
    chunks.iter().find(|c| &c.id == id)
}

pub fn le_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

pub fn le_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

pub fn be_u16(data: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([data[at], data[at + 1]])
}

pub fn be_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}
