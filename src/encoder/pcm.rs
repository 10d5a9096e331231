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

/// Scales a float sample to a signed integer of `bits` bits.
///
/// The input is clamped to [-1, 1] first so out of range samples saturate instead of
/// wrapping. Negative values scale by 2^(bits-1), positive by 2^(bits-1) - 1, so both
/// full-scale extremes map onto the integer range exactly.
pub(crate) fn quantize(sample: f32, bits: u32) -> i64 {
    let sample = if sample.is_nan() {
        0.0
    } else {
        sample.clamp(-1.0, 1.0) as f64
    };
    let half = (1i64 << (bits - 1)) as f64;
    let scaled = if sample < 0.0 {
        sample * half
    } else {
        sample * (half - 1.0)
    };
    scaled.round() as i64
}

/// Quantizes to 16 bits and clears the low nibble, leaving 12 bits of precision in a
/// 16-bit container.
pub(crate) fn quantize_12_in_16(sample: f32) -> i16 {
    (quantize(sample, 16) & !0xF) as i16
}

/// Number of bytes one sample occupies in the container for the given bit depth.
pub(crate) fn container_bytes(bit_depth: u16) -> usize {
    match bit_depth {
        8 => 1,
        12 | 16 => 2,
        24 => 3,
        32 => 4,
        _ => 8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_extremes() {
        assert_eq!(quantize(1.0, 16), 32767);
        assert_eq!(quantize(-1.0, 16), -32768);
        assert_eq!(quantize(0.0, 16), 0);
        assert_eq!(quantize(1.0, 8), 127);
        assert_eq!(quantize(-1.0, 8), -128);
        assert_eq!(quantize(1.0, 24), 8_388_607);
        assert_eq!(quantize(-1.0, 24), -8_388_608);
        assert_eq!(quantize(1.0, 32), 2_147_483_647);
        assert_eq!(quantize(-1.0, 32), -2_147_483_648);
    }

    #[test]
    fn test_quantize_clamps() {
        assert_eq!(quantize(4.0, 16), 32767);
        assert_eq!(quantize(-3.5, 16), -32768);
        assert_eq!(quantize(f32::NAN, 16), 0);
        assert_eq!(quantize(f32::INFINITY, 8), 127);
    }

    #[test]
    fn test_twelve_bit_low_nibble_cleared() {
        for sample in [0.123f32, -0.777, 0.5, -1.0, 1.0, 0.0001] {
            let value = quantize_12_in_16(sample);
            assert_eq!(value & 0xF, 0, "sample {}", sample);
            assert!((value as i64 - quantize(sample, 16)).abs() < 16);
        }
    }

    #[test]
    fn test_container_bytes() {
        assert_eq!(container_bytes(8), 1);
        assert_eq!(container_bytes(12), 2);
        assert_eq!(container_bytes(16), 2);
        assert_eq!(container_bytes(24), 3);
        assert_eq!(container_bytes(32), 4);
        assert_eq!(container_bytes(64), 8);
    }
}
