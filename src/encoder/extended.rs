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

//! IEEE 754 80-bit extended precision floats, as used by the AIFF `COMM` chunk to store
//! the sample rate.
//!
//! Layout (big-endian): 1 sign bit, 15-bit exponent biased by 16383, then a 64-bit
//! mantissa whose top bit is the explicit integer bit. Every finite f64 converts exactly,
//! since its 53-bit significand fits in the 64-bit mantissa.

const EXTENDED_BIAS: i32 = 16383;
const DOUBLE_BIAS: i32 = 1023;
const MAX_EXPONENT: u16 = 0x7FFF;

/// Encodes an f64 as a big-endian 80-bit extended float.
pub fn encode_extended(value: f64) -> [u8; 10] {
    let bits = value.to_bits();
    let sign: u16 = if value.is_sign_negative() { 0x8000 } else { 0 };
    let double_exponent = ((bits >> 52) & 0x7FF) as i32;
    let fraction = bits & ((1u64 << 52) - 1);

    let (exponent, mantissa): (u16, u64) = if double_exponent == 0x7FF {
        // Infinity keeps only the integer bit; NaN carries its payload.
        (MAX_EXPONENT, (1u64 << 63) | (fraction << 11))
    } else if double_exponent == 0 {
        if fraction == 0 {
            (0, 0)
        } else {
            // Subnormal double: normalize so the leading one becomes the integer bit.
            let shift = fraction.leading_zeros();
            let exponent = 1 - DOUBLE_BIAS - (shift as i32 - 11) + EXTENDED_BIAS;
            (exponent as u16, fraction << shift)
        }
    } else {
        let exponent = double_exponent - DOUBLE_BIAS + EXTENDED_BIAS;
        (exponent as u16, (1u64 << 63) | (fraction << 11))
    };

    let mut out = [0u8; 10];
    out[..2].copy_from_slice(&(sign | exponent).to_be_bytes());
    out[2..].copy_from_slice(&mantissa.to_be_bytes());
    out
}

/// Decodes a big-endian 80-bit extended float using the standard formula
/// `mantissa * 2^(exponent - 16383 - 63)`.
pub fn decode_extended(bytes: &[u8; 10]) -> f64 {
    let head = u16::from_be_bytes([bytes[0], bytes[1]]);
    let negative = head & 0x8000 != 0;
    let exponent = (head & MAX_EXPONENT) as i32;
    let mut mantissa_bytes = [0u8; 8];
    mantissa_bytes.copy_from_slice(&bytes[2..]);
    let mantissa = u64::from_be_bytes(mantissa_bytes);

    let magnitude = if exponent == 0 && mantissa == 0 {
        0.0
    } else if exponent == MAX_EXPONENT as i32 {
        if mantissa << 1 == 0 {
            f64::INFINITY
        } else {
            f64::NAN
        }
    } else {
        mantissa as f64 * 2f64.powi(exponent - EXTENDED_BIAS - 63)
    };

    if negative {
        -magnitude
    } else {
        magnitude
    }
}
