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

/// Number of intervals in a generated envelope curve.
pub const DEFAULT_CURVE_POINTS: usize = 50;

/// Generates `num_points + 1` values moving from `start` towards `end`.
///
/// Value `i` sits at `t = i / num_points` and equals
/// `start + (end - start) * (1 - e^(-steepness * t))`: a fast initial change that
/// settles slowly. The curve does not reach `end` exactly; callers pin the final value
/// with a held automation event.
pub fn generate_curve(start: f32, end: f32, steepness: f64, num_points: usize) -> Vec<f32> {
    if num_points == 0 {
        return vec![start];
    }

    let start = start as f64;
    let span = end as f64 - start;
    (0..=num_points)
        .map(|i| {
            let t = i as f64 / num_points as f64;
            (start + span * (1.0 - (-steepness * t).exp())) as f32
        })
        .collect()
}
