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


/// Errors raised while loading or reading an engine configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The YAML file could not be read or does not match the expected shape.
    #[error("Unable to load engine configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A duration setting could not be parsed, e.g. `release_safety_delay: soon`.
    #[error("Invalid duration for {field} ({value}): {reason}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        reason: String,
    },
}
