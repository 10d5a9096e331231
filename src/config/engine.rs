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
use std::{fmt, path::Path, str::FromStr, time::Duration};

use config::{Config, File};
use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;
use crate::envelope::{Adsr, DEFAULT_CURVE_POINTS};

const DEFAULT_VELOCITY: u8 = 127;
const DEFAULT_ATTACK_STEEPNESS: f64 = 1.5;
const DEFAULT_DECAY_STEEPNESS: f64 = 2.0;
const DEFAULT_RELEASE_STEEPNESS: f64 = 2.0;
const DEFAULT_RELEASE_SAFETY_DELAY: Duration = Duration::from_millis(10);

const DEFAULT_FADE_STEPS: u32 = 20;
const DEFAULT_FADE_FLOOR: f32 = 0.001;
const DEFAULT_FADE_RATE: f64 = 3.0;
const DEFAULT_FADE_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_RESUME_ATTEMPTS: u32 = 10;
const DEFAULT_RESUME_POLL_INTERVAL: Duration = Duration::from_millis(20);
const DEFAULT_RESUME_TIMEOUT: Duration = Duration::from_secs(1);

fn parse_duration(
    field: &'static str,
    value: &Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => Ok(DurationString::from_string(value.clone())
            .map_err(|e| ConfigError::InvalidDuration {
                field,
                value: value.clone(),
                reason: e.to_string(),
            })?
            .into()),
        None => Ok(default),
    }
}

/// How a new note interacts with voices that are already sounding.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    /// Every note gets its own voice.
    #[default]
    Poly,
    /// A new note cuts every sounding voice.
    Mono,
    /// A new note glides the last voice to its pitch without retriggering the envelope.
    Legato,
}

impl FromStr for PlayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "poly" => Ok(PlayMode::Poly),
            "mono" => Ok(PlayMode::Mono),
            "legato" => Ok(PlayMode::Legato),
            _ => Err(format!("Unknown play mode: {}", s)),
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlayMode::Poly => "poly",
            PlayMode::Mono => "mono",
            PlayMode::Legato => "legato",
        })
    }
}

/// Selects how envelope segments are scheduled.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValueCurveMode {
    /// Use value curves when the graph supports them, stepped fades otherwise.
    #[default]
    Auto,
    /// Always use value curves.
    Native,
    /// Always use linear ramps and timer-driven stepped fades.
    Stepped,
}

/// Stepped release fade used when value curves are unavailable.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct FadeConfig {
    /// Number of gain steps (default: 20).
    steps: Option<u32>,
    /// Lowest gain a step may reach (default: 0.001).
    floor: Option<f32>,
    /// Exponential decay rate across the fade (default: 3.0).
    rate: Option<f64>,
    /// Hard limit after which the fade is forced to complete (default: 30s).
    timeout: Option<String>,
}

impl FadeConfig {
    pub fn steps(&self) -> u32 {
        self.steps.unwrap_or(DEFAULT_FADE_STEPS).max(1)
    }

    pub fn floor(&self) -> f32 {
        self.floor.unwrap_or(DEFAULT_FADE_FLOOR)
    }

    pub fn rate(&self) -> f64 {
        self.rate.unwrap_or(DEFAULT_FADE_RATE)
    }

    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration("fade.timeout", &self.timeout, DEFAULT_FADE_TIMEOUT)
    }
}

/// Bounded resume-and-wait applied when the graph is not running.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct ResumeConfig {
    /// Maximum resume attempts (default: 10).
    attempts: Option<u32>,
    /// Wait between attempts (default: 20ms).
    poll_interval: Option<String>,
    /// Total time budget (default: 1s).
    timeout: Option<String>,
}

impl ResumeConfig {
    pub fn attempts(&self) -> u32 {
        self.attempts.unwrap_or(DEFAULT_RESUME_ATTEMPTS).max(1)
    }

    pub fn poll_interval(&self) -> Result<Duration, ConfigError> {
        parse_duration(
            "resume.poll_interval",
            &self.poll_interval,
            DEFAULT_RESUME_POLL_INTERVAL,
        )
    }

    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration("resume.timeout", &self.timeout, DEFAULT_RESUME_TIMEOUT)
    }
}

/// A YAML representation of the voice engine configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct EngineConfig {
    /// Default play mode for notes that don't specify one (default: poly).
    play_mode: Option<PlayMode>,
    /// Default note velocity (default: 127).
    velocity: Option<u8>,
    /// Default envelope (default: instant attack, full sustain, instant release).
    adsr: Option<Adsr>,
    /// Intervals per generated curve (default: 50).
    curve_points: Option<usize>,
    attack_steepness: Option<f64>,
    decay_steepness: Option<f64>,
    release_steepness: Option<f64>,
    /// Delay between the end of a release and voice cleanup (default: 10ms).
    release_safety_delay: Option<String>,
    /// Envelope scheduling strategy (default: auto).
    value_curves: Option<ValueCurveMode>,
    fade: Option<FadeConfig>,
    resume: Option<ResumeConfig>,
}

impl EngineConfig {
    /// Creates a configuration where every setting takes its default.
    pub fn new() -> EngineConfig {
        EngineConfig::default()
    }

    /// Parse an engine configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<EngineConfig, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<EngineConfig>()?)
    }

    pub fn with_play_mode(mut self, play_mode: PlayMode) -> EngineConfig {
        self.play_mode = Some(play_mode);
        self
    }

    pub fn with_adsr(mut self, adsr: Adsr) -> EngineConfig {
        self.adsr = Some(adsr);
        self
    }

    pub fn with_velocity(mut self, velocity: u8) -> EngineConfig {
        self.velocity = Some(velocity);
        self
    }

    pub fn with_value_curves(mut self, mode: ValueCurveMode) -> EngineConfig {
        self.value_curves = Some(mode);
        self
    }

    pub fn with_fade_timeout(mut self, timeout: &str) -> EngineConfig {
        let mut fade = self.fade.unwrap_or_default();
        fade.timeout = Some(timeout.to_string());
        self.fade = Some(fade);
        self
    }

    pub fn with_resume_attempts(mut self, attempts: u32) -> EngineConfig {
        let mut resume = self.resume.unwrap_or_default();
        resume.attempts = Some(attempts);
        self.resume = Some(resume);
        self
    }

    pub fn play_mode(&self) -> PlayMode {
        self.play_mode.unwrap_or_default()
    }

    /// Returns the default velocity, capped at 127.
    pub fn velocity(&self) -> u8 {
        self.velocity.unwrap_or(DEFAULT_VELOCITY).min(127)
    }

    pub fn adsr(&self) -> Adsr {
        self.adsr.unwrap_or_default()
    }

    pub fn curve_points(&self) -> usize {
        self.curve_points.unwrap_or(DEFAULT_CURVE_POINTS).max(1)
    }

    pub fn attack_steepness(&self) -> f64 {
        self.attack_steepness.unwrap_or(DEFAULT_ATTACK_STEEPNESS)
    }

    pub fn decay_steepness(&self) -> f64 {
        self.decay_steepness.unwrap_or(DEFAULT_DECAY_STEEPNESS)
    }

    pub fn release_steepness(&self) -> f64 {
        self.release_steepness.unwrap_or(DEFAULT_RELEASE_STEEPNESS)
    }

    pub fn release_safety_delay(&self) -> Result<Duration, ConfigError> {
        parse_duration(
            "release_safety_delay",
            &self.release_safety_delay,
            DEFAULT_RELEASE_SAFETY_DELAY,
        )
    }

    pub fn value_curves(&self) -> ValueCurveMode {
        self.value_curves.unwrap_or_default()
    }

    pub fn fade(&self) -> FadeConfig {
        self.fade.clone().unwrap_or_default()
    }

    pub fn resume(&self) -> ResumeConfig {
        self.resume.clone().unwrap_or_default()
    }
}
