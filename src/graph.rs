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

//! The audio graph the voice engine plays through.
//!
//! A graph owns buffer source nodes, each feeding its own gain stage into a stereo
//! destination. The graph keeps its own clock; every time passed to it is in seconds on
//! that clock. Gain changes are scheduled ahead of time as automation, so the control
//! side never has to be on time, only early.

pub mod offline;
pub mod param;

use std::{fmt, sync::Arc, thread, time::Duration};

use crate::audio::{AudioBuffer, BufferError};

pub use offline::{OfflineGraph, ResumeBehavior};
pub use param::{AutomationEvent, AutomationParam};

/// Identifies a source node within a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Run state of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    /// The clock is stopped and nothing renders.
    Suspended,
    Running,
    /// The graph has been shut down and cannot be resumed.
    Closed,
}

impl fmt::Display for GraphState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GraphState::Suspended => "suspended",
            GraphState::Running => "running",
            GraphState::Closed => "closed",
        })
    }
}

/// A loop region in seconds of source time. An end at or before the start loops the whole
/// buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopRegion {
    pub start: f64,
    pub end: f64,
}

/// Everything needed to create a buffer source.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub buffer: Arc<AudioBuffer>,
    /// Speed multiplier; 2.0 plays an octave up.
    pub playback_rate: f64,
    /// Stereo position in -1.0..=1.0.
    pub pan: f32,
    /// Static linear gain applied after the automated gain.
    pub output_gain: f32,
    pub loop_region: Option<LoopRegion>,
}

impl SourceSpec {
    /// A centred, unity gain, non-looping source at its native rate.
    pub fn new(buffer: Arc<AudioBuffer>) -> SourceSpec {
        SourceSpec {
            buffer,
            playback_rate: 1.0,
            pan: 0.0,
            output_gain: 1.0,
            loop_region: None,
        }
    }
}

/// Errors raised by graph operations.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GraphError {
    #[error("{0} has already been stopped")]
    AlreadyStopped(NodeId),

    #[error("{0} has already been disconnected")]
    AlreadyDisconnected(NodeId),

    #[error("Unknown node {0}")]
    UnknownNode(NodeId),

    #[error("{0} has not been started")]
    NotStarted(NodeId),

    #[error("{0} has already been started")]
    AlreadyStarted(NodeId),

    #[error("Invalid value curve: {0}")]
    InvalidCurve(String),

    #[error("The audio graph is closed")]
    Closed,

    #[error("Rendered buffer is invalid: {0}")]
    InvalidBuffer(#[from] BufferError),
}

impl GraphError {
    /// Double stops and double disconnects happen routinely during teardown and are not
    /// worth reporting.
    pub fn is_expected_race(&self) -> bool {
        matches!(
            self,
            GraphError::AlreadyStopped(_) | GraphError::AlreadyDisconnected(_)
        )
    }
}

/// The operations the voice engine needs from a rendering engine.
pub trait AudioGraph {
    /// Output sample rate.
    fn sample_rate(&self) -> u32;

    /// Current time on the graph clock, in seconds.
    fn current_time(&self) -> f64;

    fn state(&self) -> GraphState;

    /// Asks the graph to start running. The state may change later rather than at once.
    fn resume(&mut self) -> Result<(), GraphError>;

    /// Waits up to `interval` for a state change and returns the state afterwards.
    fn wait_for_state(&mut self, interval: Duration) -> GraphState {
        thread::sleep(interval);
        self.state()
    }

    /// Whether the graph can play back value curves on gain parameters.
    fn supports_value_curves(&self) -> bool;

    /// Creates an unstarted buffer source connected to the destination.
    fn create_source(&mut self, spec: SourceSpec) -> Result<NodeId, GraphError>;

    /// The automated gain of a source.
    fn gain_param(&mut self, node: NodeId) -> Result<&mut AutomationParam, GraphError>;

    /// Enables, changes or (with None) disables looping.
    fn set_loop(&mut self, node: NodeId, region: Option<LoopRegion>) -> Result<(), GraphError>;

    fn set_playback_rate(&mut self, node: NodeId, rate: f64) -> Result<(), GraphError>;

    /// Starts playback at `when`, `offset` seconds into the buffer, optionally for at most
    /// `duration` seconds.
    fn start(
        &mut self,
        node: NodeId,
        when: f64,
        offset: f64,
        duration: Option<f64>,
    ) -> Result<(), GraphError>;

    /// Stops playback at `when`.
    fn stop(&mut self, node: NodeId, when: f64) -> Result<(), GraphError>;

    /// Disconnects a source and releases it.
    fn disconnect(&mut self, node: NodeId) -> Result<(), GraphError>;

    /// Drains the sources that have ended since the last call.
    fn take_ended(&mut self) -> Vec<NodeId>;

    /// Closes the graph.
    fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_races() {
        assert!(GraphError::AlreadyStopped(NodeId(1)).is_expected_race());
        assert!(GraphError::AlreadyDisconnected(NodeId(1)).is_expected_race());
        assert!(!GraphError::UnknownNode(NodeId(1)).is_expected_race());
        assert!(!GraphError::NotStarted(NodeId(1)).is_expected_race());
        assert!(!GraphError::Closed.is_expected_race());
    }

    #[test]
    fn test_display() {
        assert_eq!(NodeId(7).to_string(), "node-7");
        assert_eq!(GraphState::Suspended.to_string(), "suspended");
        assert_eq!(
            GraphError::AlreadyStopped(NodeId(3)).to_string(),
            "node-3 has already been stopped"
        );
    }
}
