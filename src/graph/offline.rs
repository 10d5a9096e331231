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

//! A software graph that renders on demand into stereo buffers.
//!
//! The clock only moves when `render` is called, which makes rendering deterministic:
//! everything scheduled on the clock happens at the exact frame it was scheduled for,
//! no matter how long rendering takes.

use std::{
    collections::BTreeMap,
    f32::consts::FRAC_PI_4,
    fmt,
    sync::Arc,
    time::Duration,
};

use tracing::debug;

use super::{AudioGraph, AutomationParam, GraphError, GraphState, LoopRegion, NodeId, SourceSpec};
use crate::audio::AudioBuffer;

/// How a suspended graph responds to `resume`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeBehavior {
    /// Runs as soon as resume is requested.
    Immediate,
    /// Runs after the given number of state polls.
    AfterPolls(u32),
    /// Never runs.
    Never,
}

#[derive(Debug, Clone, Copy)]
struct StartRequest {
    when: f64,
    offset: f64,
    duration: Option<f64>,
}

/// A buffer source and its gain stage.
struct SourceNode {
    buffer: Arc<AudioBuffer>,
    playback_rate: f64,
    pan: f32,
    output_gain: f32,
    loop_region: Option<LoopRegion>,
    gain: AutomationParam,
    start: Option<StartRequest>,
    stop_at: Option<f64>,
    /// Read position in source frames, set when playback begins.
    position: Option<f64>,
    ended: bool,
}

impl SourceNode {
    fn new(spec: SourceSpec) -> SourceNode {
        SourceNode {
            buffer: spec.buffer,
            playback_rate: spec.playback_rate.max(0.0),
            pan: spec.pan.clamp(-1.0, 1.0),
            output_gain: spec.output_gain,
            loop_region: spec.loop_region,
            gain: AutomationParam::new(1.0),
            start: None,
            stop_at: None,
            position: None,
            ended: false,
        }
    }

    /// Loop bounds in source frames, or None if the region is empty.
    fn loop_frames(&self, region: LoopRegion) -> Option<(f64, f64)> {
        let frames = self.buffer.frame_count() as f64;
        let rate = self.buffer.sample_rate() as f64;
        let start = (region.start * rate).clamp(0.0, frames);
        let end = if region.end > region.start {
            (region.end * rate).min(frames)
        } else {
            frames
        };
        (end > start).then_some((start, end))
    }

    /// Produces the next output frame, or None when silent. Sets `ended` when playback
    /// finishes.
    fn next_frame(&mut self, time: f64, output_rate: u32) -> Option<(f32, f32)> {
        if self.ended {
            return None;
        }
        let start = self.start?;
        if time < start.when {
            return None;
        }
        if self.stop_at.is_some_and(|stop| time >= stop)
            || start.duration.is_some_and(|d| time >= start.when + d)
        {
            self.ended = true;
            return None;
        }

        let source_rate = self.buffer.sample_rate() as f64;
        let mut position = self
            .position
            .unwrap_or_else(|| (start.offset * source_rate).max(0.0));
        if let Some((loop_start, loop_end)) = self.loop_region.and_then(|r| self.loop_frames(r)) {
            while position >= loop_end {
                position -= loop_end - loop_start;
            }
        }

        let frames = self.buffer.frame_count();
        if position >= frames as f64 {
            self.ended = true;
            return None;
        }

        let index = position.floor() as usize;
        let fraction = (position - index as f64) as f32;
        let sample = |channel: &[f32]| {
            let current = channel[index];
            let next = channel.get(index + 1).copied().unwrap_or(current);
            current + (next - current) * fraction
        };

        let gain = self.gain.value_at(time) * self.output_gain;
        let channels = self.buffer.channels();
        let (left, right) = if channels.len() == 1 {
            // Equal-power pan.
            let value = sample(channels[0].as_slice());
            let angle = (self.pan + 1.0) * FRAC_PI_4;
            (value * angle.cos(), value * angle.sin())
        } else {
            let left_gain = if self.pan > 0.0 { 1.0 - self.pan } else { 1.0 };
            let right_gain = if self.pan < 0.0 { 1.0 + self.pan } else { 1.0 };
            (
                sample(channels[0].as_slice()) * left_gain,
                sample(channels[1].as_slice()) * right_gain,
            )
        };

        self.position = Some(position + self.playback_rate * source_rate / output_rate as f64);
        Some((left * gain, right * gain))
    }
}

/// Renders buffer sources into stereo output, one frame at a time.
pub struct OfflineGraph {
    sample_rate: u32,
    /// Frames rendered so far; the clock.
    frame: u64,
    state: GraphState,
    resume_behavior: ResumeBehavior,
    pending_polls: Option<u32>,
    resume_requests: u32,
    value_curves: bool,
    next_id: u64,
    nodes: BTreeMap<NodeId, SourceNode>,
    ended: Vec<NodeId>,
}

impl OfflineGraph {
    /// Creates a running graph that supports value curves.
    pub fn new(sample_rate: u32) -> OfflineGraph {
        OfflineGraph {
            sample_rate,
            frame: 0,
            state: GraphState::Running,
            resume_behavior: ResumeBehavior::Immediate,
            pending_polls: None,
            resume_requests: 0,
            value_curves: true,
            next_id: 1,
            nodes: BTreeMap::new(),
            ended: Vec::new(),
        }
    }

    /// Creates a running graph that reports no value curve support.
    pub fn without_value_curves(sample_rate: u32) -> OfflineGraph {
        OfflineGraph {
            value_curves: false,
            ..OfflineGraph::new(sample_rate)
        }
    }

    /// Creates a suspended graph that reacts to resume requests as given.
    pub fn suspended(sample_rate: u32, resume_behavior: ResumeBehavior) -> OfflineGraph {
        OfflineGraph {
            state: GraphState::Suspended,
            resume_behavior,
            ..OfflineGraph::new(sample_rate)
        }
    }

    /// Stops the clock until the next resume.
    pub fn suspend(&mut self) {
        if self.state == GraphState::Running {
            self.state = GraphState::Suspended;
        }
    }

    /// Number of times resume has been requested.
    pub fn resume_requests(&self) -> u32 {
        self.resume_requests
    }

    /// Number of connected sources.
    pub fn source_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// True once a source has ended or has a stop scheduled.
    pub fn is_stopped(&self, node: NodeId) -> bool {
        self.nodes
            .get(&node)
            .is_some_and(|n| n.ended || n.stop_at.is_some())
    }

    pub fn loop_region(&self, node: NodeId) -> Option<LoopRegion> {
        self.nodes.get(&node).and_then(|n| n.loop_region)
    }

    pub fn playback_rate(&self, node: NodeId) -> Option<f64> {
        self.nodes.get(&node).map(|n| n.playback_rate)
    }

    pub fn gain(&self, node: NodeId) -> Option<&AutomationParam> {
        self.nodes.get(&node).map(|n| &n.gain)
    }

    /// Renders the next `frames` frames. A graph that isn't running renders silence and
    /// its clock stays where it is.
    pub fn render(&mut self, frames: usize) -> Result<AudioBuffer, GraphError> {
        let mut left = vec![0.0f32; frames];
        let mut right = vec![0.0f32; frames];

        if self.state == GraphState::Running {
            let sample_rate = self.sample_rate;
            for i in 0..frames {
                let time = self.frame as f64 / sample_rate as f64;
                for (id, node) in self.nodes.iter_mut() {
                    let was_ended = node.ended;
                    if let Some((l, r)) = node.next_frame(time, sample_rate) {
                        left[i] += l;
                        right[i] += r;
                    }
                    if node.ended && !was_ended {
                        self.ended.push(*id);
                    }
                }
                self.frame += 1;
            }
        }

        Ok(AudioBuffer::new(vec![left, right], self.sample_rate)?)
    }

    fn node_mut(&mut self, node: NodeId) -> Result<&mut SourceNode, GraphError> {
        let missing = self.missing(node);
        self.nodes.get_mut(&node).ok_or(missing)
    }

    /// Ids are never reused, so an issued id with no node was disconnected.
    fn missing(&self, node: NodeId) -> GraphError {
        if node.0 > 0 && node.0 < self.next_id {
            GraphError::AlreadyDisconnected(node)
        } else {
            GraphError::UnknownNode(node)
        }
    }
}

impl AudioGraph for OfflineGraph {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }

    fn state(&self) -> GraphState {
        self.state
    }

    fn resume(&mut self) -> Result<(), GraphError> {
        if self.state == GraphState::Closed {
            return Err(GraphError::Closed);
        }
        self.resume_requests += 1;
        if self.state == GraphState::Running {
            return Ok(());
        }
        match self.resume_behavior {
            ResumeBehavior::Immediate => self.state = GraphState::Running,
            ResumeBehavior::AfterPolls(polls) => {
                self.pending_polls.get_or_insert(polls);
            }
            ResumeBehavior::Never => {}
        }
        Ok(())
    }

    fn wait_for_state(&mut self, _interval: Duration) -> GraphState {
        if let Some(remaining) = self.pending_polls {
            if remaining <= 1 {
                self.pending_polls = None;
                self.state = GraphState::Running;
            } else {
                self.pending_polls = Some(remaining - 1);
            }
        }
        self.state
    }

    fn supports_value_curves(&self) -> bool {
        self.value_curves
    }

    fn create_source(&mut self, spec: SourceSpec) -> Result<NodeId, GraphError> {
        if self.state == GraphState::Closed {
            return Err(GraphError::Closed);
        }
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, SourceNode::new(spec));
        Ok(id)
    }

    fn gain_param(&mut self, node: NodeId) -> Result<&mut AutomationParam, GraphError> {
        Ok(&mut self.node_mut(node)?.gain)
    }

    fn set_loop(&mut self, node: NodeId, region: Option<LoopRegion>) -> Result<(), GraphError> {
        self.node_mut(node)?.loop_region = region;
        Ok(())
    }

    fn set_playback_rate(&mut self, node: NodeId, rate: f64) -> Result<(), GraphError> {
        self.node_mut(node)?.playback_rate = rate.max(0.0);
        Ok(())
    }

    fn start(
        &mut self,
        node: NodeId,
        when: f64,
        offset: f64,
        duration: Option<f64>,
    ) -> Result<(), GraphError> {
        let source = self.node_mut(node)?;
        if source.start.is_some() {
            return Err(GraphError::AlreadyStarted(node));
        }
        source.start = Some(StartRequest {
            when,
            offset,
            duration,
        });
        Ok(())
    }

    fn stop(&mut self, node: NodeId, when: f64) -> Result<(), GraphError> {
        let source = self.node_mut(node)?;
        if source.start.is_none() {
            return Err(GraphError::NotStarted(node));
        }
        if source.ended || source.stop_at.is_some() {
            return Err(GraphError::AlreadyStopped(node));
        }
        source.stop_at = Some(when);
        Ok(())
    }

    fn disconnect(&mut self, node: NodeId) -> Result<(), GraphError> {
        match self.nodes.remove(&node) {
            Some(_) => Ok(()),
            None => Err(self.missing(node)),
        }
    }

    fn take_ended(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.ended)
    }

    fn close(&mut self) {
        debug!(sources = self.nodes.len(), "Closing offline graph");
        self.state = GraphState::Closed;
        self.nodes.clear();
        self.ended.clear();
    }
}

impl fmt::Debug for OfflineGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfflineGraph")
            .field("sample_rate", &self.sample_rate)
            .field("time", &self.current_time())
            .field("state", &self.state)
            .field("sources", &self.nodes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::audio::constant_buffer;

    const RATE: u32 = 1000;

    fn start_constant(graph: &mut OfflineGraph, frames: usize, pan: f32) -> NodeId {
        let node = graph
            .create_source(SourceSpec {
                pan,
                ..SourceSpec::new(constant_buffer(1.0, frames, RATE))
            })
            .unwrap();
        graph.start(node, 0.0, 0.0, None).unwrap();
        node
    }

    #[test]
    fn test_basic_render() {
        let mut graph = OfflineGraph::new(RATE);
        start_constant(&mut graph, 10, 0.0);

        let out = graph.render(20).unwrap();
        assert_eq!(out.channel_count(), 2);
        assert_eq!(out.frame_count(), 20);
        let centre = FRAC_PI_4.cos();
        for i in 0..10 {
            assert!((out.channel(0).unwrap()[i] - centre).abs() < 1e-6);
            assert!((out.channel(1).unwrap()[i] - centre).abs() < 1e-6);
        }
        assert!(out.channel(0).unwrap()[10..].iter().all(|s| *s == 0.0));
        assert!((graph.current_time() - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_multiple_source_mixing() {
        let mut graph = OfflineGraph::new(RATE);
        start_constant(&mut graph, 10, -1.0);
        start_constant(&mut graph, 10, -1.0);
        let out = graph.render(1).unwrap();
        assert!((out.channel(0).unwrap()[0] - 2.0).abs() < 1e-6);
        assert!(out.channel(1).unwrap()[0].abs() < 1e-6);
    }

    #[test]
    fn test_ended_notification() {
        let mut graph = OfflineGraph::new(RATE);
        let node = start_constant(&mut graph, 5, 0.0);
        graph.render(4).unwrap();
        assert!(graph.take_ended().is_empty());
        graph.render(4).unwrap();
        assert_eq!(graph.take_ended(), vec![node]);
        assert!(graph.take_ended().is_empty());
        assert!(graph.is_stopped(node));
    }

    #[test]
    fn test_scheduled_start_and_stop() {
        let mut graph = OfflineGraph::new(RATE);
        let node = graph
            .create_source(SourceSpec::new(constant_buffer(1.0, 100, RATE)))
            .unwrap();
        graph.start(node, 0.005, 0.0, None).unwrap();
        graph.stop(node, 0.010).unwrap();

        let out = graph.render(20).unwrap();
        let left = out.channel(0).unwrap();
        assert_eq!(left[4], 0.0);
        assert!(left[5] > 0.0);
        assert!(left[9] > 0.0);
        assert_eq!(left[10], 0.0);
        assert_eq!(graph.take_ended(), vec![node]);
    }

    #[test]
    fn test_duration_limits_playback() {
        let mut graph = OfflineGraph::new(RATE);
        let node = graph
            .create_source(SourceSpec::new(constant_buffer(1.0, 100, RATE)))
            .unwrap();
        graph.start(node, 0.0, 0.0, Some(0.003)).unwrap();
        let out = graph.render(10).unwrap();
        let audible = out.channel(0).unwrap().iter().filter(|s| **s > 0.0).count();
        assert_eq!(audible, 3);
    }

    #[test]
    fn test_loop_wraps() {
        let mut graph = OfflineGraph::new(RATE);
        let buffer = Arc::new(AudioBuffer::new(vec![vec![0.1, 0.2, 0.3, 0.4]], RATE).unwrap());
        let node = graph
            .create_source(SourceSpec {
                pan: -1.0,
                loop_region: Some(LoopRegion {
                    start: 0.001,
                    end: 0.003,
                }),
                ..SourceSpec::new(buffer)
            })
            .unwrap();
        graph.start(node, 0.0, 0.0, None).unwrap();
        let out = graph.render(7).unwrap();
        let left: Vec<f32> = out.channel(0).unwrap().iter().map(|s| (s * 10.0).round()).collect();
        assert_eq!(left, vec![1.0, 2.0, 3.0, 2.0, 3.0, 2.0, 3.0]);
        assert!(graph.take_ended().is_empty());

        graph.set_loop(node, None).unwrap();
        graph.render(5).unwrap();
        assert_eq!(graph.take_ended(), vec![node]);
    }

    #[test]
    fn test_playback_rate() {
        let mut graph = OfflineGraph::new(RATE);
        let buffer = Arc::new(AudioBuffer::new(vec![vec![0.0, 1.0, 2.0, 3.0, 4.0]], RATE).unwrap());
        let node = graph
            .create_source(SourceSpec {
                pan: -1.0,
                playback_rate: 2.0,
                ..SourceSpec::new(buffer)
            })
            .unwrap();
        graph.start(node, 0.0, 0.0, None).unwrap();
        let out = graph.render(4).unwrap();
        assert_eq!(out.channel(0).unwrap(), &[0.0, 2.0, 4.0, 0.0]);
        assert_eq!(graph.playback_rate(node), Some(2.0));
    }

    #[test]
    fn test_gain_automation_applies() {
        let mut graph = OfflineGraph::new(RATE);
        let node = start_constant(&mut graph, 100, -1.0);
        {
            let gain = graph.gain_param(node).unwrap();
            gain.set_value_at_time(0.0, 0.0);
            gain.linear_ramp_to_value_at_time(1.0, 0.010);
        }
        let out = graph.render(11).unwrap();
        let left = out.channel(0).unwrap();
        assert_eq!(left[0], 0.0);
        assert!((left[5] - 0.5).abs() < 1e-5);
        assert!((left[10] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_node_errors() {
        let mut graph = OfflineGraph::new(RATE);
        let node = graph
            .create_source(SourceSpec::new(constant_buffer(1.0, 10, RATE)))
            .unwrap();
        assert_eq!(graph.stop(node, 0.0), Err(GraphError::NotStarted(node)));
        graph.start(node, 0.0, 0.0, None).unwrap();
        assert_eq!(
            graph.start(node, 0.0, 0.0, None),
            Err(GraphError::AlreadyStarted(node))
        );
        graph.stop(node, 0.0).unwrap();
        assert_eq!(graph.stop(node, 0.0), Err(GraphError::AlreadyStopped(node)));
        graph.disconnect(node).unwrap();
        assert_eq!(
            graph.disconnect(node),
            Err(GraphError::AlreadyDisconnected(node))
        );
        assert_eq!(
            graph.stop(node, 0.0),
            Err(GraphError::AlreadyDisconnected(node))
        );
        assert_eq!(
            graph.disconnect(NodeId(99)),
            Err(GraphError::UnknownNode(NodeId(99)))
        );
        assert_eq!(graph.source_count(), 0);
    }

    #[test]
    fn test_disconnected_ids_stay_recognised() {
        let mut graph = OfflineGraph::new(RATE);
        let first = graph
            .create_source(SourceSpec::new(constant_buffer(1.0, 10, RATE)))
            .unwrap();
        graph.disconnect(first).unwrap();
        for _ in 0..1000 {
            let node = graph
                .create_source(SourceSpec::new(constant_buffer(1.0, 10, RATE)))
                .unwrap();
            graph.disconnect(node).unwrap();
        }
        let live = graph
            .create_source(SourceSpec::new(constant_buffer(1.0, 10, RATE)))
            .unwrap();

        assert_eq!(
            graph.disconnect(first),
            Err(GraphError::AlreadyDisconnected(first))
        );
        assert_eq!(
            graph.start(first, 0.0, 0.0, None),
            Err(GraphError::AlreadyDisconnected(first))
        );
        assert_eq!(
            graph.disconnect(NodeId(live.0 + 1)),
            Err(GraphError::UnknownNode(NodeId(live.0 + 1)))
        );
        assert_eq!(
            graph.disconnect(NodeId(0)),
            Err(GraphError::UnknownNode(NodeId(0)))
        );
        assert_eq!(graph.source_count(), 1);
        assert!(graph.is_connected(live));
    }

    #[test]
    fn test_suspend_stops_the_clock() {
        let mut graph = OfflineGraph::new(RATE);
        start_constant(&mut graph, 100, 0.0);
        graph.render(10).unwrap();
        graph.suspend();
        assert_eq!(graph.state(), GraphState::Suspended);

        let out = graph.render(10).unwrap();
        assert!(out.channel(0).unwrap().iter().all(|s| *s == 0.0));
        assert_eq!(graph.current_time(), 10.0 / RATE as f64);

        graph.resume().unwrap();
        assert_eq!(graph.state(), GraphState::Running);
        let out = graph.render(10).unwrap();
        assert!(out.channel(0).unwrap()[0] > 0.0);
    }

    #[test]
    fn test_suspended_graph_is_silent() {
        let mut graph = OfflineGraph::suspended(RATE, ResumeBehavior::AfterPolls(2));
        start_constant(&mut graph, 10, 0.0);
        let out = graph.render(5).unwrap();
        assert!(out.channel(0).unwrap().iter().all(|s| *s == 0.0));
        assert_eq!(graph.current_time(), 0.0);

        graph.resume().unwrap();
        assert_eq!(graph.state(), GraphState::Suspended);
        assert_eq!(
            graph.wait_for_state(Duration::from_millis(1)),
            GraphState::Suspended
        );
        assert_eq!(
            graph.wait_for_state(Duration::from_millis(1)),
            GraphState::Running
        );
        let out = graph.render(5).unwrap();
        assert!(out.channel(0).unwrap()[0] > 0.0);
    }

    #[test]
    fn test_closed_graph() {
        let mut graph = OfflineGraph::new(RATE);
        start_constant(&mut graph, 10, 0.0);
        graph.close();
        assert_eq!(graph.state(), GraphState::Closed);
        assert_eq!(graph.resume(), Err(GraphError::Closed));
        assert_eq!(
            graph.create_source(SourceSpec::new(constant_buffer(1.0, 10, RATE))),
            Err(GraphError::Closed)
        );
    }
}
