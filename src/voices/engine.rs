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

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    sync::Arc,
    time::Duration,
};

use tracing::{debug, info, warn};

use crate::{
    audio::AudioBuffer,
    config::{EngineConfig, PlayMode, ValueCurveMode},
    envelope::{map_adsr, Adsr},
    graph::{AudioGraph, GraphError, GraphState, LoopRegion, NodeId, OfflineGraph, SourceSpec},
    util::{db_to_gain, normalize_pan},
};

use super::{
    error::EngineError,
    scheduler::{
        EnvelopeScheduler, FadeProgress, NativeCurveScheduler, Onset, SchedulerKind,
        SteppedFadeScheduler,
    },
    timers::{TimerAction, TimerRegistry},
    voice::{EnvelopePhase, FadeState, NoteOptions, PlayOptions, Voice, VoiceHandle, VoiceInfo},
};

/// Frames rendered between timer checks when rendering offline.
pub const RENDER_QUANTUM: usize = 128;

/// Counters kept over the life of an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub voices_started: u64,
    pub voices_cleaned_up: u64,
    pub fades_completed: u64,
}

/// Engine configuration resolved once at construction.
#[derive(Debug, Clone)]
struct Settings {
    play_mode: PlayMode,
    velocity: u8,
    adsr: Adsr,
    safety_delay: f64,
    resume_attempts: u32,
    poll_interval: Duration,
    resume_timeout: Duration,
}

/// Plays buffers through an audio graph and manages the envelopes of their voices.
///
/// All timers run against the graph clock and fire from [`VoiceEngine::process`], which
/// the owner calls regularly. [`VoiceEngine::render`] does this automatically for an
/// [`OfflineGraph`].
pub struct VoiceEngine<G: AudioGraph> {
    graph: G,
    scheduler: Box<dyn EnvelopeScheduler>,
    settings: Settings,
    voices: BTreeMap<VoiceHandle, Voice>,
    nodes: HashMap<NodeId, VoiceHandle>,
    one_shots: HashSet<NodeId>,
    last_triggered: Option<VoiceHandle>,
    timers: TimerRegistry,
    next_handle: u64,
    stats: EngineStats,
}

/// Treats double stops and disconnects as success.
fn tolerate(result: Result<(), GraphError>) -> Result<(), GraphError> {
    match result {
        Err(e) if e.is_expected_race() => Ok(()),
        other => other,
    }
}

impl<G: AudioGraph> VoiceEngine<G> {
    /// Creates an engine, choosing the envelope scheduler from the configuration and the
    /// capabilities of the graph.
    pub fn new(graph: G, config: &EngineConfig) -> Result<Self, EngineError> {
        let safety_delay = config.release_safety_delay()?.as_secs_f64();
        let native = match config.value_curves() {
            ValueCurveMode::Auto => graph.supports_value_curves(),
            ValueCurveMode::Native => true,
            ValueCurveMode::Stepped => false,
        };

        let scheduler: Box<dyn EnvelopeScheduler> = if native {
            Box::new(NativeCurveScheduler::new(
                config.curve_points(),
                config.attack_steepness(),
                config.decay_steepness(),
                config.release_steepness(),
                safety_delay,
            ))
        } else {
            let fade = config.fade();
            Box::new(SteppedFadeScheduler::new(
                fade.steps(),
                fade.floor(),
                fade.rate(),
                fade.timeout()?.as_secs_f64(),
            ))
        };

        let resume = config.resume();
        let settings = Settings {
            play_mode: config.play_mode(),
            velocity: config.velocity(),
            adsr: config.adsr(),
            safety_delay,
            resume_attempts: resume.attempts(),
            poll_interval: resume.poll_interval()?,
            resume_timeout: resume.timeout()?,
        };

        info!(
            sample_rate = graph.sample_rate(),
            scheduler = ?scheduler.kind(),
            play_mode = %settings.play_mode,
            "Voice engine ready"
        );

        Ok(VoiceEngine {
            graph,
            scheduler,
            settings,
            voices: BTreeMap::new(),
            nodes: HashMap::new(),
            one_shots: HashSet::new(),
            last_triggered: None,
            timers: TimerRegistry::new(),
            next_handle: 1,
            stats: EngineStats::default(),
        })
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }

    pub fn scheduler_kind(&self) -> SchedulerKind {
        self.scheduler.kind()
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Number of voices not yet cleaned up, including voices in their release.
    pub fn active_voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn pending_timer_count(&self) -> usize {
        self.timers.len()
    }

    pub fn voice_info(&self, handle: VoiceHandle) -> Option<VoiceInfo> {
        self.voices.get(&handle).map(Voice::info)
    }

    /// Snapshots of every live voice, oldest first.
    pub fn voices(&self) -> Vec<VoiceInfo> {
        self.voices.values().map(Voice::info).collect()
    }

    /// Makes sure the graph is running, resuming it if needed.
    pub fn ensure_running(&mut self) -> Result<(), EngineError> {
        let mut state = self.graph.state();
        match state {
            GraphState::Running => return Ok(()),
            GraphState::Closed => {
                return Err(EngineError::ContextNotRunning { state, attempts: 0 });
            }
            GraphState::Suspended => {}
        }

        let mut attempts = 0;
        let mut waited = Duration::ZERO;
        while attempts < self.settings.resume_attempts && waited < self.settings.resume_timeout
        {
            attempts += 1;
            if let Err(e) = self.graph.resume() {
                warn!(error = %e, attempt = attempts, "Resume request failed");
            }
            state = self.graph.wait_for_state(self.settings.poll_interval);
            waited += self.settings.poll_interval;

            match state {
                GraphState::Running => {
                    debug!(attempts, "Audio graph resumed");
                    return Ok(());
                }
                GraphState::Closed => break,
                GraphState::Suspended => {}
            }
        }

        warn!(%state, attempts, "Audio graph did not start");
        Err(EngineError::ContextNotRunning { state, attempts })
    }

    /// Plays a buffer once, without an envelope.
    pub fn play(&mut self, buffer: Arc<AudioBuffer>, options: &PlayOptions) -> Result<(), EngineError> {
        if buffer.is_empty() {
            return Err(EngineError::EmptyBuffer);
        }
        self.ensure_running()?;

        let buffer = if options.reverse {
            Arc::new(buffer.reversed())
        } else {
            buffer
        };
        let offset = options.start_time.clamp(0.0, buffer.duration_seconds());
        let node = self.graph.create_source(SourceSpec {
            buffer,
            playback_rate: options.playback_rate,
            pan: normalize_pan(options.pan),
            output_gain: db_to_gain(options.gain_db),
            loop_region: None,
        })?;

        let now = self.graph.current_time();
        if let Err(e) = self.graph.start(node, now, offset, options.duration) {
            if let Err(disconnect) = tolerate(self.graph.disconnect(node)) {
                warn!(%node, error = %disconnect, "Failed to disconnect source");
            }
            return Err(e.into());
        }
        self.one_shots.insert(node);

        debug!(%node, offset, reverse = options.reverse, "Playing buffer");
        Ok(())
    }

    /// Starts a note with an ADSR gain envelope and returns its handle.
    ///
    /// In mono mode every other voice is cut first. In legato mode a sounding voice from
    /// the previous note is retuned and reused instead of starting a new one.
    pub fn play_with_note_envelope(
        &mut self,
        buffer: Arc<AudioBuffer>,
        note: &str,
        options: &NoteOptions,
    ) -> Result<VoiceHandle, EngineError> {
        if buffer.is_empty() {
            return Err(EngineError::EmptyBuffer);
        }
        self.ensure_running()?;

        let sample_rate = buffer.sample_rate() as f64;
        let frames = buffer.frame_count();
        let in_frame = options.in_frame.unwrap_or(0).min(frames);
        let out_frame = options.out_frame.unwrap_or(frames).min(frames);
        if out_frame <= in_frame {
            return Err(EngineError::EmptyBuffer);
        }

        let play_mode = options.play_mode.unwrap_or(self.settings.play_mode);
        match play_mode {
            PlayMode::Mono => {
                if !self.voices.is_empty() {
                    debug!(voices = self.voices.len(), note, "Mono note cuts sounding voices");
                }
                self.cleanup_all();
            }
            PlayMode::Legato => {
                if let Some(handle) = self.legato_target() {
                    self.retune(handle, options.playback_rate)?;
                    debug!(voice = %handle, note, "Legato note reuses voice");
                    return Ok(handle);
                }
            }
            PlayMode::Poly => {}
        }

        let offset = in_frame as f64 / sample_rate;
        let loop_region = LoopRegion {
            start: options.loop_start.unwrap_or(offset),
            end: options
                .loop_end
                .unwrap_or(out_frame as f64 / sample_rate),
        };
        let looping = options.loop_enabled || options.loop_on_release;
        let duration = match (looping, options.out_frame) {
            (false, Some(_)) => Some((out_frame - in_frame) as f64 / sample_rate),
            _ => None,
        };

        let adsr = options.adsr.unwrap_or(self.settings.adsr);
        let times = map_adsr(&adsr);
        let velocity = options.velocity.unwrap_or(self.settings.velocity).min(127);
        let peak = velocity as f32 / 127.0;

        let node = self.graph.create_source(SourceSpec {
            buffer,
            playback_rate: options.playback_rate,
            pan: normalize_pan(options.pan),
            output_gain: db_to_gain(options.gain_db),
            loop_region: looping.then_some(loop_region),
        })?;

        let now = self.graph.current_time();
        let onset = Onset {
            start: now,
            peak,
            sustain: times.sustain_level as f32 * peak,
            attack: times.attack_seconds,
            decay: times.decay_seconds,
        };
        let scheduled = self
            .graph
            .gain_param(node)
            .and_then(|gain| self.scheduler.schedule_onset(gain, &onset))
            .and_then(|_| self.graph.start(node, now, offset, duration));
        if let Err(e) = scheduled {
            warn!(%node, note, error = %e, "Failed to schedule note onset");
            self.release_node(node);
            return Err(e.into());
        }

        let handle = VoiceHandle(self.next_handle);
        self.next_handle += 1;
        self.voices.insert(
            handle,
            Voice {
                handle,
                note: note.to_string(),
                node,
                phase: EnvelopePhase::Attack,
                start_time: now,
                release_time: None,
                adsr,
                times,
                velocity,
                gain: if onset.attack > 0.0 { 0.0 } else { peak },
                loop_enabled: options.loop_enabled,
                loop_on_release: options.loop_on_release,
                loop_region,
                playback_rate: options.playback_rate,
                fade: None,
            },
        );
        self.nodes.insert(node, handle);
        self.last_triggered = Some(handle);
        self.timers.schedule(
            handle,
            now + onset.attack,
            TimerAction::PhaseAdvance(EnvelopePhase::Decay),
        );
        self.timers.schedule(
            handle,
            onset.sustain_time(),
            TimerAction::PhaseAdvance(EnvelopePhase::Sustain),
        );
        self.stats.voices_started += 1;

        debug!(
            voice = %handle,
            note,
            %node,
            mode = %play_mode,
            velocity,
            attack = times.attack_seconds,
            decay = times.decay_seconds,
            sustain = times.sustain_level,
            release = times.release_seconds,
            "Note on"
        );
        Ok(handle)
    }

    /// The voice a legato note should take over, if one is still sounding.
    fn legato_target(&self) -> Option<VoiceHandle> {
        let handle = self.last_triggered?;
        self.voices
            .get(&handle)
            .filter(|v| v.phase != EnvelopePhase::Finished)
            .map(|v| v.handle)
    }

    fn retune(&mut self, handle: VoiceHandle, playback_rate: f64) -> Result<(), EngineError> {
        let Some(voice) = self.voices.get_mut(&handle) else {
            return Ok(());
        };
        self.graph.set_playback_rate(voice.node, playback_rate)?;
        voice.playback_rate = playback_rate;
        Ok(())
    }

    /// Releases a note. With `force_stop` the voice is cut immediately.
    ///
    /// Returns false if the voice is unknown or already releasing.
    pub fn release_note(&mut self, handle: VoiceHandle, force_stop: bool) -> bool {
        let Some(voice) = self.voices.get(&handle) else {
            debug!(voice = %handle, "Release for unknown voice");
            return false;
        };
        if force_stop {
            return self.cleanup_voice(handle);
        }
        if voice.phase >= EnvelopePhase::Release {
            debug!(voice = %handle, phase = %voice.phase, "Voice is already releasing");
            return false;
        }

        self.timers.cancel_voice(handle);
        let now = self.graph.current_time();
        if let Err(e) = self.begin_release(handle, now) {
            self.handle_graph_error(handle, e);
        }
        true
    }

    fn begin_release(&mut self, handle: VoiceHandle, now: f64) -> Result<(), GraphError> {
        let Some(voice) = self.voices.get_mut(&handle) else {
            return Ok(());
        };
        let node = voice.node;
        if voice.loop_on_release {
            self.graph.set_loop(node, Some(voice.loop_region))?;
        } else if voice.loop_enabled {
            self.graph.set_loop(node, None)?;
        }

        let release = voice.times.release_seconds;
        let gain = self.graph.gain_param(node)?;
        let from = gain.value_at(now);
        voice.phase = EnvelopePhase::Release;
        voice.release_time = Some(now);
        voice.gain = from;

        if release <= 0.0 {
            gain.cancel_scheduled_values(now);
            gain.set_value_at_time(0.0, now);
            voice.gain = 0.0;
            tolerate(self.graph.stop(node, now))?;
            self.timers.schedule(
                handle,
                now + self.settings.safety_delay,
                TimerAction::Cleanup,
            );
        } else {
            let timers = self.scheduler.schedule_release(gain, from, now, release)?;
            if self.scheduler.kind() == SchedulerKind::SteppedFade {
                voice.fade = Some(FadeState {
                    start_gain: from,
                    completed: false,
                });
            }
            for (due, action) in timers {
                self.timers.schedule(handle, due, action);
            }
        }

        debug!(voice = %handle, from, release, "Note off");
        Ok(())
    }

    /// Releases every voice that isn't already releasing. Returns how many were released.
    pub fn release_all(&mut self) -> usize {
        self.release_voices_matching(|_| true)
    }

    /// Releases the voices accepted by `predicate`.
    pub fn release_voices_matching<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&VoiceInfo) -> bool,
    {
        let handles: Vec<VoiceHandle> = self
            .voices
            .values()
            .map(Voice::info)
            .filter(|info| predicate(info))
            .map(|info| info.handle)
            .collect();
        handles
            .into_iter()
            .filter(|handle| self.release_note(*handle, false))
            .count()
    }

    /// Cuts every voice and one-shot immediately.
    pub fn stop_all(&mut self) {
        let timers = self.timers.cancel_all();
        let voices = self.voices.len();
        self.cleanup_all();

        let now = self.graph.current_time();
        let one_shots: Vec<NodeId> = self.one_shots.drain().collect();
        for node in &one_shots {
            self.stop_and_disconnect(*node, now);
        }

        info!(voices, one_shots = one_shots.len(), timers, "All voices stopped");
    }

    /// Stops everything and closes the graph.
    pub fn shutdown(&mut self) {
        self.stop_all();
        self.graph.close();
        info!("Voice engine shut down");
    }

    /// Fires due timers and cleans up voices whose sources have ended.
    pub fn process(&mut self) {
        let now = self.graph.current_time();
        for timer in self.timers.take_due(now) {
            self.fire(timer.voice, timer.action, now);
        }

        for node in self.graph.take_ended() {
            if self.one_shots.remove(&node) {
                if let Err(e) = tolerate(self.graph.disconnect(node)) {
                    warn!(%node, error = %e, "Failed to disconnect finished source");
                }
                continue;
            }
            let Some(&handle) = self.nodes.get(&node) else {
                continue;
            };
            let releasing = self
                .voices
                .get(&handle)
                .is_some_and(|v| v.phase >= EnvelopePhase::Release);
            if !releasing {
                debug!(voice = %handle, "Voice reached the end of its buffer");
                self.cleanup_voice(handle);
            }
        }
    }

    fn fire(&mut self, handle: VoiceHandle, action: TimerAction, now: f64) {
        match action {
            TimerAction::PhaseAdvance(phase) => {
                if let Some(voice) = self.voices.get_mut(&handle) {
                    if voice.phase < phase && voice.phase < EnvelopePhase::Release {
                        voice.phase = phase;
                    }
                }
            }
            TimerAction::FadeStep(step) => self.fade_step(handle, step, now),
            TimerAction::FadeTimeout => {
                debug!(voice = %handle, "Fade timed out");
                self.complete_fade(handle, now);
            }
            TimerAction::Cleanup => {
                self.cleanup_voice(handle);
            }
        }
    }

    fn fade_step(&mut self, handle: VoiceHandle, step: u32, now: f64) {
        let Some(voice) = self.voices.get_mut(&handle) else {
            return;
        };
        let Some(fade) = voice.fade.filter(|f| !f.completed) else {
            return;
        };

        let progress = match self.graph.gain_param(voice.node) {
            Ok(gain) => self.scheduler.fade_step(gain, fade.start_gain, step, now),
            Err(e) => {
                self.handle_graph_error(handle, e);
                return;
            }
        };
        match progress {
            FadeProgress::Continue(value) => voice.gain = value,
            FadeProgress::Complete => self.complete_fade(handle, now),
        }
    }

    /// Finishes a stepped fade. Runs at most once per voice, whichever of the last step
    /// and the timeout comes first.
    fn complete_fade(&mut self, handle: VoiceHandle, now: f64) {
        let Some(voice) = self.voices.get_mut(&handle) else {
            return;
        };
        let Some(fade) = voice.fade.as_mut() else {
            return;
        };
        if fade.completed {
            return;
        }
        fade.completed = true;

        let floor = self.scheduler.fade_floor();
        match self.graph.gain_param(voice.node) {
            Ok(gain) => {
                gain.set_value_at_time(floor, now);
                voice.gain = floor;
            }
            Err(e) => {
                self.handle_graph_error(handle, e);
                return;
            }
        }

        self.timers.cancel_voice(handle);
        self.timers.schedule(
            handle,
            now + self.settings.safety_delay,
            TimerAction::Cleanup,
        );
        self.stats.fades_completed += 1;
        debug!(voice = %handle, "Fade complete");
    }

    fn handle_graph_error(&mut self, handle: VoiceHandle, error: GraphError) {
        if error.is_expected_race() {
            debug!(voice = %handle, error = %error, "Ignoring graph race");
            return;
        }
        warn!(voice = %handle, error = %error, "Graph error, cleaning up voice");
        self.cleanup_voice(handle);
    }

    /// Stops, disconnects and forgets a voice. Returns false if it was already gone.
    fn cleanup_voice(&mut self, handle: VoiceHandle) -> bool {
        self.timers.cancel_voice(handle);
        let Some(mut voice) = self.voices.remove(&handle) else {
            return false;
        };
        voice.phase = EnvelopePhase::Finished;
        self.nodes.remove(&voice.node);
        if self.last_triggered == Some(handle) {
            self.last_triggered = None;
        }

        let now = self.graph.current_time();
        self.stop_and_disconnect(voice.node, now);
        self.stats.voices_cleaned_up += 1;
        debug!(voice = %handle, note = %voice.note, "Voice cleaned up");
        true
    }

    fn cleanup_all(&mut self) {
        let handles: Vec<VoiceHandle> = self.voices.keys().copied().collect();
        for handle in handles {
            self.cleanup_voice(handle);
        }
    }

    fn stop_and_disconnect(&mut self, node: NodeId, now: f64) {
        match self.graph.stop(node, now) {
            Ok(()) | Err(GraphError::NotStarted(_)) => {}
            Err(e) if e.is_expected_race() => {}
            Err(e) => warn!(%node, error = %e, "Failed to stop source"),
        }
        if let Err(e) = tolerate(self.graph.disconnect(node)) {
            warn!(%node, error = %e, "Failed to disconnect source");
        }
    }

    /// Tears down a source that never became a voice.
    fn release_node(&mut self, node: NodeId) {
        let now = self.graph.current_time();
        self.stop_and_disconnect(node, now);
    }
}

impl VoiceEngine<OfflineGraph> {
    /// Renders `frames` frames of stereo output, processing timers every
    /// [`RENDER_QUANTUM`] frames.
    pub fn render(&mut self, frames: usize) -> Result<AudioBuffer, EngineError> {
        let mut left = Vec::with_capacity(frames);
        let mut right = Vec::with_capacity(frames);

        let mut remaining = frames;
        while remaining > 0 {
            let quantum = remaining.min(RENDER_QUANTUM);
            let block = self.graph.render(quantum)?;
            for (output, channel) in [&mut left, &mut right].into_iter().zip(block.channels()) {
                output.extend_from_slice(channel);
            }
            self.process();
            remaining -= quantum;
        }

        let sample_rate = self.graph.sample_rate();
        Ok(AudioBuffer::new(vec![left, right], sample_rate).map_err(GraphError::from)?)
    }

    /// Renders `seconds` of output.
    pub fn render_seconds(&mut self, seconds: f64) -> Result<AudioBuffer, EngineError> {
        let frames = (seconds.max(0.0) * self.graph.sample_rate() as f64).round() as usize;
        self.render(frames)
    }
}

impl<G: AudioGraph> fmt::Debug for VoiceEngine<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceEngine")
            .field("scheduler", &self.scheduler.kind())
            .field("voices", &self.voices.len())
            .field("one_shots", &self.one_shots.len())
            .field("timers", &self.timers.len())
            .field("stats", &self.stats)
            .finish()
    }
}
