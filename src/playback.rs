// Playback scheduling: turns the timeline plus a tempo into timed engine
// commands. Three kinds of scope can play at once with no mutual
// exclusion: the full mix, any number of single tracks, and the one-shot
// insert used to audition a fresh recording.
//
// The scheduler never talks to the engine itself; every method returns
// the commands for the caller to send (and is therefore testable without
// an audio device). Auto-stop is an explicit deadline checked from the
// tick, cleared whenever a scope stops early; no timer can race the
// state flags.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::engine_api::{EngineCommand, PlayParams, VoiceId, next_voice_id};
use crate::model::{AudioAsset, TimelineModel, Track};
use crate::notice::PlaybackError;

/// Extra wall-clock slack on single-track deadlines, so scheduling jitter
/// can't cut the tail off the last event.
pub const TRACK_STOP_GRACE: Duration = Duration::from_millis(250);

/// Cadence of the cosmetic playhead readout.
pub const POSITION_SAMPLE_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct Scope {
    playing: bool,
    handles: Vec<VoiceId>,
    deadline: Option<Instant>,
}

/// Translate one track's events into play commands. An event at model
/// time `t` starts `t / multiplier` seconds out (faster tempo compresses
/// wall-clock starts) and plays at `multiplier` rate; its gain is the
/// event volume through the track volume. Commands are emitted in the
/// track's sequence order; sounding order is governed by the computed
/// start times alone.
pub fn schedule_events(
    track: &Track,
    multiplier: f32,
    sample_rate: u32,
) -> (Vec<EngineCommand>, Vec<VoiceId>) {
    let mut cmds = Vec::with_capacity(track.events.len());
    let mut handles = Vec::with_capacity(track.events.len());
    for ev in &track.events {
        let id = next_voice_id();
        let delay_frames = (ev.start_secs / multiplier * sample_rate as f32) as u64;
        cmds.push(EngineCommand::Play(PlayParams {
            voice: id,
            asset: Arc::clone(&ev.asset),
            delay_frames,
            rate: multiplier,
            gain: ev.volume * track.volume,
            looping: track.looping,
        }));
        handles.push(id);
    }
    (cmds, handles)
}

pub struct Scheduler {
    sample_rate: u32,
    mix: Scope,
    insert: Scope,
    // playhead state, valid while the mix scope plays
    mix_started: Option<Instant>,
    mix_multiplier: f32,
    mix_total_secs: f32,
    position_secs: f32,
    last_position_sample: Option<Instant>,
}

impl Scheduler {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            mix: Scope::default(),
            insert: Scope::default(),
            mix_started: None,
            mix_multiplier: 1.0,
            mix_total_secs: 0.0,
            position_secs: 0.0,
            last_position_sample: None,
        }
    }

    pub fn mix_playing(&self) -> bool {
        self.mix.playing
    }

    /// Fractional playhead in [0, total duration], present while the mix
    /// plays. Cosmetic; sampled on a fixed cadence from `tick`.
    pub fn position_secs(&self) -> Option<f32> {
        self.mix.playing.then_some(self.position_secs)
    }

    /// Start the full mix, or stop it if it is already playing.
    pub fn toggle_mix(
        &mut self,
        model: &TimelineModel,
        now: Instant,
    ) -> Result<Vec<EngineCommand>, PlaybackError> {
        if self.mix.playing {
            return Ok(self.stop_mix());
        }

        let multiplier = model.tempo_multiplier();
        let mut cmds = Vec::new();
        let mut handles = Vec::new();
        let mut any_loop = false;
        for track in model.tracks() {
            // muted tracks are excluded entirely: no voices, no time
            if track.muted {
                continue;
            }
            let (mut track_cmds, mut track_handles) =
                schedule_events(track, multiplier, self.sample_rate);
            cmds.append(&mut track_cmds);
            handles.append(&mut track_handles);
            if track.looping && !track.events.is_empty() {
                any_loop = true;
            }
        }
        if handles.is_empty() {
            return Err(PlaybackError::EmptyMix);
        }

        let total = model.total_duration();
        self.mix.playing = true;
        self.mix.handles = handles;
        // a looping scope repeats until told to stop
        self.mix.deadline =
            (!any_loop).then(|| now + Duration::from_secs_f32(total / multiplier));
        self.mix_started = Some(now);
        self.mix_multiplier = multiplier;
        self.mix_total_secs = total;
        self.position_secs = 0.0;
        self.last_position_sample = Some(now);
        tracing::debug!(voices = self.mix.handles.len(), multiplier, "mix started");
        Ok(cmds)
    }

    pub fn stop_mix(&mut self) -> Vec<EngineCommand> {
        let cmds = drain_scope(&mut self.mix);
        if !cmds.is_empty() {
            tracing::debug!("mix stopped");
        }
        self.mix_started = None;
        self.last_position_sample = None;
        cmds
    }

    /// Start one track's events by themselves, or stop that track's scope
    /// if it is already playing. Runs concurrently with the mix scope.
    pub fn toggle_track(
        &mut self,
        model: &mut TimelineModel,
        index: usize,
        now: Instant,
    ) -> Result<Vec<EngineCommand>, PlaybackError> {
        let duration = model.track_duration(index);
        let multiplier = model.tempo_multiplier();
        let sample_rate = self.sample_rate;

        // a missing track is a benign race with UI mutation
        let Some(track) = model.track_mut(index) else {
            return Ok(Vec::new());
        };

        if track.runtime.playing {
            return Ok(stop_track_runtime(track));
        }
        if track.events.is_empty() {
            return Err(PlaybackError::EmptyTrack { idx: index });
        }
        if track.muted {
            return Ok(Vec::new());
        }

        let (cmds, handles) = schedule_events(track, multiplier, sample_rate);
        track.runtime.playing = true;
        track.runtime.handles = handles;
        track.runtime.deadline = (!track.looping)
            .then(|| now + Duration::from_secs_f32(duration / multiplier) + TRACK_STOP_GRACE);
        tracing::debug!(track = index, voices = cmds.len(), "track started");
        Ok(cmds)
    }

    pub fn stop_track(&mut self, model: &mut TimelineModel, index: usize) -> Vec<EngineCommand> {
        model
            .track_mut(index)
            .map(stop_track_runtime)
            .unwrap_or_default()
    }

    /// One-shot audition of a freshly recorded asset; plays immediately at
    /// the asset's own rate.
    pub fn play_insert(&mut self, asset: &Arc<AudioAsset>, now: Instant) -> Vec<EngineCommand> {
        let mut cmds = drain_scope(&mut self.insert);
        let id = next_voice_id();
        cmds.push(EngineCommand::Play(PlayParams {
            voice: id,
            asset: Arc::clone(asset),
            delay_frames: 0,
            rate: 1.0,
            gain: 1.0,
            looping: false,
        }));
        self.insert.playing = true;
        self.insert.handles.push(id);
        self.insert.deadline =
            Some(now + Duration::from_secs_f32(asset.duration_secs) + TRACK_STOP_GRACE);
        cmds
    }

    /// Forcibly idle every scope. One engine-side StopAll covers the
    /// voices; handle lists and flags are cleared here.
    pub fn stop_all(&mut self, model: &mut TimelineModel) -> Vec<EngineCommand> {
        self.mix = Scope::default();
        self.insert = Scope::default();
        self.mix_started = None;
        self.last_position_sample = None;
        for i in 0..model.track_count() {
            if let Some(track) = model.track_mut(i) {
                track.runtime.playing = false;
                track.runtime.handles.clear();
                track.runtime.deadline = None;
            }
        }
        tracing::debug!("all scopes stopped");
        vec![EngineCommand::StopAll]
    }

    /// Single-thread heartbeat: expires deadlines and samples the
    /// playhead. Returns the stop commands for any scope whose end time
    /// has elapsed.
    pub fn tick(&mut self, model: &mut TimelineModel, now: Instant) -> Vec<EngineCommand> {
        let mut cmds = Vec::new();

        if self.mix.playing {
            if let Some(started) = self.mix_started {
                let due = self
                    .last_position_sample
                    .is_none_or(|last| now.duration_since(last) >= POSITION_SAMPLE_INTERVAL);
                if due {
                    let elapsed = now.duration_since(started).as_secs_f32();
                    self.position_secs =
                        (elapsed * self.mix_multiplier).clamp(0.0, self.mix_total_secs);
                    self.last_position_sample = Some(now);
                }
            }
            if self.mix.deadline.is_some_and(|d| now >= d) {
                cmds.extend(self.stop_mix());
            }
        }

        if self.insert.playing && self.insert.deadline.is_some_and(|d| now >= d) {
            cmds.extend(drain_scope(&mut self.insert));
        }

        for i in 0..model.track_count() {
            let Some(track) = model.track_mut(i) else { continue };
            if track.runtime.playing && track.runtime.deadline.is_some_and(|d| now >= d) {
                cmds.extend(stop_track_runtime(track));
            }
        }

        cmds
    }
}

fn drain_scope(scope: &mut Scope) -> Vec<EngineCommand> {
    scope.playing = false;
    scope.deadline = None;
    scope.handles.drain(..).map(EngineCommand::Stop).collect()
}

fn stop_track_runtime(track: &mut Track) -> Vec<EngineCommand> {
    track.runtime.playing = false;
    track.runtime.deadline = None;
    track
        .runtime
        .handles
        .drain(..)
        .map(EngineCommand::Stop)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::StereoFrame;
    use crate::model::SampleEvent;

    const RATE: u32 = 44_100;

    fn asset(duration_secs: f32) -> Arc<AudioAsset> {
        let frames = vec![StereoFrame::zero(); (duration_secs * RATE as f32) as usize];
        Arc::new(AudioAsset::from_frames(frames, RATE))
    }

    fn event(start: f32, duration: f32, volume: f32) -> SampleEvent {
        let mut ev = SampleEvent::new("kick", asset(duration), start);
        ev.duration_secs = duration;
        ev.volume = volume;
        ev
    }

    fn play_params(cmds: &[EngineCommand]) -> Vec<&PlayParams> {
        cmds.iter()
            .filter_map(|c| match c {
                EngineCommand::Play(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn base_tempo_schedules_at_raw_model_time() {
        let mut track = Track::default();
        track.events.push(event(2.0, 0.5, 1.0));
        let (cmds, _) = schedule_events(&track, 1.0, RATE);
        let plays = play_params(&cmds);
        assert_eq!(plays[0].delay_frames, 2 * RATE as u64);
        assert_eq!(plays[0].rate, 1.0);
    }

    #[test]
    fn double_tempo_halves_start_and_doubles_rate() {
        // 240 BPM against the 120 baseline: multiplier 2
        let mut track = Track::default();
        track.events.push(event(4.0, 1.0, 1.0));
        let (cmds, _) = schedule_events(&track, 2.0, RATE);
        let plays = play_params(&cmds);
        assert_eq!(plays[0].delay_frames, 2 * RATE as u64);
        assert_eq!(plays[0].rate, 2.0);
    }

    #[test]
    fn gain_is_event_volume_through_track_volume() {
        let mut track = Track::default();
        track.volume = 0.5;
        track.events.push(event(0.0, 0.5, 0.4));
        let (cmds, _) = schedule_events(&track, 1.0, RATE);
        assert!((play_params(&cmds)[0].gain - 0.2).abs() < 1e-6);
    }

    #[test]
    fn muted_tracks_contribute_no_operations() {
        let mut model = TimelineModel::new();
        model.add_track();
        model.add_event(0, event(0.0, 0.5, 1.0));
        model.add_event(1, event(0.0, 0.5, 1.0));
        model.track_mut(0).unwrap().muted = true;

        let mut sched = Scheduler::new(RATE);
        let cmds = sched.toggle_mix(&model, Instant::now()).unwrap();
        assert_eq!(play_params(&cmds).len(), 1);
    }

    #[test]
    fn empty_mix_refuses_to_start() {
        let model = TimelineModel::new();
        let mut sched = Scheduler::new(RATE);
        let err = sched.toggle_mix(&model, Instant::now()).unwrap_err();
        assert_eq!(err, PlaybackError::EmptyMix);
        assert!(!sched.mix_playing());
    }

    #[test]
    fn empty_track_refuses_to_start() {
        let mut model = TimelineModel::new();
        let mut sched = Scheduler::new(RATE);
        let err = sched
            .toggle_track(&mut model, 0, Instant::now())
            .unwrap_err();
        assert_eq!(err, PlaybackError::EmptyTrack { idx: 0 });
        assert!(!model.track(0).unwrap().runtime.playing);
    }

    #[test]
    fn second_press_stops_the_mix() {
        let mut model = TimelineModel::new();
        model.add_event(0, event(0.0, 0.5, 1.0));
        let mut sched = Scheduler::new(RATE);
        let now = Instant::now();

        let started = sched.toggle_mix(&model, now).unwrap();
        assert_eq!(play_params(&started).len(), 1);
        assert!(sched.mix_playing());

        let stopped = sched.toggle_mix(&model, now).unwrap();
        assert!(!sched.mix_playing());
        assert!(matches!(stopped[0], EngineCommand::Stop(_)));
    }

    #[test]
    fn mix_and_track_scopes_run_concurrently() {
        let mut model = TimelineModel::new();
        model.add_event(0, event(0.0, 0.5, 1.0));
        let mut sched = Scheduler::new(RATE);
        let now = Instant::now();

        sched.toggle_mix(&model, now).unwrap();
        sched.toggle_track(&mut model, 0, now).unwrap();
        assert!(sched.mix_playing());
        assert!(model.track(0).unwrap().runtime.playing);
    }

    #[test]
    fn looping_scope_arms_no_deadline_and_outlives_its_span() {
        let mut model = TimelineModel::new();
        model.add_event(0, event(0.0, 0.5, 1.0));
        model.track_mut(0).unwrap().looping = true;
        let mut sched = Scheduler::new(RATE);
        let now = Instant::now();

        sched.toggle_mix(&model, now).unwrap();
        let plays = sched.toggle_track(&mut model, 0, now);
        assert!(plays.is_ok());

        // well past the 10 s span: nothing auto-stops
        let later = now + Duration::from_secs(60);
        let cmds = sched.tick(&mut model, later);
        assert!(cmds.is_empty());
        assert!(sched.mix_playing());
        assert!(model.track(0).unwrap().runtime.playing);
    }

    #[test]
    fn stop_all_idles_every_scope_and_clears_handles() {
        let mut model = TimelineModel::new();
        model.add_track();
        model.add_event(0, event(0.0, 0.5, 1.0));
        model.add_event(1, event(0.0, 0.5, 1.0));
        model.track_mut(0).unwrap().looping = true;
        let mut sched = Scheduler::new(RATE);
        let now = Instant::now();

        sched.toggle_mix(&model, now).unwrap();
        sched.toggle_track(&mut model, 0, now).unwrap();
        sched.toggle_track(&mut model, 1, now).unwrap();

        let cmds = sched.stop_all(&mut model);
        assert!(matches!(cmds[..], [EngineCommand::StopAll]));
        assert!(!sched.mix_playing());
        for track in model.tracks() {
            assert!(!track.runtime.playing);
            assert!(track.runtime.handles.is_empty());
        }
    }

    #[test]
    fn mix_auto_stops_when_its_span_elapses() {
        let mut model = TimelineModel::new();
        model.add_event(0, event(0.0, 0.5, 1.0));
        let mut sched = Scheduler::new(RATE);
        let now = Instant::now();

        sched.toggle_mix(&model, now).unwrap();
        // span is the 10 s floor at multiplier 1
        assert!(sched.tick(&mut model, now + Duration::from_secs(9)).is_empty());
        let cmds = sched.tick(&mut model, now + Duration::from_secs(11));
        assert!(!cmds.is_empty());
        assert!(!sched.mix_playing());
    }

    #[test]
    fn track_auto_stop_includes_the_grace_margin() {
        let mut model = TimelineModel::new();
        model.add_event(0, event(0.0, 2.0, 1.0));
        let mut sched = Scheduler::new(RATE);
        let now = Instant::now();

        sched.toggle_track(&mut model, 0, now).unwrap();
        // 2 s of content: still inside the grace window just after 2 s
        assert!(
            sched
                .tick(&mut model, now + Duration::from_millis(2100))
                .is_empty()
        );
        let cmds = sched.tick(&mut model, now + Duration::from_millis(2300));
        assert!(!cmds.is_empty());
        assert!(!model.track(0).unwrap().runtime.playing);
    }

    #[test]
    fn faster_tempo_compresses_the_mix_deadline() {
        let mut model = TimelineModel::new();
        model.add_event(0, event(0.0, 0.5, 1.0));
        model.set_tempo(180); // multiplier 1.5, span 10 s -> ~6.67 s
        let mut sched = Scheduler::new(RATE);
        let now = Instant::now();

        sched.toggle_mix(&model, now).unwrap();
        assert!(sched.tick(&mut model, now + Duration::from_secs(6)).is_empty());
        let cmds = sched.tick(&mut model, now + Duration::from_secs(7));
        assert!(!cmds.is_empty());
    }

    #[test]
    fn playhead_tracks_scaled_elapsed_time() {
        let mut model = TimelineModel::new();
        model.add_event(0, event(0.0, 0.5, 1.0));
        model.set_tempo(180);
        let mut sched = Scheduler::new(RATE);
        let now = Instant::now();

        sched.toggle_mix(&model, now).unwrap();
        sched.tick(&mut model, now + Duration::from_secs(2));
        let pos = sched.position_secs().unwrap();
        assert!((pos - 3.0).abs() < 0.01, "expected ~3.0, got {pos}");
    }

    #[test]
    fn toggle_on_a_missing_track_is_a_silent_no_op() {
        let mut model = TimelineModel::new();
        let mut sched = Scheduler::new(RATE);
        let cmds = sched.toggle_track(&mut model, 9, Instant::now()).unwrap();
        assert!(cmds.is_empty());
    }

    #[test]
    fn insert_scope_auditions_once_and_expires() {
        let mut model = TimelineModel::new();
        let mut sched = Scheduler::new(RATE);
        let now = Instant::now();
        let rec = asset(1.0);

        let cmds = sched.play_insert(&rec, now);
        assert_eq!(play_params(&cmds).len(), 1);
        assert_eq!(play_params(&cmds)[0].rate, 1.0);

        let cmds = sched.tick(&mut model, now + Duration::from_secs(2));
        assert!(cmds.iter().any(|c| matches!(c, EngineCommand::Stop(_))));
    }
}
