// The timeline: tracks holding placed sample events, plus tempo and
// selection. Everything here is plain owned state mutated from the UI
// thread; the engine only ever sees Arc<AudioAsset> references.

use std::sync::Arc;
use std::time::Instant;

use crate::audio::StereoFrame;
use crate::engine_api::VoiceId;

pub const MIN_TIMELINE_SECS: f32 = 10.0;
pub const MIN_TRACK_SECS: f32 = 1.0;

pub const MIN_TEMPO: u32 = 60;
pub const MAX_TEMPO: u32 = 200;
pub const BASE_TEMPO: u32 = 120;

/// Decoded, immutable audio. Created once per distinct name per session and
/// shared by reference from every event that uses it.
#[derive(Clone, Debug)]
pub struct AudioAsset {
    pub frames: Vec<StereoFrame>,
    pub sample_rate: u32,
    pub duration_secs: f32,
}

impl AudioAsset {
    pub fn from_frames(frames: Vec<StereoFrame>, sample_rate: u32) -> Self {
        let duration_secs = frames.len() as f32 / sample_rate as f32;
        Self { frames, sample_rate, duration_secs }
    }
}

/// One placement of an asset at a time offset within a track.
#[derive(Clone, Debug)]
pub struct SampleEvent {
    pub asset: Arc<AudioAsset>,
    pub name: String,
    pub start_secs: f32,
    pub duration_secs: f32,
    pub volume: f32,
}

impl SampleEvent {
    /// Duration defaults to the asset's own length (decoded length for
    /// recordings, nominal length for synthesized samples).
    pub fn new(name: impl Into<String>, asset: Arc<AudioAsset>, start_secs: f32) -> Self {
        let duration_secs = asset.duration_secs;
        Self {
            asset,
            name: name.into(),
            start_secs: start_secs.max(0.0),
            duration_secs,
            volume: 1.0,
        }
    }

    pub fn end_secs(&self) -> f32 {
        self.start_secs + self.duration_secs
    }
}

/// Playback state that only exists while voices are in flight. Never
/// persisted; travels with the track if the list shifts around it.
#[derive(Debug, Default)]
pub struct TrackRuntime {
    pub playing: bool,
    pub handles: Vec<VoiceId>,
    /// Auto-stop time for this track's solo-scope playback. None while a
    /// looping scope runs (loops never stop on their own).
    pub deadline: Option<Instant>,
}

#[derive(Debug)]
pub struct Track {
    /// Insertion order, not time order; events may interleave arbitrarily.
    pub events: Vec<SampleEvent>,
    pub volume: f32,
    pub muted: bool,
    /// Carried in the model but not consulted by playback.
    pub solo: bool,
    pub looping: bool,
    pub runtime: TrackRuntime,
}

impl Default for Track {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            volume: 1.0,
            muted: false,
            solo: false,
            looping: false,
            runtime: TrackRuntime::default(),
        }
    }
}

impl Track {
    /// Furthest event end on this track, floored at one second.
    pub fn duration_secs(&self) -> f32 {
        self.events
            .iter()
            .map(SampleEvent::end_secs)
            .fold(MIN_TRACK_SECS, f32::max)
    }
}

#[derive(Debug)]
pub struct TimelineModel {
    tracks: Vec<Track>,
    selected: Option<usize>,
    tempo_bpm: u32,
}

impl Default for TimelineModel {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineModel {
    /// A fresh project always starts with one empty track selected.
    pub fn new() -> Self {
        Self {
            tracks: vec![Track::default()],
            selected: Some(0),
            tempo_bpm: BASE_TEMPO,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn track_mut(&mut self, index: usize) -> Option<&mut Track> {
        self.tracks.get_mut(index)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn select(&mut self, index: usize) {
        if index < self.tracks.len() {
            self.selected = Some(index);
        }
    }

    pub fn select_prev(&mut self) {
        let cur = self.selected.unwrap_or(0);
        self.selected = Some(cur.saturating_sub(1));
    }

    pub fn select_next(&mut self) {
        let cur = self.selected.unwrap_or(0);
        self.selected = Some((cur + 1).min(self.tracks.len() - 1));
    }

    pub fn tempo_bpm(&self) -> u32 {
        self.tempo_bpm
    }

    pub fn set_tempo(&mut self, bpm: u32) {
        self.tempo_bpm = bpm.clamp(MIN_TEMPO, MAX_TEMPO);
    }

    pub fn adjust_tempo(&mut self, delta: i32) {
        let bpm = (self.tempo_bpm as i32 + delta).max(0) as u32;
        self.set_tempo(bpm);
    }

    /// Ratio of the active tempo to the 120 BPM baseline. Scales playback
    /// rate up and wall-clock start offsets down.
    pub fn tempo_multiplier(&self) -> f32 {
        self.tempo_bpm as f32 / BASE_TEMPO as f32
    }

    /// Appends an empty track and returns its index.
    pub fn add_track(&mut self) -> usize {
        self.tracks.push(Track::default());
        self.tracks.len() - 1
    }

    /// Refused (returns None) for the last remaining track or a bad index.
    /// The caller must stop any playback on the track before removal.
    pub fn remove_track(&mut self, index: usize) -> Option<Track> {
        if self.tracks.len() <= 1 || index >= self.tracks.len() {
            return None;
        }
        let removed = self.tracks.remove(index);
        // re-clamp selection against the shrunk list
        if let Some(sel) = self.selected {
            self.selected = Some(sel.min(self.tracks.len() - 1));
        }
        Some(removed)
    }

    pub fn add_event(&mut self, track: usize, event: SampleEvent) -> bool {
        match self.tracks.get_mut(track) {
            Some(t) => {
                t.events.push(event);
                true
            }
            None => false,
        }
    }

    /// Silent no-op when either index is out of range.
    pub fn remove_event(&mut self, track: usize, event: usize) -> Option<SampleEvent> {
        let t = self.tracks.get_mut(track)?;
        if event >= t.events.len() {
            return None;
        }
        Some(t.events.remove(event))
    }

    /// Transfers an event between tracks as one update; no reader can see it
    /// removed from the source but not yet in the destination. Same-track
    /// moves are just an offset mutation.
    pub fn move_event(
        &mut self,
        src_track: usize,
        event: usize,
        dst_track: usize,
        new_start_secs: f32,
    ) -> bool {
        if src_track == dst_track {
            let Some(ev) = self
                .tracks
                .get_mut(src_track)
                .and_then(|t| t.events.get_mut(event))
            else {
                return false;
            };
            ev.start_secs = new_start_secs.max(0.0);
            return true;
        }
        // validate both ends before touching anything
        if dst_track >= self.tracks.len() {
            return false;
        }
        let valid_src = self
            .tracks
            .get(src_track)
            .is_some_and(|t| event < t.events.len());
        if !valid_src {
            return false;
        }
        let mut ev = self.tracks[src_track].events.remove(event);
        ev.start_secs = new_start_secs.max(0.0);
        self.tracks[dst_track].events.push(ev);
        true
    }

    /// Furthest event end across all tracks, floored at the minimum span.
    pub fn total_duration(&self) -> f32 {
        self.tracks
            .iter()
            .flat_map(|t| t.events.iter())
            .map(SampleEvent::end_secs)
            .fold(MIN_TIMELINE_SECS, f32::max)
    }

    pub fn track_duration(&self, index: usize) -> f32 {
        self.track(index).map_or(MIN_TRACK_SECS, Track::duration_secs)
    }

    /// Destructive reset back to a single empty track. Tempo survives.
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.tracks.push(Track::default());
        self.selected = Some(0);
    }
}
