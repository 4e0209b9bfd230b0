// The coordinator between the front end, the timeline, the scheduler,
// and the engine. Handles one semantic action at a time and returns the
// engine commands it produced; main sends them. All state mutation
// happens here on the UI thread.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::audio::CompletedRecording;
use crate::engine_api::EngineCommand;
use crate::export;
use crate::model::{AudioAsset, SampleEvent, TimelineModel};
use crate::notice::{Notice, RecordError};
use crate::playback::Scheduler;
use crate::provider::{PALETTE, SampleProvider, descriptor};
use crate::session;
use crate::tui::{Action, DisplayState, EventView, TrackView};

const CURSOR_STEP_SECS: f32 = 0.5;
const TEMPO_STEP: i32 = 5;
const VOLUME_STEP: f32 = 0.1;

const RECORDING_COLOR: (u8, u8, u8) = (200, 86, 86);

pub struct App {
    pub model: TimelineModel,
    scheduler: Scheduler,
    provider: SampleProvider,
    project_dir: PathBuf,
    has_input: bool,
    recording: bool,
    cursor_secs: f32,
    next_recording: usize,
    notice: Notice,
    confirm_clear: bool,
}

impl App {
    pub fn new(
        model: TimelineModel,
        provider: SampleProvider,
        project_dir: PathBuf,
        sample_rate: u32,
        has_input: bool,
    ) -> Self {
        Self {
            model,
            scheduler: Scheduler::new(sample_rate),
            provider,
            project_dir,
            has_input,
            recording: false,
            cursor_secs: 0.0,
            next_recording: 0,
            notice: Notice::default(),
            confirm_clear: false,
        }
    }

    pub fn handle(&mut self, action: Action, now: Instant) -> Vec<EngineCommand> {
        // any action other than a second ClearAll cancels the confirmation
        if action != Action::ClearAll {
            self.confirm_clear = false;
        }

        match action {
            Action::TogglePlayMix => match self.scheduler.toggle_mix(&self.model, now) {
                Ok(cmds) => cmds,
                Err(err) => {
                    self.notice.set(err.to_string(), now);
                    Vec::new()
                }
            },
            Action::TogglePlayTrack => {
                let Some(sel) = self.model.selected() else { return Vec::new() };
                match self.scheduler.toggle_track(&mut self.model, sel, now) {
                    Ok(cmds) => cmds,
                    Err(err) => {
                        self.notice.set(err.to_string(), now);
                        Vec::new()
                    }
                }
            }
            Action::ToggleRecord => self.toggle_record(now),
            Action::Export => {
                match export::export_mix(
                    &self.project_dir,
                    &self.model,
                    self.provider.sample_rate(),
                ) {
                    Ok(path) => self.notice.set(format!("exported {}", path.display()), now),
                    Err(err) => {
                        tracing::warn!(%err, "export failed");
                        self.notice.set(format!("export failed: {err}"), now);
                    }
                }
                Vec::new()
            }
            Action::AddTrack => {
                let index = self.model.add_track();
                self.model.select(index);
                Vec::new()
            }
            Action::DeleteTrack => {
                let Some(sel) = self.model.selected() else { return Vec::new() };
                if self.model.track_count() <= 1 {
                    self.notice.set("can't delete the last track", now);
                    return Vec::new();
                }
                // stop only when the removal will actually happen
                let cmds = self.scheduler.stop_track(&mut self.model, sel);
                self.model.remove_track(sel);
                cmds
            }
            Action::SelectPrev => {
                self.model.select_prev();
                Vec::new()
            }
            Action::SelectNext => {
                self.model.select_next();
                Vec::new()
            }
            Action::TempoDown => {
                self.model.adjust_tempo(-TEMPO_STEP);
                Vec::new()
            }
            Action::TempoUp => {
                self.model.adjust_tempo(TEMPO_STEP);
                Vec::new()
            }
            Action::ToggleMute => {
                if let Some(track) = self.selected_track_mut() {
                    track.muted = !track.muted;
                }
                Vec::new()
            }
            Action::ToggleLoop => {
                if let Some(track) = self.selected_track_mut() {
                    track.looping = !track.looping;
                }
                Vec::new()
            }
            Action::VolumeDown => {
                if let Some(track) = self.selected_track_mut() {
                    track.volume = (track.volume - VOLUME_STEP).clamp(0.0, 1.0);
                }
                Vec::new()
            }
            Action::VolumeUp => {
                if let Some(track) = self.selected_track_mut() {
                    track.volume = (track.volume + VOLUME_STEP).clamp(0.0, 1.0);
                }
                Vec::new()
            }
            Action::PlaceSample(slot) => {
                self.place_sample(slot);
                Vec::new()
            }
            Action::CursorLeft => {
                self.cursor_secs = (self.cursor_secs - CURSOR_STEP_SECS).max(0.0);
                Vec::new()
            }
            Action::CursorRight => {
                self.cursor_secs =
                    (self.cursor_secs + CURSOR_STEP_SECS).min(self.model.total_duration());
                Vec::new()
            }
            Action::RemoveAtCursor => {
                self.remove_at_cursor();
                Vec::new()
            }
            Action::NudgeLeft => {
                self.nudge_at_cursor(-CURSOR_STEP_SECS);
                Vec::new()
            }
            Action::NudgeRight => {
                self.nudge_at_cursor(CURSOR_STEP_SECS);
                Vec::new()
            }
            Action::EventVolumeDown => {
                self.adjust_event_volume(-VOLUME_STEP);
                Vec::new()
            }
            Action::EventVolumeUp => {
                self.adjust_event_volume(VOLUME_STEP);
                Vec::new()
            }
            Action::ClearAll => {
                if self.confirm_clear {
                    self.confirm_clear = false;
                    let cmds = self.scheduler.stop_all(&mut self.model);
                    self.model.clear();
                    self.cursor_secs = 0.0;
                    self.notice.set("project cleared", now);
                    cmds
                } else {
                    self.confirm_clear = true;
                    self.notice.set("press c again to clear everything", now);
                    Vec::new()
                }
            }
            Action::Quit => Vec::new(), // main handles shutdown
        }
    }

    /// Heartbeat from the main loop: deadline expiry and playhead updates.
    pub fn tick(&mut self, now: Instant) -> Vec<EngineCommand> {
        self.scheduler.tick(&mut self.model, now)
    }

    fn toggle_record(&mut self, now: Instant) -> Vec<EngineCommand> {
        if !self.has_input {
            self.notice.set(RecordError::NoInputDevice.to_string(), now);
            return Vec::new();
        }
        if self.recording {
            self.recording = false;
            vec![EngineCommand::EndCapture]
        } else {
            self.recording = true;
            self.notice.set("recording... press r to stop", now);
            vec![EngineCommand::BeginCapture]
        }
    }

    /// A finished capture: keep it as a WAV next to the project, register
    /// the asset, drop it on the selected track, and audition it once.
    pub fn on_recording_complete(
        &mut self,
        rec: CompletedRecording,
        now: Instant,
    ) -> Vec<EngineCommand> {
        self.recording = false;
        if rec.frames.is_empty() {
            self.notice.set("nothing captured", now);
            return Vec::new();
        }
        let Some(sel) = self.model.selected() else { return Vec::new() };

        let name = self.next_recording_name();
        let asset = Arc::new(AudioAsset::from_frames(
            rec.frames,
            self.provider.sample_rate(),
        ));

        let wav_path = self.project_dir.join(format!("{name}.wav"));
        if let Err(err) = export::write_wav(&wav_path, &asset.frames, asset.sample_rate) {
            tracing::warn!(%err, "could not save recording wav");
        }
        self.provider.register(name.clone(), Arc::clone(&asset));

        let event = SampleEvent::new(&name, Arc::clone(&asset), 0.0);
        if !self.model.add_event(sel, event) {
            // the track vanished while we were capturing; drop the insert
            return Vec::new();
        }
        self.notice
            .set(format!("{name} added to track {}", sel + 1), now);
        self.scheduler.play_insert(&asset, now)
    }

    fn next_recording_name(&mut self) -> String {
        loop {
            let name = format!("recording-{}", self.next_recording);
            self.next_recording += 1;
            if !self.project_dir.join(format!("{name}.wav")).exists() {
                return name;
            }
        }
    }

    fn place_sample(&mut self, slot: usize) {
        let Some(desc) = PALETTE.get(slot) else { return };
        let Some(sel) = self.model.selected() else { return };
        let asset = self.provider.resolve(desc.name);
        let event = SampleEvent::new(desc.name, asset, self.cursor_secs);
        self.model.add_event(sel, event);
    }

    /// Index of the event whose start is nearest the cursor on the
    /// selected track.
    fn nearest_event_index(&self, track: usize) -> Option<usize> {
        let events = &self.model.track(track)?.events;
        events
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let da = (a.start_secs - self.cursor_secs).abs();
                let db = (b.start_secs - self.cursor_secs).abs();
                da.total_cmp(&db)
            })
            .map(|(i, _)| i)
    }

    /// Silent when the track is empty.
    fn remove_at_cursor(&mut self) {
        let Some(sel) = self.model.selected() else { return };
        if let Some(i) = self.nearest_event_index(sel) {
            self.model.remove_event(sel, i);
        }
    }

    /// Shift the nearest event in time (a same-track move).
    fn nudge_at_cursor(&mut self, delta_secs: f32) {
        let Some(sel) = self.model.selected() else { return };
        let Some(i) = self.nearest_event_index(sel) else { return };
        let Some(ev) = self.model.track(sel).and_then(|t| t.events.get(i)) else { return };
        let new_start = (ev.start_secs + delta_secs).max(0.0);
        self.model.move_event(sel, i, sel, new_start);
    }

    fn adjust_event_volume(&mut self, delta: f32) {
        let Some(sel) = self.model.selected() else { return };
        let Some(i) = self.nearest_event_index(sel) else { return };
        if let Some(ev) = self
            .model
            .track_mut(sel)
            .and_then(|t| t.events.get_mut(i))
        {
            ev.volume = (ev.volume + delta).clamp(0.0, 1.0);
        }
    }

    fn selected_track_mut(&mut self) -> Option<&mut crate::model::Track> {
        let sel = self.model.selected()?;
        self.model.track_mut(sel)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        session::save(&self.project_dir, &self.model)
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn display_state(&self, now: Instant) -> DisplayState {
        DisplayState {
            tempo_bpm: self.model.tempo_bpm(),
            mix_playing: self.scheduler.mix_playing(),
            position_secs: self.scheduler.position_secs(),
            total_secs: self.model.total_duration(),
            recording: self.recording,
            cursor_secs: self.cursor_secs,
            selected: self.model.selected().unwrap_or(0),
            tracks: self
                .model
                .tracks()
                .iter()
                .map(|t| TrackView {
                    volume: t.volume,
                    muted: t.muted,
                    looping: t.looping,
                    playing: t.runtime.playing,
                    events: t
                        .events
                        .iter()
                        .map(|e| EventView {
                            name: e.name.clone(),
                            start_secs: e.start_secs,
                            duration_secs: e.duration_secs,
                            color: descriptor(&e.name)
                                .map(|d| d.color)
                                .unwrap_or(RECORDING_COLOR),
                        })
                        .collect(),
                })
                .collect(),
            notice: self.notice.current(now).map(str::to_string),
            confirm_clear: self.confirm_clear,
        }
    }
}
