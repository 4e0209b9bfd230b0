// Project persistence: the timeline serialized to JSON under
// <project>/.beatline/project.json. Asset buffers never hit the file;
// events persist their source name and are re-resolved through the
// provider on load, so a missing WAV degrades to synthesis instead of a
// broken project.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::{SampleEvent, TimelineModel};
use crate::provider::SampleProvider;

const BEATLINE_DIR: &str = ".beatline";
const PROJECT_FILE: &str = "project.json";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedEvent {
    pub name: String,
    pub start_secs: f32,
    pub duration_secs: f32,
    pub volume: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedTrack {
    pub volume: f32,
    pub muted: bool,
    pub solo: bool,
    pub looping: bool,
    pub events: Vec<SavedEvent>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedProject {
    pub tempo_bpm: u32,
    pub selected: usize,
    pub tracks: Vec<SavedTrack>,
}

// <project_dir>/.beatline/project.json
fn project_file_path(project_dir: &Path) -> PathBuf {
    project_dir.join(BEATLINE_DIR).join(PROJECT_FILE)
}

pub fn load(project_dir: &Path) -> Option<SavedProject> {
    let path = project_file_path(project_dir);
    let data = std::fs::read_to_string(&path).ok()?;
    serde_json::from_str(&data).ok()
}

// Save the project state to disk, making the directory if needed
pub fn save(project_dir: &Path, model: &TimelineModel) -> anyhow::Result<()> {
    let path = project_file_path(project_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let saved = snapshot(model);
    let json = serde_json::to_string_pretty(&saved)?;
    std::fs::write(&path, json)?;
    Ok(())
}

pub fn snapshot(model: &TimelineModel) -> SavedProject {
    SavedProject {
        tempo_bpm: model.tempo_bpm(),
        selected: model.selected().unwrap_or(0),
        tracks: model
            .tracks()
            .iter()
            .map(|t| SavedTrack {
                volume: t.volume,
                muted: t.muted,
                solo: t.solo,
                looping: t.looping,
                events: t
                    .events
                    .iter()
                    .map(|e| SavedEvent {
                        name: e.name.clone(),
                        start_secs: e.start_secs,
                        duration_secs: e.duration_secs,
                        volume: e.volume,
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// Rebuild a live model, resolving every event's asset by name. Saved
/// durations are kept as-is (recordings keep their decoded length even if
/// the WAV has gone missing and synthesis stands in).
pub fn restore(saved: SavedProject, provider: &mut SampleProvider) -> TimelineModel {
    let mut model = TimelineModel::new();
    model.set_tempo(saved.tempo_bpm);

    for (i, st) in saved.tracks.iter().enumerate() {
        let index = if i == 0 { 0 } else { model.add_track() };
        if let Some(track) = model.track_mut(index) {
            track.volume = st.volume.clamp(0.0, 1.0);
            track.muted = st.muted;
            track.solo = st.solo;
            track.looping = st.looping;
        }
        for se in &st.events {
            let asset = provider.resolve(&se.name);
            let mut ev = SampleEvent::new(se.name.clone(), asset, se.start_secs);
            if se.duration_secs > 0.0 {
                ev.duration_secs = se.duration_secs;
            }
            ev.volume = se.volume.clamp(0.0, 1.0);
            model.add_event(index, ev);
        }
    }
    model.select(saved.selected);
    model
}
