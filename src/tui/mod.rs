// Shared surface between the front end and the coordinator: semantic
// actions going in, a display snapshot coming out. The view never reads
// the model directly; it renders whatever snapshot it is handed.

pub mod input;
pub mod view;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    // transport
    TogglePlayMix,   // space
    TogglePlayTrack, // p, selected track
    ToggleRecord,    // r
    Export,          // s

    // track list
    AddTrack,    // t
    DeleteTrack, // delete/backspace, selected track
    SelectPrev,  // up
    SelectNext,  // down
    TempoDown,   // left
    TempoUp,     // right

    // selected-track state
    ToggleMute, // m
    ToggleLoop, // l
    VolumeDown, // -
    VolumeUp,   // +/=

    // event placement and editing (nearest event to the cursor)
    PlaceSample(usize), // 1-9, 0: palette slot onto the selected track
    CursorLeft,         // [
    CursorRight,        // ]
    RemoveAtCursor,     // x
    NudgeLeft,          // ,
    NudgeRight,         // .
    EventVolumeDown,    // <
    EventVolumeUp,      // >

    ClearAll, // c, pressed twice
    Quit,     // esc
}

#[derive(Clone, Debug)]
pub struct EventView {
    pub name: String,
    pub start_secs: f32,
    pub duration_secs: f32,
    pub color: (u8, u8, u8),
}

#[derive(Clone, Debug)]
pub struct TrackView {
    pub volume: f32,
    pub muted: bool,
    pub looping: bool,
    pub playing: bool,
    pub events: Vec<EventView>,
}

/// Everything the view needs for one frame.
#[derive(Clone, Debug)]
pub struct DisplayState {
    pub tempo_bpm: u32,
    pub mix_playing: bool,
    pub position_secs: Option<f32>,
    pub total_secs: f32,
    pub recording: bool,
    pub cursor_secs: f32,
    pub selected: usize,
    pub tracks: Vec<TrackView>,
    pub notice: Option<String>,
    pub confirm_clear: bool,
}
