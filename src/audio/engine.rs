use crossbeam_channel::{Receiver, Sender};

use crate::engine_api::EngineCommand;

use super::frame::StereoFrame;
use super::voice::Voice;

// hard cap so the voice list never grows inside the audio callback
const MAX_VOICES: usize = 64;

// capture is bounded too; half a minute at 48k is plenty
const MAX_CAPTURE_FRAMES: usize = 48_000 * 30;

/// A finished microphone take, handed back to the UI thread.
#[derive(Clone, Debug)]
pub struct CompletedRecording {
    pub frames: Vec<StereoFrame>,
}

/// The real-time mixer. Lives inside the cpal output callback; all
/// communication in or out goes through channels.
pub struct Engine {
    voices: Vec<Voice>,
    input_rx: Option<Receiver<Vec<StereoFrame>>>,
    completed_tx: Option<Sender<CompletedRecording>>,
    capturing: bool,
    capture_buf: Vec<StereoFrame>,
    dropped_plays: u64,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            voices: Vec::with_capacity(MAX_VOICES),
            input_rx: None,
            completed_tx: None,
            capturing: false,
            capture_buf: Vec::new(),
            dropped_plays: 0,
        }
    }

    pub fn set_input_rx(&mut self, rx: Receiver<Vec<StereoFrame>>) {
        self.input_rx = Some(rx);
    }

    pub fn set_completed_tx(&mut self, tx: Sender<CompletedRecording>) {
        self.completed_tx = Some(tx);
    }

    pub fn handle_cmd(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::Play(params) => {
                // reuse a dead slot before growing toward the cap
                if let Some(slot) = self.voices.iter_mut().position(|v| !v.is_active()) {
                    self.voices[slot] = Voice::new(params);
                } else if self.voices.len() < MAX_VOICES {
                    self.voices.push(Voice::new(params));
                } else {
                    // at the cap: drop the trigger rather than stall
                    self.dropped_plays += 1;
                    tracing::warn!(
                        total = self.dropped_plays,
                        "voice cap reached, play trigger dropped"
                    );
                }
            }
            EngineCommand::Stop(id) => {
                if let Some(v) = self.voices.iter_mut().find(|v| v.id() == id) {
                    v.stop();
                }
                // unknown id: already finished, nothing to do
            }
            EngineCommand::StopAll => {
                for v in &mut self.voices {
                    v.stop();
                }
            }
            EngineCommand::BeginCapture => {
                self.capture_buf.clear();
                self.capturing = true;
            }
            EngineCommand::EndCapture => {
                if self.capturing {
                    self.capturing = false;
                    let frames = std::mem::take(&mut self.capture_buf);
                    if let Some(tx) = &self.completed_tx {
                        let _ = tx.try_send(CompletedRecording { frames });
                    }
                }
            }
        }
    }

    /// Pulls mic frames off the input channel. Always drains so the channel
    /// never backs up; frames are only kept while capturing.
    pub fn drain_input(&mut self) {
        let Some(rx) = &self.input_rx else { return };
        while let Ok(chunk) = rx.try_recv() {
            if self.capturing && self.capture_buf.len() < MAX_CAPTURE_FRAMES {
                self.capture_buf.extend_from_slice(&chunk);
            }
        }
    }

    pub fn dropped_plays(&self) -> u64 {
        self.dropped_plays
    }

    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        for f in out.iter_mut() {
            *f = StereoFrame::zero();
        }
        for v in &mut self.voices {
            v.render_into(out);
        }
    }
}
