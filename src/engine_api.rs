use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::model::AudioAsset;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Handle to one in-flight playback operation inside the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VoiceId(pub u64);

// fancy atomic counter lets us generate unique ids while in threads
pub fn next_voice_id() -> VoiceId {
    VoiceId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

#[derive(Clone, Debug)]
pub struct PlayParams {
    pub voice: VoiceId,
    pub asset: Arc<AudioAsset>,
    /// Engine frames to wait before the first sample sounds.
    pub delay_frames: u64,
    /// Playback rate; 1.0 = the asset's own speed.
    pub rate: f32,
    /// Flattened gain: event volume x track volume.
    pub gain: f32,
    /// Wrap back to the start instead of dying at the end of the asset.
    pub looping: bool,
}

// The engine can't load or synthesize anything itself (that would stall the
// callback), so the caller resolves an asset up front and ships a shared
// reference across the channel.
#[derive(Clone, Debug)]
pub enum EngineCommand {
    Play(PlayParams),
    /// Idempotent; unknown or already-finished voices are a no-op.
    Stop(VoiceId),
    StopAll,
    BeginCapture,
    EndCapture,
}
