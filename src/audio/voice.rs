use std::sync::Arc;

use crate::engine_api::PlayParams;
use crate::model::AudioAsset;

use super::frame::StereoFrame;

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// One in-flight playback of an asset: waits out its start delay, then
/// reads through the buffer at `rate` with linear interpolation, summing
/// into the output at `gain`. Looping voices wrap; everything else dies
/// at the buffer end.
pub struct Voice {
    id: crate::engine_api::VoiceId,
    asset: Arc<AudioAsset>,
    pos: f64,
    rate: f32,
    gain: f32,
    looping: bool,
    delay: u64,
    active: bool,
}

impl Voice {
    pub fn new(params: PlayParams) -> Self {
        let active = !params.asset.frames.is_empty();
        Self {
            id: params.voice,
            asset: params.asset,
            pos: 0.0,
            rate: params.rate.max(0.0),
            gain: params.gain,
            looping: params.looping,
            delay: params.delay_frames,
            active,
        }
    }

    pub fn id(&self) -> crate::engine_api::VoiceId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Idempotent; stopping a finished voice does nothing.
    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn render_into(&mut self, out: &mut [StereoFrame]) {
        if !self.active {
            return;
        }
        let data = &self.asset.frames;
        let len = data.len();

        for frame in out.iter_mut() {
            if self.delay > 0 {
                self.delay -= 1;
                continue;
            }
            if self.pos >= len as f64 {
                if self.looping && len > 0 {
                    self.pos -= len as f64;
                } else {
                    self.active = false;
                    break;
                }
            }

            let i = self.pos as usize;
            let frac = (self.pos - i as f64) as f32;
            let s0 = data[i];
            let s1 = data.get(i + 1).copied().unwrap_or(s0);

            frame.left += lerp(s0.left, s1.left, frac) * self.gain;
            frame.right += lerp(s0.right, s1.right, frac) * self.gain;

            self.pos += self.rate as f64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_api::next_voice_id;
    use crate::model::AudioAsset;

    fn params(frames: Vec<StereoFrame>, delay: u64, rate: f32, looping: bool) -> PlayParams {
        PlayParams {
            voice: next_voice_id(),
            asset: Arc::new(AudioAsset::from_frames(frames, 100)),
            delay_frames: delay,
            rate,
            gain: 1.0,
            looping,
        }
    }

    #[test]
    fn delay_silences_the_start() {
        let frames = vec![StereoFrame::mono(0.5); 4];
        let mut voice = Voice::new(params(frames, 3, 1.0, false));
        let mut out = vec![StereoFrame::zero(); 8];
        voice.render_into(&mut out);
        assert_eq!(out[0], StereoFrame::zero());
        assert_eq!(out[2], StereoFrame::zero());
        assert_eq!(out[3], StereoFrame::mono(0.5));
        assert!(!voice.is_active());
    }

    #[test]
    fn double_rate_reads_twice_as_fast() {
        let frames = vec![StereoFrame::mono(1.0); 8];
        let mut voice = Voice::new(params(frames, 0, 2.0, false));
        let mut out = vec![StereoFrame::zero(); 8];
        voice.render_into(&mut out);
        // 8 source frames consumed in 4 output frames
        assert_eq!(out[3], StereoFrame::mono(1.0));
        assert_eq!(out[4], StereoFrame::zero());
        assert!(!voice.is_active());
    }

    #[test]
    fn looping_voice_survives_the_buffer_end() {
        let frames = vec![StereoFrame::mono(0.25); 4];
        let mut voice = Voice::new(params(frames, 0, 1.0, true));
        let mut out = vec![StereoFrame::zero(); 64];
        voice.render_into(&mut out);
        assert!(voice.is_active());
        assert_eq!(out[63], StereoFrame::mono(0.25));
    }

    #[test]
    fn stop_is_idempotent() {
        let frames = vec![StereoFrame::mono(0.25); 4];
        let mut voice = Voice::new(params(frames, 0, 1.0, false));
        voice.stop();
        voice.stop();
        assert!(!voice.is_active());
    }

    #[test]
    fn empty_asset_never_activates() {
        let voice = Voice::new(params(Vec::new(), 0, 1.0, true));
        assert!(!voice.is_active());
    }
}
