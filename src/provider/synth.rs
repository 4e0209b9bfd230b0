// Deterministic voice synthesis, used whenever a sample can't be loaded
// from disk. Each instrument kind maps to one pure render function over
// (name, sample rate); the same inputs always produce the same frames.

use crate::audio::StereoFrame;
use crate::model::AudioAsset;
use crate::provider::{InstrumentKind, SampleDescriptor};

use std::f32::consts::TAU;

/// Render a descriptor into decoded audio at the engine sample rate.
pub fn render(desc: &SampleDescriptor, sample_rate: u32) -> AudioAsset {
    let len = (desc.duration_secs * sample_rate as f32).max(1.0) as usize;
    let dt = 1.0 / sample_rate as f32;
    let mut noise = Xorshift64::from_name(desc.name);
    let mut phase = 0.0f32;

    let mut frames = Vec::with_capacity(len);
    for i in 0..len {
        let t = i as f32 * dt;
        let sample = match desc.kind {
            // descending sine sweep: the classic electronic kick punch
            InstrumentKind::Kick => {
                let freq = 20.0 + 40.0 * (-9.0 * t).exp();
                phase += TAU * freq * dt;
                phase.sin() * (-5.0 * t).exp()
            }
            // tonal body plus noise rattle, more rattle than body
            InstrumentKind::Snare => {
                let body = (TAU * 180.0 * t).sin() * 0.35 * (-12.0 * t).exp();
                let rattle = noise.next_sample() * 0.65 * (-16.0 * t).exp();
                body + rattle
            }
            InstrumentKind::HiHat => noise.next_sample() * (-55.0 * t).exp(),
            InstrumentKind::OpenHat => noise.next_sample() * 0.8 * (-9.0 * t).exp(),
            // three quick bursts then a tail
            InstrumentKind::Clap => {
                let env = if t < 0.03 {
                    (-60.0 * (t % 0.01)).exp()
                } else {
                    (-18.0 * (t - 0.03)).exp()
                };
                noise.next_sample() * 0.9 * env
            }
            InstrumentKind::Crash => noise.next_sample() * 0.9 * (-3.0 * t).exp(),
            InstrumentKind::Tom => {
                let freq = 80.0 + 80.0 * (-10.0 * t).exp();
                phase += TAU * freq * dt;
                phase.sin() * (-8.0 * t).exp()
            }
            // low sine with a quiet octave overtone, slow decay
            InstrumentKind::Bass => {
                let f = (TAU * 55.0 * t).sin() * 0.8 + (TAU * 110.0 * t).sin() * 0.2;
                f * (-0.5 * t).exp()
            }
            // bright harmonic stack
            InstrumentKind::Lead => {
                let f = (TAU * 440.0 * t).sin() * 0.6
                    + (TAU * 880.0 * t).sin() * 0.25
                    + (TAU * 1320.0 * t).sin() * 0.15;
                f * (-1.5 * t).exp()
            }
            // instant attack, quick decay
            InstrumentKind::Pluck => {
                let f = (TAU * 330.0 * t).sin() * 0.75 + (TAU * 660.0 * t).sin() * 0.25;
                f * (-6.0 * t).exp()
            }
            // detuned pair for width, slow attack and long tail
            InstrumentKind::Pad => {
                let attack = (t / 0.3).min(1.0);
                let f = (TAU * 220.0 * t).sin() * 0.4
                    + (TAU * 221.5 * t).sin() * 0.4
                    + (TAU * 330.0 * t).sin() * 0.2;
                f * attack * (-0.8 * t).exp()
            }
            // stepped arpeggio over a major chord, each step decaying
            InstrumentKind::Arp => {
                const STEP_SECS: f32 = 0.125;
                const STEPS: [f32; 4] = [261.63, 329.63, 392.0, 523.25];
                let step = (t / STEP_SECS) as usize % STEPS.len();
                let t_in_step = t % STEP_SECS;
                (TAU * STEPS[step] * t).sin() * (-10.0 * t_in_step).exp() * (-0.6 * t).exp()
            }
        };
        frames.push(StereoFrame::mono(sample.clamp(-1.0, 1.0)));
    }
    AudioAsset::from_frames(frames, sample_rate)
}

/// White noise source seeded from the sample name, so synthesized
/// percussion is reproducible across sessions.
struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    fn from_name(name: &str) -> Self {
        // FNV-1a fold of the name; xorshift needs a nonzero state
        let hash = name
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
                (h ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
            });
        Self { state: hash.max(1) }
    }

    fn next_sample(&mut self) -> f32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        // top 24 bits mapped into [-1, 1]
        (x >> 40) as f32 / 8_388_608.0 - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::PALETTE;

    #[test]
    fn rendering_is_deterministic() {
        for desc in PALETTE.iter() {
            let a = render(desc, 22_050);
            let b = render(desc, 22_050);
            assert_eq!(a.frames, b.frames, "{} differed between renders", desc.name);
        }
    }

    #[test]
    fn output_never_exceeds_unit_amplitude() {
        for desc in PALETTE.iter() {
            let asset = render(desc, 22_050);
            for f in &asset.frames {
                assert!(f.left.abs() <= 1.0 && f.right.abs() <= 1.0);
            }
        }
    }

    #[test]
    fn rendered_length_matches_nominal_duration() {
        let desc = PALETTE.iter().find(|d| d.name == "kick").unwrap();
        let asset = render(desc, 44_100);
        let expected = (desc.duration_secs * 44_100.0) as usize;
        assert_eq!(asset.frames.len(), expected);
        assert!((asset.duration_secs - desc.duration_secs).abs() < 0.001);
    }

    #[test]
    fn different_names_give_different_noise() {
        let mut a = Xorshift64::from_name("hihat");
        let mut b = Xorshift64::from_name("crash");
        let seq_a: Vec<f32> = (0..16).map(|_| a.next_sample()).collect();
        let seq_b: Vec<f32> = (0..16).map(|_| b.next_sample()).collect();
        assert_ne!(seq_a, seq_b);
    }
}
