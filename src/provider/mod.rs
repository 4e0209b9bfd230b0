// Resolves sample names to decoded audio. External WAVs win when they
// exist; anything else falls back to deterministic synthesis. Assets are
// memoized per name so every event referencing "kick" shares one buffer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::audio::StereoFrame;
use crate::model::AudioAsset;

pub mod synth;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstrumentKind {
    Kick,
    Snare,
    HiHat,
    OpenHat,
    Clap,
    Tom,
    Crash,
    Bass,
    Lead,
    Pluck,
    Pad,
    Arp,
}

/// Static description of one instrument: lookup key, nominal length,
/// synthesis kind, and the color the timeline draws it with.
#[derive(Clone, Copy, Debug)]
pub struct SampleDescriptor {
    pub name: &'static str,
    pub duration_secs: f32,
    pub kind: InstrumentKind,
    pub color: (u8, u8, u8),
}

pub static PALETTE: [SampleDescriptor; 12] = [
    SampleDescriptor { name: "kick", duration_secs: 0.5, kind: InstrumentKind::Kick, color: (224, 82, 82) },
    SampleDescriptor { name: "snare", duration_secs: 0.4, kind: InstrumentKind::Snare, color: (235, 152, 78) },
    SampleDescriptor { name: "hihat", duration_secs: 0.15, kind: InstrumentKind::HiHat, color: (240, 208, 96) },
    SampleDescriptor { name: "openhat", duration_secs: 0.5, kind: InstrumentKind::OpenHat, color: (201, 222, 85) },
    SampleDescriptor { name: "clap", duration_secs: 0.35, kind: InstrumentKind::Clap, color: (121, 201, 103) },
    SampleDescriptor { name: "tom", duration_secs: 0.45, kind: InstrumentKind::Tom, color: (86, 197, 150) },
    SampleDescriptor { name: "crash", duration_secs: 1.5, kind: InstrumentKind::Crash, color: (88, 182, 214) },
    SampleDescriptor { name: "bass", duration_secs: 1.0, kind: InstrumentKind::Bass, color: (102, 128, 219) },
    SampleDescriptor { name: "lead", duration_secs: 0.8, kind: InstrumentKind::Lead, color: (153, 110, 221) },
    SampleDescriptor { name: "pluck", duration_secs: 0.5, kind: InstrumentKind::Pluck, color: (205, 98, 202) },
    SampleDescriptor { name: "pad", duration_secs: 2.0, kind: InstrumentKind::Pad, color: (221, 100, 150) },
    SampleDescriptor { name: "arp", duration_secs: 1.0, kind: InstrumentKind::Arp, color: (150, 150, 160) },
];

/// Unknown names (stale project files, renamed WAVs) still need a buffer;
/// they synthesize as a short pluck.
const FALLBACK: SampleDescriptor = SampleDescriptor {
    name: "pluck",
    duration_secs: 0.5,
    kind: InstrumentKind::Pluck,
    color: (150, 150, 160),
};

pub fn descriptor(name: &str) -> Option<&'static SampleDescriptor> {
    PALETTE.iter().find(|d| d.name == name)
}

pub struct SampleProvider {
    dir: PathBuf,
    sample_rate: u32,
    cache: HashMap<String, Arc<AudioAsset>>,
}

impl SampleProvider {
    pub fn new(dir: impl Into<PathBuf>, sample_rate: u32) -> Self {
        Self { dir: dir.into(), sample_rate, cache: HashMap::new() }
    }

    /// Name -> shared asset. First call loads `<dir>/<name>.wav` or
    /// synthesizes; repeated calls are a cache hit.
    pub fn resolve(&mut self, name: &str) -> Arc<AudioAsset> {
        if let Some(asset) = self.cache.get(name) {
            return Arc::clone(asset);
        }
        let path = self.dir.join(format!("{name}.wav"));
        let asset = match load_wav(&path, self.sample_rate) {
            Ok(asset) => {
                tracing::debug!(name, path = %path.display(), "loaded sample from disk");
                asset
            }
            Err(err) => {
                // never surfaced; synthesis covers every failure mode
                tracing::debug!(name, %err, "wav load failed, synthesizing");
                let desc = descriptor(name).copied().unwrap_or(FALLBACK);
                synth::render(&desc, self.sample_rate)
            }
        };
        let asset = Arc::new(asset);
        self.cache.insert(name.to_string(), Arc::clone(&asset));
        asset
    }

    /// Registers an already-decoded asset (recordings) under a name so
    /// later resolves hit the cache instead of the disk.
    pub fn register(&mut self, name: impl Into<String>, asset: Arc<AudioAsset>) {
        self.cache.insert(name.into(), asset);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Decode a WAV into stereo frames at the engine rate. Mono is duplicated,
/// extra channels beyond two are dropped, rates are linearly resampled.
fn load_wav(path: &Path, target_rate: u32) -> anyhow::Result<AudioAsset> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("open {}", path.display()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max = (1i32 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|x| x as f32 / max))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let mut frames: Vec<StereoFrame> = if channels == 1 {
        samples.into_iter().map(StereoFrame::mono).collect()
    } else {
        samples
            .chunks_exact(channels)
            .map(|c| StereoFrame { left: c[0], right: c[1] })
            .collect()
    };

    if spec.sample_rate != target_rate {
        frames = resample_linear(&frames, spec.sample_rate, target_rate);
    }

    Ok(AudioAsset::from_frames(frames, target_rate))
}

fn resample_linear(frames: &[StereoFrame], source_rate: u32, target_rate: u32) -> Vec<StereoFrame> {
    if source_rate == target_rate || frames.is_empty() {
        return frames.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (frames.len() as f64 * ratio).ceil() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos.floor() as usize;
        let frac = (src_pos - idx as f64) as f32;
        if idx >= frames.len().saturating_sub(1) {
            out.push(*frames.last().unwrap_or(&StereoFrame::zero()));
        } else {
            let a = frames[idx];
            let b = frames[idx + 1];
            out.push(StereoFrame {
                left: a.left * (1.0 - frac) + b.left * frac,
                right: a.right * (1.0 - frac) + b.right * frac,
            });
        }
    }
    out
}
