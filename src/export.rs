// Offline mix render and WAV encoding. The render mirrors live full-mix
// playback (event gain through track gain, muted tracks skipped) but uses
// untransformed model time: the live tempo multiplier does not apply to
// the exported file. Capacity is a fixed ten seconds; later material is
// truncated.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::audio::StereoFrame;
use crate::model::TimelineModel;

pub const EXPORT_SECS: f32 = 10.0;
pub const EXPORT_FILE: &str = "mix.wav";

/// Mix every unmuted track into a fixed-length stereo buffer at the given
/// rate. Does not mutate the model.
pub fn render_mix(model: &TimelineModel, sample_rate: u32) -> Vec<StereoFrame> {
    let len = (EXPORT_SECS * sample_rate as f32) as usize;
    let mut buf = vec![StereoFrame::zero(); len];

    for track in model.tracks() {
        if track.muted {
            continue;
        }
        for ev in &track.events {
            let gain = ev.volume * track.volume;
            let start = (ev.start_secs * sample_rate as f32) as usize;
            for (i, f) in ev.asset.frames.iter().enumerate() {
                let Some(slot) = buf.get_mut(start + i) else { break };
                slot.left += f.left * gain;
                slot.right += f.right * gain;
            }
        }
    }
    buf
}

/// Standard signed-PCM quantization: clamp, then scale the positive and
/// negative branches to their own full ranges.
pub fn quantize(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s >= 0.0 {
        (s * 0x7FFF as f32) as i16
    } else {
        (s * 0x8000 as f32) as i16
    }
}

/// Write frames as 16-bit little-endian PCM in a RIFF/WAVE container
/// (44-byte header, interleaved stereo).
pub fn write_wav(path: &Path, frames: &[StereoFrame], sample_rate: u32) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("create {}", path.display()))?;
    for f in frames {
        writer.write_sample(quantize(f.left))?;
        writer.write_sample(quantize(f.right))?;
    }
    writer.finalize()?;
    Ok(())
}

/// Render the timeline and write `<dir>/mix.wav`. Returns the file path.
pub fn export_mix(dir: &Path, model: &TimelineModel, sample_rate: u32) -> anyhow::Result<PathBuf> {
    let frames = render_mix(model, sample_rate);
    let path = dir.join(EXPORT_FILE);
    write_wav(&path, &frames, sample_rate)?;
    tracing::info!(path = %path.display(), frames = frames.len(), "mix exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AudioAsset, SampleEvent};
    use std::sync::Arc;

    const RATE: u32 = 8_000;

    fn asset(value: f32, frames: usize) -> Arc<AudioAsset> {
        Arc::new(AudioAsset::from_frames(
            vec![StereoFrame::mono(value); frames],
            RATE,
        ))
    }

    #[test]
    fn render_places_events_at_untransformed_model_time() {
        let mut model = TimelineModel::new();
        model.set_tempo(200); // must have no effect on export timing
        let ev = SampleEvent::new("kick", asset(0.5, 100), 2.0);
        model.add_event(0, ev);

        let buf = render_mix(&model, RATE);
        let start = 2 * RATE as usize;
        assert_eq!(buf[start - 1], StereoFrame::zero());
        assert_eq!(buf[start], StereoFrame::mono(0.5));
        assert_eq!(buf[start + 99], StereoFrame::mono(0.5));
        assert_eq!(buf[start + 100], StereoFrame::zero());
    }

    #[test]
    fn render_applies_event_and_track_gain() {
        let mut model = TimelineModel::new();
        let mut ev = SampleEvent::new("kick", asset(1.0, 10), 0.0);
        ev.volume = 0.5;
        model.add_event(0, ev);
        model.track_mut(0).unwrap().volume = 0.5;

        let buf = render_mix(&model, RATE);
        assert!((buf[0].left - 0.25).abs() < 1e-6);
    }

    #[test]
    fn muted_tracks_are_silent_in_the_export() {
        let mut model = TimelineModel::new();
        model.add_event(0, SampleEvent::new("kick", asset(1.0, 10), 0.0));
        model.track_mut(0).unwrap().muted = true;

        let buf = render_mix(&model, RATE);
        assert_eq!(buf[0], StereoFrame::zero());
    }

    #[test]
    fn material_past_the_capacity_is_truncated() {
        let mut model = TimelineModel::new();
        // starts inside the window, runs past its end
        model.add_event(0, SampleEvent::new("pad", asset(1.0, 4 * RATE as usize), 8.0));
        let buf = render_mix(&model, RATE);
        assert_eq!(buf.len(), 10 * RATE as usize);
        assert_eq!(buf.last().copied().unwrap(), StereoFrame::mono(1.0));
    }

    #[test]
    fn quantize_uses_asymmetric_scales_and_clamps() {
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(1.0), 0x7FFF);
        assert_eq!(quantize(-1.0), -0x8000);
        assert_eq!(quantize(2.0), 0x7FFF);
        assert_eq!(quantize(-2.0), -0x8000);
        assert_eq!(quantize(0.5), 0x3FFF);
    }

    #[test]
    fn wav_header_is_byte_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let frames = vec![StereoFrame::mono(0.25); 1000];
        write_wav(&path, &frames, RATE).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let data_size = 1000u32 * 2 * 2; // frames x channels x 2 bytes
        let chunk_size = 36 + data_size;

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[4..8], chunk_size.to_le_bytes());
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(&bytes[16..20], 16u32.to_le_bytes()); // fmt chunk size
        assert_eq!(&bytes[20..22], 1u16.to_le_bytes()); // PCM format code
        assert_eq!(&bytes[22..24], 2u16.to_le_bytes()); // channels
        assert_eq!(&bytes[24..28], RATE.to_le_bytes());
        assert_eq!(&bytes[28..32], (RATE * 2 * 2).to_le_bytes()); // byte rate
        assert_eq!(&bytes[32..34], 4u16.to_le_bytes()); // block align
        assert_eq!(&bytes[34..36], 16u16.to_le_bytes()); // bits per sample
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(&bytes[40..44], data_size.to_le_bytes());
        assert_eq!(bytes.len() as u32, 44 + data_size);
    }

    #[test]
    fn export_mix_writes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = TimelineModel::new();
        model.add_event(0, SampleEvent::new("kick", asset(0.5, 100), 0.0));

        let path = export_mix(dir.path(), &model, RATE).unwrap();
        assert!(path.ends_with(EXPORT_FILE));
        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, RATE);
        assert_eq!(reader.duration(), 10 * RATE);
    }
}
