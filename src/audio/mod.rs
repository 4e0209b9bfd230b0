use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};

use crate::engine_api::EngineCommand;

pub mod engine;
mod frame;
mod voice;

pub use engine::CompletedRecording;
pub use frame::StereoFrame;

/// Owner of the live streams. Dropping it tears the audio down.
pub struct AudioHandle {
    tx: Sender<EngineCommand>,
    completed_rx: Receiver<CompletedRecording>,
    sample_rate: u32,
    has_input: bool,
    _output_stream: cpal::Stream,
    _input_stream: Option<cpal::Stream>, // None when no mic available
}

impl AudioHandle {
    pub fn send(&self, cmd: EngineCommand) {
        let _ = self.tx.try_send(cmd);
    }

    pub fn poll_completed_recording(&self) -> Option<CompletedRecording> {
        self.completed_rx.try_recv().ok()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn has_input(&self) -> bool {
        self.has_input
    }
}

pub fn start_audio() -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<EngineCommand>(1024);

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("no default output device")?;
    let config = device
        .default_output_config()
        .context("no default output config")?;

    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;

    let (input_tx, input_rx) = crossbeam_channel::bounded::<Vec<StereoFrame>>(2048);
    let (completed_tx, completed_rx) = crossbeam_channel::bounded::<CompletedRecording>(16);

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let output_stream = build_output_stream_f32(
                &device, &config.into(), rx, input_rx, completed_tx, channels,
            )?;
            output_stream.play().context("failed to play output stream")?;

            let input_stream = try_build_input_stream(&host, sample_rate, input_tx);
            let has_input = input_stream.is_some();
            tracing::info!(rate = sample_rate, has_input, "audio engine started");

            Ok(AudioHandle {
                tx,
                completed_rx,
                sample_rate,
                has_input,
                _output_stream: output_stream,
                _input_stream: input_stream,
            })
        }
        other => anyhow::bail!("unsupported sample format {other} (only f32 supported)"),
    }
}

// ── Output stream ─────────────────────────────────────────────────

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<EngineCommand>,
    input_rx: Receiver<Vec<StereoFrame>>,
    completed_tx: Sender<CompletedRecording>,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let mut engine = engine::Engine::new();
    engine.set_input_rx(input_rx);
    engine.set_completed_tx(completed_tx);

    let err_fn = |err| tracing::error!("audio output stream error: {err}");

    let channels = channels.max(1);
    let mut scratch: Vec<StereoFrame> = Vec::with_capacity(4096);

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }

            // Drain mic input into the capture buffer
            engine.drain_input();

            let n_frames = data.len() / channels;
            scratch.clear();
            scratch.resize(n_frames, StereoFrame::zero());
            engine.render_block(&mut scratch);
            interleave(&scratch, data, channels);
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

/// Spreads a stereo render across the device's channel layout: mono devices
/// get a downmix, extra channels beyond the front pair stay silent.
fn interleave(frames: &[StereoFrame], data: &mut [f32], channels: usize) {
    if channels == 1 {
        for (out, f) in data.iter_mut().zip(frames) {
            *out = 0.5 * (f.left + f.right);
        }
        return;
    }
    for (chunk, f) in data.chunks_exact_mut(channels).zip(frames) {
        chunk[0] = f.left;
        chunk[1] = f.right;
        for s in &mut chunk[2..] {
            *s = 0.0;
        }
    }
}

fn try_build_input_stream(
    host: &cpal::Host,
    target_sample_rate: cpal::SampleRate,
    tx: Sender<Vec<StereoFrame>>,
) -> Option<cpal::Stream> {
    let device = match host.default_input_device() {
        Some(d) => d,
        None => {
            tracing::warn!("no default input device; mic recording disabled");
            return None;
        }
    };

    let supported = device.default_input_config().ok()?;
    let mut stream_config: cpal::StreamConfig = supported.into();
    stream_config.sample_rate = target_sample_rate;

    let in_channels = stream_config.channels as usize;

    let err_fn = |err| tracing::error!("audio input stream error: {err}");

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                let frames: Vec<StereoFrame> = if in_channels == 1 {
                    data.iter().map(|&s| StereoFrame::mono(s)).collect()
                } else {
                    data.chunks_exact(in_channels)
                        .map(|c| StereoFrame {
                            left: c[0],
                            right: if c.len() > 1 { c[1] } else { c[0] },
                        })
                        .collect()
                };

                let _ = tx.try_send(frames);
            },
            err_fn,
            None,
        )
        .ok()?;

    if let Err(e) = stream.play() {
        tracing::warn!("could not start input stream: {e}");
        return None;
    }

    Some(stream)
}
