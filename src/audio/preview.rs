//! Pattern preview through the default output device
//!
//! Each pattern note becomes a sine voice with a short attack and release,
//! scheduled at its start offset. Mixing lives in [`PreviewMixer`] so it can
//! be exercised without an audio device.

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use etude_core::types::time;
use etude_core::{Pattern, Pitch};
use std::sync::{Arc, Mutex};

/// Default preview tempo
pub const DEFAULT_BPM: f64 = 90.0;

const ATTACK_SECS: f32 = 0.01;
const RELEASE_SECS: f32 = 0.08;
const VOICE_GAIN: f32 = 0.2;

/// One scheduled sine tone
#[derive(Debug, Clone)]
struct PreviewVoice {
    frequency: f32,
    start_sample: u64,
    end_sample: u64,
    phase: f32,
}

impl PreviewVoice {
    /// Linear attack and release, clamped to the voice's span
    fn envelope(&self, now: u64, sample_rate: f32) -> f32 {
        if now < self.start_sample || now >= self.end_sample {
            return 0.0;
        }
        let since_start = (now - self.start_sample) as f32 / sample_rate;
        let until_end = (self.end_sample - now) as f32 / sample_rate;
        (since_start / ATTACK_SECS)
            .min(until_end / RELEASE_SECS)
            .min(1.0)
    }
}

/// Sums the active voices one sample at a time
#[derive(Debug, Clone)]
pub struct PreviewMixer {
    sample_rate: f32,
    now: u64,
    voices: Vec<PreviewVoice>,
}

impl PreviewMixer {
    pub fn new(sample_rate: f32) -> Self {
        PreviewMixer {
            sample_rate,
            now: 0,
            voices: Vec::new(),
        }
    }

    /// Replace whatever is sounding with `pattern`, starting now
    pub fn schedule(&mut self, pattern: &Pattern, bpm: f64) {
        self.voices.clear();
        let samples_per_ms = self.sample_rate as f64 / 1000.0;
        for note in pattern.notes() {
            let Ok(pitch) = Pitch::from_midi(note.midi()) else {
                continue;
            };
            let start = (time::to_millis(note.start_offset(), bpm) * samples_per_ms) as u64;
            let length = (time::to_millis(note.duration(), bpm) * samples_per_ms) as u64;
            self.voices.push(PreviewVoice {
                frequency: pitch.frequency(),
                start_sample: self.now + start,
                end_sample: self.now + start + length.max(1),
                phase: 0.0,
            });
        }
    }

    pub fn stop(&mut self) {
        self.voices.clear();
    }

    pub fn is_silent(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn next_sample(&mut self) -> f32 {
        let now = self.now;
        let sample_rate = self.sample_rate;
        let mut mixed = 0.0;
        for voice in &mut self.voices {
            let level = voice.envelope(now, sample_rate);
            if level > 0.0 {
                mixed += VOICE_GAIN * level * (2.0 * std::f32::consts::PI * voice.phase).sin();
                voice.phase = (voice.phase + voice.frequency / sample_rate) % 1.0;
            }
        }
        self.voices.retain(|v| now + 1 < v.end_sample);
        self.now += 1;
        mixed.clamp(-1.0, 1.0)
    }
}

/// Output stream playing whatever the shared mixer holds
pub struct PreviewPlayer {
    stream: Stream,
    mixer: Arc<Mutex<PreviewMixer>>,
    bpm: f64,
}

impl PreviewPlayer {
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No output device available"))?;
        let config = device.default_output_config()?;

        let sample_format = config.sample_format();
        let config: StreamConfig = config.into();
        let mixer = Arc::new(Mutex::new(PreviewMixer::new(config.sample_rate.0 as f32)));

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &config, mixer.clone())?,
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &config, mixer.clone())?,
            SampleFormat::U16 => Self::build_stream::<u16>(&device, &config, mixer.clone())?,
            _ => return Err(anyhow!("Unsupported sample format: {:?}", sample_format)),
        };
        stream
            .play()
            .map_err(|e| anyhow!("Failed to play stream: {}", e))?;

        Ok(PreviewPlayer {
            stream,
            mixer,
            bpm: DEFAULT_BPM,
        })
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &StreamConfig,
        mixer: Arc<Mutex<PreviewMixer>>,
    ) -> Result<Stream>
    where
        T: Sample + SizedSample + Send + 'static + cpal::FromSample<f32>,
    {
        let channels = config.channels as usize;
        let err_fn = |err| tracing::error!("Audio output stream error: {}", err);

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let Ok(mut mixer) = mixer.lock() else {
                        return;
                    };
                    for frame in data.chunks_mut(channels) {
                        let value: T = cpal::Sample::from_sample(mixer.next_sample());
                        for sample in frame.iter_mut() {
                            *sample = value;
                        }
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| anyhow!("Failed to build output stream: {}", e))
    }

    pub fn play(&self, pattern: &Pattern) -> Result<()> {
        let mut mixer = self
            .mixer
            .lock()
            .map_err(|e| anyhow!("Failed to lock preview mixer: {}", e))?;
        mixer.schedule(pattern, self.bpm);
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        let mut mixer = self
            .mixer
            .lock()
            .map_err(|e| anyhow!("Failed to lock preview mixer: {}", e))?;
        mixer.stop();
        Ok(())
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        if bpm.is_finite() && bpm > 0.0 {
            self.bpm = bpm;
        }
    }

    pub fn pause(&self) -> Result<()> {
        self.stream
            .pause()
            .map_err(|e| anyhow!("Failed to pause stream: {}", e))
    }
}
