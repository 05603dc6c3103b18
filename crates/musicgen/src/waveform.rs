use std::io::Cursor;
use std::time::Duration;

use crate::error::GenerationError;

/// Native sample rate of the model's audio codec and of every artifact
pub const SAMPLE_RATE: u32 = 32_000;

/// Generated audio held in host memory
///
/// Samples are interleaved `f32` in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl Waveform {
    /// Build a waveform from interleaved samples
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedOutput` when there are no channels, the sample rate
    /// is zero, or the sample count is not a whole number of frames
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Result<Self, GenerationError> {
        if channels == 0 || sample_rate == 0 {
            return Err(GenerationError::UnexpectedOutput(format!(
                "waveform needs at least one channel and a sample rate, got {channels} channel(s) at {sample_rate} Hz"
            )));
        }

        if samples.len() % usize::from(channels) != 0 {
            return Err(GenerationError::UnexpectedOutput(format!(
                "{} samples do not divide into {channels} channel(s)",
                samples.len()
            )));
        }

        Ok(Self {
            samples,
            channels,
            sample_rate,
        })
    }

    /// Decode a WAV container
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedOutput` if the bytes are not a readable WAV file
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self, GenerationError> {
        let unreadable = |e: hound::Error| GenerationError::UnexpectedOutput(format!("unreadable WAV audio: {e}"));

        let mut reader = hound::WavReader::new(Cursor::new(bytes)).map_err(unreadable)?;
        let spec = reader.spec();

        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>(),
            hound::SampleFormat::Int => {
                let scale = int_scale(spec.bits_per_sample);
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|s| pcm_to_f32(s, scale)))
                    .collect::<Result<Vec<_>, _>>()
            }
        }
        .map_err(unreadable)?;

        Self::new(samples, spec.channels, spec.sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub const fn channels(&self) -> u16 {
        self.channels
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples per channel
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }

    /// Playback length
    pub fn duration(&self) -> Duration {
        let frames = u64::try_from(self.frames()).unwrap_or(u64::MAX);
        Duration::from_micros(frames.saturating_mul(1_000_000) / u64::from(self.sample_rate))
    }
}

/// Full-scale magnitude of signed PCM at the given bit depth
fn int_scale(bits_per_sample: u16) -> f32 {
    2f32.powi(i32::from(bits_per_sample.clamp(1, 32)) - 1)
}

#[allow(clippy::cast_precision_loss)]
fn pcm_to_f32(sample: i32, scale: f32) -> f32 {
    sample as f32 / scale
}

/// Convert a float sample to 16-bit PCM, clamping out-of-range values
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn f32_to_pcm16(sample: f32) -> i16 {
    let sample = sample.clamp(-1.0, 1.0);
    if sample >= 0.0 {
        (sample * f32::from(i16::MAX)).round() as i16
    } else {
        (sample * -f32::from(i16::MIN)).round() as i16
    }
}
