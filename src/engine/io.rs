//! WAV file I/O for offline rendering
//!
//! The processor is single-channel, so only mono files are accepted. Samples
//! are converted to 32-bit float on import; no resampling is done, the
//! caller instantiates the processor at the file's own rate.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::error::{NeuralFxError, Result};

/// Mono audio held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct MonoAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl MonoAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }
}

/// Output sample encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    Int16,
    Int24,
    Float32,
}

impl BitDepth {
    /// Parse 16, 24 or 32
    pub fn from_bits(bits: u16) -> Result<Self> {
        match bits {
            16 => Ok(BitDepth::Int16),
            24 => Ok(BitDepth::Int24),
            32 => Ok(BitDepth::Float32),
            other => Err(NeuralFxError::UnsupportedFormat {
                format: format!("{}-bit audio (only 16, 24, 32 supported)", other),
            }),
        }
    }

    fn spec(self, sample_rate: u32) -> WavSpec {
        let (bits_per_sample, sample_format) = match self {
            BitDepth::Int16 => (16, SampleFormat::Int),
            BitDepth::Int24 => (24, SampleFormat::Int),
            BitDepth::Float32 => (32, SampleFormat::Float),
        };
        WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample,
            sample_format,
        }
    }
}

/// Read a mono WAV file
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `InvalidAudio` - If the file is not a readable WAV file or holds no samples
/// * `UnsupportedFormat` - If the file has more than one channel
pub fn import_mono(path: &Path) -> Result<MonoAudio> {
    if !path.exists() {
        return Err(NeuralFxError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let reader = WavReader::open(path).map_err(|e| NeuralFxError::InvalidAudio {
        reason: format!("Failed to open WAV file: {}", e),
        source: Some(Box::new(e)),
    })?;

    let spec = reader.spec();
    if spec.channels != 1 {
        return Err(NeuralFxError::UnsupportedFormat {
            format: format!("{}-channel audio (only mono supported)", spec.channels),
        });
    }

    let samples = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
    if samples.is_empty() {
        return Err(NeuralFxError::InvalidAudio {
            reason: "file contains no samples".to_string(),
            source: None,
        });
    }

    Ok(MonoAudio::new(samples, spec.sample_rate))
}

/// Write mono audio to a WAV file
pub fn export_mono(audio: &MonoAudio, path: &Path, depth: BitDepth) -> Result<()> {
    let mut writer =
        WavWriter::create(path, depth.spec(audio.sample_rate)).map_err(wav_error)?;

    match depth {
        BitDepth::Int16 => {
            for &sample in &audio.samples {
                let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(scaled).map_err(wav_error)?;
            }
        }
        BitDepth::Int24 => {
            for &sample in &audio.samples {
                // 24-bit stored as i32 in hound
                let scaled = (sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32;
                writer.write_sample(scaled).map_err(wav_error)?;
            }
        }
        BitDepth::Float32 => {
            for &sample in &audio.samples {
                writer.write_sample(sample).map_err(wav_error)?;
            }
        }
    }

    writer.finalize().map_err(wav_error)
}

/// Sine wave at `frequency` with unit amplitude
pub fn generate_test_tone(frequency: f32, duration_secs: f32, sample_rate: u32) -> MonoAudio {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;
    let samples = (0..num_samples)
        .map(|i| (angular_freq * i as f32).sin())
        .collect();
    MonoAudio::new(samples, sample_rate)
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn wav_error(e: hound::Error) -> NeuralFxError {
    match e {
        hound::Error::IoError(io) => NeuralFxError::Io(io),
        other => NeuralFxError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            other.to_string(),
        )),
    }
}

fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let scale = match (sample_format, bits_per_sample) {
        (SampleFormat::Float, _) => {
            return reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid_samples(bits_per_sample, e));
        }
        (SampleFormat::Int, 8) => 128.0,
        (SampleFormat::Int, 16) => 32768.0,
        (SampleFormat::Int, 24) => 8388608.0,
        (SampleFormat::Int, 32) => 2147483648.0,
        (SampleFormat::Int, other) => {
            return Err(NeuralFxError::UnsupportedFormat {
                format: format!("{}-bit integer audio", other),
            })
        }
    };

    reader
        .samples::<i32>()
        .map(|s| s.map(|v| v as f32 / scale))
        .collect::<std::result::Result<Vec<f32>, _>>()
        .map_err(|e| invalid_samples(bits_per_sample, e))
}

fn invalid_samples(bits_per_sample: u16, e: hound::Error) -> NeuralFxError {
    NeuralFxError::InvalidAudio {
        reason: format!("Failed to read {}-bit samples: {}", bits_per_sample, e),
        source: Some(Box::new(e)),
    }
}
