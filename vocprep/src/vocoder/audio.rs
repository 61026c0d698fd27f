//! Waveform loading
//!
//! Decodes a file to mono f32 PCM with symphonia and optionally resamples it
//! with rubato so every utterance is analysed at the same rate.

use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use rubato::{FastFixedIn, PolynomialDegree, Resampler};

use super::ExtractionError;

/// Decoded mono waveform
#[derive(Debug, Clone)]
pub struct MonoAudio {
    /// Samples in [-1.0, 1.0]; multi-channel input is averaged
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl MonoAudio {
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode an audio file to mono f32 samples
///
/// **Algorithm:**
/// 1. Probe the container (extension used as a hint)
/// 2. Pick the first track with a known codec
/// 3. Decode every packet of that track, averaging channels
pub fn decode_mono(path: &Path) -> Result<MonoAudio, ExtractionError> {
    let decode_err = |reason: String| ExtractionError::Decode {
        path: path.to_path_buf(),
        reason,
    };

    tracing::debug!(path = %path.display(), "Decoding waveform");

    let file = std::fs::File::open(path).map_err(|e| decode_err(format!("open failed: {}", e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| decode_err(format!("probe failed: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| decode_err("no audio track".to_string()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| decode_err("sample rate unknown".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decode_err(format!("no decoder: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(decode_err(format!("read packet failed: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|e| decode_err(format!("decode failed: {}", e)))?;
        append_mono(&decoded, &mut samples);
    }

    tracing::debug!(
        path = %path.display(),
        sample_rate = sample_rate,
        total_samples = samples.len(),
        "Waveform decoded"
    );

    Ok(MonoAudio {
        samples,
        sample_rate,
    })
}

/// Average all channels of a decoded buffer into `out`
fn append_mono(decoded: &AudioBufferRef, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::U8(buf) => mix_channels(&**buf, out),
        AudioBufferRef::U16(buf) => mix_channels(&**buf, out),
        AudioBufferRef::U24(buf) => mix_channels(&**buf, out),
        AudioBufferRef::U32(buf) => mix_channels(&**buf, out),
        AudioBufferRef::S8(buf) => mix_channels(&**buf, out),
        AudioBufferRef::S16(buf) => mix_channels(&**buf, out),
        AudioBufferRef::S24(buf) => mix_channels(&**buf, out),
        AudioBufferRef::S32(buf) => mix_channels(&**buf, out),
        AudioBufferRef::F32(buf) => mix_channels(&**buf, out),
        AudioBufferRef::F64(buf) => mix_channels(&**buf, out),
    }
}

fn mix_channels<S>(buf: &AudioBuffer<S>, out: &mut Vec<f32>)
where
    S: Sample,
    f32: FromSample<S>,
{
    let num_channels = buf.spec().channels.count();
    if num_channels == 0 {
        return;
    }

    out.reserve(buf.frames());
    for frame_idx in 0..buf.frames() {
        let mut sum = 0.0f32;
        for ch in 0..num_channels {
            sum += f32::from_sample(buf.chan(ch)[frame_idx]);
        }
        out.push(sum / num_channels as f32);
    }
}

/// Resample mono audio to `target_rate`; returns the input unchanged if already there
pub fn resample(audio: MonoAudio, target_rate: u32) -> Result<MonoAudio, ExtractionError> {
    if audio.sample_rate == target_rate {
        tracing::debug!("Sample rate already at {}Hz, skipping resample", target_rate);
        return Ok(audio);
    }
    if audio.samples.is_empty() {
        return Ok(MonoAudio {
            samples: Vec::new(),
            sample_rate: target_rate,
        });
    }

    tracing::debug!(
        "Resampling from {}Hz to {}Hz",
        audio.sample_rate,
        target_rate
    );

    let input_frames = audio.samples.len();
    let mut resampler = FastFixedIn::<f32>::new(
        target_rate as f64 / audio.sample_rate as f64,
        1.0,
        PolynomialDegree::Septic,
        input_frames,
        1,
    )
    .map_err(|e| ExtractionError::Resample(format!("Failed to create resampler: {}", e)))?;

    let planar_input = vec![audio.samples];
    let mut output = resampler
        .process(&planar_input, None)
        .map_err(|e| ExtractionError::Resample(format!("Resampling failed: {}", e)))?;

    let samples = output.pop().unwrap_or_default();
    tracing::debug!(
        "Resampled {} input frames to {} output frames",
        input_frames,
        samples.len()
    );

    Ok(MonoAudio {
        samples,
        sample_rate: target_rate,
    })
}
