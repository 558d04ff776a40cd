//! Audio file loading and decoding

use aural_audio::{to_stereo, AudioError, DecodedAudio, SourceDecoder, SourceHandle};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, MetadataRevision, StandardTagKey};
use symphonia::core::probe::{Hint, ProbeResult};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur during track loading
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No audio track found in file")]
    NoAudioTrack,
    #[error("Unsupported format")]
    UnsupportedFormat,
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Resample error: {0}")]
    Resample(String),
}

impl From<LoadError> for AudioError {
    fn from(e: LoadError) -> Self {
        AudioError::UnsupportedSource(e.to_string())
    }
}

/// Track metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Seconds, when the container states it
    pub duration_secs: Option<f64>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// A loaded and decoded audio track
pub struct LoadedTrack {
    /// Interleaved stereo samples (f32, normalized to -1.0 to 1.0)
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Track metadata
    pub metadata: TrackMetadata,
}

/// Audio file loader using Symphonia
#[derive(Debug, Clone, Copy)]
pub struct TrackLoader {
    target_sample_rate: u32,
}

impl Default for TrackLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackLoader {
    /// Create a new track loader with default 48kHz sample rate
    pub fn new() -> Self {
        Self::with_sample_rate(48000)
    }

    /// Create a new track loader with specific sample rate
    pub fn with_sample_rate(target_sample_rate: u32) -> Self {
        Self { target_sample_rate }
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Load and decode an audio file to stereo at the loader's rate
    pub fn load(&self, path: &Path) -> Result<LoadedTrack, LoadError> {
        self.load_at(path, self.target_sample_rate)
    }

    fn load_at(&self, path: &Path, target_rate: u32) -> Result<LoadedTrack, LoadError> {
        let mut probed = probe(path)?;

        // Find first audio track
        let track = probed
            .format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(LoadError::NoAudioTrack)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let source_sample_rate = codec_params.sample_rate.unwrap_or(44100);
        let channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(2);

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| LoadError::Decode(e.to_string()))?;

        let mut metadata = extract_metadata(&mut probed);
        metadata.sample_rate = source_sample_rate;
        metadata.channels = channels;

        // Decode all samples
        let mut samples: Vec<f32> = Vec::new();
        let mut format = probed.format;

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "Stopping decode early");
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(e) => {
                    debug!(error = %e, "Skipping undecodable packet");
                    continue;
                }
            };

            let spec = *decoded.spec();
            let duration = decoded.capacity() as u64;

            let mut sample_buf = SampleBuffer::<f32>::new(duration, spec);
            sample_buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(sample_buf.samples());
        }

        if samples.is_empty() {
            return Err(LoadError::Decode("no audio frames decoded".into()));
        }

        let total_frames = samples.len() / channels.max(1) as usize;
        metadata.duration_secs = Some(total_frames as f64 / source_sample_rate as f64);

        let stereo = to_stereo(&samples, channels);
        let samples = resample_stereo(&stereo, source_sample_rate, target_rate)?;

        Ok(LoadedTrack {
            samples,
            sample_rate: target_rate,
            metadata,
        })
    }
}

impl SourceDecoder for TrackLoader {
    fn decode(
        &self,
        source: &SourceHandle,
        target_sample_rate: u32,
    ) -> Result<DecodedAudio, AudioError> {
        match source {
            SourceHandle::Path(path) => {
                let track = self.load_at(path, target_sample_rate).map_err(|e| {
                    warn!(path = %path.display(), error = %e, "Failed to decode track");
                    AudioError::from(e)
                })?;
                Ok(DecodedAudio {
                    samples: track.samples,
                    sample_rate: track.sample_rate,
                })
            }
            SourceHandle::Memory(pcm) => {
                let stereo = to_stereo(&pcm.samples, pcm.channels);
                if stereo.is_empty() {
                    return Err(AudioError::UnsupportedSource("no audio frames".into()));
                }
                let samples = resample_stereo(&stereo, pcm.sample_rate, target_sample_rate)?;
                Ok(DecodedAudio {
                    samples,
                    sample_rate: target_sample_rate,
                })
            }
        }
    }
}

/// Read tags and stated duration without decoding the audio
pub fn read_metadata(path: &Path) -> Result<TrackMetadata, LoadError> {
    let mut probed = probe(path)?;

    let (sample_rate, channels, n_frames) = {
        let track = probed
            .format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(LoadError::NoAudioTrack)?;
        let params = &track.codec_params;
        (
            params.sample_rate,
            params.channels.map(|c| c.count() as u16),
            params.n_frames,
        )
    };

    let mut metadata = extract_metadata(&mut probed);
    metadata.sample_rate = sample_rate.unwrap_or(0);
    metadata.channels = channels.unwrap_or(0);
    metadata.duration_secs = match (n_frames, sample_rate) {
        (Some(frames), Some(rate)) if rate > 0 => Some(frames as f64 / rate as f64),
        _ => None,
    };
    Ok(metadata)
}

fn probe(path: &Path) -> Result<ProbeResult, LoadError> {
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Create hint from file extension
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| match e {
            symphonia::core::errors::Error::Unsupported(_) => LoadError::UnsupportedFormat,
            other => LoadError::Decode(other.to_string()),
        })
}

/// Pull title/artist/album from container tags, falling back to tags found
/// while probing (e.g. ID3 ahead of an MP3 stream)
fn extract_metadata(probed: &mut ProbeResult) -> TrackMetadata {
    let mut metadata = TrackMetadata::default();

    if let Some(revision) = probed.format.metadata().current() {
        apply_tags(&mut metadata, revision);
    }
    if let Some(probe_meta) = probed.metadata.get() {
        if let Some(revision) = probe_meta.current() {
            apply_tags(&mut metadata, revision);
        }
    }

    metadata
}

fn apply_tags(metadata: &mut TrackMetadata, revision: &MetadataRevision) {
    for tag in revision.tags() {
        let slot = match tag.std_key {
            Some(StandardTagKey::TrackTitle) => &mut metadata.title,
            Some(StandardTagKey::Artist) => &mut metadata.artist,
            Some(StandardTagKey::Album) => &mut metadata.album,
            _ => continue,
        };
        if slot.is_none() {
            let value = tag.value.to_string();
            if !value.trim().is_empty() {
                *slot = Some(value);
            }
        }
    }
}

/// Resample interleaved stereo from `source_rate` to `target_rate`
fn resample_stereo(
    samples: &[f32],
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<f32>, LoadError> {
    use rubato::{FftFixedInOut, Resampler};

    if source_rate == target_rate {
        return Ok(samples.to_vec());
    }
    if source_rate == 0 || target_rate == 0 {
        return Err(LoadError::Resample(format!(
            "invalid rates {} -> {}",
            source_rate, target_rate
        )));
    }

    let frames = samples.len() / 2;
    let expected_frames =
        (frames as u64 * target_rate as u64 / source_rate as u64) as usize;

    let mut resampler =
        FftFixedInOut::<f32>::new(source_rate as usize, target_rate as usize, 1024, 2)
            .map_err(|e| LoadError::Resample(e.to_string()))?;

    // Deinterleave
    let left: Vec<f32> = samples.iter().step_by(2).copied().collect();
    let right: Vec<f32> = samples.iter().skip(1).step_by(2).copied().collect();

    let chunk_size = resampler.input_frames_next();
    let delay = resampler.output_delay();
    let mut output: [Vec<f32>; 2] = [
        Vec::with_capacity(expected_frames + delay),
        Vec::with_capacity(expected_frames + delay),
    ];

    let mut pos = 0;
    let mut padded = [vec![0.0f32; chunk_size], vec![0.0f32; chunk_size]];
    // Keep feeding (zero-padded past the end) until the delayed output is out
    while output[0].len() < expected_frames + delay {
        let input: [&[f32]; 2] = if pos + chunk_size <= frames {
            [&left[pos..pos + chunk_size], &right[pos..pos + chunk_size]]
        } else {
            for (buf, channel) in padded.iter_mut().zip([&left, &right]) {
                buf.fill(0.0);
                if pos < frames {
                    buf[..frames - pos].copy_from_slice(&channel[pos..]);
                }
            }
            [padded[0].as_slice(), padded[1].as_slice()]
        };

        let resampled = resampler
            .process(&input, None)
            .map_err(|e| LoadError::Resample(e.to_string()))?;
        for (out, data) in output.iter_mut().zip(resampled) {
            out.extend(data);
        }
        pos += chunk_size;
    }

    // Reinterleave, dropping the resampler's startup delay
    let mut interleaved = Vec::with_capacity(expected_frames * 2);
    for i in delay..delay + expected_frames {
        interleaved.push(output[0][i]);
        interleaved.push(output[1][i]);
    }

    debug!(
        from = source_rate,
        to = target_rate,
        frames = expected_frames,
        "Resampled"
    );
    Ok(interleaved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aural_audio::PcmBuffer;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("aural-loader-{}-{}", std::process::id(), name))
    }

    /// Minimal 16-bit PCM WAV writer
    fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
        let data_len = (samples.len() * 2) as u32;
        let mut bytes = Vec::with_capacity(44 + data_len as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * channels as u32 * 2).to_le_bytes());
        bytes.extend_from_slice(&(channels * 2).to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_load_mono_wav_as_stereo() {
        let path = temp_path("mono.wav");
        let samples: Vec<i16> = (0..800).map(|i| ((i % 50) * 300) as i16).collect();
        write_wav(&path, 8000, 1, &samples);

        let track = TrackLoader::with_sample_rate(8000).load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(track.sample_rate, 8000);
        assert_eq!(track.samples.len(), 1600);
        assert_eq!(track.samples[2], track.samples[3]);
        assert_eq!(track.metadata.channels, 1);
        assert!((track.metadata.duration_secs.unwrap() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_decode_resamples_to_graph_rate() {
        let path = temp_path("resample.wav");
        let samples: Vec<i16> = (0..1600).map(|i| if i % 2 == 0 { 1000 } else { -1000 }).collect();
        write_wav(&path, 8000, 2, &samples);

        let decoded = TrackLoader::new()
            .decode(&SourceHandle::Path(path.clone()), 16000)
            .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(decoded.sample_rate, 16000);
        assert_eq!(decoded.frames(), 1600);
        assert!((decoded.duration_secs() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_memory_source_resampled() {
        let pcm = PcmBuffer {
            samples: vec![0.25; 4410],
            sample_rate: 44100,
            channels: 1,
        };
        let decoded = TrackLoader::new()
            .decode(&SourceHandle::Memory(Arc::new(pcm)), 48000)
            .unwrap();
        assert_eq!(decoded.frames(), 4800);
        // Steady-state level survives resampling
        let mid = decoded.samples[4800];
        assert!((mid - 0.25).abs() < 0.01, "got {}", mid);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = TrackLoader::new().load(Path::new("/nonexistent/track.mp3"));
        assert!(matches!(result, Err(LoadError::Io(_))));

        let err = TrackLoader::new()
            .decode(&SourceHandle::Path("/nonexistent/track.mp3".into()), 48000)
            .unwrap_err();
        assert!(matches!(err, AudioError::UnsupportedSource(_)));
    }

    #[test]
    fn test_garbage_file_rejected() {
        let path = temp_path("garbage.mp3");
        std::fs::write(&path, b"definitely not audio").unwrap();
        let result = TrackLoader::new().load(&path);
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn test_read_metadata_without_decoding() {
        let path = temp_path("meta.wav");
        write_wav(&path, 8000, 2, &vec![0i16; 1600]);
        let metadata = read_metadata(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(metadata.sample_rate, 8000);
        assert_eq!(metadata.channels, 2);
        assert!((metadata.duration_secs.unwrap() - 0.1).abs() < 1e-9);
        assert!(metadata.title.is_none());
    }
}
