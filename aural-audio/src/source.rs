//! Source handles and the decoder seam between the graph and file I/O

use crate::AudioError;
use std::path::PathBuf;
use std::sync::Arc;

/// Raw interleaved PCM held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Where a track's audio comes from
#[derive(Debug, Clone)]
pub enum SourceHandle {
    /// Audio file on disk
    Path(PathBuf),
    /// Already-decoded PCM
    Memory(Arc<PcmBuffer>),
}

impl SourceHandle {
    /// Short description for logs
    pub fn describe(&self) -> String {
        match self {
            SourceHandle::Path(path) => path.display().to_string(),
            SourceHandle::Memory(pcm) => format!(
                "<memory: {} samples, {} Hz, {} ch>",
                pcm.samples.len(),
                pcm.sample_rate,
                pcm.channels
            ),
        }
    }
}

/// Decoded stream ready for the render thread
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Interleaved stereo samples
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate.max(1) as f64
    }
}

/// Turns a [`SourceHandle`] into stereo PCM at the graph's sample rate
pub trait SourceDecoder: Send {
    fn decode(&self, source: &SourceHandle, target_sample_rate: u32)
        -> Result<DecodedAudio, AudioError>;
}

/// Convert interleaved samples with `channels` channels to interleaved stereo.
///
/// Mono is duplicated; anything wider keeps the first two channels.
pub fn to_stereo(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.iter().flat_map(|&s| [s, s]).collect(),
        2 => samples.to_vec(),
        n => samples
            .chunks_exact(n as usize)
            .flat_map(|frame| [frame[0], frame[1]])
            .collect(),
    }
}

/// Decoder for in-memory PCM already at the graph rate
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryDecoder;

impl SourceDecoder for MemoryDecoder {
    fn decode(
        &self,
        source: &SourceHandle,
        target_sample_rate: u32,
    ) -> Result<DecodedAudio, AudioError> {
        let pcm = match source {
            SourceHandle::Memory(pcm) => pcm,
            SourceHandle::Path(path) => {
                return Err(AudioError::UnsupportedSource(format!(
                    "{}: file sources need a file decoder",
                    path.display()
                )))
            }
        };

        if pcm.sample_rate != target_sample_rate {
            return Err(AudioError::UnsupportedSource(format!(
                "sample rate {} Hz does not match output rate {} Hz",
                pcm.sample_rate, target_sample_rate
            )));
        }

        let samples = to_stereo(&pcm.samples, pcm.channels);
        if samples.is_empty() {
            return Err(AudioError::UnsupportedSource("no audio frames".into()));
        }

        Ok(DecodedAudio {
            samples,
            sample_rate: target_sample_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(samples: Vec<f32>, sample_rate: u32, channels: u16) -> SourceHandle {
        SourceHandle::Memory(Arc::new(PcmBuffer {
            samples,
            sample_rate,
            channels,
        }))
    }

    #[test]
    fn test_to_stereo() {
        assert_eq!(to_stereo(&[1.0, 2.0], 1), vec![1.0, 1.0, 2.0, 2.0]);
        assert_eq!(to_stereo(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3), vec![1.0, 2.0, 4.0, 5.0]);
        assert!(to_stereo(&[1.0], 0).is_empty());
    }

    #[test]
    fn test_memory_decoder_accepts_matching_rate() {
        let decoded = MemoryDecoder
            .decode(&memory(vec![0.1; 100], 8000, 1), 8000)
            .unwrap();
        assert_eq!(decoded.frames(), 100);
        assert!((decoded.duration_secs() - 0.0125).abs() < 1e-9);
    }

    #[test]
    fn test_memory_decoder_rejects_unsupported() {
        let wrong_rate = MemoryDecoder.decode(&memory(vec![0.1; 100], 44100, 2), 48000);
        assert!(matches!(wrong_rate, Err(AudioError::UnsupportedSource(_))));

        let empty = MemoryDecoder.decode(&memory(Vec::new(), 8000, 2), 8000);
        assert!(matches!(empty, Err(AudioError::UnsupportedSource(_))));

        let path = MemoryDecoder.decode(&SourceHandle::Path("a.mp3".into()), 8000);
        assert!(matches!(path, Err(AudioError::UnsupportedSource(_))));
    }
}
