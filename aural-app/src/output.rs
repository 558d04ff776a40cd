//! cpal output stream wrapped as an [`OutputSink`]

use cpal::traits::{DeviceTrait, StreamTrait};
use tracing::{error, warn};

use aural_audio::{AudioError, GraphRenderer, OutputSink, MAX_BUFFER_SIZE};

pub struct CpalSink {
    stream: cpal::Stream,
}

impl CpalSink {
    /// Build a stream whose callback owns `renderer`. The stream stays paused
    /// until [`OutputSink::start`].
    pub fn new(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        mut renderer: GraphRenderer,
    ) -> Result<Self, AudioError> {
        let channels = config.channels as usize;

        // Stereo scratch for devices that are not 2-channel
        let mut stereo = vec![0.0f32; MAX_BUFFER_SIZE * 2];

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if channels == 2 {
                        renderer.process(data);
                        return;
                    }
                    for chunk in data.chunks_mut(MAX_BUFFER_SIZE * channels) {
                        let frames = chunk.len() / channels;
                        let scratch = &mut stereo[..frames * 2];
                        renderer.process(scratch);
                        for (frame, lr) in chunk.chunks_mut(channels).zip(scratch.chunks(2)) {
                            if channels == 1 {
                                frame[0] = (lr[0] + lr[1]) * 0.5;
                            } else {
                                frame[0] = lr[0];
                                frame[1] = lr[1];
                                frame[2..].fill(0.0);
                            }
                        }
                    }
                },
                |err| error!(error = %err, "Audio stream error"),
                None,
            )
            .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;

        // Some hosts start streams on creation
        if let Err(e) = stream.pause() {
            warn!(error = %e, "Could not pause new stream");
        }

        Ok(Self { stream })
    }
}

impl OutputSink for CpalSink {
    fn start(&mut self) -> Result<(), AudioError> {
        self.stream
            .play()
            .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))
    }

    fn stop(&mut self) {
        if let Err(e) = self.stream.pause() {
            warn!(error = %e, "Could not pause stream");
        }
    }
}
