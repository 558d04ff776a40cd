//! Audio graph - fixed EQ/effects topology and its render path
//!
//! ```text
//! source -> EQ (10 bands) -> master gain -+-> dry gain ----+
//!                                         +-> delay  -> gain -+-> sum -> tap -> out
//!                                         +-> reverb -> gain -+
//! ```
//!
//! [`AudioGraph`] is the control-side handle: it decodes sources, writes
//! parameters into atomic slots and sends transport commands. [`GraphRenderer`]
//! lives in the output callback and owns every DSP node. The two never share a
//! lock.

use crate::effects::{ConvolutionReverb, Delay, Effect, GainStage};
use crate::eq::{Equalizer, EQ_BANDS, GAIN_MAX_DB, GAIN_MIN_DB};
use crate::params::{combined_linear_gain, ParamSlots, TransportReport, TransportSlot};
use crate::source::{DecodedAudio, SourceDecoder, SourceHandle};
use crate::AudioError;
use aural_analysis::{tap_pair, AnalysisTap, TapFeed, SPECTRUM_BINS};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Largest slice processed in one pass (stereo interleaved floats).
/// Larger device buffers are rendered in chunks of this size.
pub const MAX_BUFFER_SIZE: usize = 8192;

/// How much the dry path ducks at full reverb mix
const DRY_REVERB_DUCK: f32 = 0.3;

/// Queue depth for commands, events and retired sources
const CHANNEL_CAPACITY: usize = 256;

/// Transport commands sent to the render thread.
///
/// Each carries the epoch assigned by the control side; the renderer echoes the
/// epoch of the last command it applied in every transport publication.
#[derive(Debug)]
pub enum RenderCommand {
    Load {
        source: Arc<DecodedAudio>,
        epoch: u64,
    },
    Play {
        epoch: u64,
    },
    Pause {
        epoch: u64,
    },
    Seek {
        frame: u64,
        epoch: u64,
    },
    Unload {
        epoch: u64,
    },
}

/// Events sent from the render thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderEvent {
    /// The loaded source ran out while playing
    EndOfStream { epoch: u64 },
}

/// Graph construction parameters
#[derive(Debug, Clone, Copy)]
pub struct GraphConfig {
    /// Output sample rate; sources are decoded to this rate
    pub sample_rate: u32,
    /// Spectrum bins exposed by the analysis tap
    pub analysis_bins: usize,
    /// Seed for the reverb impulse response and the idle spectrum pattern
    pub seed: u64,
}

impl GraphConfig {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            analysis_bins: SPECTRUM_BINS,
            seed: 0x5eed_a0a1,
        }
    }
}

/// State shared between the control handle and the renderer
#[derive(Debug)]
struct Shared {
    params: ParamSlots,
    transport: TransportSlot,
}

/// Control-side handle to the audio graph
pub struct AudioGraph {
    sample_rate: u32,
    shared: Arc<Shared>,
    command_tx: Sender<RenderCommand>,
    event_rx: Receiver<RenderEvent>,
    retire_rx: Receiver<Arc<DecodedAudio>>,
    decoder: Box<dyn SourceDecoder>,
    epoch: u64,
    /// Duration of the loaded source, if any
    loaded: Option<f64>,
}

impl AudioGraph {
    /// Build the graph. The renderer goes to the output callback; the tap goes
    /// to whoever draws the spectrum.
    pub fn new(
        config: GraphConfig,
        decoder: Box<dyn SourceDecoder>,
    ) -> (AudioGraph, GraphRenderer, AnalysisTap) {
        let sample_rate = config.sample_rate.max(1);
        let shared = Arc::new(Shared {
            params: ParamSlots::new(1.0),
            transport: TransportSlot::new(sample_rate),
        });

        let (command_tx, command_rx) = bounded(CHANNEL_CAPACITY);
        let (event_tx, event_rx) = bounded(CHANNEL_CAPACITY);
        let (retire_tx, retire_rx) = bounded(CHANNEL_CAPACITY);
        let (feed, tap) = tap_pair(config.analysis_bins, config.seed);

        let renderer = GraphRenderer::new(
            sample_rate,
            config.seed,
            Arc::clone(&shared),
            command_rx,
            event_tx,
            retire_tx,
            feed,
        );

        info!(sample_rate, "Audio graph created");

        let graph = AudioGraph {
            sample_rate,
            shared,
            command_tx,
            event_rx,
            retire_rx,
            decoder,
            epoch: 0,
            loaded: None,
        };

        (graph, renderer, tap)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Set one EQ band in dB. Takes effect at the next render buffer.
    pub fn set_band_gain(&self, index: usize, gain_db: f32) {
        if index >= EQ_BANDS {
            warn!(index, "Ignoring gain for nonexistent EQ band");
            return;
        }
        if !gain_db.is_finite() {
            warn!(index, "Ignoring non-finite EQ gain");
            return;
        }
        self.shared
            .params
            .set_band_gain(index, gain_db.clamp(GAIN_MIN_DB, GAIN_MAX_DB));
    }

    pub fn band_gain(&self, index: usize) -> Option<f32> {
        self.shared.params.band_gain(index)
    }

    /// Set master level from volume (0..1) and trim (dB)
    pub fn set_master_level(&self, volume: f32, gain_trim_db: f32) {
        if !volume.is_finite() || !gain_trim_db.is_finite() {
            warn!("Ignoring non-finite master level");
            return;
        }
        let gain = combined_linear_gain(volume.clamp(0.0, 1.0), gain_trim_db);
        self.shared.params.set_master_gain(gain);
    }

    /// Current master gain, linear
    pub fn master_gain(&self) -> f32 {
        self.shared.params.master_gain()
    }

    pub fn set_reverb_mix(&self, mix: f32) {
        if mix.is_finite() {
            self.shared.params.set_reverb_mix(mix.clamp(0.0, 1.0));
        }
    }

    pub fn reverb_mix(&self) -> f32 {
        self.shared.params.reverb_mix()
    }

    pub fn set_delay_mix(&self, mix: f32) {
        if mix.is_finite() {
            self.shared.params.set_delay_mix(mix.clamp(0.0, 1.0));
        }
    }

    pub fn delay_mix(&self) -> f32 {
        self.shared.params.delay_mix()
    }

    /// Decode `source` and hand it to the renderer, paused at 0.
    ///
    /// Returns the duration in seconds. On failure the previously loaded
    /// source stays in place.
    pub fn load(&mut self, source: &SourceHandle) -> Result<f64, AudioError> {
        self.collect_retired();

        let decoded = self.decoder.decode(source, self.sample_rate)?;
        if decoded.sample_rate != self.sample_rate {
            return Err(AudioError::UnsupportedSource(format!(
                "decoder produced {} Hz for a {} Hz graph",
                decoded.sample_rate, self.sample_rate
            )));
        }
        let duration = decoded.duration_secs();

        let epoch = self.next_epoch();
        self.send(RenderCommand::Load {
            source: Arc::new(decoded),
            epoch,
        })?;
        self.loaded = Some(duration);

        info!(source = %source.describe(), duration, "Source loaded");
        Ok(duration)
    }

    pub fn play(&mut self) -> Result<(), AudioError> {
        self.require_loaded()?;
        let epoch = self.next_epoch();
        self.send(RenderCommand::Play { epoch })
    }

    pub fn pause(&mut self) -> Result<(), AudioError> {
        let epoch = self.next_epoch();
        self.send(RenderCommand::Pause { epoch })
    }

    /// Move the play head; returns the clamped position in seconds
    pub fn seek(&mut self, seconds: f64) -> Result<f64, AudioError> {
        let duration = self.require_loaded()?;
        let target = if seconds.is_finite() {
            seconds.clamp(0.0, duration)
        } else {
            0.0
        };
        let frame = (target * self.sample_rate as f64).round() as u64;
        let epoch = self.next_epoch();
        self.send(RenderCommand::Seek { frame, epoch })?;
        Ok(target)
    }

    /// Drop the loaded source
    pub fn unload(&mut self) -> Result<(), AudioError> {
        let epoch = self.next_epoch();
        self.send(RenderCommand::Unload { epoch })?;
        self.loaded = None;
        self.collect_retired();
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Duration of the loaded source, 0 when nothing is loaded
    pub fn duration(&self) -> f64 {
        self.loaded.unwrap_or(0.0)
    }

    /// Epoch of the most recent transport command
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Render transport, or `None` while the renderer has not yet caught up
    /// with the latest command
    pub fn transport(&self) -> Option<TransportReport> {
        let report = self.shared.transport.read();
        (report.epoch == self.epoch).then_some(report)
    }

    /// True if the current source ended since the last call.
    /// End-of-stream from superseded commands is discarded.
    pub fn take_end_of_stream(&mut self) -> bool {
        self.collect_retired();

        let mut ended = false;
        for event in self.event_rx.try_iter() {
            match event {
                RenderEvent::EndOfStream { epoch } if epoch == self.epoch => ended = true,
                RenderEvent::EndOfStream { epoch } => {
                    debug!(epoch, current = self.epoch, "Dropping stale end-of-stream");
                }
            }
        }
        ended
    }

    fn require_loaded(&self) -> Result<f64, AudioError> {
        self.loaded
            .ok_or_else(|| AudioError::PlaybackError("no source loaded".into()))
    }

    fn next_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    fn send(&self, command: RenderCommand) -> Result<(), AudioError> {
        self.command_tx.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => AudioError::PlaybackError("render command queue full".into()),
            TrySendError::Disconnected(_) => {
                AudioError::PlaybackError("renderer has shut down".into())
            }
        })
    }

    /// Free sources the renderer has finished with
    fn collect_retired(&self) {
        for retired in self.retire_rx.try_iter() {
            debug!(frames = retired.frames(), "Releasing retired source");
        }
    }
}

/// Render-side processor, driven by the output callback
pub struct GraphRenderer {
    shared: Arc<Shared>,
    command_rx: Receiver<RenderCommand>,
    event_tx: Sender<RenderEvent>,
    retire_tx: Sender<Arc<DecodedAudio>>,
    feed: TapFeed,

    source: Option<Arc<DecodedAudio>>,
    /// Play head in frames
    position: usize,
    playing: bool,
    epoch: u64,

    eq: Equalizer,
    band_generation: u64,
    master: GainStage,
    dry: GainStage,
    delay: Delay,
    delay_gain: GainStage,
    reverb: ConvolutionReverb,
    reverb_gain: GainStage,
    reverb_idle: bool,

    // Pre-allocated processing buffers (no allocation in the callback)
    delay_buffer: Vec<f32>,
    reverb_buffer: Vec<f32>,
    mono_buffer: Vec<f32>,
}

impl GraphRenderer {
    #[allow(clippy::too_many_arguments)]
    fn new(
        sample_rate: u32,
        seed: u64,
        shared: Arc<Shared>,
        command_rx: Receiver<RenderCommand>,
        event_tx: Sender<RenderEvent>,
        retire_tx: Sender<Arc<DecodedAudio>>,
        feed: TapFeed,
    ) -> Self {
        let master = GainStage::new(shared.params.master_gain());
        Self {
            shared,
            command_rx,
            event_tx,
            retire_tx,
            feed,
            source: None,
            position: 0,
            playing: false,
            epoch: 0,
            eq: Equalizer::new(sample_rate),
            // Forces the first buffer to pick up whatever the slots hold
            band_generation: u64::MAX,
            master,
            dry: GainStage::new(1.0),
            delay: Delay::new(sample_rate),
            delay_gain: GainStage::new(0.0),
            reverb: ConvolutionReverb::new(sample_rate, seed),
            reverb_gain: GainStage::new(0.0),
            reverb_idle: true,
            delay_buffer: vec![0.0; MAX_BUFFER_SIZE],
            reverb_buffer: vec![0.0; MAX_BUFFER_SIZE],
            mono_buffer: vec![0.0; MAX_BUFFER_SIZE / 2],
        }
    }

    /// Fill `output` (stereo interleaved) with the next block of audio
    pub fn process(&mut self, output: &mut [f32]) {
        self.drain_commands();

        if output.len() % 2 != 0 {
            output.fill(0.0);
        } else {
            for chunk in output.chunks_mut(MAX_BUFFER_SIZE) {
                self.render_chunk(chunk);
            }
        }

        let total = self.source.as_ref().map_or(0, |s| s.frames());
        self.shared
            .transport
            .publish(self.position as u64, total as u64, self.epoch, self.playing);
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.command_rx.try_recv() {
            match command {
                RenderCommand::Load { source, epoch } => {
                    self.epoch = epoch;
                    let previous = self.source.replace(source);
                    self.position = 0;
                    self.playing = false;
                    // New track starts with silent tails
                    self.delay.reset();
                    self.reverb.reset();
                    self.retire(previous);
                }
                RenderCommand::Play { epoch } => {
                    self.epoch = epoch;
                    self.playing = self.source.is_some();
                }
                RenderCommand::Pause { epoch } => {
                    self.epoch = epoch;
                    self.playing = false;
                }
                RenderCommand::Seek { frame, epoch } => {
                    self.epoch = epoch;
                    let total = self.source.as_ref().map_or(0, |s| s.frames());
                    self.position = (frame as usize).min(total);
                }
                RenderCommand::Unload { epoch } => {
                    self.epoch = epoch;
                    self.playing = false;
                    self.position = 0;
                    let previous = self.source.take();
                    self.retire(previous);
                }
            }
        }
    }

    fn retire(&mut self, source: Option<Arc<DecodedAudio>>) {
        if let Some(source) = source {
            // If the control side is not draining, the last reference is
            // dropped here instead.
            let _ = self.retire_tx.try_send(source);
        }
    }

    /// Pick up parameter changes at the buffer boundary
    fn apply_params(&mut self) {
        let params = &self.shared.params;

        let generation = params.band_generation();
        if generation != self.band_generation {
            for band in 0..EQ_BANDS {
                self.eq
                    .set_band_gain(band, params.band_gain(band).unwrap_or(0.0));
            }
            self.band_generation = generation;
        }

        let reverb = params.reverb_mix();
        self.master.set_target(params.master_gain());
        self.dry.set_target(1.0 - reverb * DRY_REVERB_DUCK);
        self.reverb_gain.set_target(reverb);
        self.delay_gain.set_target(params.delay_mix());
    }

    /// Copy source frames into `out`, zero-filling past the end or when paused
    fn fill_source(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        if !self.playing {
            return;
        }
        let Some(source) = self.source.as_ref() else {
            return;
        };

        let total = source.frames();
        let frames = (out.len() / 2).min(total.saturating_sub(self.position));
        let start = self.position * 2;
        out[..frames * 2].copy_from_slice(&source.samples[start..start + frames * 2]);
        self.position += frames;

        if self.position >= total {
            self.playing = false;
            let _ = self
                .event_tx
                .try_send(RenderEvent::EndOfStream { epoch: self.epoch });
        }
    }

    fn render_chunk(&mut self, out: &mut [f32]) {
        let len = out.len();
        self.apply_params();
        self.fill_source(out);

        self.eq.process(out);
        self.master.process(out);

        // Delay send
        let delay_buf = &mut self.delay_buffer[..len];
        delay_buf.copy_from_slice(out);
        self.delay.process(delay_buf);
        self.delay_gain.process(delay_buf);

        // Reverb send; the convolver sleeps while its mix is fully off
        let reverb_buf = &mut self.reverb_buffer[..len];
        if self.reverb_gain.is_silent() {
            if !self.reverb_idle {
                self.reverb.reset();
                self.reverb_idle = true;
            }
            reverb_buf.fill(0.0);
        } else {
            self.reverb_idle = false;
            reverb_buf.copy_from_slice(out);
            self.reverb.process(reverb_buf);
            self.reverb_gain.process(reverb_buf);
        }

        self.dry.process(out);
        for ((o, d), r) in out.iter_mut().zip(delay_buf.iter()).zip(reverb_buf.iter()) {
            *o += *d + *r;
        }

        if out.iter().any(|s| !s.is_finite()) {
            out.fill(0.0);
            self.eq.reset();
            self.delay.reset();
            self.reverb.reset();
        }

        let frames = len / 2;
        let mono = &mut self.mono_buffer[..frames];
        for (m, frame) in mono.iter_mut().zip(out.chunks_exact(2)) {
            *m = (frame[0] + frame[1]) * 0.5;
        }
        self.feed.push(mono);
    }
}
