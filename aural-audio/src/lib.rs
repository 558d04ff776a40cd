//! Audio engine for Aural - EQ, effects and the real-time render path
//!
//! This module provides the core audio processing pipeline:
//! - Effects: Biquad, delay, convolution reverb and gain primitives
//! - EQ: The 10-band graphic equalizer and its presets
//! - Graph: Control handle and render-side processor for the fixed topology
//! - Source/Sink: Seams for decoders and output devices

mod effects;
mod eq;
mod error;
mod graph;
mod params;
mod sink;
mod source;

pub use effects::{
    generate_impulse_response, Biquad, BiquadCoeffs, ConvolutionReverb, Delay, Effect, FilterKind,
    GainStage, DELAY_SECONDS, IMPULSE_SECONDS, REVERB_BLOCK_FRAMES,
};
pub use eq::{
    default_bands, kind_for, preset, EqBand, Equalizer, Preset, BAND_FREQUENCIES, BAND_LABELS,
    EQ_BANDS, GAIN_MAX_DB, GAIN_MIN_DB, PRESETS,
};
pub use error::AudioError;
pub use graph::{AudioGraph, GraphConfig, GraphRenderer, RenderCommand, RenderEvent, MAX_BUFFER_SIZE};
pub use params::{combined_linear_gain, AtomicF32, ParamSlots, TransportReport, TransportSlot};
pub use sink::{NullSink, OutputSink};
pub use source::{to_stereo, DecodedAudio, MemoryDecoder, PcmBuffer, SourceDecoder, SourceHandle};
