//! Audio effects for Aural

mod biquad;
mod convolution;
mod delay;
mod gain;

pub use biquad::{Biquad, BiquadCoeffs, FilterKind};
pub use convolution::{generate_impulse_response, ConvolutionReverb, IMPULSE_SECONDS, REVERB_BLOCK_FRAMES};
pub use delay::{Delay, DELAY_SECONDS};
pub use gain::GainStage;

/// Trait for audio effects
pub trait Effect: Send {
    /// Process audio samples in place (stereo interleaved)
    fn process(&mut self, samples: &mut [f32]);

    /// Reset effect state
    fn reset(&mut self);

    /// Get effect name
    fn name(&self) -> &'static str;
}
