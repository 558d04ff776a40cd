//! Audio analysis module for Aural
//!
//! Provides the spectrum tap that feeds visualizers from the post-mix signal.

mod spectrum;

pub use spectrum::{tap_pair, AnalysisTap, SpectrumSnapshot, TapFeed, SPECTRUM_BINS};
