//! 10-band graphic equalizer
//!
//! Band 0 is a low shelf, band 9 a high shelf, and everything in between is a
//! peaking filter at Q = 1. Bands run in series in index order.

use crate::effects::{Biquad, Effect, FilterKind};

/// Number of EQ bands
pub const EQ_BANDS: usize = 10;

/// Band center frequencies in Hz
pub const BAND_FREQUENCIES: [f32; EQ_BANDS] = [
    32.0, 64.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

/// Display labels, one per band
pub const BAND_LABELS: [&str; EQ_BANDS] = [
    "32", "64", "125", "250", "500", "1K", "2K", "4K", "8K", "16K",
];

/// Band gain limits in dB
pub const GAIN_MIN_DB: f32 = -12.0;
pub const GAIN_MAX_DB: f32 = 12.0;

/// Q for the peaking bands
const PEAKING_Q: f32 = 1.0;

/// Filter shape used by band `index`
pub fn kind_for(index: usize) -> FilterKind {
    match index {
        0 => FilterKind::LowShelf,
        i if i == EQ_BANDS - 1 => FilterKind::HighShelf,
        _ => FilterKind::Peaking,
    }
}

/// User-facing description of one band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqBand {
    pub frequency: f32,
    /// Gain in dB, within [`GAIN_MIN_DB`, `GAIN_MAX_DB`]
    pub gain: f32,
    pub label: &'static str,
    pub kind: FilterKind,
}

/// The ten bands at 0 dB
pub fn default_bands() -> [EqBand; EQ_BANDS] {
    std::array::from_fn(|i| EqBand {
        frequency: BAND_FREQUENCIES[i],
        gain: 0.0,
        label: BAND_LABELS[i],
        kind: kind_for(i),
    })
}

/// Named set of band gains
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    pub name: &'static str,
    pub gains: [f32; EQ_BANDS],
}

/// Built-in presets
pub const PRESETS: [Preset; 8] = [
    Preset {
        name: "Flat",
        gains: [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    },
    Preset {
        name: "Bass Boost",
        gains: [8.0, 6.0, 4.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    },
    Preset {
        name: "Treble",
        gains: [0.0, 0.0, 0.0, 0.0, 0.0, 2.0, 4.0, 6.0, 8.0, 8.0],
    },
    Preset {
        name: "Vocal",
        gains: [-2.0, -1.0, 0.0, 2.0, 4.0, 4.0, 3.0, 2.0, 1.0, 0.0],
    },
    Preset {
        name: "Rock",
        gains: [5.0, 4.0, 2.0, 0.0, -1.0, 0.0, 2.0, 4.0, 5.0, 5.0],
    },
    Preset {
        name: "EDM",
        gains: [6.0, 5.0, 2.0, 0.0, -2.0, 0.0, 2.0, 4.0, 6.0, 5.0],
    },
    Preset {
        name: "Pop",
        gains: [1.0, 2.0, 3.0, 2.0, 0.0, -1.0, 0.0, 2.0, 3.0, 2.0],
    },
    Preset {
        name: "Loud",
        gains: [5.0, 4.0, 3.0, 2.0, 2.0, 2.0, 3.0, 4.0, 5.0, 5.0],
    },
];

/// Look up a preset by exact name
pub fn preset(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name == name)
}

/// Series chain of the ten band filters
pub struct Equalizer {
    filters: [Biquad; EQ_BANDS],
}

impl Equalizer {
    pub fn new(sample_rate: u32) -> Self {
        let sr = sample_rate as f32;
        Self {
            filters: std::array::from_fn(|i| {
                Biquad::new(kind_for(i), BAND_FREQUENCIES[i], PEAKING_Q, sr)
            }),
        }
    }

    /// Stage a band gain; out-of-range indices are ignored
    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) {
        if let Some(filter) = self.filters.get_mut(index) {
            filter.set_gain_db(gain_db.clamp(GAIN_MIN_DB, GAIN_MAX_DB));
        }
    }

    pub fn band_gain(&self, index: usize) -> Option<f32> {
        self.filters.get(index).map(|f| f.gain_db())
    }
}

impl Effect for Equalizer {
    fn process(&mut self, samples: &mut [f32]) {
        for filter in self.filters.iter_mut() {
            filter.process(samples);
        }
    }

    fn reset(&mut self) {
        self.filters.iter_mut().for_each(|f| f.reset());
    }

    fn name(&self) -> &'static str {
        "Equalizer"
    }
}
