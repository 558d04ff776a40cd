//! Biquad EQ filter (low shelf, peaking, high shelf)
//!
//! Uses RBJ Audio EQ Cookbook formulas. Coefficient changes are staged and
//! swapped in at the start of the next `process` call, so a gain change never
//! lands in the middle of a buffer. Filter state survives coefficient changes.

use super::Effect;
use std::f32::consts::PI;

/// Filter shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterKind {
    LowShelf,
    #[default]
    Peaking,
    HighShelf,
}

/// Normalized biquad coefficients (a0 folded in)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl BiquadCoeffs {
    /// Unity-gain passthrough
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Compute coefficients for the given shape
    pub fn new(kind: FilterKind, freq: f32, gain_db: f32, q: f32, sample_rate: f32) -> Self {
        if gain_db.abs() < 0.01 {
            return Self::IDENTITY;
        }

        // Keep the center below Nyquist for low device rates
        let freq = freq.clamp(1.0, sample_rate * 0.499);
        let a = 10.0f32.powf(gain_db / 40.0);
        let omega = 2.0 * PI * freq / sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();

        match kind {
            FilterKind::Peaking => {
                let alpha = sin_omega / (2.0 * q);
                let a0 = 1.0 + alpha / a;
                Self {
                    b0: (1.0 + alpha * a) / a0,
                    b1: (-2.0 * cos_omega) / a0,
                    b2: (1.0 - alpha * a) / a0,
                    a1: (-2.0 * cos_omega) / a0,
                    a2: (1.0 - alpha / a) / a0,
                }
            }
            FilterKind::LowShelf => {
                // Shelf slope S = 1
                let alpha = sin_omega / 2.0 * 2.0f32.sqrt();
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                let a0 = (a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha;
                Self {
                    b0: (a * ((a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha)) / a0,
                    b1: (2.0 * a * ((a - 1.0) - (a + 1.0) * cos_omega)) / a0,
                    b2: (a * ((a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha)) / a0,
                    a1: (-2.0 * ((a - 1.0) + (a + 1.0) * cos_omega)) / a0,
                    a2: ((a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha) / a0,
                }
            }
            FilterKind::HighShelf => {
                let alpha = sin_omega / 2.0 * 2.0f32.sqrt();
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                let a0 = (a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha;
                Self {
                    b0: (a * ((a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha)) / a0,
                    b1: (-2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega)) / a0,
                    b2: (a * ((a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha)) / a0,
                    a1: (2.0 * ((a - 1.0) - (a + 1.0) * cos_omega)) / a0,
                    a2: ((a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha) / a0,
                }
            }
        }
    }

    /// Magnitude response at `freq`, linear
    pub fn magnitude_at(&self, freq: f32, sample_rate: f32) -> f32 {
        let w = 2.0 * PI * freq / sample_rate;
        let (c1, s1) = (w.cos(), w.sin());
        let (c2, s2) = ((2.0 * w).cos(), (2.0 * w).sin());

        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);

        ((num_re * num_re + num_im * num_im) / (den_re * den_re + den_im * den_im)).sqrt()
    }
}

/// Biquad filter state for a single channel
#[derive(Default, Clone)]
struct BiquadState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadState {
    #[inline]
    fn process(&mut self, input: f32, c: &BiquadCoeffs) -> f32 {
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Stereo biquad filter with staged coefficient updates
pub struct Biquad {
    kind: FilterKind,
    sample_rate: f32,
    frequency: f32,
    q: f32,
    gain_db: f32,
    coeffs: BiquadCoeffs,
    pending: Option<BiquadCoeffs>,
    left: BiquadState,
    right: BiquadState,
}

impl Biquad {
    /// Create a filter at 0 dB (passthrough)
    pub fn new(kind: FilterKind, frequency: f32, q: f32, sample_rate: f32) -> Self {
        Self {
            kind,
            sample_rate,
            frequency,
            q,
            gain_db: 0.0,
            coeffs: BiquadCoeffs::IDENTITY,
            pending: None,
            left: BiquadState::default(),
            right: BiquadState::default(),
        }
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Gain most recently requested, in dB
    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    /// Stage new gain; applied at the next buffer boundary
    pub fn set_gain_db(&mut self, gain_db: f32) {
        if gain_db == self.gain_db {
            return;
        }
        self.gain_db = gain_db;
        self.pending = Some(BiquadCoeffs::new(
            self.kind,
            self.frequency,
            gain_db,
            self.q,
            self.sample_rate,
        ));
    }

    /// Coefficients currently in use by `process`
    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }
}

impl Effect for Biquad {
    fn process(&mut self, samples: &mut [f32]) {
        if let Some(next) = self.pending.take() {
            self.coeffs = next;
        }

        if self.coeffs == BiquadCoeffs::IDENTITY {
            // Keep the history current so re-enabling a band is seamless
            for frame in samples.chunks_exact(2) {
                self.left.process(frame[0], &BiquadCoeffs::IDENTITY);
                self.right.process(frame[1], &BiquadCoeffs::IDENTITY);
            }
            return;
        }

        for frame in samples.chunks_exact_mut(2) {
            frame[0] = self.left.process(frame[0], &self.coeffs);
            frame[1] = self.right.process(frame[1], &self.coeffs);
        }
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }

    fn name(&self) -> &'static str {
        match self.kind {
            FilterKind::LowShelf => "Low Shelf",
            FilterKind::Peaking => "Peaking",
            FilterKind::HighShelf => "High Shelf",
        }
    }
}
