//! FFT-based spectrum tap for real-time visualization
//!
//! The render path pushes post-mix mono samples into a lock-free ring
//! ([`TapFeed`]); the control side drains it once per display frame and
//! turns the most recent window into magnitude bins ([`AnalysisTap`]).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;

/// Default number of magnitude bins exposed to visualizers
pub const SPECTRUM_BINS: usize = 128;

/// Minimum ring capacity in samples (~170ms at 48kHz)
const MIN_RING_CAPACITY: usize = 8192;

/// Idle bar height range, as a fraction of full scale
const IDLE_MIN: f32 = 0.02;
const IDLE_MAX: f32 = 0.07;

/// One frame of spectrum data for visualization
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpectrumSnapshot {
    /// Magnitude per bin (0.0 - 1.0), lowest frequency first
    pub bins: Vec<f32>,
    /// Peak sample level of the analysis window (0.0 - 1.0)
    pub peak: f32,
    /// True when this is the idle pattern rather than measured data
    pub idle: bool,
}

impl SpectrumSnapshot {
    /// Downsample the bins to `count` bars by picking evenly spaced bins
    pub fn bars(&self, count: usize) -> Vec<f32> {
        if self.bins.is_empty() || count == 0 {
            return vec![0.0; count];
        }
        (0..count)
            .map(|i| self.bins[i * self.bins.len() / count])
            .collect()
    }
}

/// Render-side writer half of the tap
pub struct TapFeed {
    producer: HeapProd<f32>,
}

impl TapFeed {
    /// Push mono samples. Never blocks; samples that do not fit are dropped.
    #[inline]
    pub fn push(&mut self, samples: &[f32]) {
        let _ = self.producer.push_slice(samples);
    }
}

/// Create a connected feed/tap pair with `bins` magnitude bins
pub fn tap_pair(bins: usize, seed: u64) -> (TapFeed, AnalysisTap) {
    let bins = bins.max(2).next_power_of_two();
    let capacity = (bins * 8).max(MIN_RING_CAPACITY);
    let (producer, consumer) = HeapRb::<f32>::new(capacity).split();
    (TapFeed { producer }, AnalysisTap::new(consumer, bins, seed))
}

/// Control-side spectrum analyzer fed by a [`TapFeed`]
pub struct AnalysisTap {
    consumer: HeapCons<f32>,
    bins: usize,
    fft_size: usize,
    fft: std::sync::Arc<dyn rustfft::Fft<f32>>,
    window: Vec<f32>,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
    previous_magnitudes: Vec<f32>,
    /// Most recent `fft_size` samples, circular
    history: Vec<f32>,
    history_pos: usize,
    drain_buffer: Vec<f32>,
    fft_buffer: Vec<Complex<f32>>,
    active: bool,
    idle_rng: StdRng,
}

impl AnalysisTap {
    fn new(consumer: HeapCons<f32>, bins: usize, seed: u64) -> Self {
        let fft_size = bins * 2;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        // Blackman window
        let window = (0..fft_size)
            .map(|i| {
                let x = i as f32 / fft_size as f32;
                0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
            })
            .collect();

        Self {
            consumer,
            bins,
            fft_size,
            fft,
            window,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
            previous_magnitudes: vec![0.0; bins],
            history: vec![0.0; fft_size],
            history_pos: 0,
            drain_buffer: vec![0.0; 1024],
            fft_buffer: vec![Complex::new(0.0, 0.0); fft_size],
            active: false,
            idle_rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Number of magnitude bins
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Whether the tap reports measured data (playing) or the idle pattern
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Switch between measured data and the idle pattern.
    ///
    /// Activating clears the window and smoothing history so no stale frame
    /// from before a pause is shown.
    pub fn set_active(&mut self, active: bool) {
        if active && !self.active {
            self.history.fill(0.0);
            self.previous_magnitudes.fill(0.0);
        }
        self.active = active;
    }

    /// Pull pending samples from the feed into the analysis window
    fn drain(&mut self) {
        loop {
            let n = self.consumer.pop_slice(&mut self.drain_buffer);
            if n == 0 {
                break;
            }
            for &sample in &self.drain_buffer[..n] {
                self.history[self.history_pos] = sample;
                self.history_pos = (self.history_pos + 1) % self.fft_size;
            }
        }
    }

    /// Produce the spectrum for the current display frame
    pub fn snapshot(&mut self) -> SpectrumSnapshot {
        self.drain();

        if !self.active {
            return self.idle_pattern();
        }

        let mut peak = 0.0f32;
        for i in 0..self.fft_size {
            // Oldest sample sits at the write position
            let sample = self.history[(self.history_pos + i) % self.fft_size];
            peak = peak.max(sample.abs());
            self.fft_buffer[i] = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.fft_buffer);

        let scale = 1.0 / self.fft_size as f32;
        let db_range = self.max_db - self.min_db;
        let mut bins = Vec::with_capacity(self.bins);

        for (k, prev) in self.previous_magnitudes.iter_mut().enumerate() {
            let magnitude = self.fft_buffer[k].norm() * scale;
            let smoothed = self.smoothing * *prev + (1.0 - self.smoothing) * magnitude;
            *prev = smoothed;

            let value = if smoothed > 0.0 {
                let db = 20.0 * smoothed.log10();
                ((db - self.min_db) / db_range).clamp(0.0, 1.0)
            } else {
                0.0
            };
            bins.push(value);
        }

        SpectrumSnapshot {
            bins,
            peak: peak.min(1.0),
            idle: false,
        }
    }

    fn idle_pattern(&mut self) -> SpectrumSnapshot {
        let bins = (0..self.bins)
            .map(|_| self.idle_rng.random_range(IDLE_MIN..IDLE_MAX))
            .collect();
        SpectrumSnapshot {
            bins,
            peak: 0.0,
            idle: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bins_rounded_to_power_of_two() {
        let (_, tap) = tap_pair(100, 1);
        assert_eq!(tap.bins(), 128);
        let (_, tap) = tap_pair(SPECTRUM_BINS, 1);
        assert_eq!(tap.bins(), SPECTRUM_BINS);
    }

    #[test]
    fn test_idle_pattern_bounded_and_deterministic() {
        let (_, mut a) = tap_pair(SPECTRUM_BINS, 42);
        let (_, mut b) = tap_pair(SPECTRUM_BINS, 42);

        let snap_a = a.snapshot();
        let snap_b = b.snapshot();

        assert!(snap_a.idle);
        assert_eq!(snap_a, snap_b);
        assert_eq!(snap_a.bins.len(), SPECTRUM_BINS);
        assert!(snap_a
            .bins
            .iter()
            .all(|&v| (IDLE_MIN..IDLE_MAX).contains(&v)));
    }

    #[test]
    fn test_sine_peaks_at_expected_bin() {
        let (mut feed, mut tap) = tap_pair(SPECTRUM_BINS, 7);
        tap.set_active(true);

        // Bin 16 of a 256-point FFT
        let fft_size = SPECTRUM_BINS * 2;
        let samples: Vec<f32> = (0..fft_size * 4)
            .map(|i| (2.0 * PI * 16.0 * i as f32 / fft_size as f32).sin() * 0.5)
            .collect();
        feed.push(&samples);

        let mut snap = tap.snapshot();
        for _ in 0..20 {
            feed.push(&samples);
            snap = tap.snapshot();
        }

        assert!(!snap.idle);
        let (max_bin, _) = snap
            .bins
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });
        assert_eq!(max_bin, 16);
        assert!((snap.peak - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_silence_reports_zero() {
        let (mut feed, mut tap) = tap_pair(SPECTRUM_BINS, 7);
        tap.set_active(true);
        feed.push(&vec![0.0; 1024]);

        let snap = tap.snapshot();
        assert!(snap.bins.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_bars_downsample() {
        let snap = SpectrumSnapshot {
            bins: (0..128).map(|i| i as f32).collect(),
            peak: 0.0,
            idle: false,
        };
        let bars = snap.bars(32);
        assert_eq!(bars.len(), 32);
        assert_eq!(bars[0], 0.0);
        assert_eq!(bars[1], 4.0);
        assert_eq!(bars[31], 124.0);
    }
}
