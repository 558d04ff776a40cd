//! Convolution reverb using uniformly partitioned overlap-save FFT.
//!
//! The impulse response is split into `REVERB_BLOCK_FRAMES`-sized partitions,
//! each transformed once up front. Input is collected one block at a time;
//! when a block fills, its spectrum enters a frequency-domain delay line and
//! is multiplied against every partition. Output therefore trails the input
//! by exactly one block.
//!
//! All buffers are allocated in `with_impulse`; `process` does not allocate.

use super::Effect;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Partition size in frames (also the added latency)
pub const REVERB_BLOCK_FRAMES: usize = 512;

/// Length of the generated impulse response
pub const IMPULSE_SECONDS: f32 = 2.0;

/// Loudness calibration applied after RMS normalization
const GAIN_CALIBRATION: f32 = 0.00125;
const GAIN_CALIBRATION_SAMPLE_RATE: f32 = 44100.0;
const MIN_POWER: f32 = 0.000125;

/// Generate a stereo decaying-noise impulse response.
///
/// Each channel is uniform noise in [-1, 1) shaped by `(1 - i/len)^2`.
pub fn generate_impulse_response(sample_rate: u32, seed: u64) -> [Vec<f32>; 2] {
    let length = (sample_rate as f32 * IMPULSE_SECONDS) as usize;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut channel = || -> Vec<f32> {
        (0..length)
            .map(|i| {
                let envelope = 1.0 - i as f32 / length as f32;
                rng.random_range(-1.0f32..1.0) * envelope * envelope
            })
            .collect()
    };

    let left = channel();
    let right = channel();
    [left, right]
}

/// Scale that brings an impulse response to a consistent perceived level
fn normalization_scale(impulse: &[Vec<f32>; 2], sample_rate: u32) -> f32 {
    let length = impulse[0].len().max(impulse[1].len());
    if length == 0 {
        return 1.0;
    }

    let energy: f32 = impulse.iter().flatten().map(|s| s * s).sum();
    let mut power = (energy / (2 * length) as f32).sqrt();
    if !power.is_finite() || power < MIN_POWER {
        power = MIN_POWER;
    }

    GAIN_CALIBRATION / power * GAIN_CALIBRATION_SAMPLE_RATE / sample_rate.max(1) as f32
}

/// Stereo convolution reverb (L with IR channel 0, R with IR channel 1)
pub struct ConvolutionReverb {
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    partitions: usize,
    /// Partition spectra per channel, `partitions * 2B` each
    ir_spectra: [Vec<Complex<f32>>; 2],
    /// Frequency-domain delay line of input block spectra
    fdl: [Vec<Complex<f32>>; 2],
    fdl_pos: usize,
    prev_input: [Vec<f32>; 2],
    input_block: [Vec<f32>; 2],
    output_block: [Vec<f32>; 2],
    /// Frame position inside the current block
    block_pos: usize,
    fft_buffer: Vec<Complex<f32>>,
    accumulator: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl ConvolutionReverb {
    /// Create a reverb with a generated, normalized impulse response
    pub fn new(sample_rate: u32, seed: u64) -> Self {
        let mut impulse = generate_impulse_response(sample_rate, seed);
        let scale = normalization_scale(&impulse, sample_rate);
        for channel in impulse.iter_mut() {
            channel.iter_mut().for_each(|s| *s *= scale);
        }
        Self::with_impulse(&impulse)
    }

    /// Create a reverb from an impulse response used as-is
    pub fn with_impulse(impulse: &[Vec<f32>; 2]) -> Self {
        let block = REVERB_BLOCK_FRAMES;
        let fft_size = block * 2;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let ifft = planner.plan_fft_inverse(fft_size);

        let length = impulse[0].len().max(impulse[1].len());
        let partitions = length.div_ceil(block).max(1);

        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(ifft.get_inplace_scratch_len());
        let mut scratch = vec![Complex::new(0.0, 0.0); scratch_len];

        let mut ir_spectra = [
            vec![Complex::new(0.0, 0.0); partitions * fft_size],
            vec![Complex::new(0.0, 0.0); partitions * fft_size],
        ];
        for (ch, spectra) in ir_spectra.iter_mut().enumerate() {
            let taps = &impulse[ch];
            for p in 0..partitions {
                let segment = &mut spectra[p * fft_size..(p + 1) * fft_size];
                let start = p * block;
                for (i, bin) in segment.iter_mut().take(block).enumerate() {
                    let tap = taps.get(start + i).copied().unwrap_or(0.0);
                    *bin = Complex::new(tap, 0.0);
                }
                fft.process_with_scratch(segment, &mut scratch);
            }
        }

        Self {
            fft,
            ifft,
            partitions,
            ir_spectra,
            fdl: [
                vec![Complex::new(0.0, 0.0); partitions * fft_size],
                vec![Complex::new(0.0, 0.0); partitions * fft_size],
            ],
            fdl_pos: 0,
            prev_input: [vec![0.0; block], vec![0.0; block]],
            input_block: [vec![0.0; block], vec![0.0; block]],
            output_block: [vec![0.0; block], vec![0.0; block]],
            block_pos: 0,
            fft_buffer: vec![Complex::new(0.0, 0.0); fft_size],
            accumulator: vec![Complex::new(0.0, 0.0); fft_size],
            scratch,
        }
    }

    /// Number of impulse response partitions
    pub fn partitions(&self) -> usize {
        self.partitions
    }

    /// Convolve the block that just filled and stage its output
    fn process_block(&mut self) {
        let block = REVERB_BLOCK_FRAMES;
        let fft_size = block * 2;
        let norm = 1.0 / fft_size as f32;

        for ch in 0..2 {
            for i in 0..block {
                self.fft_buffer[i] = Complex::new(self.prev_input[ch][i], 0.0);
                self.fft_buffer[block + i] = Complex::new(self.input_block[ch][i], 0.0);
            }
            self.fft
                .process_with_scratch(&mut self.fft_buffer, &mut self.scratch);

            let slot = self.fdl_pos * fft_size;
            self.fdl[ch][slot..slot + fft_size].copy_from_slice(&self.fft_buffer);

            self.accumulator.fill(Complex::new(0.0, 0.0));
            for p in 0..self.partitions {
                // Partition p pairs with the input spectrum from p blocks ago
                let idx = (self.fdl_pos + self.partitions - p) % self.partitions;
                let x = &self.fdl[ch][idx * fft_size..(idx + 1) * fft_size];
                let h = &self.ir_spectra[ch][p * fft_size..(p + 1) * fft_size];
                for ((acc, &xk), &hk) in self.accumulator.iter_mut().zip(x).zip(h) {
                    *acc += xk * hk;
                }
            }

            self.ifft
                .process_with_scratch(&mut self.accumulator, &mut self.scratch);

            // Overlap-save: the second half is the valid linear convolution
            for i in 0..block {
                self.output_block[ch][i] = self.accumulator[block + i].re * norm;
            }

            let (prev, current) = (&mut self.prev_input[ch], &self.input_block[ch]);
            prev.copy_from_slice(current);
        }

        self.fdl_pos = (self.fdl_pos + 1) % self.partitions;
    }
}

impl Effect for ConvolutionReverb {
    fn process(&mut self, samples: &mut [f32]) {
        for frame in samples.chunks_exact_mut(2) {
            let pos = self.block_pos;
            self.input_block[0][pos] = frame[0];
            self.input_block[1][pos] = frame[1];
            frame[0] = self.output_block[0][pos];
            frame[1] = self.output_block[1][pos];

            self.block_pos += 1;
            if self.block_pos == REVERB_BLOCK_FRAMES {
                self.process_block();
                self.block_pos = 0;
            }
        }
    }

    fn reset(&mut self) {
        for ch in 0..2 {
            self.fdl[ch].fill(Complex::new(0.0, 0.0));
            self.prev_input[ch].fill(0.0);
            self.input_block[ch].fill(0.0);
            self.output_block[ch].fill(0.0);
        }
        self.fdl_pos = 0;
        self.block_pos = 0;
    }

    fn name(&self) -> &'static str {
        "Reverb"
    }
}
