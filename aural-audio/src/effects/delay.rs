//! Fixed-time stereo delay line.
//!
//! One second of buffer, read back at a fixed 300ms with no feedback. The
//! output is the delayed signal only; the graph mixes it against the dry path.

use super::Effect;

/// Delay time in seconds
pub const DELAY_SECONDS: f32 = 0.3;

/// Maximum delay time in seconds
const MAX_DELAY_SECS: f32 = 1.0;

/// Stereo delay line
pub struct Delay {
    /// Delay buffer (stereo interleaved: L,R,L,R,...)
    buffer: Vec<f32>,
    /// Buffer length in stereo frames
    buffer_frames: usize,
    /// Write position (in frames, not samples)
    write_pos: usize,
    /// Delay time in whole frames
    delay_frames: usize,
}

impl Delay {
    /// Create a new delay at the fixed delay time
    pub fn new(sample_rate: u32) -> Self {
        let sr = sample_rate.max(1) as f32;
        let buffer_frames = ((sr * MAX_DELAY_SECS) as usize).max(2);
        let delay_frames = ((sr * DELAY_SECONDS).round() as usize).clamp(1, buffer_frames - 1);

        Self {
            buffer: vec![0.0; buffer_frames * 2],
            buffer_frames,
            write_pos: 0,
            delay_frames,
        }
    }

    /// Delay time in frames
    pub fn delay_frames(&self) -> usize {
        self.delay_frames
    }
}

impl Effect for Delay {
    fn process(&mut self, samples: &mut [f32]) {
        for frame in samples.chunks_exact_mut(2) {
            let read_pos = if self.write_pos >= self.delay_frames {
                self.write_pos - self.delay_frames
            } else {
                self.buffer_frames - (self.delay_frames - self.write_pos)
            };

            let delayed_l = self.buffer[read_pos * 2];
            let delayed_r = self.buffer[read_pos * 2 + 1];

            self.buffer[self.write_pos * 2] = frame[0];
            self.buffer[self.write_pos * 2 + 1] = frame[1];
            self.write_pos = (self.write_pos + 1) % self.buffer_frames;

            frame[0] = delayed_l;
            frame[1] = delayed_r;
        }
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }

    fn name(&self) -> &'static str {
        "Delay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impulse_arrives_after_delay_time() {
        let mut delay = Delay::new(1000);
        assert_eq!(delay.delay_frames(), 300);

        let mut samples = vec![0.0; 1000 * 2];
        samples[0] = 1.0;
        samples[1] = -1.0;
        delay.process(&mut samples);

        for (i, frame) in samples.chunks_exact(2).enumerate() {
            if i == 300 {
                assert_eq!(frame, &[1.0, -1.0]);
            } else {
                assert_eq!(frame, &[0.0, 0.0], "frame {}", i);
            }
        }
    }

    #[test]
    fn test_no_feedback() {
        let mut delay = Delay::new(1000);
        let mut samples = vec![0.0; 4000];
        samples[0] = 1.0;
        delay.process(&mut samples);

        let nonzero = samples.iter().filter(|&&s| s != 0.0).count();
        assert_eq!(nonzero, 1);
    }

    #[test]
    fn test_reset_silences_line() {
        let mut delay = Delay::new(1000);
        let mut samples = vec![0.5; 200];
        delay.process(&mut samples);

        delay.reset();
        let mut samples = vec![0.0; 1000];
        delay.process(&mut samples);
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_wraps_across_calls() {
        let mut delay = Delay::new(1000);
        let mut out = Vec::new();
        for block in 0..8 {
            let mut samples = vec![0.0; 128];
            if block == 7 {
                samples[0] = 1.0;
            }
            delay.process(&mut samples);
            out.extend_from_slice(&samples);
        }
        // Impulse written at frame 448, nothing comes out in the first 512 frames
        assert!(out.iter().all(|&s| s == 0.0));

        let mut tail = vec![0.0; 1000];
        delay.process(&mut tail);
        // 448 + 300 = 748, and 512 frames were already consumed
        assert_eq!(tail[(748 - 512) * 2], 1.0);
    }
}
