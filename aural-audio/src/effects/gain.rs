//! Linear gain with a per-buffer ramp

use super::Effect;

/// Gain stage that ramps from its current to its target value across one
/// buffer, so level changes never step mid-signal
#[derive(Debug, Clone)]
pub struct GainStage {
    current: f32,
    target: f32,
}

impl GainStage {
    pub fn new(gain: f32) -> Self {
        Self {
            current: gain,
            target: gain,
        }
    }

    /// Gain reached at the end of the next buffer
    pub fn set_target(&mut self, gain: f32) {
        self.target = gain;
    }

    /// Jump straight to `gain` with no ramp
    pub fn set_immediate(&mut self, gain: f32) {
        self.current = gain;
        self.target = gain;
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// True when fully settled at zero
    pub fn is_silent(&self) -> bool {
        self.current == 0.0 && self.target == 0.0
    }
}

impl Effect for GainStage {
    fn process(&mut self, samples: &mut [f32]) {
        let frames = samples.len() / 2;
        if frames == 0 {
            return;
        }

        if self.current == self.target {
            if self.current != 1.0 {
                let g = self.current;
                samples.iter_mut().for_each(|s| *s *= g);
            }
            return;
        }

        let step = (self.target - self.current) / frames as f32;
        let mut g = self.current;
        for frame in samples.chunks_exact_mut(2) {
            g += step;
            frame[0] *= g;
            frame[1] *= g;
        }
        self.current = self.target;
    }

    fn reset(&mut self) {
        self.current = self.target;
    }

    fn name(&self) -> &'static str {
        "Gain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_gain() {
        let mut gain = GainStage::new(0.5);
        let mut samples = vec![1.0, -1.0, 0.5, 0.5];
        gain.process(&mut samples);
        assert_eq!(samples, vec![0.5, -0.5, 0.25, 0.25]);
    }

    #[test]
    fn test_ramp_reaches_target_at_buffer_end() {
        let mut gain = GainStage::new(0.0);
        gain.set_target(1.0);

        let mut samples = vec![1.0; 8];
        gain.process(&mut samples);

        assert!((samples[0] - 0.25).abs() < 1e-6);
        assert!((samples[6] - 1.0).abs() < 1e-6);
        // Monotonic ramp, no step
        for pair in samples.chunks_exact(2).collect::<Vec<_>>().windows(2) {
            assert!(pair[1][0] >= pair[0][0]);
        }
        assert_eq!(gain.current(), 1.0);
    }

    #[test]
    fn test_silent_only_when_settled() {
        let mut gain = GainStage::new(0.4);
        gain.set_target(0.0);
        assert!(!gain.is_silent());

        let mut samples = vec![1.0; 4];
        gain.process(&mut samples);
        assert!(gain.is_silent());
    }
}
