//! User-facing EQ and effects state
//!
//! These mirror what the user has set. The session copies every change into
//! the graph's parameter slots.

use aural_audio::{
    combined_linear_gain, default_bands, preset, EqBand, EQ_BANDS, GAIN_MAX_DB, GAIN_MIN_DB,
};
use aural_library::DEFAULT_VOLUME;

/// The ten bands plus the preset they came from
#[derive(Debug, Clone, PartialEq)]
pub struct EqState {
    pub bands: [EqBand; EQ_BANDS],
    /// Preset last applied, cleared by any manual band edit
    pub active_preset: Option<&'static str>,
}

impl Default for EqState {
    fn default() -> Self {
        Self {
            bands: default_bands(),
            active_preset: Some("Flat"),
        }
    }
}

impl EqState {
    /// Set one band (clamped). Returns the stored gain, or `None` for a bad
    /// index.
    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) -> Option<f32> {
        if !gain_db.is_finite() {
            return None;
        }
        let band = self.bands.get_mut(index)?;
        band.gain = gain_db.clamp(GAIN_MIN_DB, GAIN_MAX_DB);
        self.active_preset = None;
        Some(band.gain)
    }

    /// Load a built-in preset by name. Unknown names leave everything as is.
    pub fn apply_preset(&mut self, name: &str) -> bool {
        let Some(preset) = preset(name) else {
            return false;
        };
        for (band, gain) in self.bands.iter_mut().zip(preset.gains) {
            band.gain = gain;
        }
        self.active_preset = Some(preset.name);
        true
    }

    pub fn gains(&self) -> [f32; EQ_BANDS] {
        std::array::from_fn(|i| self.bands[i].gain)
    }
}

/// Output level and effect sends
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectsState {
    /// Linear, 0.0 - 1.0
    pub volume: f32,
    /// Trim in dB, -12 to +12
    pub gain_db: f32,
    /// Reverb send, 0.0 - 1.0
    pub reverb: f32,
    /// Delay send, 0.0 - 1.0
    pub delay: f32,
}

impl Default for EffectsState {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            gain_db: 0.0,
            reverb: 0.0,
            delay: 0.0,
        }
    }
}

impl EffectsState {
    /// Linear gain applied by the master stage
    pub fn combined_gain(&self) -> f32 {
        combined_linear_gain(self.volume, self.gain_db)
    }
}

/// Format seconds as `m:ss`
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let eq = EqState::default();
        assert_eq!(eq.active_preset, Some("Flat"));
        assert_eq!(eq.gains(), [0.0; EQ_BANDS]);

        let fx = EffectsState::default();
        assert_eq!(fx.volume, 0.8);
        assert!((fx.combined_gain() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_band_edit_clamps_and_clears_preset() {
        let mut eq = EqState::default();
        assert!(eq.apply_preset("Rock"));
        assert_eq!(eq.active_preset, Some("Rock"));

        assert_eq!(eq.set_band_gain(2, 30.0), Some(12.0));
        assert_eq!(eq.bands[2].gain, 12.0);
        assert_eq!(eq.active_preset, None);

        assert_eq!(eq.set_band_gain(10, 1.0), None);
    }

    #[test]
    fn test_unknown_preset_ignored() {
        let mut eq = EqState::default();
        eq.set_band_gain(0, 3.0);
        assert!(!eq.apply_preset("Nope"));
        assert_eq!(eq.bands[0].gain, 3.0);
        assert_eq!(eq.active_preset, None);
    }

    #[test]
    fn test_flat_resets_manual_edits() {
        let mut eq = EqState::default();
        eq.apply_preset("Loud");
        eq.set_band_gain(0, -7.5);
        eq.set_band_gain(9, 11.0);
        assert_eq!(eq.active_preset, None);

        assert!(eq.apply_preset("Flat"));
        assert_eq!(eq.gains(), [0.0; EQ_BANDS]);
        assert_eq!(eq.active_preset, Some("Flat"));
    }

    #[test]
    fn test_preset_round_trip() {
        let mut eq = EqState::default();
        assert!(eq.apply_preset("Vocal"));
        assert_eq!(eq.gains(), preset("Vocal").unwrap().gains);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(5.9), "0:05");
        assert_eq!(format_time(65.0), "1:05");
        assert_eq!(format_time(3600.0), "60:00");
        assert_eq!(format_time(f64::NAN), "0:00");
    }
}
