//! Lock-free parameter and transport slots shared with the render thread
//!
//! The control side writes parameters with plain atomic stores; the render
//! side reads them at the start of each buffer. Transport state flows the
//! other way through a small seqlock so position, duration and epoch are
//! always read as one consistent set.

use crate::eq::EQ_BANDS;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// `f32` stored as its bit pattern in an `AtomicU32`
#[derive(Debug, Default)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Linear master gain from a volume fraction and a trim in dB
pub fn combined_linear_gain(volume: f32, gain_trim_db: f32) -> f32 {
    volume * 10f32.powf(gain_trim_db / 20.0)
}

/// Parameters written by the control side, read once per render buffer
#[derive(Debug)]
pub struct ParamSlots {
    band_gains: [AtomicF32; EQ_BANDS],
    /// Bumped after any band write so the renderer can skip unchanged buffers
    band_generation: AtomicU64,
    master_gain: AtomicF32,
    reverb_mix: AtomicF32,
    delay_mix: AtomicF32,
}

impl ParamSlots {
    pub fn new(master_gain: f32) -> Self {
        Self {
            band_gains: std::array::from_fn(|_| AtomicF32::new(0.0)),
            band_generation: AtomicU64::new(0),
            master_gain: AtomicF32::new(master_gain),
            reverb_mix: AtomicF32::new(0.0),
            delay_mix: AtomicF32::new(0.0),
        }
    }

    pub fn set_band_gain(&self, index: usize, gain_db: f32) {
        if let Some(slot) = self.band_gains.get(index) {
            slot.store(gain_db);
            self.band_generation.fetch_add(1, Ordering::Release);
        }
    }

    pub fn band_gain(&self, index: usize) -> Option<f32> {
        self.band_gains.get(index).map(AtomicF32::load)
    }

    pub fn band_generation(&self) -> u64 {
        self.band_generation.load(Ordering::Acquire)
    }

    pub fn set_master_gain(&self, gain: f32) {
        self.master_gain.store(gain);
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain.load()
    }

    pub fn set_reverb_mix(&self, mix: f32) {
        self.reverb_mix.store(mix);
    }

    pub fn reverb_mix(&self) -> f32 {
        self.reverb_mix.load()
    }

    pub fn set_delay_mix(&self, mix: f32) {
        self.delay_mix.store(mix);
    }

    pub fn delay_mix(&self) -> f32 {
        self.delay_mix.load()
    }
}

/// Consistent view of the render-side transport
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransportReport {
    pub position_secs: f64,
    pub duration_secs: f64,
    /// Epoch of the command that produced this state
    pub epoch: u64,
    pub playing: bool,
}

/// Single-writer seqlock holding the render transport
#[derive(Debug)]
pub struct TransportSlot {
    seq: AtomicU64,
    position_frames: AtomicU64,
    duration_frames: AtomicU64,
    epoch: AtomicU64,
    playing: AtomicBool,
    sample_rate: u32,
}

impl TransportSlot {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            seq: AtomicU64::new(0),
            position_frames: AtomicU64::new(0),
            duration_frames: AtomicU64::new(0),
            epoch: AtomicU64::new(0),
            playing: AtomicBool::new(false),
            sample_rate: sample_rate.max(1),
        }
    }

    /// Publish from the render thread (the only writer)
    pub fn publish(&self, position_frames: u64, duration_frames: u64, epoch: u64, playing: bool) {
        let seq = self.seq.load(Ordering::Relaxed);
        self.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        std::sync::atomic::fence(Ordering::Release);

        self.position_frames.store(position_frames, Ordering::Relaxed);
        self.duration_frames.store(duration_frames, Ordering::Relaxed);
        self.epoch.store(epoch, Ordering::Relaxed);
        self.playing.store(playing, Ordering::Relaxed);

        self.seq.store(seq.wrapping_add(2), Ordering::Release);
    }

    /// Read a consistent snapshot, retrying while a write is in progress
    pub fn read(&self) -> TransportReport {
        loop {
            let before = self.seq.load(Ordering::Acquire);
            if before % 2 == 1 {
                std::hint::spin_loop();
                continue;
            }

            let position = self.position_frames.load(Ordering::Relaxed);
            let duration = self.duration_frames.load(Ordering::Relaxed);
            let epoch = self.epoch.load(Ordering::Relaxed);
            let playing = self.playing.load(Ordering::Relaxed);

            std::sync::atomic::fence(Ordering::Acquire);
            if self.seq.load(Ordering::Relaxed) == before {
                let sr = self.sample_rate as f64;
                return TransportReport {
                    position_secs: position as f64 / sr,
                    duration_secs: duration as f64 / sr,
                    epoch,
                    playing,
                };
            }
        }
    }
}
