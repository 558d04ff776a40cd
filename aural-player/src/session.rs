//! Session - the one object a front-end talks to
//!
//! Owns the playlist, the playback controller, the user-facing EQ/effects
//! state and the shared analysis tap. Every EQ or effects change is copied
//! into the graph's parameter slots right away.

use crate::controller::{PlaybackController, PlaybackState, PlayerError};
use crate::settings::{EffectsState, EqState};
use aural_analysis::{AnalysisTap, SpectrumSnapshot};
use aural_audio::{AudioGraph, EqBand, OutputSink, EQ_BANDS, GAIN_MAX_DB, GAIN_MIN_DB};
use aural_library::{NewTrack, PlaylistError, PlaylistStore, RepeatMode, Track, TrackId};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Read-only view of everything a front-end renders
#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub is_playing: bool,
    pub state: PlaybackState,
    pub current_track: Option<Track>,
    pub playlist: Vec<Track>,
    /// Seconds
    pub current_time: f64,
    pub duration: f64,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub eq_bands: [EqBand; EQ_BANDS],
    pub active_preset: Option<&'static str>,
    pub volume: f32,
    pub gain: f32,
    pub reverb: f32,
    pub delay: f32,
}

pub struct Session {
    playlist: PlaylistStore,
    controller: PlaybackController,
    eq: EqState,
    effects: EffectsState,
    tap: Arc<Mutex<AnalysisTap>>,
    /// A track has loaded at least once
    has_loaded: bool,
}

impl Session {
    /// Build a session around a fresh graph. `seed` drives shuffle.
    pub fn new(graph: AudioGraph, tap: AnalysisTap, sink: Box<dyn OutputSink>, seed: u64) -> Self {
        let session = Self {
            playlist: PlaylistStore::new(),
            controller: PlaybackController::new(graph, sink, seed),
            eq: EqState::default(),
            effects: EffectsState::default(),
            tap: Arc::new(Mutex::new(tap)),
            has_loaded: false,
        };
        session.push_eq();
        session.push_effects();
        session
    }

    pub fn playlist(&self) -> &PlaylistStore {
        &self.playlist
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    // --- Playlist ---

    /// Add tracks at the end. Starts the first one when nothing is current.
    pub fn append(&mut self, entries: Vec<NewTrack>) -> Vec<TrackId> {
        let ids = self.playlist.append(entries);
        info!(count = ids.len(), total = self.playlist.len(), "Tracks added");

        if self.controller.current().is_none() {
            if let Some(&first) = ids.first() {
                if let Err(e) = self.controller.play_track(&mut self.playlist, first) {
                    warn!(track = %first, error = %e, "Auto-play failed");
                }
            }
        }
        self.sync();
        ids
    }

    /// Remove a track. Removing the current one stops playback.
    pub fn remove(&mut self, id: TrackId) -> Result<Track, PlayerError> {
        if self.playlist.get(id).is_none() {
            return Err(PlaylistError::UnknownTrack(id).into());
        }
        // Stop first; a failed stop leaves the playlist untouched
        let stopped = self.controller.handle_removed(id);
        self.sync();
        stopped?;
        Ok(self.playlist.remove(id)?)
    }

    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), PlayerError> {
        self.playlist.reorder(from, to)?;
        Ok(())
    }

    // --- Transport ---

    pub fn play_track(&mut self, id: TrackId) -> Result<(), PlayerError> {
        let result = self.controller.play_track(&mut self.playlist, id);
        self.sync();
        result
    }

    pub fn toggle_play(&mut self) -> Result<(), PlayerError> {
        let result = self.controller.toggle();
        self.sync();
        result
    }

    pub fn play(&mut self) -> Result<(), PlayerError> {
        let result = self.controller.play();
        self.sync();
        result
    }

    pub fn pause(&mut self) -> Result<(), PlayerError> {
        let result = self.controller.pause();
        self.sync();
        result
    }

    pub fn next(&mut self) -> Result<(), PlayerError> {
        let result = self.controller.next(&mut self.playlist);
        self.sync();
        result
    }

    pub fn previous(&mut self) -> Result<(), PlayerError> {
        let result = self.controller.previous(&mut self.playlist);
        self.sync();
        result
    }

    pub fn seek(&mut self, seconds: f64) -> Result<f64, PlayerError> {
        let result = self.controller.seek(seconds);
        self.sync();
        result
    }

    pub fn set_shuffle(&mut self, shuffle: bool) {
        debug!(shuffle, "Shuffle changed");
        self.controller.set_shuffle(shuffle);
    }

    pub fn set_repeat(&mut self, repeat: RepeatMode) {
        debug!(repeat = %repeat, "Repeat changed");
        self.controller.set_repeat(repeat);
    }

    /// Drive position updates and auto-advance; call once per UI frame
    pub fn poll(&mut self) -> Result<(), PlayerError> {
        let result = self.controller.poll(&mut self.playlist);
        self.sync();
        result
    }

    // --- EQ ---

    /// Set one band (clamped to +/-12 dB). Clears the active preset.
    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) -> Option<f32> {
        let stored = self.eq.set_band_gain(index, gain_db)?;
        self.controller.graph().set_band_gain(index, stored);
        Some(stored)
    }

    /// Apply a built-in preset. Unknown names change nothing.
    pub fn apply_preset(&mut self, name: &str) -> bool {
        if !self.eq.apply_preset(name) {
            warn!(preset = name, "Unknown preset");
            return false;
        }
        self.push_eq();
        info!(preset = name, "Preset applied");
        true
    }

    // --- Effects ---

    pub fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            return;
        }
        self.effects.volume = volume.clamp(0.0, 1.0);
        self.push_master();
    }

    pub fn set_gain(&mut self, gain_db: f32) {
        if !gain_db.is_finite() {
            return;
        }
        self.effects.gain_db = gain_db.clamp(GAIN_MIN_DB, GAIN_MAX_DB);
        self.push_master();
    }

    pub fn set_reverb(&mut self, mix: f32) {
        if !mix.is_finite() {
            return;
        }
        self.effects.reverb = mix.clamp(0.0, 1.0);
        self.controller.graph().set_reverb_mix(self.effects.reverb);
    }

    pub fn set_delay(&mut self, mix: f32) {
        if !mix.is_finite() {
            return;
        }
        self.effects.delay = mix.clamp(0.0, 1.0);
        self.controller.graph().set_delay_mix(self.effects.delay);
    }

    pub fn effects(&self) -> EffectsState {
        self.effects
    }

    pub fn eq(&self) -> &EqState {
        &self.eq
    }

    // --- Views ---

    pub fn snapshot(&self) -> PlayerSnapshot {
        let current_track = self
            .controller
            .current()
            .and_then(|id| self.playlist.get(id))
            .cloned();

        PlayerSnapshot {
            is_playing: self.controller.is_playing(),
            state: self.controller.state(),
            current_track,
            playlist: self.playlist.tracks().to_vec(),
            current_time: self.controller.position(),
            duration: self.controller.duration(),
            shuffle: self.controller.shuffle(),
            repeat: self.controller.repeat(),
            eq_bands: self.eq.bands,
            active_preset: self.eq.active_preset,
            volume: self.effects.volume,
            gain: self.effects.gain_db,
            reverb: self.effects.reverb,
            delay: self.effects.delay,
        }
    }

    /// Current spectrum, or `None` before any track has loaded
    pub fn analysis(&self) -> Option<SpectrumSnapshot> {
        if !self.has_loaded {
            return None;
        }
        Some(self.tap.lock().snapshot())
    }

    /// Shared tap for a visualization thread
    pub fn analysis_handle(&self) -> Arc<Mutex<AnalysisTap>> {
        Arc::clone(&self.tap)
    }

    /// Release the output device
    pub fn shutdown(&mut self) {
        info!("Session shutting down");
        self.controller.shutdown();
        self.sync();
    }

    fn sync(&mut self) {
        if self.controller.current().is_some() {
            self.has_loaded = true;
        }
        let playing = self.controller.is_playing();
        let mut tap = self.tap.lock();
        if tap.is_active() != playing {
            tap.set_active(playing);
        }
    }

    fn push_eq(&self) {
        for (i, gain) in self.eq.gains().into_iter().enumerate() {
            self.controller.graph().set_band_gain(i, gain);
        }
    }

    fn push_master(&self) {
        self.controller
            .graph()
            .set_master_level(self.effects.volume, self.effects.gain_db);
    }

    fn push_effects(&self) {
        self.push_master();
        self.controller.graph().set_reverb_mix(self.effects.reverb);
        self.controller.graph().set_delay_mix(self.effects.delay);
    }
}
