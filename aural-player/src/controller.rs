//! Playback controller - transport state machine and track advance policy
//!
//! ```text
//! Idle --load--> Loading --ok--> Playing <--toggle--> Paused
//!                                   |
//!                             stream ends
//!                                   v
//!                                 Ended --(repeat/next)--> Loading
//! ```
//!
//! The controller refers to tracks only by [`TrackId`]; the playlist is
//! passed in by the session for every operation that needs it.

use aural_audio::{AudioError, AudioGraph, OutputSink};
use aural_library::{PlaylistError, PlaylistStore, RepeatMode, TrackId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Ended,
}

/// Errors from player commands
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Playlist(#[from] PlaylistError),
    #[error("No track is loaded")]
    NothingLoaded,
}

/// Ticket for a play attempt in flight; see [`PlaybackController::begin_play`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct PlayRequest {
    intent: u64,
}

/// Owns the audio graph and output sink and drives them from user intent
pub struct PlaybackController {
    graph: AudioGraph,
    sink: Box<dyn OutputSink>,
    state: PlaybackState,
    current: Option<TrackId>,
    /// Seconds
    position: f64,
    duration: f64,
    shuffle: bool,
    repeat: RepeatMode,
    rng: StdRng,
    /// Bumped by every transport intent; completions carrying an older value
    /// are dropped
    intent: u64,
    /// The last device acquisition failed; the next play tries twice
    device_retry: bool,
}

impl PlaybackController {
    pub fn new(graph: AudioGraph, sink: Box<dyn OutputSink>, seed: u64) -> Self {
        Self {
            graph,
            sink,
            state: PlaybackState::Idle,
            current: None,
            position: 0.0,
            duration: 0.0,
            shuffle: false,
            repeat: RepeatMode::Off,
            rng: StdRng::seed_from_u64(seed),
            intent: 0,
            device_retry: false,
        }
    }

    pub fn graph(&self) -> &AudioGraph {
        &self.graph
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn current(&self) -> Option<TrackId> {
        self.current
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn set_shuffle(&mut self, shuffle: bool) {
        self.shuffle = shuffle;
    }

    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    pub fn set_repeat(&mut self, repeat: RepeatMode) {
        self.repeat = repeat;
    }

    /// Load `id` and start playing it.
    ///
    /// On a load failure nothing changes: the previous track (if any) stays
    /// current and keeps its state.
    pub fn play_track(
        &mut self,
        playlist: &mut PlaylistStore,
        id: TrackId,
    ) -> Result<(), PlayerError> {
        let track = playlist.get(id).ok_or(PlaylistError::UnknownTrack(id))?;
        let source = track.source.clone();
        let name = track.name.clone();

        let prior = self.state;
        self.state = PlaybackState::Loading;
        self.intent += 1;

        let duration = match self.graph.load(&source) {
            Ok(duration) => duration,
            Err(e) => {
                warn!(track = %id, name = %name, error = %e, "Track failed to load");
                self.state = prior;
                return Err(e.into());
            }
        };

        self.current = Some(id);
        self.position = 0.0;
        self.duration = duration;
        playlist.set_duration(id, duration);
        self.state = PlaybackState::Paused;
        info!(track = %id, name = %name, duration, "Now playing");

        self.play()
    }

    /// Start or resume the current track
    pub fn play(&mut self) -> Result<(), PlayerError> {
        let request = self.begin_play()?;
        let acquired = self.acquire_device();
        self.finish_play(request, acquired)
    }

    /// First half of a play: validate and record the intent. The device can
    /// then be acquired elsewhere and the outcome handed to
    /// [`finish_play`](Self::finish_play).
    pub fn begin_play(&mut self) -> Result<PlayRequest, PlayerError> {
        if self.current.is_none() || !self.graph.is_loaded() {
            return Err(PlayerError::NothingLoaded);
        }

        // Playing an ended track starts it over
        if self.state == PlaybackState::Ended {
            self.graph.seek(0.0)?;
            self.position = 0.0;
        }

        self.intent += 1;
        Ok(PlayRequest {
            intent: self.intent,
        })
    }

    /// Second half of a play. A request superseded by a later intent is
    /// dropped without touching state.
    pub fn finish_play(
        &mut self,
        request: PlayRequest,
        acquired: Result<(), AudioError>,
    ) -> Result<(), PlayerError> {
        if request.intent != self.intent {
            debug!(
                request = request.intent,
                current = self.intent,
                "Dropping stale play completion"
            );
            return Ok(());
        }

        if let Err(e) = acquired {
            self.state = PlaybackState::Paused;
            return Err(e.into());
        }

        match self.graph.play() {
            Ok(()) => {
                self.state = PlaybackState::Playing;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Playback failed");
                self.state = PlaybackState::Paused;
                Err(e.into())
            }
        }
    }

    /// Start the output device, retrying once if the previous attempt failed
    pub fn acquire_device(&mut self) -> Result<(), AudioError> {
        let mut result = self.sink.start();

        if self.device_retry && matches!(result, Err(AudioError::DeviceUnavailable(_))) {
            warn!("Output device unavailable, retrying");
            result = self.sink.start();
        }

        match result {
            Ok(()) => {
                self.device_retry = false;
                Ok(())
            }
            Err(e) => {
                if matches!(e, AudioError::DeviceUnavailable(_)) {
                    self.device_retry = true;
                }
                warn!(error = %e, "Could not start output");
                Err(e)
            }
        }
    }

    /// Pause playback. The device keeps running so effect tails ring out.
    pub fn pause(&mut self) -> Result<(), PlayerError> {
        // Supersede any play still in flight
        self.intent += 1;
        if self.state != PlaybackState::Playing {
            return Ok(());
        }
        self.graph.pause()?;
        self.state = PlaybackState::Paused;
        Ok(())
    }

    /// Play/pause toggle. Does nothing without a current track.
    pub fn toggle(&mut self) -> Result<(), PlayerError> {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused | PlaybackState::Ended => self.play(),
            PlaybackState::Idle | PlaybackState::Loading => Ok(()),
        }
    }

    /// Move the play head, clamped to the track. Returns the new position.
    pub fn seek(&mut self, seconds: f64) -> Result<f64, PlayerError> {
        if self.current.is_none() || !self.graph.is_loaded() {
            return Err(PlayerError::NothingLoaded);
        }
        let position = self.graph.seek(seconds)?;
        self.position = position;
        match self.state {
            // The renderer may have run off the end since the last poll; its
            // end-of-stream is now stale, so restart it at the new position
            PlaybackState::Playing => self.graph.play()?,
            PlaybackState::Ended => self.state = PlaybackState::Paused,
            _ => {}
        }
        Ok(position)
    }

    /// User "next": wraps at the end, random when shuffling
    pub fn next(&mut self, playlist: &mut PlaylistStore) -> Result<(), PlayerError> {
        let len = playlist.len();
        if len == 0 {
            return Ok(());
        }

        let index = if self.shuffle {
            self.rng.random_range(0..len)
        } else {
            self.current_index(playlist).map_or(0, |i| (i + 1) % len)
        };
        self.play_index(playlist, index)
    }

    /// User "previous": wraps at the start, never shuffled
    pub fn previous(&mut self, playlist: &mut PlaylistStore) -> Result<(), PlayerError> {
        let len = playlist.len();
        if len == 0 {
            return Ok(());
        }

        let index = match self.current_index(playlist) {
            Some(i) if i > 0 => i - 1,
            _ => len - 1,
        };
        self.play_index(playlist, index)
    }

    /// Sync position from the renderer and handle end of stream
    pub fn poll(&mut self, playlist: &mut PlaylistStore) -> Result<(), PlayerError> {
        if let Some(report) = self.graph.transport() {
            if matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
                self.position = report.position_secs.min(self.duration);
            }
        }

        if self.graph.take_end_of_stream() && self.state == PlaybackState::Playing {
            self.position = self.duration;
            self.state = PlaybackState::Ended;
            debug!(track = ?self.current, "Track ended");
            return self.handle_track_end(playlist);
        }
        Ok(())
    }

    /// Decide what plays after the current track finished
    fn handle_track_end(&mut self, playlist: &mut PlaylistStore) -> Result<(), PlayerError> {
        if self.repeat == RepeatMode::One {
            return self.play();
        }

        let Some(index) = self.current_index(playlist) else {
            // Current track vanished from the list
            return Ok(());
        };

        let len = playlist.len();
        let mut next = if self.shuffle {
            self.rng.random_range(0..len)
        } else {
            index + 1
        };

        if next >= len {
            if self.repeat == RepeatMode::All {
                next = 0;
            } else {
                info!("Reached end of playlist");
                return Ok(());
            }
        }

        match self.play_index(playlist, next) {
            Ok(()) => Ok(()),
            // Next track is loaded and current; play left it Paused
            Err(e @ PlayerError::Audio(AudioError::DeviceUnavailable(_))) => Err(e),
            Err(e) => {
                error!(error = %e, "Could not advance to next track");
                self.state = PlaybackState::Ended;
                Err(PlayerError::Audio(AudioError::PlaybackError(e.to_string())))
            }
        }
    }

    /// Stop and forget the current track
    pub fn stop(&mut self) -> Result<(), PlayerError> {
        self.intent += 1;
        if self.graph.is_loaded() {
            self.graph.unload()?;
        }
        self.state = PlaybackState::Idle;
        self.current = None;
        self.position = 0.0;
        self.duration = 0.0;
        Ok(())
    }

    /// React to `id` having been removed from the playlist.
    /// Returns true if it was the current track (playback stopped).
    pub fn handle_removed(&mut self, id: TrackId) -> Result<bool, PlayerError> {
        if self.current != Some(id) {
            return Ok(false);
        }
        info!(track = %id, "Current track removed, stopping");
        self.stop()?;
        Ok(true)
    }

    /// Release the output device
    pub fn shutdown(&mut self) {
        self.intent += 1;
        self.sink.stop();
        self.state = match self.state {
            PlaybackState::Playing => PlaybackState::Paused,
            other => other,
        };
    }

    fn current_index(&self, playlist: &PlaylistStore) -> Option<usize> {
        self.current.and_then(|id| playlist.index_of(id))
    }

    fn play_index(&mut self, playlist: &mut PlaylistStore, index: usize) -> Result<(), PlayerError> {
        let id = playlist
            .track_at(index)
            .map(|t| t.id)
            .ok_or(PlaylistError::IndexOutOfRange {
                index,
                len: playlist.len(),
            })?;
        self.play_track(playlist, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aural_audio::{GraphConfig, GraphRenderer, MemoryDecoder, NullSink, PcmBuffer, SourceHandle};
    use aural_library::NewTrack;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::Arc;

    const SR: u32 = 8000;

    fn tone(name: &str, frames: usize) -> NewTrack {
        let pcm = PcmBuffer {
            samples: vec![0.1; frames * 2],
            sample_rate: SR,
            channels: 2,
        };
        NewTrack::new(name, SourceHandle::Memory(Arc::new(pcm)))
    }

    fn undecodable(name: &str) -> NewTrack {
        let pcm = PcmBuffer {
            samples: vec![0.1; 100],
            sample_rate: SR * 2,
            channels: 1,
        };
        NewTrack::new(name, SourceHandle::Memory(Arc::new(pcm)))
    }

    fn controller_with(sink: Box<dyn OutputSink>) -> (PlaybackController, GraphRenderer) {
        let (graph, renderer, _tap) =
            AudioGraph::new(GraphConfig::new(SR), Box::new(MemoryDecoder));
        (PlaybackController::new(graph, sink, 9), renderer)
    }

    fn setup(names: &[&str]) -> (PlaybackController, GraphRenderer, PlaylistStore, Vec<TrackId>) {
        let (controller, renderer) = controller_with(Box::new(NullSink::new()));
        let mut playlist = PlaylistStore::new();
        let ids = playlist.append(names.iter().map(|n| tone(n, 400)).collect());
        (controller, renderer, playlist, ids)
    }

    fn render(renderer: &mut GraphRenderer, frames: usize) {
        let mut out = vec![0.0; frames * 2];
        renderer.process(&mut out);
    }

    /// Sink that refuses to start a set number of times
    struct FlakySink {
        failures: Rc<Cell<usize>>,
        attempts: Rc<Cell<usize>>,
    }

    impl OutputSink for FlakySink {
        fn start(&mut self) -> Result<(), AudioError> {
            self.attempts.set(self.attempts.get() + 1);
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(AudioError::DeviceUnavailable("blocked".into()));
            }
            Ok(())
        }

        fn stop(&mut self) {}
    }

    #[test]
    fn test_play_track_fills_duration() {
        let (mut c, _r, mut playlist, ids) = setup(&["A", "B"]);
        c.play_track(&mut playlist, ids[1]).unwrap();
        assert_eq!(c.state(), PlaybackState::Playing);
        assert_eq!(c.current(), Some(ids[1]));
        assert!((c.duration() - 0.05).abs() < 1e-9);
        assert_eq!(playlist.get(ids[1]).unwrap().duration, Some(c.duration()));
        assert_eq!(playlist.get(ids[0]).unwrap().duration, None);
    }

    #[test]
    fn test_end_with_repeat_off_at_last_track() {
        let (mut c, mut r, mut playlist, ids) = setup(&["A", "B", "C"]);
        c.play_track(&mut playlist, ids[2]).unwrap();
        render(&mut r, 1000);
        c.poll(&mut playlist).unwrap();

        assert_eq!(c.state(), PlaybackState::Ended);
        assert!(!c.is_playing());
        assert_eq!(c.current(), Some(ids[2]));
    }

    #[test]
    fn test_end_with_repeat_all_wraps() {
        let (mut c, mut r, mut playlist, ids) = setup(&["A", "B", "C"]);
        c.set_repeat(RepeatMode::All);
        c.play_track(&mut playlist, ids[2]).unwrap();
        render(&mut r, 1000);
        c.poll(&mut playlist).unwrap();

        assert_eq!(c.state(), PlaybackState::Playing);
        assert_eq!(c.current(), Some(ids[0]));
        assert_eq!(c.position(), 0.0);
    }

    #[test]
    fn test_end_advances_in_order() {
        let (mut c, mut r, mut playlist, ids) = setup(&["A", "B", "C"]);
        c.play_track(&mut playlist, ids[0]).unwrap();
        render(&mut r, 1000);
        c.poll(&mut playlist).unwrap();
        assert_eq!(c.current(), Some(ids[1]));
        assert!(c.is_playing());
    }

    #[test]
    fn test_end_with_repeat_one_replays() {
        let (mut c, mut r, mut playlist, ids) = setup(&["A", "B"]);
        c.set_repeat(RepeatMode::One);
        c.set_shuffle(true);
        c.play_track(&mut playlist, ids[1]).unwrap();
        render(&mut r, 1000);
        c.poll(&mut playlist).unwrap();

        assert_eq!(c.current(), Some(ids[1]));
        assert!(c.is_playing());
        assert_eq!(c.position(), 0.0);

        render(&mut r, 100);
        c.poll(&mut playlist).unwrap();
        assert!((c.position() - 100.0 / SR as f64).abs() < 1e-9);
    }

    #[test]
    fn test_end_with_shuffle_picks_a_track() {
        let (mut c, mut r, mut playlist, ids) = setup(&["A", "B", "C", "D"]);
        c.set_shuffle(true);
        c.set_repeat(RepeatMode::All);
        c.play_track(&mut playlist, ids[0]).unwrap();
        render(&mut r, 1000);
        c.poll(&mut playlist).unwrap();

        assert!(c.is_playing());
        assert!(ids.contains(&c.current().unwrap()));
    }

    #[test]
    fn test_end_after_current_removed_stops() {
        let (mut c, mut r, mut playlist, ids) = setup(&["A", "B", "C"]);
        c.play_track(&mut playlist, ids[1]).unwrap();
        playlist.remove(ids[1]).unwrap();
        render(&mut r, 1000);
        c.poll(&mut playlist).unwrap();

        assert!(!c.is_playing());
        assert_eq!(c.state(), PlaybackState::Ended);
    }

    #[test]
    fn test_next_load_failure_stays_ended() {
        let (mut c, mut r, mut playlist, _) = setup(&[]);
        let ids = playlist.append(vec![tone("A", 400), undecodable("Bad")]);
        c.play_track(&mut playlist, ids[0]).unwrap();
        render(&mut r, 1000);

        let err = c.poll(&mut playlist).unwrap_err();
        assert!(matches!(err, PlayerError::Audio(AudioError::PlaybackError(_))));
        assert_eq!(c.state(), PlaybackState::Ended);
        assert_eq!(c.current(), Some(ids[0]));
    }

    #[test]
    fn test_seek_after_unpolled_end_resumes() {
        let (mut c, mut r, mut playlist, ids) = setup(&["A", "B"]);
        c.play_track(&mut playlist, ids[0]).unwrap();
        render(&mut r, 500);

        // Seek lands before the end-of-stream is polled
        c.seek(0.0).unwrap();
        for _ in 0..3 {
            render(&mut r, 100);
            c.poll(&mut playlist).unwrap();
        }
        assert_eq!(c.state(), PlaybackState::Playing);
        assert_eq!(c.current(), Some(ids[0]));
        assert!((c.position() - 300.0 / SR as f64).abs() < 1e-9);

        // And still advances when it runs out again
        render(&mut r, 200);
        c.poll(&mut playlist).unwrap();
        assert_eq!(c.current(), Some(ids[1]));
        assert!(c.is_playing());
    }

    #[test]
    fn test_device_failure_on_advance_leaves_next_paused() {
        let failures = Rc::new(Cell::new(0));
        let attempts = Rc::new(Cell::new(0));
        let sink = FlakySink {
            failures: Rc::clone(&failures),
            attempts: Rc::clone(&attempts),
        };
        let (mut c, mut r) = controller_with(Box::new(sink));
        let mut playlist = PlaylistStore::new();
        let ids = playlist.append(vec![tone("A", 400), tone("B", 400)]);
        c.play_track(&mut playlist, ids[0]).unwrap();

        failures.set(1);
        render(&mut r, 1000);
        let err = c.poll(&mut playlist).unwrap_err();

        assert!(matches!(err, PlayerError::Audio(AudioError::DeviceUnavailable(_))));
        assert_eq!(c.state(), PlaybackState::Paused);
        assert_eq!(c.current(), Some(ids[1]));
        assert_eq!(c.position(), 0.0);

        c.play().unwrap();
        assert!(c.is_playing());
    }

    #[test]
    fn test_failed_load_keeps_current_track() {
        let (mut c, _r, mut playlist, _) = setup(&[]);
        let ids = playlist.append(vec![tone("A", 400), undecodable("Bad")]);
        c.play_track(&mut playlist, ids[0]).unwrap();

        let err = c.play_track(&mut playlist, ids[1]).unwrap_err();
        assert!(matches!(err, PlayerError::Audio(AudioError::UnsupportedSource(_))));
        assert_eq!(c.current(), Some(ids[0]));
        assert_eq!(c.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_previous_wraps_regardless_of_shuffle() {
        let (mut c, _r, mut playlist, ids) = setup(&["A", "B", "C"]);
        c.set_shuffle(true);
        c.play_track(&mut playlist, ids[0]).unwrap();
        c.previous(&mut playlist).unwrap();
        assert_eq!(c.current(), Some(ids[2]));
        c.previous(&mut playlist).unwrap();
        assert_eq!(c.current(), Some(ids[1]));
    }

    #[test]
    fn test_next_wraps_and_starts_at_head() {
        let (mut c, _r, mut playlist, ids) = setup(&["A", "B", "C"]);
        c.next(&mut playlist).unwrap();
        assert_eq!(c.current(), Some(ids[0]));

        c.play_track(&mut playlist, ids[2]).unwrap();
        c.next(&mut playlist).unwrap();
        assert_eq!(c.current(), Some(ids[0]));

        let mut empty = PlaylistStore::new();
        let (mut idle, _r2) = controller_with(Box::new(NullSink::new()));
        idle.next(&mut empty).unwrap();
        assert_eq!(idle.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_stale_play_completion_dropped() {
        let (mut c, _r, mut playlist, ids) = setup(&["A"]);
        c.play_track(&mut playlist, ids[0]).unwrap();
        c.pause().unwrap();

        let request = c.begin_play().unwrap();
        c.pause().unwrap();
        c.finish_play(request, Ok(())).unwrap();
        assert_eq!(c.state(), PlaybackState::Paused);
    }

    #[test]
    fn test_device_unavailable_retried_once_on_next_play() {
        let failures = Rc::new(Cell::new(2));
        let attempts = Rc::new(Cell::new(0));
        let sink = FlakySink {
            failures: Rc::clone(&failures),
            attempts: Rc::clone(&attempts),
        };
        let (mut c, _r) = controller_with(Box::new(sink));
        let mut playlist = PlaylistStore::new();
        let ids = playlist.append(vec![tone("A", 400)]);

        let err = c.play_track(&mut playlist, ids[0]).unwrap_err();
        assert!(matches!(err, PlayerError::Audio(AudioError::DeviceUnavailable(_))));
        assert_eq!(c.state(), PlaybackState::Paused);
        assert_eq!(c.current(), Some(ids[0]));
        assert_eq!(attempts.get(), 1);

        // One failure left: the automatic retry absorbs it
        c.play().unwrap();
        assert_eq!(attempts.get(), 3);
        assert!(c.is_playing());
    }

    #[test]
    fn test_device_unavailable_surfaces_after_retry() {
        let failures = Rc::new(Cell::new(5));
        let attempts = Rc::new(Cell::new(0));
        let sink = FlakySink {
            failures: Rc::clone(&failures),
            attempts: Rc::clone(&attempts),
        };
        let (mut c, _r) = controller_with(Box::new(sink));
        let mut playlist = PlaylistStore::new();
        let ids = playlist.append(vec![tone("A", 400)]);

        assert!(c.play_track(&mut playlist, ids[0]).is_err());
        assert!(c.play().is_err());
        assert_eq!(attempts.get(), 3);
        assert!(!c.is_playing());
    }

    #[test]
    fn test_seek_clamps_and_leaves_ended() {
        let (mut c, mut r, mut playlist, ids) = setup(&["A"]);
        assert_eq!(c.seek(1.0), Err(PlayerError::NothingLoaded));

        c.play_track(&mut playlist, ids[0]).unwrap();
        render(&mut r, 1000);
        c.poll(&mut playlist).unwrap();
        assert_eq!(c.state(), PlaybackState::Ended);

        assert_eq!(c.seek(10.0).unwrap(), c.duration());
        assert_eq!(c.state(), PlaybackState::Paused);
        assert_eq!(c.seek(0.02).unwrap(), 0.02);
        assert_eq!(c.position(), 0.02);
    }

    #[test]
    fn test_toggle_from_ended_restarts() {
        let (mut c, mut r, mut playlist, ids) = setup(&["A"]);
        c.toggle().unwrap();
        assert_eq!(c.state(), PlaybackState::Idle);

        c.play_track(&mut playlist, ids[0]).unwrap();
        render(&mut r, 1000);
        c.poll(&mut playlist).unwrap();
        assert_eq!(c.state(), PlaybackState::Ended);

        c.toggle().unwrap();
        assert!(c.is_playing());
        assert_eq!(c.position(), 0.0);

        c.toggle().unwrap();
        assert_eq!(c.state(), PlaybackState::Paused);
    }

    #[test]
    fn test_pause_freezes_position() {
        let (mut c, mut r, mut playlist, ids) = setup(&["A"]);
        c.play_track(&mut playlist, ids[0]).unwrap();
        render(&mut r, 100);
        c.poll(&mut playlist).unwrap();
        c.pause().unwrap();
        render(&mut r, 100);
        c.poll(&mut playlist).unwrap();
        let frozen = c.position();
        render(&mut r, 100);
        c.poll(&mut playlist).unwrap();

        assert_eq!(c.position(), frozen);
        assert!((frozen - 100.0 / SR as f64).abs() < 1e-9);
    }

    #[test]
    fn test_handle_removed_stops_current_only() {
        let (mut c, _r, mut playlist, ids) = setup(&["A", "B"]);
        c.play_track(&mut playlist, ids[0]).unwrap();

        assert!(!c.handle_removed(ids[1]).unwrap());
        assert!(c.is_playing());

        assert!(c.handle_removed(ids[0]).unwrap());
        assert_eq!(c.state(), PlaybackState::Idle);
        assert_eq!(c.current(), None);
        assert!(!c.graph().is_loaded());
    }
}
