//! Ordered, mutable track list
//!
//! The store owns every [`Track`]; everything else refers to tracks by
//! [`TrackId`], so reordering never invalidates a reference.

use crate::track::{NewTrack, Track, TrackId};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Errors from playlist edits
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaylistError {
    #[error("Index {index} out of range for playlist of {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Track {0} is not in the playlist")]
    UnknownTrack(TrackId),
}

/// What happens when playback reaches the end of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    #[default]
    Off,
    /// Replay the current track
    One,
    /// Wrap around to the first track after the last
    All,
}

impl RepeatMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RepeatMode::Off => "off",
            RepeatMode::One => "one",
            RepeatMode::All => "all",
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepeatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(RepeatMode::Off),
            "one" => Ok(RepeatMode::One),
            "all" => Ok(RepeatMode::All),
            other => Err(format!("unknown repeat mode '{}'", other)),
        }
    }
}

/// The playlist
#[derive(Debug, Default)]
pub struct PlaylistStore {
    tracks: Vec<Track>,
    next_id: u64,
}

impl PlaylistStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append entries in order, returning their fresh ids
    pub fn append(&mut self, entries: Vec<NewTrack>) -> Vec<TrackId> {
        let mut ids = Vec::with_capacity(entries.len());
        for entry in entries {
            self.next_id += 1;
            let id = TrackId(self.next_id);
            self.tracks.push(Track {
                id,
                name: entry.name,
                artist: entry.artist,
                album: entry.album,
                source: entry.source,
                duration: None,
            });
            ids.push(id);
        }
        debug!(added = ids.len(), total = self.tracks.len(), "Tracks appended");
        ids
    }

    /// Remove a track by id, returning it
    pub fn remove(&mut self, id: TrackId) -> Result<Track, PlaylistError> {
        let index = self.index_of(id).ok_or(PlaylistError::UnknownTrack(id))?;
        Ok(self.tracks.remove(index))
    }

    /// Move the track at `from` so it ends up at `to`, shifting the others
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), PlaylistError> {
        let len = self.tracks.len();
        for index in [from, to] {
            if index >= len {
                return Err(PlaylistError::IndexOutOfRange { index, len });
            }
        }
        let track = self.tracks.remove(from);
        self.tracks.insert(to, track);
        Ok(())
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn index_of(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    pub fn track_at(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Track following `id` in order, if any
    pub fn after(&self, id: TrackId) -> Option<TrackId> {
        let index = self.index_of(id)?;
        self.tracks.get(index + 1).map(|t| t.id)
    }

    /// Track preceding `id` in order, if any
    pub fn before(&self, id: TrackId) -> Option<TrackId> {
        let index = self.index_of(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.tracks.get(i))
            .map(|t| t.id)
    }

    pub fn ids(&self) -> Vec<TrackId> {
        self.tracks.iter().map(|t| t.id).collect()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Record the duration learned at load time. Returns false for unknown ids.
    pub fn set_duration(&mut self, id: TrackId, seconds: f64) -> bool {
        match self.tracks.iter_mut().find(|t| t.id == id) {
            Some(track) => {
                track.duration = Some(seconds);
                true
            }
            None => false,
        }
    }
}
