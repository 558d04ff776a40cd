//! Track identity and playlist entries

use aural_audio::SourceHandle;
use std::fmt;
use std::path::Path;

/// Stable playlist-unique track identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A track owned by the playlist
#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub source: SourceHandle,
    /// Seconds, known once the track has been loaded
    pub duration: Option<f64>,
}

/// A track about to be appended (no id yet)
#[derive(Debug, Clone)]
pub struct NewTrack {
    pub name: String,
    pub source: SourceHandle,
    pub artist: Option<String>,
    pub album: Option<String>,
}

impl NewTrack {
    pub fn new(name: impl Into<String>, source: SourceHandle) -> Self {
        Self {
            name: name.into(),
            source,
            artist: None,
            album: None,
        }
    }

    /// Entry for a file on disk, named after the file
    pub fn from_path(path: &Path) -> Self {
        Self::new(
            display_name_from_path(path),
            SourceHandle::Path(path.to_path_buf()),
        )
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }
}

/// File name without its last extension ("song.mp3" -> "song")
pub fn display_name_from_path(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_drops_extension() {
        assert_eq!(display_name_from_path(Path::new("song.mp3")), "song");
        assert_eq!(
            display_name_from_path(Path::new("/music/Artist - Title.flac")),
            "Artist - Title"
        );
        assert_eq!(display_name_from_path(Path::new("a.b.ogg")), "a.b");
        assert_eq!(display_name_from_path(Path::new("noext")), "noext");
    }

    #[test]
    fn test_new_track_from_path() {
        let track = NewTrack::from_path(Path::new("/tmp/intro.wav")).with_artist("Someone");
        assert_eq!(track.name, "intro");
        assert_eq!(track.artist.as_deref(), Some("Someone"));
        assert!(matches!(track.source, SourceHandle::Path(_)));
    }

    #[test]
    fn test_track_id_display() {
        assert_eq!(TrackId(7).to_string(), "#7");
    }
}
