//! Track library for Aural - playlist, decoding, folder scanning and config

mod config;
mod loader;
mod playlist;
mod scanner;
mod track;

pub use config::{Config, DEFAULT_VOLUME};
pub use loader::{read_metadata, LoadError, LoadedTrack, TrackLoader, TrackMetadata};
pub use playlist::{PlaylistError, PlaylistStore, RepeatMode};
pub use scanner::{collect_audio_files, expand_inputs, is_audio_file, ScanConfig, ScanError, AUDIO_EXTENSIONS};
pub use track::{display_name_from_path, NewTrack, Track, TrackId};
