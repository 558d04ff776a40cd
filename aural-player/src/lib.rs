//! Playback control for Aural
//!
//! Ties the playlist, the transport state machine and the audio graph
//! together behind a single [`Session`].

mod controller;
mod session;
mod settings;

pub use aural_library::RepeatMode;
pub use controller::{PlayRequest, PlaybackController, PlaybackState, PlayerError};
pub use session::{PlayerSnapshot, Session};
pub use settings::{format_time, EffectsState, EqState};
