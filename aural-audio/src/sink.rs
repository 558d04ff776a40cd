//! Output device seam

use crate::AudioError;

/// An output device that pulls from the graph renderer once started.
///
/// `start` is called on every play request and must be idempotent.
pub trait OutputSink {
    fn start(&mut self) -> Result<(), AudioError>;

    /// Release the device; the renderer stops being called
    fn stop(&mut self);
}

/// Sink with no device behind it (tests, offline rendering)
#[derive(Debug, Default)]
pub struct NullSink {
    running: bool,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl OutputSink for NullSink {
    fn start(&mut self) -> Result<(), AudioError> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
    }
}
