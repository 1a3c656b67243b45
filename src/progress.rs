//! Progress reporting for long-running transcriptions.
//!
//! Sinks are called synchronously on the thread running the transcription.
//! Async consumers can pass an unbounded channel sender and read
//! [`ProgressEvent`]s on the other side.

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// Milestones reported by [`crate::SpeechEngine::transcribe`], in percent.
pub mod milestones {
    pub const LOADING_MODEL: f32 = 0.0;
    pub const ANALYZING_AUDIO: f32 = 10.0;
    pub const DURATION_KNOWN: f32 = 15.0;
    pub const TRANSCRIBING: f32 = 20.0;
    pub const POST_PROCESSING: f32 = 90.0;
    pub const DONE: f32 = 100.0;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub message: String,
    /// 0 to 100, non-decreasing within one call.
    pub percent: f32,
}

pub trait ProgressSink {
    fn report(&self, message: &str, percent: f32);
}

impl<F> ProgressSink for F
where
    F: Fn(&str, f32),
{
    fn report(&self, message: &str, percent: f32) {
        self(message, percent);
    }
}

/// Discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _message: &str, _percent: f32) {}
}

impl ProgressSink for UnboundedSender<ProgressEvent> {
    fn report(&self, message: &str, percent: f32) {
        // Receiver may be gone.
        let _ = self.send(ProgressEvent {
            message: message.to_string(),
            percent,
        });
    }
}
