//! Error taxonomy for the transcription pipeline.

use std::path::PathBuf;

use crate::writer::OutputFormat;

/// Errors that can occur while transcribing or persisting a transcript.
#[derive(Debug, thiserror::Error)]
pub enum TranscribeError {
    /// Audio file missing, unreadable, empty, or not a file.
    #[error("invalid input {}: {message}", .path.display())]
    Input { path: PathBuf, message: String },

    /// Unsupported container or codec, corrupt data, or zero-length audio.
    #[error("audio decode error: {0}")]
    Decode(String),

    /// Model file missing or failed to load.
    #[error("model not available: {0}")]
    ModelNotAvailable(String),

    /// The recognition backend failed; carries the backend's own message.
    #[error("inference error: {0}")]
    Inference(String),

    /// Output directory could not be created.
    #[error("failed to create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing one output format failed. Formats written earlier stay on disk.
    #[error("failed to write {format} output to {}: {source}", .path.display())]
    Write {
        format: OutputFormat,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize transcript: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl TranscribeError {
    /// Stable short name for status surfaces and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input { .. } => "input",
            Self::Decode(_) => "decode",
            Self::ModelNotAvailable(_) => "model",
            Self::Inference(_) => "inference",
            Self::OutputDir { .. } | Self::Write { .. } => "write",
            Self::Serialize(_) => "serialize",
        }
    }

    /// The output format that failed to write, if this is a per-format write error.
    pub fn failed_format(&self) -> Option<OutputFormat> {
        match self {
            Self::Write { format, .. } => Some(*format),
            _ => None,
        }
    }

    pub(crate) fn input(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Input {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Extension trait wrapping foreign errors with a context prefix.
pub trait ResultExt<T> {
    /// Wrap the error as [`TranscribeError::Decode`].
    fn decode(self, context: &str) -> Result<T, TranscribeError>;
    /// Wrap the error as [`TranscribeError::Inference`].
    fn inference(self, context: &str) -> Result<T, TranscribeError>;
    /// Wrap the error as [`TranscribeError::ModelNotAvailable`].
    fn model(self, context: &str) -> Result<T, TranscribeError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn decode(self, context: &str) -> Result<T, TranscribeError> {
        self.map_err(|e| TranscribeError::Decode(format!("{context}: {e}")))
    }
    fn inference(self, context: &str) -> Result<T, TranscribeError> {
        self.map_err(|e| TranscribeError::Inference(format!("{context}: {e}")))
    }
    fn model(self, context: &str) -> Result<T, TranscribeError> {
        self.map_err(|e| TranscribeError::ModelNotAvailable(format!("{context}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_prefixed() {
        let result: Result<(), String> = Err("bad header".into());
        let error = result.decode("probe").unwrap_err();
        assert_eq!(error.to_string(), "audio decode error: probe: bad header");
        assert_eq!(error.kind(), "decode");
    }

    #[test]
    fn write_error_names_format() {
        let error = TranscribeError::Write {
            format: OutputFormat::Json,
            path: PathBuf::from("/tmp/out/talk.json"),
            source: std::io::Error::other("disk full"),
        };
        assert_eq!(error.failed_format(), Some(OutputFormat::Json));
        assert_eq!(error.kind(), "write");
        let message = error.to_string();
        assert!(message.contains("json"), "got: {message}");
        assert!(message.contains("disk full"), "got: {message}");
    }

    #[test]
    fn inference_keeps_backend_message() {
        let error: Result<(), _> = Err("CUDA out of memory");
        let error = error.inference("whisper full").unwrap_err();
        assert!(error.to_string().contains("CUDA out of memory"));
        assert_eq!(error.failed_format(), None);
    }
}
