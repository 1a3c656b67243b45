//! Whisper model sizes and model file resolution.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TranscribeError;

/// Environment variable pointing at a ggml model file.
pub const MODEL_PATH_ENV: &str = "GLIMPSE_WHISPER_MODEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    #[default]
    Medium,
    Large,
}

impl ModelSize {
    pub const ALL: [ModelSize; 5] = [
        ModelSize::Tiny,
        ModelSize::Base,
        ModelSize::Small,
        ModelSize::Medium,
        ModelSize::Large,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::Base => "base",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }

    /// Parameter count of the published checkpoint.
    pub fn parameters(self) -> &'static str {
        match self {
            Self::Tiny => "39M",
            Self::Base => "74M",
            Self::Small => "244M",
            Self::Medium => "769M",
            Self::Large => "1550M",
        }
    }

    /// Approximate memory needed for inference.
    pub fn memory(self) -> &'static str {
        match self {
            Self::Tiny | Self::Base => "~1GB",
            Self::Small => "~2GB",
            Self::Medium => "~5GB",
            Self::Large => "~10GB",
        }
    }

    /// Speed relative to `large`.
    pub fn relative_speed(self) -> u32 {
        match self {
            Self::Tiny => 32,
            Self::Base => 16,
            Self::Small => 6,
            Self::Medium => 2,
            Self::Large => 1,
        }
    }

    /// whisper.cpp model file name, e.g. `ggml-medium.bin`.
    pub fn ggml_file_name(self) -> String {
        format!("ggml-{}.bin", self.as_str())
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelSize {
    type Err = TranscribeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|size| size.as_str() == normalized)
            .ok_or_else(|| {
                TranscribeError::ModelNotAvailable(format!(
                    "unknown model size {value:?}, expected one of tiny, base, small, medium, large"
                ))
            })
    }
}

/// Default model directory, `$HOME/.glimpse/models`.
pub fn default_model_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home).join(".glimpse").join("models")
}

/// Resolve the model file to load.
///
/// Order: `explicit`, then [`MODEL_PATH_ENV`], then
/// `default_model_dir()/ggml-{size}.bin`. The chosen file must exist.
pub fn resolve_model_path(
    explicit: Option<&Path>,
    size: ModelSize,
) -> Result<PathBuf, TranscribeError> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(TranscribeError::ModelNotAvailable(format!(
            "model file does not exist: {}",
            path.display()
        )));
    }

    if let Ok(path) = std::env::var(MODEL_PATH_ENV) {
        let candidate = PathBuf::from(path.trim());
        if candidate.is_file() {
            debug!("using model from {MODEL_PATH_ENV}: {}", candidate.display());
            return Ok(candidate);
        }
    }

    let candidate = default_model_dir().join(size.ggml_file_name());
    if candidate.is_file() {
        return Ok(candidate);
    }

    Err(TranscribeError::ModelNotAvailable(format!(
        "no {size} model found. Place {} in {}, set {MODEL_PATH_ENV}, or pass a model path",
        size.ggml_file_name(),
        default_model_dir().display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sizes_case_insensitively() {
        assert_eq!("Medium".parse::<ModelSize>().unwrap(), ModelSize::Medium);
        assert_eq!(" tiny ".parse::<ModelSize>().unwrap(), ModelSize::Tiny);
        assert!("huge".parse::<ModelSize>().is_err());
    }

    #[test]
    fn size_table_is_ordered_by_speed() {
        let speeds: Vec<u32> = ModelSize::ALL.iter().map(|s| s.relative_speed()).collect();
        assert!(speeds.windows(2).all(|w| w[0] > w[1]), "got {speeds:?}");
        assert_eq!(ModelSize::Large.parameters(), "1550M");
        assert_eq!(ModelSize::Small.memory(), "~2GB");
    }

    #[test]
    fn ggml_file_names_are_stable() {
        assert_eq!(ModelSize::Base.ggml_file_name(), "ggml-base.bin");
        assert_eq!(ModelSize::default().ggml_file_name(), "ggml-medium.bin");
    }

    #[test]
    fn explicit_model_path_must_exist() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("ggml-nope.bin");
        let error = resolve_model_path(Some(&missing), ModelSize::Tiny).unwrap_err();
        assert_eq!(error.kind(), "model");

        let present = tmp.path().join("ggml-tiny.bin");
        std::fs::write(&present, b"weights").unwrap();
        assert_eq!(
            resolve_model_path(Some(&present), ModelSize::Tiny).unwrap(),
            present
        );
    }

    #[test]
    fn default_model_dir_under_glimpse() {
        let dir = default_model_dir();
        assert!(dir.ends_with(".glimpse/models"), "got {}", dir.display());
    }
}
