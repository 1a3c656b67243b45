//! Rendering transcripts to files.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::TranscribeError;
use crate::transcript::TranscriptResult;

/// Output formats, ordered the way they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Txt,
    Timestamped,
    Srt,
    Vtt,
    Json,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Txt,
        OutputFormat::Timestamped,
        OutputFormat::Srt,
        OutputFormat::Vtt,
        OutputFormat::Json,
    ];

    /// Formats written when the caller does not choose. WebVTT is opt-in.
    pub const DEFAULTS: [OutputFormat; 4] = [
        OutputFormat::Txt,
        OutputFormat::Timestamped,
        OutputFormat::Srt,
        OutputFormat::Json,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Timestamped => "timestamped",
            Self::Srt => "srt",
            Self::Vtt => "vtt",
            Self::Json => "json",
        }
    }

    /// Appended to the audio file stem to build the output file name.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Txt => ".txt",
            Self::Timestamped => "_timestamped.txt",
            Self::Srt => ".srt",
            Self::Vtt => ".vtt",
            Self::Json => ".json",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|format| format.as_str() == name)
    }

    /// Recognised formats from `names`, deduplicated, in write order.
    /// Unknown names are skipped with a warning.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Vec<Self> {
        let mut formats: Vec<Self> = names
            .iter()
            .filter_map(|name| {
                let name = name.as_ref();
                let parsed = Self::parse(name);
                if parsed.is_none() {
                    warn!("ignoring unknown output format {name:?}");
                }
                parsed
            })
            .collect();
        formats.sort_unstable();
        formats.dedup();
        formats
    }

    pub fn render(self, result: &TranscriptResult) -> Result<String, TranscribeError> {
        Ok(match self {
            Self::Txt => result.to_plain_text().to_string(),
            Self::Timestamped => result.to_timestamped_text(),
            Self::Srt => result.to_srt(),
            Self::Vtt => result.to_vtt(),
            Self::Json => result.to_json()?,
        })
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{output_dir}/{stem}{suffix}` for `audio_path`'s file stem.
pub fn output_path(audio_path: &Path, output_dir: &Path, format: OutputFormat) -> PathBuf {
    let stem = audio_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(format!("{stem}{}", format.suffix()))
}

/// Write `formats` for `result` and return the written paths.
///
/// Creates `output_dir` (with parents) first. On a write failure the error
/// names the failing format; files written before it are left in place.
pub fn save_transcript(
    result: &TranscriptResult,
    audio_path: &Path,
    output_dir: &Path,
    formats: &[OutputFormat],
) -> Result<BTreeMap<OutputFormat, PathBuf>, TranscribeError> {
    std::fs::create_dir_all(output_dir).map_err(|source| TranscribeError::OutputDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let mut ordered = formats.to_vec();
    ordered.sort_unstable();
    ordered.dedup();

    let mut files = BTreeMap::new();
    for format in ordered {
        let path = output_path(audio_path, output_dir, format);
        let contents = format.render(result)?;
        std::fs::write(&path, contents).map_err(|source| TranscribeError::Write {
            format,
            path: path.clone(),
            source,
        })?;
        debug!("wrote {format} to {}", path.display());
        let _ = files.insert(format, path);
    }

    Ok(files)
}
