//! Transcript values and their subtitle/text renderers.

use serde::{Deserialize, Serialize};

use crate::timecode;

/// Default threshold for [`TranscriptResult::merge_short_segments`], in seconds.
pub const DEFAULT_MIN_SEGMENT_DURATION: f64 = 3.0;

/// A time-bounded span of transcribed speech.
///
/// `end < start` is accepted as-is; [`Segment::duration`] is then negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment start time in seconds.
    pub start: f64,
    /// Segment end time in seconds.
    pub end: f64,
    pub text: String,
}

impl Segment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn start_formatted(&self) -> String {
        timecode::to_short(self.start)
    }

    pub fn end_formatted(&self) -> String {
        timecode::to_short(self.end)
    }
}

/// Full output of one transcription call.
///
/// `text` is the engine's own transcript and is not required to equal the
/// concatenation of segment texts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResult {
    pub text: String,
    pub language: String,
    /// Total source audio duration in seconds.
    pub duration: f64,
    pub segments: Vec<Segment>,
}

impl TranscriptResult {
    pub fn to_plain_text(&self) -> &str {
        &self.text
    }

    /// One `[start -> end] text` line per segment, no trailing newline.
    pub fn to_timestamped_text(&self) -> String {
        self.segments
            .iter()
            .map(|seg| {
                format!(
                    "[{} -> {}] {}",
                    seg.start_formatted(),
                    seg.end_formatted(),
                    seg.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_srt(&self) -> String {
        let mut lines = Vec::with_capacity(self.segments.len() * 4);
        for (index, seg) in self.segments.iter().enumerate() {
            lines.push((index + 1).to_string());
            lines.push(format!(
                "{} --> {}",
                timecode::to_srt(seg.start),
                timecode::to_srt(seg.end)
            ));
            lines.push(seg.text.trim().to_string());
            lines.push(String::new());
        }
        lines.join("\n")
    }

    pub fn to_vtt(&self) -> String {
        let mut lines = Vec::with_capacity(2 + self.segments.len() * 3);
        lines.push("WEBVTT".to_string());
        lines.push(String::new());
        for seg in &self.segments {
            lines.push(format!(
                "{} --> {}",
                timecode::to_vtt(seg.start),
                timecode::to_vtt(seg.end)
            ));
            lines.push(seg.text.trim().to_string());
            lines.push(String::new());
        }
        lines.join("\n")
    }

    /// Pretty-printed `{text, language, duration, segments}`. Segments carry
    /// only `start`, `end` and `text`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Segments fully contained in `[start, end]`. Overlapping segments that
    /// cross either boundary are excluded.
    pub fn segments_by_time(&self, start: f64, end: f64) -> Vec<&Segment> {
        self.segments
            .iter()
            .filter(|seg| seg.start >= start && seg.end <= end)
            .collect()
    }

    /// Collapse runs of short segments.
    ///
    /// Walks the segments keeping an accumulator. While the accumulator is
    /// shorter than `min_duration` it absorbs the next segment (its end and
    /// space-joined text); otherwise it is emitted and the next segment
    /// becomes the accumulator. The duration checked is always the
    /// accumulator's, never the incoming segment's.
    pub fn merge_short_segments(&self, min_duration: f64) -> TranscriptResult {
        let mut segments = self.segments.iter();
        let Some(first) = segments.next() else {
            return self.clone();
        };

        let mut merged = Vec::with_capacity(self.segments.len());
        let mut current = first.clone();

        for seg in segments {
            if current.duration() < min_duration {
                current = Segment {
                    start: current.start,
                    end: seg.end,
                    text: format!("{} {}", current.text, seg.text),
                };
            } else {
                merged.push(std::mem::replace(&mut current, seg.clone()));
            }
        }
        merged.push(current);

        TranscriptResult {
            text: self.text.clone(),
            language: self.language.clone(),
            duration: self.duration,
            segments: merged,
        }
    }
}
