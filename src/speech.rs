//! The transcription pipeline: lazy model load, decode, inference, mapping.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::audio;
use crate::error::TranscribeError;
use crate::options::{InferenceParams, TranscribeOptions};
use crate::progress::{milestones, ProgressSink};
use crate::transcript::{Segment, TranscriptResult};
use crate::writer::{self, OutputFormat};
use crate::{ModelProvider, TranscriptionEngine};

/// Turns audio files into [`TranscriptResult`]s.
///
/// The model is loaded from the provider on first use and kept for the life
/// of this value; later calls never reload it. The model lock is held for a
/// whole call, so at most one inference runs at a time per engine. Share one
/// `SpeechEngine` behind an `Arc` to share the model.
///
/// If a backend panics mid-call the model it was using is discarded and the
/// next call loads a fresh one.
pub struct SpeechEngine<P: ModelProvider> {
    provider: P,
    model: Mutex<Option<P::Engine>>,
}

/// Arguments for [`SpeechEngine::transcribe_and_save`].
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub audio_path: PathBuf,
    pub output_dir: PathBuf,
    /// Format names as given by the caller; unknown names are ignored.
    /// `None` selects [`OutputFormat::DEFAULTS`].
    pub formats: Option<Vec<String>>,
    pub options: TranscribeOptions,
}

impl SaveRequest {
    pub fn new(audio_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            audio_path: audio_path.into(),
            output_dir: output_dir.into(),
            formats: None,
            options: TranscribeOptions::default(),
        }
    }

    pub fn formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.formats = Some(formats.into_iter().map(Into::into).collect());
        self
    }

    pub fn options(mut self, options: TranscribeOptions) -> Self {
        self.options = options;
        self
    }

    fn resolved_formats(&self) -> Vec<OutputFormat> {
        match &self.formats {
            Some(names) => OutputFormat::parse_list(names),
            None => OutputFormat::DEFAULTS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavedTranscript {
    pub result: TranscriptResult,
    pub files: BTreeMap<OutputFormat, PathBuf>,
}

impl<P: ModelProvider> SpeechEngine<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            model: Mutex::new(None),
        }
    }

    /// Whether a usable model is cached. A model abandoned by a panicking
    /// call does not count.
    pub fn is_loaded(&self) -> bool {
        self.model.lock().is_ok_and(|guard| guard.is_some())
    }

    /// Load the model now instead of on the first transcription.
    pub fn preload(&self) -> Result<(), TranscribeError> {
        self.loaded_model().map(drop)
    }

    fn loaded_model(&self) -> Result<MutexGuard<'_, Option<P::Engine>>, TranscribeError> {
        let mut guard = match self.model.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("previous transcription panicked, discarding its model");
                let mut guard = poisoned.into_inner();
                *guard = None;
                self.model.clear_poison();
                guard
            }
        };
        if guard.is_none() {
            info!("loading transcription model...");
            *guard = Some(self.provider.load()?);
            info!("transcription model loaded");
        }
        Ok(guard)
    }

    /// Transcribe one audio file.
    ///
    /// Blocks for the whole inference. Progress is reported at fixed
    /// milestones (see [`milestones`]).
    pub fn transcribe(
        &self,
        audio_path: &Path,
        options: &TranscribeOptions,
        progress: &dyn ProgressSink,
    ) -> Result<TranscriptResult, TranscribeError> {
        audio::check_input(audio_path)?;

        report(progress, "loading model", milestones::LOADING_MODEL);
        let mut guard = self.loaded_model()?;
        let engine = guard
            .as_mut()
            .ok_or_else(|| TranscribeError::ModelNotAvailable("model missing after load".into()))?;

        report(progress, "analyzing audio", milestones::ANALYZING_AUDIO);
        let samples = audio::decode_audio_file(audio_path)?;
        let duration = audio::duration_seconds(&samples);
        report(
            progress,
            &format!("audio duration: {:.1} minutes", duration / 60.0),
            milestones::DURATION_KNOWN,
        );

        report(progress, "transcribing", milestones::TRANSCRIBING);
        let params = InferenceParams::from(options);
        if params.initial_prompt.is_some() {
            debug!("steering output toward simplified Chinese");
        }
        let output = engine.transcribe_samples(&samples, &params)?;
        drop(guard);

        report(progress, "processing results", milestones::POST_PROCESSING);
        let segments = output
            .segments
            .into_iter()
            .map(|seg| Segment {
                start: seg.start,
                end: seg.end,
                text: seg.text.trim().to_string(),
            })
            .collect::<Vec<_>>();

        let language = output
            .language
            .or_else(|| options.requested_language())
            .unwrap_or_default();

        report(progress, "transcription complete", milestones::DONE);
        info!(
            "transcribed {} ({:.1}s, {} segments, language={})",
            audio_path.display(),
            duration,
            segments.len(),
            language
        );

        Ok(TranscriptResult {
            text: output.text,
            language,
            duration,
            segments,
        })
    }

    /// Transcribe, then write each requested format into `request.output_dir`.
    /// Nothing is written if transcription fails.
    pub fn transcribe_and_save(
        &self,
        request: &SaveRequest,
        progress: &dyn ProgressSink,
    ) -> Result<SavedTranscript, TranscribeError> {
        let result = self.transcribe(&request.audio_path, &request.options, progress)?;
        let files = writer::save_transcript(
            &result,
            &request.audio_path,
            &request.output_dir,
            &request.resolved_formats(),
        )?;
        Ok(SavedTranscript { result, files })
    }
}

fn report(progress: &dyn ProgressSink, message: &str, percent: f32) {
    info!("{message} ({percent:.1}%)");
    progress.report(message, percent);
}
