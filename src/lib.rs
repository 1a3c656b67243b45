pub mod audio;
pub mod engines;
pub mod error;
pub mod model;
pub mod options;
pub mod progress;
pub mod speech;
pub mod task;
pub mod timecode;
pub mod transcript;
pub mod writer;

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

pub use error::{ResultExt, TranscribeError};
pub use options::{InferenceParams, Task, TranscribeOptions};
pub use progress::{NoProgress, ProgressEvent, ProgressSink};
pub use speech::{SaveRequest, SavedTranscript, SpeechEngine};
pub use transcript::{Segment, TranscriptResult};
pub use writer::OutputFormat;

/// Raw output of a recognition backend, before segment text is normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineOutput {
    pub text: String,
    /// Language the backend detected or used, when it reports one.
    pub language: Option<String>,
    pub segments: Vec<Segment>,
}

pub trait TranscriptionEngine {
    type ModelParams: Default;

    /// Load with default model params.
    fn load_model(&mut self, model_path: &Path) -> Result<(), TranscribeError> {
        self.load_model_with_params(model_path, Self::ModelParams::default())
    }

    /// Load with explicit model params.
    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), TranscribeError>;

    fn unload_model(&mut self);

    /// Transcribe already-decoded samples (16 kHz, mono, f32 in [-1, 1]).
    fn transcribe_samples(
        &mut self,
        samples: &[f32],
        params: &InferenceParams,
    ) -> Result<EngineOutput, TranscribeError>;

    /// Transcribe any file [`audio::decode_audio_file`] can read.
    fn transcribe_file(
        &mut self,
        audio_path: &Path,
        params: &InferenceParams,
    ) -> Result<EngineOutput, TranscribeError> {
        let samples = audio::decode_audio_file(audio_path)?;
        self.transcribe_samples(&samples, params)
    }
}

/// Produces a ready-to-use engine. [`SpeechEngine`] calls it at most once.
pub trait ModelProvider {
    type Engine: TranscriptionEngine;

    fn load(&self) -> Result<Self::Engine, TranscribeError>;
}

impl<F, E> ModelProvider for F
where
    F: Fn() -> Result<E, TranscribeError>,
    E: TranscriptionEngine,
{
    type Engine = E;

    fn load(&self) -> Result<E, TranscribeError> {
        self()
    }
}

/// Loads a default-constructed engine from a model file.
pub struct FileModelProvider<E: TranscriptionEngine> {
    model_path: PathBuf,
    params: E::ModelParams,
    _engine: PhantomData<fn() -> E>,
}

impl<E: TranscriptionEngine> FileModelProvider<E> {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self::with_params(model_path, E::ModelParams::default())
    }

    pub fn with_params(model_path: impl Into<PathBuf>, params: E::ModelParams) -> Self {
        Self {
            model_path: model_path.into(),
            params,
            _engine: PhantomData,
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl<E> ModelProvider for FileModelProvider<E>
where
    E: TranscriptionEngine + Default,
    E::ModelParams: Clone,
{
    type Engine = E;

    fn load(&self) -> Result<E, TranscribeError> {
        let mut engine = E::default();
        engine.load_model_with_params(&self.model_path, self.params.clone())?;
        Ok(engine)
    }
}
