use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::error::{ResultExt, TranscribeError};
use crate::model::{self, ModelSize};
use crate::options::{InferenceParams, Task};
use crate::transcript::Segment;
use crate::{EngineOutput, ModelProvider, TranscriptionEngine};

/// whisper.cpp reports segment times in centiseconds.
const CENTISECONDS_PER_SECOND: f64 = 100.0;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WhisperModelParams {
    pub use_gpu: bool,
}

impl Default for WhisperModelParams {
    fn default() -> Self {
        Self { use_gpu: true }
    }
}

/// whisper.cpp through whisper-rs.
///
/// Recognised `extra` keys: `temperature` (number), `beam_size` (integer,
/// switches to beam search), `n_threads` (integer), `no_context` (bool).
/// Other keys are logged and ignored.
#[derive(Default)]
pub struct WhisperEngine {
    loaded_model_path: Option<PathBuf>,
    context: Option<WhisperContext>,
}

impl WhisperEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TranscriptionEngine for WhisperEngine {
    type ModelParams = WhisperModelParams;

    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), TranscribeError> {
        if !model_path.is_file() {
            return Err(TranscribeError::ModelNotAvailable(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }

        let path = model_path
            .to_str()
            .ok_or_else(|| TranscribeError::ModelNotAvailable("model path is not UTF-8".into()))?;

        let mut context_params = WhisperContextParameters::default();
        let _ = context_params.use_gpu(params.use_gpu);

        info!("loading whisper model from {}", model_path.display());
        let context = WhisperContext::new_with_params(path, context_params).model("whisper load")?;

        self.loaded_model_path = Some(model_path.to_path_buf());
        self.context = Some(context);
        Ok(())
    }

    fn unload_model(&mut self) {
        self.loaded_model_path = None;
        self.context = None;
    }

    fn transcribe_samples(
        &mut self,
        samples: &[f32],
        params: &InferenceParams,
    ) -> Result<EngineOutput, TranscribeError> {
        let (Some(context), Some(model_path)) = (&self.context, &self.loaded_model_path) else {
            return Err(TranscribeError::ModelNotAvailable(
                "Model not loaded. Call load_model() first.".into(),
            ));
        };
        debug!(
            "running {} on {} samples",
            model_path.display(),
            samples.len()
        );

        let strategy = match extra_u64(params, "beam_size") {
            Some(beam_size) => SamplingStrategy::BeamSearch {
                beam_size: beam_size as i32,
                patience: -1.0,
            },
            None => SamplingStrategy::Greedy { best_of: 1 },
        };

        let language = params.language.as_deref().unwrap_or("auto");
        let mut full_params = FullParams::new(strategy);
        full_params.set_language(Some(language));
        full_params.set_translate(params.task == Task::Translate);
        full_params.set_token_timestamps(params.word_timestamps);
        full_params.set_print_special(false);
        full_params.set_print_progress(false);
        full_params.set_print_realtime(false);
        full_params.set_print_timestamps(false);
        if let Some(prompt) = params.initial_prompt.as_deref() {
            full_params.set_initial_prompt(prompt);
        }
        apply_extra(&mut full_params, params);

        let mut state = context.create_state().inference("whisper state init")?;
        state.full(full_params, samples).inference("whisper full")?;

        let n_segments = state.full_n_segments().inference("segment count")?;
        let mut segments = Vec::with_capacity(n_segments.max(0) as usize);
        for i in 0..n_segments {
            let text = state.full_get_segment_text(i).inference("segment text")?;
            let t0 = state.full_get_segment_t0(i).inference("segment start")?;
            let t1 = state.full_get_segment_t1(i).inference("segment end")?;
            segments.push(Segment {
                start: t0 as f64 / CENTISECONDS_PER_SECOND,
                end: t1 as f64 / CENTISECONDS_PER_SECOND,
                text,
            });
        }

        let text = segments.iter().map(|seg| seg.text.as_str()).collect::<String>();
        let detected = state
            .full_lang_id_from_state()
            .ok()
            .and_then(whisper_rs::get_lang_str)
            .map(str::to_string);
        debug!(
            "whisper produced {} segments, language={detected:?}",
            segments.len()
        );

        Ok(EngineOutput {
            text,
            language: detected,
            segments,
        })
    }
}

fn extra_u64(params: &InferenceParams, key: &str) -> Option<u64> {
    params.extra.get(key).and_then(Value::as_u64)
}

fn apply_extra(full_params: &mut FullParams<'_, '_>, params: &InferenceParams) {
    for (key, value) in &params.extra {
        match (key.as_str(), value) {
            ("beam_size", _) => {}
            ("temperature", Value::Number(n)) => {
                if let Some(t) = n.as_f64() {
                    full_params.set_temperature(t as f32);
                }
            }
            ("n_threads", Value::Number(n)) => {
                if let Some(threads) = n.as_u64() {
                    full_params.set_n_threads(threads as i32);
                }
            }
            ("no_context", Value::Bool(flag)) => full_params.set_no_context(*flag),
            _ => warn!("ignoring unsupported whisper parameter {key}={value}"),
        }
    }
}

/// Loads a whisper model resolved by [`model::resolve_model_path`].
#[derive(Debug, Clone, Default)]
pub struct WhisperModelProvider {
    pub model_path: Option<PathBuf>,
    pub size: ModelSize,
    pub params: WhisperModelParams,
}

impl WhisperModelProvider {
    pub fn new(size: ModelSize) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn from_path(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: Some(model_path.into()),
            ..Self::default()
        }
    }
}

impl ModelProvider for WhisperModelProvider {
    type Engine = WhisperEngine;

    fn load(&self) -> Result<WhisperEngine, TranscribeError> {
        let path = model::resolve_model_path(self.model_path.as_deref(), self.size)?;
        let mut engine = WhisperEngine::new();
        engine.load_model_with_params(&path, self.params.clone())?;
        Ok(engine)
    }
}
