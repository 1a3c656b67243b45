#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use glimpse_scribe::{EngineOutput, InferenceParams, Segment, TranscribeError, TranscriptionEngine};

/// Write a 16-bit PCM WAV of `seconds` of a quiet tone.
pub fn write_wav(path: &Path, sample_rate: u32, channels: u16, seconds: f64) -> PathBuf {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let frames = (f64::from(sample_rate) * seconds).round() as u32;
    let mut writer = hound::WavWriter::create(path, spec).expect("wav file should be created");
    for i in 0..frames {
        let t = f64::from(i) / f64::from(sample_rate);
        let sample = ((t * 440.0 * std::f64::consts::TAU).sin() * 1000.0) as i16;
        for _ in 0..channels {
            writer.write_sample(sample).expect("sample should be written");
        }
    }
    writer.finalize().expect("wav should be finalized");

    path.to_path_buf()
}

/// Engine returning a canned output and recording what it was asked.
#[derive(Clone)]
pub struct StubEngine {
    pub output: Result<EngineOutput, String>,
    pub calls: Arc<Mutex<Vec<(usize, InferenceParams)>>>,
}

impl StubEngine {
    pub fn returning(output: EngineOutput) -> Self {
        Self {
            output: Ok(output),
            calls: Arc::default(),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            output: Err(message.to_string()),
            calls: Arc::default(),
        }
    }
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::returning(hello_world())
    }
}

impl TranscriptionEngine for StubEngine {
    type ModelParams = ();

    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        _params: (),
    ) -> Result<(), TranscribeError> {
        if model_path.is_file() {
            Ok(())
        } else {
            Err(TranscribeError::ModelNotAvailable(format!(
                "Model file not found: {}",
                model_path.display()
            )))
        }
    }

    fn unload_model(&mut self) {}

    fn transcribe_samples(
        &mut self,
        samples: &[f32],
        params: &InferenceParams,
    ) -> Result<EngineOutput, TranscribeError> {
        self.calls.lock().unwrap().push((samples.len(), params.clone()));
        self.output.clone().map_err(TranscribeError::Inference)
    }
}

/// The canonical "hello world" backend output.
pub fn hello_world() -> EngineOutput {
    EngineOutput {
        text: "hello world".to_string(),
        language: Some("en".to_string()),
        segments: vec![
            Segment::new(0.0, 4.5, " hello "),
            Segment::new(4.5, 10.0, "world "),
        ],
    }
}

/// Provider closure that counts how many times it loads.
pub fn counting_provider(
    engine: StubEngine,
    loads: Arc<AtomicUsize>,
) -> impl Fn() -> Result<StubEngine, TranscribeError> {
    move || {
        let _ = loads.fetch_add(1, Ordering::SeqCst);
        Ok(engine.clone())
    }
}
