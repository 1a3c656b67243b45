use std::path::PathBuf;

use clap::Parser;
use glimpse_scribe::{
    engines::whisper::WhisperModelProvider, model::ModelSize, SaveRequest, SpeechEngine,
    TranscribeOptions,
};
use tracing_subscriber::EnvFilter;

/// Transcribe an audio or video file and save text and subtitle files.
#[derive(Parser)]
struct Args {
    /// Audio or video file (mp3, m4a, wav, mp4, webm).
    audio: PathBuf,
    /// Output directory. Defaults to the audio file's directory.
    output_dir: Option<PathBuf>,
    /// Model size, used when --model is not given.
    #[arg(long, default_value = "medium")]
    size: ModelSize,
    /// Explicit ggml model file.
    #[arg(long)]
    model: Option<PathBuf>,
    /// Language code, or "auto".
    #[arg(long, default_value = "zh")]
    language: String,
    /// Output formats: txt, timestamped, srt, vtt, json.
    #[arg(long, value_delimiter = ',', default_value = "txt,timestamped,srt,json")]
    formats: Vec<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    if !args.audio.is_file() {
        return Err(format!("File not found: {}", args.audio.display()).into());
    }

    let output_dir = args.output_dir.clone().unwrap_or_else(|| {
        args.audio
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    });

    let provider = WhisperModelProvider {
        model_path: args.model.clone(),
        size: args.size,
        ..Default::default()
    };
    let engine = SpeechEngine::new(provider);

    let request = SaveRequest::new(&args.audio, &output_dir)
        .formats(args.formats.clone())
        .options(TranscribeOptions::default().with_language(args.language.clone()));

    let progress = |message: &str, percent: f32| println!("[{percent:5.1}%] {message}");
    let saved = engine.transcribe_and_save(&request, &progress)?;

    println!("\nSaved files:");
    for (format, path) in &saved.files {
        println!("  {format}: {}", path.display());
    }

    println!("\nFirst 5 segments:");
    for segment in saved.result.segments.iter().take(5) {
        let preview: String = segment.text.chars().take(50).collect();
        println!("  [{}] {preview}", segment.start_formatted());
    }

    Ok(())
}
