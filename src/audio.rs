//! Audio loading: any supported container to 16 kHz mono f32 in [-1, 1].

use std::ffi::OsStr;
use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::error::{ResultExt, TranscribeError};

/// External decoder for formats symphonia cannot read.
const FFMPEG_PROGRAM: &str = "ffmpeg";

/// Sample rate every engine consumes.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Duration in seconds of decoded 16 kHz samples.
pub fn duration_seconds(samples: &[f32]) -> f64 {
    samples.len() as f64 / f64::from(TARGET_SAMPLE_RATE)
}

/// Decode an audio or video file to 16 kHz mono samples.
///
/// 16 kHz mono PCM16 WAV is read directly; anything else is probed with
/// symphonia, mixed down to mono and resampled. Containers or codecs
/// symphonia lacks (FLV, Opus in webm) go through `ffmpeg` when it is on
/// `PATH`.
pub fn decode_audio_file(path: &Path) -> Result<Vec<f32>, TranscribeError> {
    check_input(path)?;

    let samples = if is_native_wav(path) {
        debug!("reading native 16 kHz wav {}", path.display());
        read_wav_samples(path)?
    } else {
        decode_any(path, OsStr::new(FFMPEG_PROGRAM))?
    };

    if samples.is_empty() {
        return Err(TranscribeError::Decode(format!(
            "no audio samples decoded from {}",
            path.display()
        )));
    }
    Ok(samples)
}

/// Reject missing, unreadable, empty and non-file paths.
pub(crate) fn check_input(path: &Path) -> Result<(), TranscribeError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TranscribeError::input(path, "file not found")
        } else {
            TranscribeError::input(path, format!("unreadable: {e}"))
        }
    })?;
    if !metadata.is_file() {
        return Err(TranscribeError::input(path, "not a regular file"));
    }
    if metadata.len() == 0 {
        return Err(TranscribeError::input(path, "file is empty"));
    }
    Ok(())
}

fn decode_any(path: &Path, ffmpeg: &OsStr) -> Result<Vec<f32>, TranscribeError> {
    let reason = match decode_with_symphonia(path) {
        Err(TranscribeError::Decode(reason)) => reason,
        other => return other,
    };

    debug!("symphonia cannot decode {}: {reason}; trying ffmpeg", path.display());
    match decode_with_ffmpeg(path, ffmpeg) {
        Ok(Some(samples)) => Ok(samples),
        Ok(None) => Err(TranscribeError::Decode(format!(
            "{reason} (ffmpeg not installed)"
        ))),
        Err(TranscribeError::Decode(ffmpeg_reason)) => Err(TranscribeError::Decode(format!(
            "{reason}; {ffmpeg_reason}"
        ))),
        Err(e) => Err(e),
    }
}

fn is_native_wav(path: &Path) -> bool {
    let is_wav = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
    if !is_wav {
        return false;
    }
    hound::WavReader::open(path).is_ok_and(|reader| {
        let spec = reader.spec();
        spec.channels == 1
            && spec.sample_rate == TARGET_SAMPLE_RATE
            && spec.bits_per_sample == 16
            && spec.sample_format == hound::SampleFormat::Int
    })
}

/// Requirements: 16 kHz, mono, PCM int16 WAV file.
pub fn read_wav_samples(wav_path: &Path) -> Result<Vec<f32>, TranscribeError> {
    let mut reader = hound::WavReader::open(wav_path).decode("open wav")?;
    let spec = reader.spec();

    if spec.channels != 1 {
        return Err(TranscribeError::Decode(format!(
            "Expected 1 channel, found {}",
            spec.channels
        )));
    }

    if spec.sample_rate != TARGET_SAMPLE_RATE {
        return Err(TranscribeError::Decode(format!(
            "Expected {TARGET_SAMPLE_RATE} Hz sample rate, found {} Hz",
            spec.sample_rate
        )));
    }

    if spec.bits_per_sample != 16 {
        return Err(TranscribeError::Decode(format!(
            "Expected 16 bits per sample, found {}",
            spec.bits_per_sample
        )));
    }

    if spec.sample_format != hound::SampleFormat::Int {
        return Err(TranscribeError::Decode(format!(
            "Expected Int sample format, found {:?}",
            spec.sample_format
        )));
    }

    reader
        .samples::<i16>()
        .map(|sample| sample.map(|s| f32::from(s) / f32::from(i16::MAX)))
        .collect::<Result<Vec<f32>, _>>()
        .decode("read wav samples")
}

struct TrackDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
}

impl TrackDecoder {
    fn open(path: &Path) -> Result<Self, TranscribeError> {
        let file =
            File::open(path).map_err(|e| TranscribeError::input(path, format!("open: {e}")))?;
        let stream = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
            let _ = hint.with_extension(ext);
        }

        let format = symphonia::default::get_probe()
            .format(&hint, stream, &FormatOptions::default(), &MetadataOptions::default())
            .decode("probe failed")?
            .format;

        let track = format
            .default_track()
            .filter(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .or_else(|| format.tracks().iter().find(|t| t.codec_params.codec != CODEC_TYPE_NULL))
            .ok_or_else(|| TranscribeError::Decode("no audio track found".into()))?;
        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate.unwrap_or(TARGET_SAMPLE_RATE);

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .decode("codec init failed")?;

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
        })
    }

    /// Decode every packet of the track, mixed down to mono at the source rate.
    fn read_mono(mut self) -> Result<Vec<f32>, TranscribeError> {
        let mut mono = Vec::new();
        let mut buffer: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(TranscribeError::Decode(format!("packet read: {e}"))),
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    debug!("skipping corrupt packet: {e}");
                    continue;
                }
                Err(e) => return Err(TranscribeError::Decode(format!("decode: {e}"))),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count();
            let frames = decoded.capacity();
            if buffer.as_ref().map_or(true, |buf| buf.capacity() < frames * channels) {
                buffer = Some(SampleBuffer::new(frames as u64, spec));
            }
            let Some(buf) = buffer.as_mut() else {
                continue;
            };
            buf.copy_interleaved_ref(decoded);
            mix_to_mono(buf.samples(), channels, &mut mono);
        }

        Ok(mono)
    }
}

fn mix_to_mono(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    match channels {
        0 | 1 => out.extend_from_slice(interleaved),
        n => out.extend(
            interleaved
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32),
        ),
    }
}

fn decode_with_symphonia(path: &Path) -> Result<Vec<f32>, TranscribeError> {
    let track = TrackDecoder::open(path)?;
    let source_rate = track.sample_rate;
    let mono = track.read_mono()?;
    debug!(
        "decoded {} samples at {source_rate} Hz from {}",
        mono.len(),
        path.display()
    );

    if mono.is_empty() || source_rate == TARGET_SAMPLE_RATE {
        return Ok(mono);
    }
    resample(&mono, source_rate, TARGET_SAMPLE_RATE)
}

/// Decode through an external ffmpeg, the way whisper's own loader does.
///
/// Returns `Ok(None)` when the program cannot be started at all.
fn decode_with_ffmpeg(path: &Path, program: &OsStr) -> Result<Option<Vec<f32>>, TranscribeError> {
    let rate = TARGET_SAMPLE_RATE.to_string();
    let output = Command::new(program)
        .args(["-nostdin", "-threads", "0", "-i"])
        .arg(path)
        .args(["-f", "s16le", "-ac", "1", "-acodec", "pcm_s16le", "-ar", &rate, "-"])
        .stdin(Stdio::null())
        .output();

    let output = match output {
        Ok(output) => output,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(TranscribeError::Decode(format!("ffmpeg: {e}"))),
    };
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = stderr.lines().last().unwrap_or("").trim();
        return Err(TranscribeError::Decode(format!(
            "ffmpeg exited with {}: {reason}",
            output.status
        )));
    }

    Ok(Some(pcm_s16le_to_f32(&output.stdout)))
}

fn pcm_s16le_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32_768.0)
        .collect()
}

const RESAMPLE_CHUNK: usize = 1024;

/// Resample mono audio from `from_rate` to `to_rate`.
///
/// The output length tracks the input duration; padding added to fill the
/// last chunk is cut off.
pub fn resample(
    samples: &[f32],
    from_rate: u32,
    to_rate: u32,
) -> Result<Vec<f32>, TranscribeError> {
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let ratio = f64::from(to_rate) / f64::from(from_rate);
    let sinc = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler =
        SincFixedIn::<f32>::new(ratio, 1.0, sinc, RESAMPLE_CHUNK, 1).decode("resampler init")?;

    let expected_len = (samples.len() as f64 * ratio).round() as usize;
    let mut output = Vec::with_capacity(expected_len + RESAMPLE_CHUNK);
    let mut block = vec![0.0_f32; RESAMPLE_CHUNK];

    for chunk in samples.chunks(RESAMPLE_CHUNK) {
        block[..chunk.len()].copy_from_slice(chunk);
        block[chunk.len()..].fill(0.0);
        let frames = resampler.process(&[&block[..]], None).decode("resample")?;
        output.extend(frames.into_iter().flatten());
    }

    output.truncate(expected_len);
    Ok(output)
}
