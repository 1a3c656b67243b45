#[cfg(feature = "whisper")]
pub mod whisper;
