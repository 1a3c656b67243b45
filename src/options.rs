//! Per-call transcription options and the parameters handed to a backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Initial prompt biasing Chinese output toward simplified characters.
///
/// This only steers the decoder; traditional characters can still appear.
pub const SIMPLIFIED_CHINESE_PROMPT: &str = "以下是普通话的句子，请使用简体中文输出。";

/// Language requested when the caller does not specify one.
pub const DEFAULT_LANGUAGE: &str = "zh";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Keep the spoken language.
    #[default]
    Transcribe,
    /// Translate to English.
    Translate,
}

impl Task {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transcribe => "transcribe",
            Self::Translate => "translate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscribeOptions {
    /// Language code. `None` or `"auto"` lets the engine detect it.
    pub language: Option<String>,
    pub task: Task,
    pub word_timestamps: bool,
    pub use_simplified_chinese: bool,
    /// Engine-specific parameters, passed through unvalidated.
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for TranscribeOptions {
    fn default() -> Self {
        Self {
            language: Some(DEFAULT_LANGUAGE.to_string()),
            task: Task::Transcribe,
            word_timestamps: false,
            use_simplified_chinese: true,
            extra: BTreeMap::new(),
        }
    }
}

impl TranscribeOptions {
    /// Options with auto-detected language.
    pub fn auto_detect() -> Self {
        Self {
            language: None,
            ..Self::default()
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Requested language as a lowercase code, with `"auto"` and blanks
    /// folded into `None`.
    ///
    /// Region suffixes are dropped and common English names map to their
    /// code, so `"Chinese"`, `"zh-CN"` and `"zh"` all yield `"zh"`.
    pub fn requested_language(&self) -> Option<String> {
        normalize_language(self.language.as_deref())
    }

    fn wants_simplified_chinese_prompt(&self) -> bool {
        self.use_simplified_chinese
            && matches!(self.requested_language().as_deref(), None | Some("zh"))
    }
}

fn normalize_language(value: Option<&str>) -> Option<String> {
    let raw = value?.trim();
    let base = raw.split(['-', '_']).next().unwrap_or(raw).trim();
    let normalized = base.to_ascii_lowercase();
    if normalized.is_empty() || normalized == "auto" {
        return None;
    }

    let code = match normalized.as_str() {
        "chinese" | "mandarin" => "zh",
        "english" => "en",
        "japanese" => "ja",
        "korean" => "ko",
        "cantonese" => "yue",
        "french" => "fr",
        "german" => "de",
        "spanish" => "es",
        "russian" => "ru",
        _ => return Some(normalized),
    };
    Some(code.to_string())
}

/// Parameters passed to a [`crate::TranscriptionEngine`] for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceParams {
    pub language: Option<String>,
    pub task: Task,
    pub word_timestamps: bool,
    pub initial_prompt: Option<String>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self::from(&TranscribeOptions::default())
    }
}

impl From<&TranscribeOptions> for InferenceParams {
    fn from(options: &TranscribeOptions) -> Self {
        let initial_prompt = options
            .wants_simplified_chinese_prompt()
            .then(|| SIMPLIFIED_CHINESE_PROMPT.to_string());

        Self {
            language: options.requested_language(),
            task: options.task,
            word_timestamps: options.word_timestamps,
            initial_prompt,
            extra: options.extra.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_chinese_deployment() {
        let options = TranscribeOptions::default();
        assert_eq!(options.language.as_deref(), Some("zh"));
        assert_eq!(options.task, Task::Transcribe);
        assert!(!options.word_timestamps);
        assert!(options.use_simplified_chinese);
    }

    #[test]
    fn steering_prompt_for_chinese_and_unset_language() {
        for language in [Some("zh"), Some("Chinese"), None, Some("auto")] {
            let options = TranscribeOptions {
                language: language.map(String::from),
                ..TranscribeOptions::default()
            };
            let params = InferenceParams::from(&options);
            assert_eq!(
                params.initial_prompt.as_deref(),
                Some(SIMPLIFIED_CHINESE_PROMPT),
                "language {language:?}"
            );
        }
    }

    #[test]
    fn no_steering_prompt_for_other_languages_or_when_disabled() {
        let params = InferenceParams::from(&TranscribeOptions::default().with_language("en"));
        assert_eq!(params.initial_prompt, None);
        assert_eq!(params.language.as_deref(), Some("en"));

        let options = TranscribeOptions {
            use_simplified_chinese: false,
            ..TranscribeOptions::default()
        };
        assert_eq!(InferenceParams::from(&options).initial_prompt, None);
    }

    #[test]
    fn language_names_and_regions_become_codes() {
        for (given, expected) in [
            ("Chinese", "zh"),
            ("chinese", "zh"),
            (" zh-CN ", "zh"),
            ("ZH_tw", "zh"),
            ("English", "en"),
            ("ja", "ja"),
            ("Cantonese", "yue"),
        ] {
            let params = InferenceParams::from(&TranscribeOptions::default().with_language(given));
            assert_eq!(params.language.as_deref(), Some(expected), "language {given:?}");
        }
    }

    #[test]
    fn auto_language_reaches_engine_as_none() {
        let params = InferenceParams::from(&TranscribeOptions::default().with_language("auto"));
        assert_eq!(params.language, None);
    }

    #[test]
    fn deserializes_partial_config() {
        let options: TranscribeOptions = serde_json::from_str(
            r#"{"language": "ja", "task": "translate", "extra": {"temperature": 0.2}}"#,
        )
        .unwrap();
        assert_eq!(options.language.as_deref(), Some("ja"));
        assert_eq!(options.task, Task::Translate);
        assert!(options.use_simplified_chinese);
        assert_eq!(options.extra["temperature"], 0.2);
    }
}
