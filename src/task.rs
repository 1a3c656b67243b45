//! Background transcription tasks with a shared status board.
//!
//! The pipeline itself is synchronous. These helpers run it on tokio's
//! blocking pool and expose progress either as channel messages
//! ([`spawn_transcription`]) or as polled status entries ([`TaskBoard`]).

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::TranscribeError;
use crate::progress::{milestones, ProgressEvent};
use crate::speech::{SaveRequest, SavedTranscript, SpeechEngine};
use crate::transcript::Segment;
use crate::writer::OutputFormat;
use crate::ModelProvider;

/// Run [`SpeechEngine::transcribe_and_save`] on the blocking pool.
///
/// Progress arrives on the returned receiver. Aborting the handle does not
/// stop an inference that has already started.
pub fn spawn_transcription<P>(
    engine: Arc<SpeechEngine<P>>,
    request: SaveRequest,
) -> (
    JoinHandle<Result<SavedTranscript, TranscribeError>>,
    UnboundedReceiver<ProgressEvent>,
)
where
    P: ModelProvider + Send + Sync + 'static,
    P::Engine: Send,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::task::spawn_blocking(move || engine.transcribe_and_save(&request, &tx));
    (handle, rx)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskStatus {
    Starting,
    Transcribing {
        progress: f32,
        message: String,
    },
    Completed {
        progress: f32,
        text: String,
        timestamped_text: String,
        segments: Vec<TimedSegment>,
        duration: f64,
        language: String,
        files: BTreeMap<OutputFormat, PathBuf>,
    },
    #[serde(rename = "error")]
    Failed {
        kind: &'static str,
        message: String,
    },
}

impl TaskStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }

    fn completed(saved: SavedTranscript) -> Self {
        let SavedTranscript { result, files } = saved;
        Self::Completed {
            progress: milestones::DONE,
            timestamped_text: result.to_timestamped_text(),
            segments: result.segments.iter().map(TimedSegment::from).collect(),
            text: result.text,
            duration: result.duration,
            language: result.language,
            files,
        }
    }
}

/// A segment with its display timestamps, as shown to status readers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedSegment {
    pub start: f64,
    pub end: f64,
    pub start_formatted: String,
    pub end_formatted: String,
    pub text: String,
}

impl From<&Segment> for TimedSegment {
    fn from(segment: &Segment) -> Self {
        Self {
            start: segment.start,
            end: segment.end,
            start_formatted: segment.start_formatted(),
            end_formatted: segment.end_formatted(),
            text: segment.text.clone(),
        }
    }
}

/// Outcome of [`TaskBoard::submit`].
#[derive(Debug)]
pub enum Submission {
    /// The task already completed; its stored status is returned unchanged.
    Cached(TaskStatus),
    /// The task is in progress from an earlier submission.
    Running,
    /// Work was spawned; the handle resolves once the status is final.
    Started(JoinHandle<()>),
}

/// Task id to status map shared between workers and status readers.
#[derive(Clone, Default)]
pub struct TaskBoard {
    tasks: Arc<Mutex<HashMap<String, TaskStatus>>>,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, task_id: &str) -> Option<TaskStatus> {
        self.tasks().get(task_id).cloned()
    }

    // Entries are only ever replaced whole, so a poisoned map is still consistent.
    fn tasks(&self) -> MutexGuard<'_, HashMap<String, TaskStatus>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, task_id: &str, status: TaskStatus) {
        let _ = self.tasks().insert(task_id.to_string(), status);
    }

    /// Start `request` under `task_id` unless it is completed or running.
    ///
    /// A failed task is started again.
    pub fn submit<P>(
        &self,
        task_id: impl Into<String>,
        engine: Arc<SpeechEngine<P>>,
        request: SaveRequest,
    ) -> Submission
    where
        P: ModelProvider + Send + Sync + 'static,
        P::Engine: Send,
    {
        let task_id = task_id.into();
        {
            let mut tasks = self.tasks();
            match tasks.get(&task_id) {
                Some(status @ TaskStatus::Completed { .. }) => {
                    info!("task {task_id} already completed, returning cached result");
                    return Submission::Cached(status.clone());
                }
                Some(TaskStatus::Starting | TaskStatus::Transcribing { .. }) => {
                    return Submission::Running;
                }
                Some(TaskStatus::Failed { .. }) | None => {
                    let _ = tasks.insert(task_id.clone(), TaskStatus::Starting);
                }
            }
        }

        info!(
            "starting task {task_id} for {}",
            request.audio_path.display()
        );
        let board = self.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let progress = |message: &str, percent: f32| {
                board.set(
                    &task_id,
                    TaskStatus::Transcribing {
                        progress: percent,
                        message: message.to_string(),
                    },
                );
            };

            let status = match engine.transcribe_and_save(&request, &progress) {
                Ok(saved) => TaskStatus::completed(saved),
                Err(e) => {
                    error!("task {task_id} failed: {e}");
                    TaskStatus::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    }
                }
            };
            board.set(&task_id, status);
        });

        Submission::Started(handle)
    }
}
