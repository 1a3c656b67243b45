mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glimpse_scribe::progress::milestones;
use glimpse_scribe::task::{spawn_transcription, Submission, TaskBoard, TaskStatus};
use glimpse_scribe::{OutputFormat, SaveRequest, SpeechEngine};

use common::{counting_provider, hello_world, write_wav, StubEngine};

#[tokio::test]
async fn spawned_transcription_streams_progress() {
    let tmp = tempfile::tempdir().unwrap();
    let audio = write_wav(&tmp.path().join("bg.wav"), 16_000, 1, 2.0);
    let engine = Arc::new(SpeechEngine::new(counting_provider(
        StubEngine::returning(hello_world()),
        Arc::default(),
    )));

    let request = SaveRequest::new(&audio, tmp.path().join("out")).formats(["json"]);
    let (handle, mut rx) = spawn_transcription(engine, request);

    let saved = handle.await.unwrap().unwrap();
    assert_eq!(saved.result.text, "hello world");
    assert!(saved.files[&OutputFormat::Json].is_file());

    let mut percents = Vec::new();
    while let Some(event) = rx.recv().await {
        percents.push(event.percent);
    }
    assert_eq!(percents.first(), Some(&milestones::LOADING_MODEL));
    assert_eq!(percents.last(), Some(&milestones::DONE));
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn completed_task_is_served_from_cache() {
    let tmp = tempfile::tempdir().unwrap();
    let audio = write_wav(&tmp.path().join("BV1abc.wav"), 16_000, 1, 1.0);
    let loads = Arc::new(AtomicUsize::new(0));
    let stub = StubEngine::returning(hello_world());
    let calls = Arc::clone(&stub.calls);
    let engine = Arc::new(SpeechEngine::new(counting_provider(stub, Arc::clone(&loads))));
    let board = TaskBoard::new();

    assert_eq!(board.status("transcribe_BV1abc"), None);

    let request = SaveRequest::new(&audio, tmp.path()).formats(["txt"]);
    let Submission::Started(handle) =
        board.submit("transcribe_BV1abc", Arc::clone(&engine), request.clone())
    else {
        panic!("first submission should start work");
    };
    handle.await.unwrap();

    let status = board.status("transcribe_BV1abc").unwrap();
    let TaskStatus::Completed {
        progress,
        text,
        timestamped_text,
        segments,
        language,
        files,
        ..
    } = &status
    else {
        panic!("expected completed status, got {status:?}");
    };
    assert_eq!(*progress, milestones::DONE);
    assert_eq!(text, "hello world");
    assert_eq!(language, "en");
    assert_eq!(
        timestamped_text,
        "[00:00 -> 00:04] hello\n[00:04 -> 00:10] world"
    );
    assert_eq!(segments[1].start_formatted, "00:04");
    assert_eq!(segments[1].end_formatted, "00:10");
    assert_eq!(segments[1].text, "world");
    assert_eq!(files.len(), 1);
    assert!(status.is_finished());

    match board.submit("transcribe_BV1abc", engine, request) {
        Submission::Cached(cached) => assert_eq!(cached, status),
        other => panic!("expected cached result, got {other:?}"),
    }
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_task_records_error_and_can_be_resubmitted() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = Arc::new(SpeechEngine::new(counting_provider(
        StubEngine::returning(hello_world()),
        Arc::default(),
    )));
    let board = TaskBoard::new();
    let request = SaveRequest::new(tmp.path().join("gone.m4a"), tmp.path());

    let Submission::Started(handle) = board.submit("t1", Arc::clone(&engine), request.clone())
    else {
        panic!("expected work to start");
    };
    handle.await.unwrap();

    match board.status("t1") {
        Some(TaskStatus::Failed { kind, message }) => {
            assert_eq!(kind, "input");
            assert!(message.contains("gone.m4a"), "got {message}");
        }
        other => panic!("expected failure, got {other:?}"),
    }

    assert!(matches!(
        board.submit("t1", engine, request),
        Submission::Started(_)
    ));
}

#[test]
fn status_serializes_with_status_tag() {
    let json = serde_json::to_value(TaskStatus::Transcribing {
        progress: 20.0,
        message: "transcribing".into(),
    })
    .unwrap();
    assert_eq!(json["status"], "transcribing");
    assert_eq!(json["progress"], 20.0);

    let json = serde_json::to_value(TaskStatus::Failed {
        kind: "decode",
        message: "bad codec".into(),
    })
    .unwrap();
    assert_eq!(json["status"], "error");
}

#[tokio::test]
async fn completed_status_serializes_display_fields() {
    let tmp = tempfile::tempdir().unwrap();
    let audio = write_wav(&tmp.path().join("s.wav"), 16_000, 1, 1.0);
    let engine = Arc::new(SpeechEngine::new(counting_provider(
        StubEngine::returning(hello_world()),
        Arc::default(),
    )));
    let board = TaskBoard::new();

    let request = SaveRequest::new(&audio, tmp.path()).formats(["srt"]);
    let Submission::Started(handle) = board.submit("s", engine, request) else {
        panic!("expected work to start");
    };
    handle.await.unwrap();

    let json = serde_json::to_value(board.status("s").unwrap()).unwrap();
    assert_eq!(json["status"], "completed");
    assert_eq!(json["progress"], 100.0);
    assert_eq!(json["segments"][0]["start_formatted"], "00:00");
    assert_eq!(json["segments"][0]["end"], 4.5);
    assert!(json["timestamped_text"].as_str().unwrap().contains("] hello"));
    assert!(json["files"]["srt"].as_str().unwrap().ends_with("s.srt"));
}

