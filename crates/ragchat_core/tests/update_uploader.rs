use std::path::PathBuf;
use std::sync::Once;
use std::time::Duration;

use pretty_assertions::assert_eq;
use ragchat_core::{
    update, AppState, Effect, FileReport, FileStage, FileStatus, Msg, ProcessingOutcome,
    ProcessingSession, Severity, SUCCESS_DISPLAY,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(ragchat_logging::initialize_for_tests);
}

fn select(state: AppState, name: &str) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::FileSelected {
            name: name.to_string(),
            path: PathBuf::from(format!("/docs/{name}")),
        },
    )
}

fn uploaded(names: &[&str]) -> AppState {
    let mut state = AppState::new();
    for name in names {
        let (next, _) = select(state, name);
        let (next, _) = update(
            next,
            Msg::UploadFinished {
                name: name.to_string(),
                result: Ok(()),
            },
        );
        state = next;
    }
    state
}

fn report(name: &str, status: FileStatus) -> FileReport {
    FileReport {
        name: name.to_string(),
        status,
    }
}

fn processing() -> FileStatus {
    FileStatus::Processing { progress: None }
}

#[test]
fn selecting_a_file_starts_an_upload() {
    init_logging();
    let (mut state, effects) = select(AppState::new(), "notes.pdf");

    assert_eq!(
        effects,
        vec![Effect::UploadFile {
            name: "notes.pdf".to_string(),
            path: PathBuf::from("/docs/notes.pdf"),
        }]
    );
    let view = state.view();
    assert_eq!(view.files[0].stage, FileStage::Uploading);
    assert_eq!(view.uploader_status.unwrap().text, "Uploading notes.pdf...");
    assert!(state.consume_dirty());
    assert!(state.tracked_files().is_empty());
}

#[test]
fn upload_progress_updates_the_row() {
    init_logging();
    let (state, _) = select(AppState::new(), "notes.pdf");
    let (state, effects) = update(
        state,
        Msg::UploadProgress {
            name: "notes.pdf".to_string(),
            percent: 40,
        },
    );

    assert!(effects.is_empty());
    assert_eq!(state.view().files[0].upload_percent, 40);
}

#[test]
fn successful_upload_tracks_and_persists_the_name() {
    init_logging();
    let (state, _) = select(AppState::new(), "notes.pdf");
    let (state, effects) = update(
        state,
        Msg::UploadFinished {
            name: "notes.pdf".to_string(),
            result: Ok(()),
        },
    );

    assert_eq!(state.tracked_files(), vec!["notes.pdf"]);
    assert_eq!(
        effects,
        vec![Effect::PersistSession {
            uploaded_files: vec!["notes.pdf".to_string()],
            reset_chat_pending: false,
        }]
    );
    let status = state.view().uploader_status.unwrap();
    assert_eq!(status.severity, Severity::Success);
}

#[test]
fn failed_upload_leaves_the_file_untracked() {
    init_logging();
    let (state, _) = select(AppState::new(), "notes.pdf");
    let (state, effects) = update(
        state,
        Msg::UploadFinished {
            name: "notes.pdf".to_string(),
            result: Err("http status 500".to_string()),
        },
    );

    assert!(effects.is_empty());
    assert!(state.view().files.is_empty());
    let status = state.view().uploader_status.unwrap();
    assert_eq!(status.severity, Severity::Error);
    assert_eq!(status.text, "Upload of notes.pdf failed. Check backend.");

    // The same name can be retried after a failure.
    let (_, effects) = select(state, "notes.pdf");
    assert_eq!(effects.len(), 1);
}

#[test]
fn duplicate_name_never_uploads() {
    init_logging();
    let state = uploaded(&["notes.pdf"]);
    let (state, effects) = select(state, "notes.pdf");

    assert!(effects.is_empty());
    assert_eq!(state.view().files.len(), 1);
    let status = state.view().uploader_status.unwrap();
    assert_eq!(status.text, "notes.pdf is already uploaded.");
    assert_eq!(status.severity, Severity::Warning);
}

#[test]
fn duplicate_of_an_upload_in_flight_is_rejected() {
    init_logging();
    let (state, _) = select(AppState::new(), "notes.pdf");
    let (_, effects) = select(state, "notes.pdf");
    assert!(effects.is_empty());
}

#[test]
fn upload_without_a_file_warns() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::NoFileSelected);

    assert!(effects.is_empty());
    assert_eq!(
        state.view().uploader_status.unwrap().text,
        "Please choose a file to upload."
    );
}

#[test]
fn processing_with_no_files_never_polls() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::ProcessClicked);

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.processing, ProcessingSession::Idle);
    assert_eq!(view.uploader_status.unwrap().text, "Please upload a file first!");
}

#[test]
fn processing_ignores_uploads_still_in_flight() {
    init_logging();
    let state = uploaded(&["a.pdf"]);
    let (state, _) = select(state, "b.pdf");
    let (_, effects) = update(state, Msg::ProcessClicked);

    assert_eq!(
        effects,
        vec![Effect::StartPolling {
            names: vec!["a.pdf".to_string()]
        }]
    );
}

#[test]
fn single_file_progress_runs_zero_zero_hundred_then_succeeds() {
    init_logging();
    let state = uploaded(&["a.pdf"]);
    let (state, effects) = update(state, Msg::ProcessClicked);
    assert_eq!(
        effects,
        vec![Effect::StartPolling {
            names: vec!["a.pdf".to_string()]
        }]
    );

    let ticks = [(0, processing()), (0, processing()), (100, FileStatus::Completed)];
    let mut state = state;
    let mut seen = Vec::new();
    for (percent, status) in ticks {
        let (next, _) = update(
            state,
            Msg::ProcessingTick {
                percent,
                reports: vec![report("a.pdf", status)],
            },
        );
        seen.push(next.view().progress_percent.unwrap());
        state = next;
    }
    assert_eq!(seen, vec![0, 0, 100]);

    let (state, effects) = update(
        state,
        Msg::ProcessingFinished {
            outcome: ProcessingOutcome::AllCompleted,
        },
    );
    assert_eq!(
        effects,
        vec![
            Effect::PersistSession {
                uploaded_files: vec!["a.pdf".to_string()],
                reset_chat_pending: true,
            },
            Effect::ScheduleSuccessClear {
                after: SUCCESS_DISPLAY
            },
        ]
    );
    let view = state.view();
    assert_eq!(view.processing, ProcessingSession::ShowingSuccess);
    assert_eq!(view.files[0].stage, FileStage::Completed);
    assert_eq!(view.uploader_status.unwrap().severity, Severity::Success);
}

#[test]
fn failure_stops_processing_and_reports_failed_names() {
    init_logging();
    let state = uploaded(&["a.pdf", "b.pdf"]);
    let (state, _) = update(state, Msg::ProcessClicked);
    let (state, _) = update(
        state,
        Msg::ProcessingTick {
            percent: 0,
            reports: vec![report("a.pdf", FileStatus::Failed), report("b.pdf", processing())],
        },
    );
    let (state, effects) = update(
        state,
        Msg::ProcessingFinished {
            outcome: ProcessingOutcome::SomeFailed {
                failed: vec!["a.pdf".to_string()],
            },
        },
    );

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.processing, ProcessingSession::Idle);
    assert_eq!(view.files[0].stage, FileStage::Failed);
    // Never reached a terminal state; stays where the last tick left it.
    assert_eq!(view.files[1].stage, FileStage::Processing);
    assert_eq!(view.uploader_status.unwrap().text, "Some files failed: a.pdf");
}

#[test]
fn missing_file_is_untracked_during_polling() {
    init_logging();
    let state = uploaded(&["a.pdf", "gone.pdf"]);
    let (state, _) = update(state, Msg::ProcessClicked);
    let (state, effects) = update(
        state,
        Msg::ProcessingTick {
            percent: 100,
            reports: vec![
                report("a.pdf", FileStatus::Completed),
                report("gone.pdf", FileStatus::Missing),
            ],
        },
    );

    assert_eq!(state.tracked_files(), vec!["a.pdf"]);
    assert_eq!(
        effects,
        vec![Effect::PersistSession {
            uploaded_files: vec!["a.pdf".to_string()],
            reset_chat_pending: false,
        }]
    );
}

#[test]
fn process_click_while_polling_is_ignored() {
    init_logging();
    let state = uploaded(&["a.pdf"]);
    let (state, _) = update(state, Msg::ProcessClicked);
    let (state, effects) = update(state, Msg::ProcessClicked);

    assert!(effects.is_empty());
    assert_eq!(state.view().processing, ProcessingSession::Polling);
}

#[test]
fn transport_error_surfaces_and_returns_to_idle() {
    init_logging();
    let state = uploaded(&["a.pdf"]);
    let (state, _) = update(state, Msg::ProcessClicked);
    let (state, _) = update(
        state,
        Msg::ProcessingFinished {
            outcome: ProcessingOutcome::TransportError {
                message: "connection refused".to_string(),
            },
        },
    );

    let view = state.view();
    assert_eq!(view.processing, ProcessingSession::Idle);
    assert_eq!(
        view.uploader_status.unwrap().text,
        "Processing failed. Check backend."
    );
}

#[test]
fn success_display_elapsing_resets_the_conversation() {
    init_logging();
    let state = AppState::with_success_display(Duration::from_millis(10));
    let (state, _) = update(state, Msg::InputChanged("what is in a.pdf?".to_string()));
    let (state, _) = update(state, Msg::SendClicked);
    let (state, _) = update(
        state,
        Msg::AnswerReceived {
            request_id: 1,
            result: Ok("nothing yet".to_string()),
        },
    );
    let (state, _) = update(
        state,
        Msg::RevealFinished { request_id: 1 },
    );

    let (state, _) = select(state, "a.pdf");
    let (state, _) = update(
        state,
        Msg::UploadFinished {
            name: "a.pdf".to_string(),
            result: Ok(()),
        },
    );
    let (state, _) = update(state, Msg::ProcessClicked);
    let (state, effects) = update(
        state,
        Msg::ProcessingFinished {
            outcome: ProcessingOutcome::AllCompleted,
        },
    );
    assert!(effects.contains(&Effect::ScheduleSuccessClear {
        after: Duration::from_millis(10)
    }));
    assert_eq!(state.view().transcript.len(), 2);

    let (state, effects) = update(state, Msg::SuccessDisplayElapsed);
    let view = state.view();
    assert!(view.transcript.is_empty());
    assert_eq!(view.chat_epoch, 1);
    assert_eq!(view.uploader_status, None);
    assert_eq!(view.processing, ProcessingSession::Idle);
    assert_eq!(
        effects,
        vec![Effect::PersistSession {
            uploaded_files: vec!["a.pdf".to_string()],
            reset_chat_pending: false,
        }]
    );

    // A second expiry is stale and changes nothing.
    let (state, effects) = update(state, Msg::SuccessDisplayElapsed);
    assert!(effects.is_empty());
    assert_eq!(state.view().chat_epoch, 1);
}
