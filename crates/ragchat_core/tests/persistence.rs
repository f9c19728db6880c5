use ragchat_core::{update, AppState, Effect, FileStage, Msg, Sender};

fn init_logging() {
    ragchat_logging::initialize_for_tests();
}

fn restore(names: &[&str], reset_chat_pending: bool) -> (AppState, Vec<Effect>) {
    update(
        AppState::new(),
        Msg::RestoreSession {
            uploaded_files: names.iter().map(|n| n.to_string()).collect(),
            reset_chat_pending,
        },
    )
}

#[test]
fn restored_names_are_tracked_and_revalidated() {
    init_logging();
    let (state, effects) = restore(&["a.pdf", "b.txt"], false);

    assert_eq!(state.tracked_files(), vec!["a.pdf", "b.txt"]);
    assert!(state.view().files.iter().all(|f| f.stage == FileStage::Uploaded));
    assert_eq!(
        effects,
        vec![Effect::RevalidateFiles {
            names: vec!["a.pdf".to_string(), "b.txt".to_string()]
        }]
    );
}

#[test]
fn names_unknown_to_backend_are_dropped_and_persisted() {
    init_logging();
    let (state, _) = restore(&["a.pdf", "b.txt"], false);
    let (state, effects) = update(
        state,
        Msg::RevalidationFinished {
            missing: vec!["a.pdf".to_string()],
        },
    );

    assert_eq!(state.tracked_files(), vec!["b.txt"]);
    assert_eq!(
        effects,
        vec![Effect::PersistSession {
            uploaded_files: vec!["b.txt".to_string()],
            reset_chat_pending: false,
        }]
    );
}

#[test]
fn revalidation_without_missing_names_writes_nothing() {
    init_logging();
    let (state, _) = restore(&["a.pdf"], false);
    let (state, effects) = update(state, Msg::RevalidationFinished { missing: vec![] });

    assert_eq!(state.tracked_files(), vec!["a.pdf"]);
    assert!(effects.is_empty());
}

#[test]
fn pending_reset_flag_clears_chat_and_is_consumed() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::InputChanged("hi".to_string()));
    let (state, _) = update(state, Msg::SendClicked);
    assert_eq!(state.view().transcript[0].sender, Sender::User);

    let (state, effects) = update(
        state,
        Msg::RestoreSession {
            uploaded_files: vec!["a.pdf".to_string()],
            reset_chat_pending: true,
        },
    );

    let view = state.view();
    assert!(view.transcript.is_empty());
    assert_eq!(view.chat_epoch, 1);
    assert_eq!(
        effects,
        vec![
            Effect::RevalidateFiles {
                names: vec!["a.pdf".to_string()]
            },
            Effect::CancelRequest { request_id: 1 },
            Effect::PersistSession {
                uploaded_files: vec!["a.pdf".to_string()],
                reset_chat_pending: false,
            },
        ]
    );
}
