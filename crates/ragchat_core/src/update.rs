use crate::{AppState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::RestoreSession {
            uploaded_files,
            reset_chat_pending,
        } => {
            let mut effects = state.uploader.restore(uploaded_files);
            if reset_chat_pending {
                // The previous run finished processing but never got to reset.
                effects.extend(state.reset_chat());
                state.uploader.set_reset_chat_pending(false);
                effects.push(state.uploader.persist_effect());
            }
            if !effects.is_empty() {
                state.mark_dirty();
            }
            effects
        }
        Msg::RevalidationFinished { missing } => {
            if state.uploader.drop_missing(&missing) {
                state.mark_dirty();
                vec![state.uploader.persist_effect()]
            } else {
                Vec::new()
            }
        }
        Msg::FileSelected { name, path } => {
            state.mark_dirty();
            state.uploader.select_file(name, path)
        }
        Msg::NoFileSelected => {
            state.uploader.no_file_selected();
            state.mark_dirty();
            Vec::new()
        }
        Msg::UploadProgress { name, percent } => {
            if state.uploader.upload_progress(&name, percent) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::UploadFinished { name, result } => {
            let effects = state.uploader.upload_finished(name, result.is_ok());
            state.mark_dirty();
            effects
        }
        Msg::ProcessClicked => {
            state.mark_dirty();
            state.uploader.start_processing()
        }
        Msg::ProcessingTick { percent, reports } => {
            state.mark_dirty();
            state.uploader.apply_tick(percent, reports)
        }
        Msg::ProcessingFinished { outcome } => {
            let success_display = state.success_display();
            state.mark_dirty();
            state.uploader.finish_processing(outcome, success_display)
        }
        Msg::SuccessDisplayElapsed => {
            if state.uploader.success_elapsed() {
                state.uploader.set_reset_chat_pending(false);
                let mut effects = state.reset_chat();
                effects.push(state.uploader.persist_effect());
                effects
            } else {
                Vec::new()
            }
        }
        Msg::InputChanged(text) => {
            state.chat.input_changed(text);
            Vec::new()
        }
        Msg::SendClicked => {
            if state.chat.can_send() {
                let request_id = state.allocate_request_id();
                state.mark_dirty();
                state.chat.send(request_id)
            } else {
                Vec::new()
            }
        }
        Msg::AnswerReceived { request_id, result } => {
            let effects = state.chat.answer_received(request_id, result);
            state.mark_dirty();
            effects
        }
        Msg::RevealProgress { request_id, text } => {
            if state.chat.reveal_progress(request_id, text) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::RevealFinished { request_id } => {
            if state.chat.reveal_finished(request_id) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::StopClicked => {
            let effects = state.chat.stop();
            if !effects.is_empty() {
                state.mark_dirty();
            }
            effects
        }
        Msg::ResetChat => state.reset_chat(),
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
