use std::time::Duration;

use crate::chat::ChatState;
use crate::uploader::UploaderState;
use crate::view_model::{AppViewModel, FileRowView, MessageView, StatusLine};
use crate::{ChatPhase, Effect, SUCCESS_DISPLAY};

pub type RequestId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub(crate) uploader: UploaderState,
    pub(crate) chat: ChatState,
    chat_epoch: u64,
    next_request_id: RequestId,
    success_display: Duration,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            uploader: UploaderState::default(),
            chat: ChatState::default(),
            chat_epoch: 0,
            next_request_id: 1,
            success_display: SUCCESS_DISPLAY,
            dirty: false,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_success_display(success_display: Duration) -> Self {
        Self {
            success_display,
            ..Self::default()
        }
    }

    pub fn view(&self) -> AppViewModel {
        let chat_phase = self.chat.phase();
        let message_count = self.chat.messages().len();
        let transcript = self
            .chat
            .messages()
            .iter()
            .enumerate()
            .map(|(idx, message)| MessageView {
                sender: message.sender,
                text: message.text.clone(),
                in_progress: idx + 1 == message_count
                    && matches!(chat_phase, ChatPhase::Revealing { .. }),
            })
            .collect();

        AppViewModel {
            files: self
                .uploader
                .files()
                .map(|record| FileRowView {
                    name: record.name.clone(),
                    stage: record.stage,
                    upload_percent: record.upload_percent,
                    backend_progress: record.backend_progress,
                })
                .collect(),
            uploader_status: self.uploader.status().map(StatusLine::from_status),
            processing: self.uploader.session(),
            progress_percent: self.uploader.progress_percent(),
            transcript,
            generating: self.chat.is_generating(),
            input: self.chat.input().to_string(),
            chat_epoch: self.chat_epoch,
            dirty: self.dirty,
        }
    }

    /// Names the backend has accepted, in display order.
    pub fn tracked_files(&self) -> Vec<String> {
        self.uploader.tracked_names()
    }

    pub fn chat_phase(&self) -> ChatPhase {
        self.chat.phase()
    }

    pub fn chat_epoch(&self) -> u64 {
        self.chat_epoch
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn success_display(&self) -> Duration {
        self.success_display
    }

    pub(crate) fn allocate_request_id(&mut self) -> RequestId {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    /// Drop the transcript and bump the epoch; any running request is cancelled.
    pub(crate) fn reset_chat(&mut self) -> Vec<Effect> {
        let effects = self
            .chat
            .active_request()
            .map(|request_id| vec![Effect::CancelRequest { request_id }])
            .unwrap_or_default();
        self.chat = ChatState::default();
        self.chat_epoch += 1;
        self.mark_dirty();
        effects
    }
}
