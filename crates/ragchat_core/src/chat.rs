use crate::{Effect, RequestId};

/// Shown in place of an answer when the backend could not be reached.
pub const BACKEND_FAILURE_TEXT: &str = "⚠️ Backend connection failed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
}

impl ChatMessage {
    fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    fn system(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::System,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatPhase {
    #[default]
    Idle,
    /// Query sent, nothing shown yet.
    Awaiting { request_id: RequestId },
    /// The tail system message is still growing.
    Revealing { request_id: RequestId },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct ChatState {
    messages: Vec<ChatMessage>,
    input: String,
    phase: ChatPhase,
}

impl ChatState {
    pub(crate) fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub(crate) fn input(&self) -> &str {
        &self.input
    }

    pub(crate) fn phase(&self) -> ChatPhase {
        self.phase
    }

    pub(crate) fn active_request(&self) -> Option<RequestId> {
        match self.phase {
            ChatPhase::Idle => None,
            ChatPhase::Awaiting { request_id } | ChatPhase::Revealing { request_id } => {
                Some(request_id)
            }
        }
    }

    pub(crate) fn is_generating(&self) -> bool {
        self.phase != ChatPhase::Idle
    }

    pub(crate) fn input_changed(&mut self, text: String) {
        self.input = text;
    }

    /// Whether [`ChatState::send`] would accept the current input.
    pub(crate) fn can_send(&self) -> bool {
        !self.input.trim().is_empty() && !self.is_generating()
    }

    pub(crate) fn send(&mut self, request_id: RequestId) -> Vec<Effect> {
        if !self.can_send() {
            return Vec::new();
        }
        let query = std::mem::take(&mut self.input);
        self.messages.push(ChatMessage::user(query.clone()));
        self.phase = ChatPhase::Awaiting { request_id };
        vec![Effect::Ask { request_id, query }]
    }

    pub(crate) fn answer_received(
        &mut self,
        request_id: RequestId,
        result: Result<String, String>,
    ) -> Vec<Effect> {
        if self.active_request() != Some(request_id) {
            return Vec::new();
        }
        match (self.phase, result) {
            (ChatPhase::Awaiting { .. }, Ok(text)) => {
                self.messages.push(ChatMessage::system(String::new()));
                self.phase = ChatPhase::Revealing { request_id };
                vec![Effect::StartReveal { request_id, text }]
            }
            // A stream may fail after part of the answer is already visible.
            (_, Err(_)) => {
                self.messages.push(ChatMessage::system(BACKEND_FAILURE_TEXT));
                self.phase = ChatPhase::Idle;
                Vec::new()
            }
            (ChatPhase::Revealing { .. }, Ok(_)) | (ChatPhase::Idle, Ok(_)) => Vec::new(),
        }
    }

    /// Returns true when the tail message changed.
    pub(crate) fn reveal_progress(&mut self, request_id: RequestId, text: String) -> bool {
        match self.phase {
            ChatPhase::Revealing { request_id: active } if active == request_id => {
                match self.messages.last_mut() {
                    Some(last) if last.sender == Sender::System && last.text != text => {
                        last.text = text;
                        true
                    }
                    _ => false,
                }
            }
            // Streamed answers skip the buffered step and open the message here.
            ChatPhase::Awaiting { request_id: active } if active == request_id => {
                self.messages.push(ChatMessage::system(text));
                self.phase = ChatPhase::Revealing { request_id };
                true
            }
            _ => false,
        }
    }

    pub(crate) fn reveal_finished(&mut self, request_id: RequestId) -> bool {
        match self.phase {
            ChatPhase::Revealing { request_id: active } if active == request_id => {
                self.phase = ChatPhase::Idle;
                true
            }
            ChatPhase::Awaiting { request_id: active } if active == request_id => {
                self.messages.push(ChatMessage::system(String::new()));
                self.phase = ChatPhase::Idle;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn stop(&mut self) -> Vec<Effect> {
        match self.active_request() {
            Some(request_id) => {
                self.phase = ChatPhase::Idle;
                vec![Effect::CancelRequest { request_id }]
            }
            None => Vec::new(),
        }
    }
}
