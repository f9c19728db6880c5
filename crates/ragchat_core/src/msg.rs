use std::path::PathBuf;

use crate::RequestId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Restore file names and the reset flag remembered from a previous run.
    RestoreSession {
        uploaded_files: Vec<String>,
        reset_chat_pending: bool,
    },
    /// Names the backend no longer recognizes after the restore probe.
    RevalidationFinished { missing: Vec<String> },
    /// User picked a file to upload.
    FileSelected { name: String, path: PathBuf },
    /// User asked to upload without naming a file.
    NoFileSelected,
    /// Engine progress for an upload in flight.
    UploadProgress { name: String, percent: u8 },
    /// Engine completion for an upload; the error carries a log message only.
    UploadFinished {
        name: String,
        result: Result<(), String>,
    },
    /// User clicked Process.
    ProcessClicked,
    /// One poll round: aggregate percent plus the per-file reports.
    ProcessingTick { percent: u8, reports: Vec<FileReport> },
    /// The poll loop reached a terminal state.
    ProcessingFinished { outcome: ProcessingOutcome },
    /// The success status has been on screen long enough.
    SuccessDisplayElapsed,
    /// User edited the chat input.
    InputChanged(String),
    /// User submitted the chat input.
    SendClicked,
    /// Full answer (or failure) for a buffered ask.
    AnswerReceived {
        request_id: RequestId,
        result: Result<String, String>,
    },
    /// Text revealed so far for a request, either animated or streamed.
    RevealProgress { request_id: RequestId, text: String },
    /// The reveal (or stream) for a request ran to the end.
    RevealFinished { request_id: RequestId },
    /// User clicked Stop.
    StopClicked,
    /// Clear the conversation as if the widget were remounted.
    ResetChat,
    /// Changes nothing and emits no effects.
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub name: String,
    pub status: FileStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Processing { progress: Option<u8> },
    Completed,
    Failed,
    /// Backend answered "not found".
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    AllCompleted,
    SomeFailed { failed: Vec<String> },
    /// Every tracked name turned out to be unknown to the backend.
    NothingTracked,
    TransportError { message: String },
    /// The poll loop hit its tick bound before a terminal state.
    GaveUp,
}
