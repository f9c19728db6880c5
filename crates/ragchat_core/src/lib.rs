//! RagChat core: pure state machine for the uploader and conversation widgets.
mod chat;
mod effect;
mod msg;
mod state;
mod update;
mod uploader;
mod view_model;

pub use chat::{ChatMessage, ChatPhase, Sender, BACKEND_FAILURE_TEXT};
pub use effect::{Effect, SUCCESS_DISPLAY};
pub use msg::{FileReport, FileStatus, Msg, ProcessingOutcome};
pub use state::{AppState, RequestId};
pub use update::update;
pub use uploader::{FileRecord, FileStage, ProcessingSession, UploaderStatus};
pub use view_model::{AppViewModel, FileRowView, MessageView, Severity, StatusLine};
