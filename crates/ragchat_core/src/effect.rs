use std::path::PathBuf;
use std::time::Duration;

use crate::RequestId;

/// How long the "processing complete" status stays visible before the
/// conversation is reset.
pub const SUCCESS_DISPLAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    UploadFile { name: String, path: PathBuf },
    /// Probe each restored name once; unknown names come back as missing.
    RevalidateFiles { names: Vec<String> },
    StartPolling { names: Vec<String> },
    ScheduleSuccessClear { after: Duration },
    PersistSession {
        uploaded_files: Vec<String>,
        reset_chat_pending: bool,
    },
    Ask { request_id: RequestId, query: String },
    StartReveal { request_id: RequestId, text: String },
    CancelRequest { request_id: RequestId },
}
