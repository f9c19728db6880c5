pub const CMD_UPLOAD: &str = "/upload";
pub const CMD_PROCESS: &str = "/process";
pub const CMD_STOP: &str = "/stop";
pub const CMD_RESET: &str = "/reset";
pub const CMD_FILES: &str = "/files";
pub const CMD_HELP: &str = "/help";
pub const CMD_QUIT: &str = "/quit";
pub const CMD_EXIT: &str = "/exit";

pub const PREFIX_USER: &str = "you> ";
pub const PREFIX_SYSTEM: &str = "rag> ";
/// Marks a tail message resumed after another line interrupted it.
pub const CONTINUATION: &str = "... ";
pub const RESET_BANNER: &str = "--- new conversation ---";

/// Upload progress is reported in steps of this many percent.
pub const UPLOAD_STEP_PERCENT: u8 = 25;

pub const HELP_TEXT: &str = "\
Commands:
  /upload <path>   upload a document to the backend
  /process         start processing the uploaded documents
  /files           list uploaded documents
  /stop            stop the answer being typed
  /reset           start a new conversation
  /help            show this help
  /quit            exit
Anything else is sent as a question.
";
