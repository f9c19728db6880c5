use crate::{FileStage, ProcessingSession, Sender, UploaderStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub severity: Severity,
}

impl StatusLine {
    pub(crate) fn from_status(status: &UploaderStatus) -> Self {
        let (text, severity) = match status {
            UploaderStatus::Uploading { name } => (format!("Uploading {name}..."), Severity::Info),
            UploaderStatus::Uploaded { name } => {
                (format!("{name} uploaded successfully."), Severity::Success)
            }
            UploaderStatus::UploadFailed { name } => (
                format!("Upload of {name} failed. Check backend."),
                Severity::Error,
            ),
            UploaderStatus::Duplicate { name } => {
                (format!("{name} is already uploaded."), Severity::Warning)
            }
            UploaderStatus::NoFileSelected => {
                ("Please choose a file to upload.".to_string(), Severity::Warning)
            }
            UploaderStatus::NoFiles => {
                ("Please upload a file first!".to_string(), Severity::Warning)
            }
            UploaderStatus::Processing { percent } => {
                (format!("Processing files... {percent}%"), Severity::Info)
            }
            UploaderStatus::ProcessingComplete => {
                ("All files processed.".to_string(), Severity::Success)
            }
            UploaderStatus::SomeFilesFailed { failed } => (
                format!("Some files failed: {}", failed.join(", ")),
                Severity::Error,
            ),
            UploaderStatus::ProcessError => (
                "Processing failed. Check backend.".to_string(),
                Severity::Error,
            ),
            UploaderStatus::GaveUp => (
                "Processing is taking too long; stopped polling.".to_string(),
                Severity::Warning,
            ),
        };
        Self { text, severity }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub files: Vec<FileRowView>,
    pub uploader_status: Option<StatusLine>,
    pub processing: ProcessingSession,
    pub progress_percent: Option<u8>,
    pub transcript: Vec<MessageView>,
    pub generating: bool,
    pub input: String,
    pub chat_epoch: u64,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRowView {
    pub name: String,
    pub stage: FileStage,
    pub upload_percent: u8,
    pub backend_progress: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub sender: Sender,
    pub text: String,
    pub in_progress: bool,
}
