use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::{Effect, FileReport, FileStatus, ProcessingOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStage {
    Uploading,
    Uploaded,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub name: String,
    pub stage: FileStage,
    pub upload_percent: u8,
    /// Last per-file progress the backend reported while processing.
    pub backend_progress: Option<u8>,
}

impl FileRecord {
    fn uploading(name: String) -> Self {
        Self {
            name,
            stage: FileStage::Uploading,
            upload_percent: 0,
            backend_progress: None,
        }
    }

    fn uploaded(name: String) -> Self {
        Self {
            name,
            stage: FileStage::Uploaded,
            upload_percent: 100,
            backend_progress: None,
        }
    }

    /// Tracked files are the ones the backend has accepted.
    pub fn is_tracked(&self) -> bool {
        self.stage != FileStage::Uploading
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingSession {
    #[default]
    Idle,
    Polling,
    /// Success is on screen; the conversation resets when it clears.
    ShowingSuccess,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploaderStatus {
    Uploading { name: String },
    Uploaded { name: String },
    UploadFailed { name: String },
    Duplicate { name: String },
    NoFileSelected,
    NoFiles,
    Processing { percent: u8 },
    ProcessingComplete,
    SomeFilesFailed { failed: Vec<String> },
    ProcessError,
    GaveUp,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct UploaderState {
    files: BTreeMap<String, FileRecord>,
    status: Option<UploaderStatus>,
    session: ProcessingSession,
    progress_percent: Option<u8>,
    reset_chat_pending: bool,
}

impl UploaderState {
    pub(crate) fn files(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.values()
    }

    pub(crate) fn status(&self) -> Option<&UploaderStatus> {
        self.status.as_ref()
    }

    pub(crate) fn session(&self) -> ProcessingSession {
        self.session
    }

    pub(crate) fn progress_percent(&self) -> Option<u8> {
        self.progress_percent
    }

    pub(crate) fn reset_chat_pending(&self) -> bool {
        self.reset_chat_pending
    }

    pub(crate) fn tracked_names(&self) -> Vec<String> {
        self.files
            .values()
            .filter(|record| record.is_tracked())
            .map(|record| record.name.clone())
            .collect()
    }

    pub(crate) fn persist_effect(&self) -> Effect {
        Effect::PersistSession {
            uploaded_files: self.tracked_names(),
            reset_chat_pending: self.reset_chat_pending,
        }
    }

    /// Re-track names from a previous run and ask for them to be re-validated.
    pub(crate) fn restore(&mut self, names: Vec<String>) -> Vec<Effect> {
        let mut restored = Vec::new();
        for name in names {
            let name = name.trim().to_string();
            if name.is_empty() || self.files.contains_key(&name) {
                continue;
            }
            self.files
                .insert(name.clone(), FileRecord::uploaded(name.clone()));
            restored.push(name);
        }
        if restored.is_empty() {
            Vec::new()
        } else {
            vec![Effect::RevalidateFiles { names: restored }]
        }
    }

    pub(crate) fn set_reset_chat_pending(&mut self, pending: bool) {
        self.reset_chat_pending = pending;
    }

    /// Returns true when at least one name was dropped.
    pub(crate) fn drop_missing(&mut self, missing: &[String]) -> bool {
        let before = self.files.len();
        for name in missing {
            self.files.remove(name);
        }
        self.files.len() != before
    }

    pub(crate) fn select_file(&mut self, name: String, path: PathBuf) -> Vec<Effect> {
        if self.files.contains_key(&name) {
            self.status = Some(UploaderStatus::Duplicate { name });
            return Vec::new();
        }
        self.files
            .insert(name.clone(), FileRecord::uploading(name.clone()));
        self.status = Some(UploaderStatus::Uploading { name: name.clone() });
        vec![Effect::UploadFile { name, path }]
    }

    pub(crate) fn no_file_selected(&mut self) {
        self.status = Some(UploaderStatus::NoFileSelected);
    }

    /// Returns true when the visible percent changed.
    pub(crate) fn upload_progress(&mut self, name: &str, percent: u8) -> bool {
        match self.files.get_mut(name) {
            Some(record) if record.stage == FileStage::Uploading => {
                let percent = percent.min(100);
                if record.upload_percent == percent {
                    return false;
                }
                record.upload_percent = percent;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn upload_finished(&mut self, name: String, ok: bool) -> Vec<Effect> {
        let uploading = matches!(
            self.files.get(&name),
            Some(record) if record.stage == FileStage::Uploading
        );
        if !uploading {
            return Vec::new();
        }

        if ok {
            self.files.insert(name.clone(), FileRecord::uploaded(name.clone()));
            self.status = Some(UploaderStatus::Uploaded { name });
            vec![self.persist_effect()]
        } else {
            self.files.remove(&name);
            self.status = Some(UploaderStatus::UploadFailed { name });
            Vec::new()
        }
    }

    pub(crate) fn start_processing(&mut self) -> Vec<Effect> {
        if self.session != ProcessingSession::Idle {
            return Vec::new();
        }
        let names = self.tracked_names();
        if names.is_empty() {
            self.status = Some(UploaderStatus::NoFiles);
            return Vec::new();
        }

        for record in self.files.values_mut().filter(|r| r.is_tracked()) {
            record.stage = FileStage::Processing;
            record.backend_progress = None;
        }
        self.session = ProcessingSession::Polling;
        self.progress_percent = Some(0);
        self.status = Some(UploaderStatus::Processing { percent: 0 });
        vec![Effect::StartPolling { names }]
    }

    pub(crate) fn apply_tick(&mut self, percent: u8, reports: Vec<FileReport>) -> Vec<Effect> {
        if self.session != ProcessingSession::Polling {
            return Vec::new();
        }

        let mut dropped = false;
        for report in reports {
            match report.status {
                FileStatus::Missing => {
                    dropped |= self.files.remove(&report.name).is_some();
                }
                status => {
                    if let Some(record) = self.files.get_mut(&report.name) {
                        apply_status(record, status);
                    }
                }
            }
        }

        let percent = percent.min(100);
        self.progress_percent = Some(percent);
        self.status = Some(UploaderStatus::Processing { percent });

        if dropped {
            vec![self.persist_effect()]
        } else {
            Vec::new()
        }
    }

    pub(crate) fn finish_processing(
        &mut self,
        outcome: ProcessingOutcome,
        success_display: Duration,
    ) -> Vec<Effect> {
        if self.session != ProcessingSession::Polling {
            return Vec::new();
        }

        match outcome {
            ProcessingOutcome::AllCompleted => {
                self.session = ProcessingSession::ShowingSuccess;
                self.progress_percent = Some(100);
                self.status = Some(UploaderStatus::ProcessingComplete);
                self.reset_chat_pending = true;
                vec![
                    self.persist_effect(),
                    Effect::ScheduleSuccessClear {
                        after: success_display,
                    },
                ]
            }
            ProcessingOutcome::SomeFailed { failed } => {
                self.session = ProcessingSession::Idle;
                self.status = Some(UploaderStatus::SomeFilesFailed { failed });
                Vec::new()
            }
            ProcessingOutcome::NothingTracked => {
                self.session = ProcessingSession::Idle;
                self.progress_percent = None;
                self.status = Some(UploaderStatus::NoFiles);
                Vec::new()
            }
            ProcessingOutcome::TransportError { .. } => {
                self.session = ProcessingSession::Idle;
                self.status = Some(UploaderStatus::ProcessError);
                Vec::new()
            }
            ProcessingOutcome::GaveUp => {
                self.session = ProcessingSession::Idle;
                self.status = Some(UploaderStatus::GaveUp);
                Vec::new()
            }
        }
    }

    /// Clears the success status. Returns true when the conversation should reset.
    pub(crate) fn success_elapsed(&mut self) -> bool {
        if self.session != ProcessingSession::ShowingSuccess {
            return false;
        }
        self.session = ProcessingSession::Idle;
        self.status = None;
        self.progress_percent = None;
        true
    }
}

fn apply_status(record: &mut FileRecord, status: FileStatus) {
    match status {
        FileStatus::Processing { progress } => {
            record.stage = FileStage::Processing;
            record.backend_progress = progress.map(|p| p.min(100));
        }
        FileStatus::Completed => {
            record.stage = FileStage::Completed;
            record.backend_progress = Some(100);
        }
        FileStatus::Failed => {
            record.stage = FileStage::Failed;
        }
        FileStatus::Missing => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracked(names: &[&str]) -> UploaderState {
        let mut state = UploaderState::default();
        state.restore(names.iter().map(|n| n.to_string()).collect());
        state
    }

    #[test]
    fn restore_skips_blank_and_repeated_names() {
        let mut state = UploaderState::default();
        let effects = state.restore(vec![
            "a.pdf".to_string(),
            "  ".to_string(),
            "a.pdf".to_string(),
        ]);
        assert_eq!(state.tracked_names(), vec!["a.pdf".to_string()]);
        assert_eq!(
            effects,
            vec![Effect::RevalidateFiles {
                names: vec!["a.pdf".to_string()]
            }]
        );
    }

    #[test]
    fn uploading_files_are_not_tracked() {
        let mut state = tracked(&["a.pdf"]);
        state.select_file("b.pdf".to_string(), PathBuf::from("b.pdf"));
        assert_eq!(state.tracked_names(), vec!["a.pdf".to_string()]);
    }

    #[test]
    fn upload_progress_is_clamped_and_ignored_after_upload() {
        let mut state = UploaderState::default();
        state.select_file("a.pdf".to_string(), PathBuf::from("a.pdf"));
        assert!(state.upload_progress("a.pdf", 150));
        assert_eq!(state.files().next().unwrap().upload_percent, 100);

        state.upload_finished("a.pdf".to_string(), true);
        assert!(!state.upload_progress("a.pdf", 10));
        assert_eq!(state.files().next().unwrap().stage, FileStage::Uploaded);
    }

    #[test]
    fn late_upload_result_for_unknown_name_is_ignored() {
        let mut state = UploaderState::default();
        let effects = state.upload_finished("ghost.pdf".to_string(), true);
        assert!(effects.is_empty());
        assert!(state.tracked_names().is_empty());
        assert_eq!(state.status(), None);
    }

    #[test]
    fn tick_outside_polling_is_ignored() {
        let mut state = tracked(&["a.pdf"]);
        let effects = state.apply_tick(
            100,
            vec![FileReport {
                name: "a.pdf".to_string(),
                status: FileStatus::Completed,
            }],
        );
        assert!(effects.is_empty());
        assert_eq!(state.progress_percent(), None);
        assert_eq!(state.files().next().unwrap().stage, FileStage::Uploaded);
    }
}
