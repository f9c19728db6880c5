use ragchat_core::{AppViewModel, FileRowView, FileStage, MessageView, Sender, Severity};

use super::constants::*;
use super::markdown::render_markdown;

/// Turns successive view models into terminal output.
///
/// A terminal cannot redraw a growing message in place without a full-screen
/// UI, so the renderer diffs each view against the previous one and only
/// writes what changed: new messages, the grown suffix of the tail message,
/// and status lines when they change.
///
/// With `markdown` on, an answer that was typed out raw is reprinted with
/// terminal styling once it finishes, unless styling would not change it.
/// Answers that arrive already finished are printed styled right away.
pub struct TerminalRenderer {
    last: AppViewModel,
    /// The cursor sits right after the tail message text.
    tail_open: bool,
    markdown: bool,
}

impl TerminalRenderer {
    pub fn new(markdown: bool) -> Self {
        Self {
            last: AppViewModel::default(),
            tail_open: false,
            markdown,
        }
    }

    pub fn render(&mut self, view: &AppViewModel) -> String {
        let mut out = String::new();
        self.render_status(view, &mut out);
        self.render_uploads(view, &mut out);
        self.render_transcript(view, &mut out);
        self.last = view.clone();
        out
    }

    /// Ends an open tail line before unrelated output is written.
    pub fn interrupt(&mut self) -> String {
        let mut out = String::new();
        self.close_tail(&mut out);
        out
    }

    fn close_tail(&mut self, out: &mut String) {
        if self.tail_open {
            out.push('\n');
            self.tail_open = false;
        }
    }

    fn render_status(&mut self, view: &AppViewModel, out: &mut String) {
        if view.uploader_status == self.last.uploader_status {
            return;
        }
        if let Some(status) = &view.uploader_status {
            self.close_tail(out);
            out.push_str(severity_tag(status.severity));
            out.push(' ');
            out.push_str(&status.text);
            out.push('\n');
        }
    }

    fn render_uploads(&mut self, view: &AppViewModel, out: &mut String) {
        for file in view.files.iter().filter(|f| f.stage == FileStage::Uploading) {
            let step = file.upload_percent / UPLOAD_STEP_PERCENT;
            let previous_step = self
                .last
                .files
                .iter()
                .find(|old| old.name == file.name && old.stage == FileStage::Uploading)
                .map(|old| old.upload_percent / UPLOAD_STEP_PERCENT)
                .unwrap_or(0);
            if step > previous_step {
                self.close_tail(out);
                out.push_str(&format!("[upload] {} {}%\n", file.name, file.upload_percent));
            }
        }
    }

    fn render_transcript(&mut self, view: &AppViewModel, out: &mut String) {
        let mut previous = std::mem::take(&mut self.last.transcript);
        if view.chat_epoch != self.last.chat_epoch {
            self.close_tail(out);
            out.push_str(RESET_BANNER);
            out.push('\n');
            previous.clear();
        }

        for (index, message) in view.transcript.iter().enumerate() {
            match previous.get(index) {
                Some(old) if old == message => {}
                Some(old) => {
                    match message.text.strip_prefix(old.text.as_str()) {
                        Some("") => {}
                        Some(delta) => {
                            if !self.tail_open {
                                out.push_str(sender_prefix(message.sender));
                                out.push_str(CONTINUATION);
                            }
                            out.push_str(delta);
                            self.tail_open = true;
                        }
                        None => self.start_message(message, out),
                    }
                    if !message.in_progress {
                        self.close_tail(out);
                        if old.in_progress && self.styles(message) {
                            let styled = render_markdown(&message.text);
                            if styled != message.text.trim_end() {
                                out.push_str(&styled);
                                out.push('\n');
                            }
                        }
                    }
                }
                None if !message.in_progress && self.styles(message) => {
                    self.close_tail(out);
                    out.push_str(sender_prefix(message.sender));
                    out.push_str(&render_markdown(&message.text));
                    out.push('\n');
                }
                None => {
                    self.start_message(message, out);
                    if !message.in_progress {
                        self.close_tail(out);
                    }
                }
            }
        }
    }

    fn styles(&self, message: &MessageView) -> bool {
        self.markdown && message.sender == Sender::System
    }

    fn start_message(&mut self, message: &MessageView, out: &mut String) {
        self.close_tail(out);
        out.push_str(sender_prefix(message.sender));
        out.push_str(&message.text);
        self.tail_open = true;
    }
}

/// Listing printed for `/files`.
pub fn render_files(view: &AppViewModel) -> String {
    if view.files.is_empty() {
        return "No files uploaded.\n".to_string();
    }
    let mut out = String::from("Uploaded files:\n");
    for file in &view.files {
        out.push_str(&format!("  {}  {}\n", file.name, stage_label(file)));
    }
    if let Some(percent) = view.progress_percent {
        out.push_str(&format!("Processing: {percent}%\n"));
    }
    out
}

fn stage_label(file: &FileRowView) -> String {
    match file.stage {
        FileStage::Uploading => format!("uploading {}%", file.upload_percent),
        FileStage::Uploaded => "uploaded".to_string(),
        FileStage::Processing => match file.backend_progress {
            Some(progress) => format!("processing ({progress}%)"),
            None => "processing".to_string(),
        },
        FileStage::Completed => "completed".to_string(),
        FileStage::Failed => "failed".to_string(),
    }
}

fn sender_prefix(sender: Sender) -> &'static str {
    match sender {
        Sender::User => PREFIX_USER,
        Sender::System => PREFIX_SYSTEM,
    }
}

fn severity_tag(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "[info]",
        Severity::Success => "[ok]",
        Severity::Warning => "[warn]",
        Severity::Error => "[error]",
    }
}
