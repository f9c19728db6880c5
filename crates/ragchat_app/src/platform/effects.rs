use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use ragchat_core::{Effect, FileReport, FileStatus, Msg, ProcessingOutcome};
use ragchat_engine::{EngineEvent, EngineHandle, PollOutcome, ProbeStatus};
use ragchat_logging::{rag_debug, rag_info, rag_warn};

use super::app::AppEvent;
use super::persistence;

/// Executes core effects against the engine and feeds engine events back
/// into the dispatch loop as core messages.
pub struct EffectRunner {
    engine: EngineHandle,
    state_dir: PathBuf,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, state_dir: PathBuf, msg_tx: mpsc::Sender<AppEvent>) -> Self {
        let runner = Self { engine, state_dir };
        runner.spawn_event_loop(msg_tx);
        runner
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::UploadFile { name, path } => {
                    rag_info!("UploadFile name={} path={}", name, path.display());
                    self.engine.upload(name, path);
                }
                Effect::RevalidateFiles { names } => {
                    rag_info!("RevalidateFiles count={}", names.len());
                    self.engine.revalidate(names);
                }
                Effect::StartPolling { names } => {
                    rag_info!("StartPolling names={:?}", names);
                    self.engine.start_polling(names);
                }
                Effect::ScheduleSuccessClear { after } => {
                    self.engine.schedule_success_clear(after);
                }
                Effect::PersistSession {
                    uploaded_files,
                    reset_chat_pending,
                } => {
                    persistence::save_session(&self.state_dir, &uploaded_files, reset_chat_pending);
                }
                Effect::Ask { request_id, query } => {
                    rag_info!("Ask request_id={} query_len={}", request_id, query.len());
                    self.engine.ask(request_id, query);
                }
                Effect::StartReveal { request_id, text } => {
                    rag_debug!("StartReveal request_id={} chars={}", request_id, text.chars().count());
                    self.engine.reveal(request_id, text);
                }
                Effect::CancelRequest { request_id } => {
                    rag_info!("CancelRequest request_id={}", request_id);
                    self.engine.cancel(request_id);
                }
            }
        }
    }

    fn spawn_event_loop(&self, msg_tx: mpsc::Sender<AppEvent>) {
        let engine = self.engine.clone();
        thread::spawn(move || loop {
            if let Some(event) = engine.try_recv() {
                if msg_tx.send(AppEvent::Core(map_event(event))).is_err() {
                    break;
                }
            } else {
                thread::sleep(Duration::from_millis(10));
            }
        });
    }
}

pub(crate) fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::UploadProgress { name, sent, total } => Msg::UploadProgress {
            name,
            percent: upload_percent(sent, total),
        },
        EngineEvent::UploadCompleted { name, result } => Msg::UploadFinished {
            name,
            result: result.map(|_| ()).map_err(|err| err.to_string()),
        },
        EngineEvent::Revalidated { missing } => Msg::RevalidationFinished { missing },
        EngineEvent::PollTick(tick) => Msg::ProcessingTick {
            percent: tick.percent,
            reports: tick
                .reports
                .into_iter()
                .map(|report| FileReport {
                    name: report.name,
                    status: map_status(report.status),
                })
                .collect(),
        },
        EngineEvent::PollFinished(outcome) => Msg::ProcessingFinished {
            outcome: map_outcome(outcome),
        },
        EngineEvent::Answer { request_id, result } => Msg::AnswerReceived {
            request_id,
            result: result.map_err(|err| err.to_string()),
        },
        EngineEvent::Revealed { request_id, text } => Msg::RevealProgress { request_id, text },
        EngineEvent::RevealFinished { request_id } => Msg::RevealFinished { request_id },
        EngineEvent::SuccessClearDue => Msg::SuccessDisplayElapsed,
    }
}

fn upload_percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    (sent.min(total) * 100 / total) as u8
}

fn map_status(status: ProbeStatus) -> FileStatus {
    match status {
        ProbeStatus::Processing { progress } => FileStatus::Processing { progress },
        ProbeStatus::Completed => FileStatus::Completed,
        ProbeStatus::Failed => FileStatus::Failed,
        ProbeStatus::Missing => FileStatus::Missing,
    }
}

fn map_outcome(outcome: PollOutcome) -> ProcessingOutcome {
    match outcome {
        PollOutcome::AllCompleted => ProcessingOutcome::AllCompleted,
        PollOutcome::SomeFailed { failed } => ProcessingOutcome::SomeFailed { failed },
        PollOutcome::NothingTracked => ProcessingOutcome::NothingTracked,
        PollOutcome::TransportError(err) => {
            rag_warn!("Processing poll failed: {}", err);
            ProcessingOutcome::TransportError {
                message: err.to_string(),
            }
        }
        PollOutcome::GaveUp { ticks } => {
            rag_warn!("Processing still running after {} polls; giving up", ticks);
            ProcessingOutcome::GaveUp
        }
    }
}
