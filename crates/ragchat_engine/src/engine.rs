use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use ragchat_logging::{rag_error, rag_info, rag_warn};
use tokio_util::sync::CancellationToken;

use crate::client::{BackendSettings, ChannelProgressSink, ProgressSink, ReqwestBackend};
use crate::poll::{poll_until_terminal, revalidate, PollSettings};
use crate::reveal::{reveal, RevealOutcome, RevealSettings};
use crate::{Backend, BackendError, BackendInfo, EngineEvent, FailureKind, RequestId};

/// How answers are obtained from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AskMode {
    /// `POST /ask`, then play the answer back with the typing reveal.
    #[default]
    Buffered,
    /// `POST /ask_stream`, showing text as the backend produces it.
    Streaming,
}

#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub backend: BackendSettings,
    pub poll: PollSettings,
    pub reveal: RevealSettings,
    pub ask_mode: AskMode,
}

enum EngineCommand {
    Upload { name: String, path: PathBuf },
    Revalidate { names: Vec<String> },
    StartPolling { names: Vec<String> },
    Ask { request_id: RequestId, query: String },
    Reveal { request_id: RequestId, text: String },
    Cancel { request_id: RequestId },
    ScheduleSuccessClear { after: Duration },
}

#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

struct EngineContext {
    backend: Arc<dyn Backend>,
    settings: EngineSettings,
    event_tx: mpsc::Sender<EngineEvent>,
    tokens: Mutex<HashMap<RequestId, CancellationToken>>,
}

impl EngineContext {
    fn emit(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }

    fn sink(&self) -> ChannelProgressSink {
        ChannelProgressSink::new(self.event_tx.clone())
    }

    /// Token for a request, created on first use.
    fn token(&self, request_id: RequestId) -> CancellationToken {
        let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        tokens.entry(request_id).or_default().clone()
    }

    fn release(&self, request_id: RequestId) {
        let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        tokens.remove(&request_id);
    }

    fn cancel(&self, request_id: RequestId) {
        let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = tokens.remove(&request_id) {
            token.cancel();
        }
    }
}

impl EngineHandle {
    pub fn new(settings: EngineSettings) -> Result<Self, BackendError> {
        let backend = Arc::new(ReqwestBackend::new(settings.backend.clone())?);
        Ok(Self::with_backend(backend, settings))
    }

    pub fn with_backend(backend: Arc<dyn Backend>, settings: EngineSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let context = Arc::new(EngineContext {
            backend,
            settings,
            event_tx,
            tokens: Mutex::new(HashMap::new()),
        });

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    rag_error!("engine could not start its runtime: {}", err);
                    return;
                }
            };
            while let Ok(command) = cmd_rx.recv() {
                // Tokens are registered here, in command order, so a Cancel
                // always finds the token of the request it follows.
                let token = match &command {
                    EngineCommand::Cancel { request_id } => {
                        context.cancel(*request_id);
                        continue;
                    }
                    EngineCommand::Ask { request_id, .. }
                    | EngineCommand::Reveal { request_id, .. } => {
                        Some(context.token(*request_id))
                    }
                    _ => None,
                };
                let context = context.clone();
                runtime.spawn(async move {
                    handle_command(&context, command, token.unwrap_or_default()).await;
                });
            }
        });

        Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        }
    }

    pub fn upload(&self, name: impl Into<String>, path: PathBuf) {
        self.send(EngineCommand::Upload {
            name: name.into(),
            path,
        });
    }

    pub fn revalidate(&self, names: Vec<String>) {
        self.send(EngineCommand::Revalidate { names });
    }

    pub fn start_polling(&self, names: Vec<String>) {
        self.send(EngineCommand::StartPolling { names });
    }

    pub fn ask(&self, request_id: RequestId, query: impl Into<String>) {
        self.send(EngineCommand::Ask {
            request_id,
            query: query.into(),
        });
    }

    pub fn reveal(&self, request_id: RequestId, text: impl Into<String>) {
        self.send(EngineCommand::Reveal {
            request_id,
            text: text.into(),
        });
    }

    pub fn cancel(&self, request_id: RequestId) {
        self.send(EngineCommand::Cancel { request_id });
    }

    pub fn schedule_success_clear(&self, after: Duration) {
        self.send(EngineCommand::ScheduleSuccessClear { after });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.recv_timeout(timeout).ok()
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            rag_warn!("engine thread is gone; command dropped");
        }
    }
}

async fn handle_command(context: &EngineContext, command: EngineCommand, token: CancellationToken) {
    match command {
        EngineCommand::Upload { name, path } => {
            let result = match tokio::fs::read(&path).await {
                Ok(contents) => {
                    let sink: Arc<dyn ProgressSink> = Arc::new(context.sink());
                    context
                        .backend
                        .upload(&name, Bytes::from(contents), sink)
                        .await
                }
                Err(err) => Err(BackendError::new(
                    FailureKind::Io,
                    format!("{}: {}", path.display(), err),
                )),
            };
            match &result {
                Ok(receipt) => rag_info!(
                    "uploaded {}: {}",
                    name,
                    receipt.message.as_deref().unwrap_or("ok")
                ),
                Err(err) => rag_warn!("upload of {} failed: {}", name, err),
            }
            context.emit(EngineEvent::UploadCompleted { name, result });
        }
        EngineCommand::Revalidate { names } => {
            let missing = revalidate(context.backend.as_ref(), &names).await;
            context.emit(EngineEvent::Revalidated { missing });
        }
        EngineCommand::StartPolling { names } => {
            let sink = context.sink();
            let outcome = poll_until_terminal(
                context.backend.as_ref(),
                names,
                &context.settings.poll,
                &sink,
            )
            .await;
            context.emit(EngineEvent::PollFinished(outcome));
        }
        EngineCommand::Ask { request_id, query } => match context.settings.ask_mode {
            AskMode::Buffered => {
                let result = tokio::select! {
                    _ = token.cancelled() => return,
                    result = context.backend.ask(&query) => result,
                };
                // Release before emitting: the answer triggers a Reveal for the same id.
                context.release(request_id);
                if let Err(err) = &result {
                    rag_warn!("ask {} failed: {}", request_id, err);
                }
                context.emit(EngineEvent::Answer { request_id, result });
            }
            AskMode::Streaming => {
                let sink = context.sink();
                let result = tokio::select! {
                    _ = token.cancelled() => return,
                    result = context.backend.ask_stream(request_id, &query, &sink) => result,
                };
                context.release(request_id);
                match result {
                    Ok(_) => context.emit(EngineEvent::RevealFinished { request_id }),
                    Err(err) => {
                        rag_warn!("streamed ask {} failed: {}", request_id, err);
                        context.emit(EngineEvent::Answer {
                            request_id,
                            result: Err(err),
                        });
                    }
                }
            }
        },
        EngineCommand::Reveal { request_id, text } => {
            let sink = context.sink();
            let outcome = reveal(request_id, &text, &context.settings.reveal, &token, &sink).await;
            if let RevealOutcome::Cancelled { revealed } = outcome {
                rag_info!(
                    "reveal {} stopped after {} of {} chars",
                    request_id,
                    revealed.chars().count(),
                    text.chars().count()
                );
            }
            context.release(request_id);
        }
        EngineCommand::ScheduleSuccessClear { after } => {
            tokio::time::sleep(after).await;
            context.emit(EngineEvent::SuccessClearDue);
        }
        // Handled synchronously by the command loop.
        EngineCommand::Cancel { .. } => {}
    }
}

/// One-shot `GET /` used by the `--check` flag.
pub fn fetch_backend_info(settings: &BackendSettings) -> Result<BackendInfo, BackendError> {
    let backend = ReqwestBackend::new(settings.clone())?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| BackendError::new(FailureKind::Io, err.to_string()))?;
    runtime.block_on(backend.info())
}
