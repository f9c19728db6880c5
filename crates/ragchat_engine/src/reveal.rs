use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::{EngineEvent, ProgressSink, RequestId};

#[derive(Debug, Clone)]
pub struct RevealSettings {
    pub chunk_chars: usize,
    pub chunk_delay: Duration,
}

impl Default for RevealSettings {
    fn default() -> Self {
        Self {
            chunk_chars: 3,
            chunk_delay: Duration::from_millis(3),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealOutcome {
    Completed,
    Cancelled { revealed: String },
}

/// Plays back an already received answer a few characters at a time.
///
/// Each step emits the whole prefix revealed so far. Once `cancel` fires no
/// further events are emitted, including the final `RevealFinished`.
pub async fn reveal(
    request_id: RequestId,
    text: &str,
    settings: &RevealSettings,
    cancel: &CancellationToken,
    sink: &dyn ProgressSink,
) -> RevealOutcome {
    let chunk_chars = settings.chunk_chars.max(1);
    let mut revealed = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while chars.peek().is_some() {
        if cancel.is_cancelled() {
            return RevealOutcome::Cancelled { revealed };
        }
        revealed.extend(chars.by_ref().take(chunk_chars));
        sink.emit(EngineEvent::Revealed {
            request_id,
            text: revealed.clone(),
        });
        if chars.peek().is_none() {
            break;
        }
        tokio::select! {
            _ = cancel.cancelled() => return RevealOutcome::Cancelled { revealed },
            _ = tokio::time::sleep(settings.chunk_delay) => {}
        }
    }

    if cancel.is_cancelled() {
        return RevealOutcome::Cancelled { revealed };
    }
    sink.emit(EngineEvent::RevealFinished { request_id });
    RevealOutcome::Completed
}
