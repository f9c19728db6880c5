use std::fmt;

use serde::Deserialize;

pub type RequestId = u64;

/// What a single status probe learned about one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Processing { progress: Option<u8> },
    Completed,
    Failed,
    /// The backend answered 404 for the name.
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub name: String,
    pub status: ProbeStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTick {
    pub tick: u32,
    pub percent: u8,
    pub reports: Vec<StatusReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    AllCompleted,
    SomeFailed { failed: Vec<String> },
    NothingTracked,
    TransportError(BackendError),
    GaveUp { ticks: u32 },
}

/// Body of a successful `POST /ingest`; both fields are informational.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct IngestReceipt {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status_url: Option<String>,
}

/// Body of `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct BackendInfo {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub endpoints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    UploadProgress {
        name: String,
        sent: u64,
        total: u64,
    },
    UploadCompleted {
        name: String,
        result: Result<IngestReceipt, BackendError>,
    },
    Revalidated {
        missing: Vec<String>,
    },
    PollTick(PollTick),
    PollFinished(PollOutcome),
    Answer {
        request_id: RequestId,
        result: Result<String, BackendError>,
    },
    /// Full text revealed so far for the request.
    Revealed {
        request_id: RequestId,
        text: String,
    },
    RevealFinished {
        request_id: RequestId,
    },
    SuccessClearDue,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: FailureKind,
    pub message: String,
}

impl BackendError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Io,
    /// Response body was not the JSON (or UTF-8) we expected.
    Decode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Io => write!(f, "io error"),
            FailureKind::Decode => write!(f, "decode error"),
        }
    }
}
