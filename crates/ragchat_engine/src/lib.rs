//! RagChat engine: backend IO and effect execution.
mod answer;
mod client;
mod engine;
mod persist;
mod poll;
mod reveal;
mod stream;
mod types;

pub use answer::extract_answer;
pub use client::{
    Backend, BackendSettings, ChannelProgressSink, ProgressSink, ReqwestBackend, StatusEndpoint,
};
pub use engine::{fetch_backend_info, AskMode, EngineHandle, EngineSettings};
pub use persist::{ensure_state_dir, AtomicFileWriter, PersistError};
pub use poll::{aggregate, poll_until_terminal, revalidate, Aggregate, PollSettings};
pub use reveal::{reveal, RevealOutcome, RevealSettings};
pub use stream::StreamDecoder;
pub use types::{
    BackendError, BackendInfo, EngineEvent, FailureKind, IngestReceipt, PollOutcome, PollTick,
    ProbeStatus, RequestId, StatusReport,
};
