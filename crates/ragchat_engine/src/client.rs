use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use ragchat_logging::{rag_debug, rag_warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, Url};
use serde::Deserialize;

use crate::answer::extract_answer;
use crate::stream::StreamDecoder;
use crate::{
    BackendError, BackendInfo, EngineEvent, FailureKind, IngestReceipt, ProbeStatus, RequestId,
};

/// Which per-file status route the backend exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusEndpoint {
    /// `GET /status/{name}`: `processing | completed | failed` plus progress.
    #[default]
    Status,
    /// `GET /process/{name}`: `processing | done`.
    Process,
}

impl StatusEndpoint {
    fn segment(self) -> &'static str {
        match self {
            StatusEndpoint::Status => "status",
            StatusEndpoint::Process => "process",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub base_url: String,
    pub status_endpoint: StatusEndpoint,
    /// `None` leaves connection attempts unbounded.
    pub connect_timeout: Option<Duration>,
    /// `None` leaves requests unbounded; a hung backend stalls the caller.
    pub request_timeout: Option<Duration>,
    pub upload_chunk_size: usize,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            status_endpoint: StatusEndpoint::Status,
            connect_timeout: None,
            request_timeout: None,
            upload_chunk_size: 64 * 1024,
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// The RAG backend as seen by the client.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// `POST /ingest`, reporting bytes handed to the transport as they go.
    async fn upload(
        &self,
        name: &str,
        contents: Bytes,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<IngestReceipt, BackendError>;

    async fn probe_status(&self, name: &str) -> Result<ProbeStatus, BackendError>;

    /// `POST /ask`, returning the answer text extracted from the payload.
    async fn ask(&self, query: &str) -> Result<String, BackendError>;

    /// `POST /ask_stream`, emitting the accumulated text as it arrives.
    async fn ask_stream(
        &self,
        request_id: RequestId,
        query: &str,
        sink: &dyn ProgressSink,
    ) -> Result<String, BackendError>;

    async fn info(&self) -> Result<BackendInfo, BackendError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    settings: BackendSettings,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
    #[serde(default)]
    progress: Option<f64>,
}

impl ReqwestBackend {
    pub fn new(settings: BackendSettings) -> Result<Self, BackendError> {
        // Fail early on a malformed base URL rather than on the first request.
        Url::parse(&settings.base_url)
            .map_err(|err| BackendError::new(FailureKind::InvalidUrl, err.to_string()))?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| BackendError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    /// Joins percent-encoded path segments onto the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = Url::parse(&self.settings.base_url)
            .map_err(|err| BackendError::new(FailureKind::InvalidUrl, err.to_string()))?;
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                BackendError::new(FailureKind::InvalidUrl, "base url cannot carry a path")
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    fn json_body(query: &str) -> Result<Vec<u8>, BackendError> {
        serde_json::to_vec(&serde_json::json!({ "query": query }))
            .map_err(|err| BackendError::new(FailureKind::Decode, err.to_string()))
    }
}

#[async_trait::async_trait]
impl Backend for ReqwestBackend {
    async fn upload(
        &self,
        name: &str,
        contents: Bytes,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<IngestReceipt, BackendError> {
        let url = self.endpoint(&["ingest"])?;
        let total = contents.len() as u64;
        let chunk_size = self.settings.upload_chunk_size.max(1);
        let chunks: Vec<Bytes> = (0..contents.len())
            .step_by(chunk_size)
            .map(|start| contents.slice(start..(start + chunk_size).min(contents.len())))
            .collect();

        sink.emit(EngineEvent::UploadProgress {
            name: name.to_string(),
            sent: 0,
            total,
        });

        let progress_name = name.to_string();
        let mut sent = 0u64;
        let body = futures_util::stream::iter(chunks).map(move |chunk| {
            sent += chunk.len() as u64;
            sink.emit(EngineEvent::UploadProgress {
                name: progress_name.clone(),
                sent,
                total,
            });
            Ok::<Bytes, std::io::Error>(chunk)
        });

        let part = Part::stream_with_length(reqwest::Body::wrap_stream(body), total)
            .file_name(name.to_string());
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        match serde_json::from_slice::<IngestReceipt>(&body) {
            Ok(receipt) => Ok(receipt),
            Err(err) => {
                rag_debug!("ingest response for {} was not a receipt: {}", name, err);
                Ok(IngestReceipt::default())
            }
        }
    }

    async fn probe_status(&self, name: &str) -> Result<ProbeStatus, BackendError> {
        let url = self.endpoint(&[self.settings.status_endpoint.segment(), name])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(ProbeStatus::Missing);
        }
        if !status.is_success() {
            return Err(BackendError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        let parsed: StatusBody = serde_json::from_slice(&body)
            .map_err(|err| BackendError::new(FailureKind::Decode, err.to_string()))?;
        Ok(parse_status(name, &parsed))
    }

    async fn ask(&self, query: &str) -> Result<String, BackendError> {
        let url = self.endpoint(&["ask"])?;
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(Self::json_body(query)?)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        // Error responses still carry a JSON `detail` worth showing.
        let status = response.status();
        if !status.is_success() {
            rag_warn!("ask returned {}", status);
        }
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        let payload: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|err| BackendError::new(FailureKind::Decode, err.to_string()))?;
        Ok(extract_answer(&payload))
    }

    async fn ask_stream(
        &self,
        request_id: RequestId,
        query: &str,
        sink: &dyn ProgressSink,
    ) -> Result<String, BackendError> {
        let url = self.endpoint(&["ask_stream"])?;
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(Self::json_body(query)?)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());
        let mut text = StreamDecoder::for_content_type(content_type);
        rag_debug!("ask_stream {} decoding as {}", request_id, text.encoding().name());
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            if text.push(&chunk) {
                sink.emit(EngineEvent::Revealed {
                    request_id,
                    text: text.as_str().to_string(),
                });
            }
        }
        Ok(text.finish())
    }

    async fn info(&self) -> Result<BackendInfo, BackendError> {
        let url = self.endpoint(&[])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&body)
            .map_err(|err| BackendError::new(FailureKind::Decode, err.to_string()))
    }
}

fn parse_status(name: &str, body: &StatusBody) -> ProbeStatus {
    let progress = body
        .progress
        .filter(|p| p.is_finite())
        .map(|p| p.clamp(0.0, 100.0).round() as u8);
    match body.status.trim().to_ascii_lowercase().as_str() {
        "completed" | "done" => ProbeStatus::Completed,
        "failed" => ProbeStatus::Failed,
        "processing" | "pending" => ProbeStatus::Processing { progress },
        other => {
            rag_warn!("unknown status {:?} for {}; treating as processing", other, name);
            ProbeStatus::Processing { progress }
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        return BackendError::new(FailureKind::Timeout, err.to_string());
    }
    BackendError::new(FailureKind::Network, err.to_string())
}
