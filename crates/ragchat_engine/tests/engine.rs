use std::fs;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use ragchat_engine::{
    AskMode, BackendSettings, EngineEvent, EngineHandle, EngineSettings, FailureKind,
    PollOutcome, PollSettings, RevealSettings,
};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn engine_for(server: &MockServer, ask_mode: AskMode, reveal: RevealSettings) -> EngineHandle {
    EngineHandle::new(EngineSettings {
        backend: BackendSettings {
            base_url: server.uri(),
            ..BackendSettings::default()
        },
        poll: PollSettings {
            interval: Duration::from_millis(10),
            max_ticks: 20,
        },
        reveal,
        ask_mode,
    })
    .expect("engine")
}

/// Drains events off the async test thread until `done` matches or time runs out.
async fn collect_until(
    engine: &EngineHandle,
    timeout: Duration,
    done: fn(&EngineEvent) -> bool,
) -> Vec<EngineEvent> {
    let engine = engine.clone();
    tokio::task::spawn_blocking(move || {
        let deadline = Instant::now() + timeout;
        let mut events = Vec::new();
        while Instant::now() < deadline {
            if let Some(event) = engine.recv_timeout(Duration::from_millis(10)) {
                let finished = done(&event);
                events.push(event);
                if finished {
                    break;
                }
            }
        }
        events
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn upload_reads_the_file_and_reports_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ingest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = dir.path().join("notes.txt");
    fs::write(&file, "some document text").unwrap();

    let engine = engine_for(&server, AskMode::Buffered, RevealSettings::default());
    engine.upload("notes.txt", file);

    let events = collect_until(&engine, Duration::from_secs(5), |e| {
        matches!(e, EngineEvent::UploadCompleted { .. })
    })
    .await;

    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::UploadProgress { sent: 18, total: 18, .. }
    )));
    match events.last() {
        Some(EngineEvent::UploadCompleted { name, result }) => {
            assert_eq!(name, "notes.txt");
            assert!(result.is_ok());
        }
        other => panic!("unexpected last event: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn upload_of_unreadable_path_fails_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ingest"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let engine = engine_for(&server, AskMode::Buffered, RevealSettings::default());
    engine.upload("nope.pdf", "/definitely/not/here/nope.pdf".into());

    let events = collect_until(&engine, Duration::from_secs(5), |e| {
        matches!(e, EngineEvent::UploadCompleted { .. })
    })
    .await;
    match events.last() {
        Some(EngineEvent::UploadCompleted { result: Err(err), .. }) => {
            assert_eq!(err.kind, FailureKind::Io);
        }
        other => panic!("unexpected last event: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn polling_through_the_handle_ends_with_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status/a.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "completed" })))
        .mount(&server)
        .await;

    let engine = engine_for(&server, AskMode::Buffered, RevealSettings::default());
    engine.start_polling(vec!["a.pdf".to_string()]);

    let events = collect_until(&engine, Duration::from_secs(5), |e| {
        matches!(e, EngineEvent::PollFinished(_))
    })
    .await;
    assert_eq!(
        events.last(),
        Some(&EngineEvent::PollFinished(PollOutcome::AllCompleted))
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn ask_then_reveal_plays_back_the_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ask"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "answer": "Retrieval first." })))
        .mount(&server)
        .await;

    let engine = engine_for(&server, AskMode::Buffered, RevealSettings::default());
    engine.ask(1, "What is RAG?");
    let events = collect_until(&engine, Duration::from_secs(5), |e| {
        matches!(e, EngineEvent::Answer { .. })
    })
    .await;
    assert_eq!(
        events.last(),
        Some(&EngineEvent::Answer {
            request_id: 1,
            result: Ok("Retrieval first.".to_string())
        })
    );

    engine.reveal(1, "Retrieval first.");
    let events = collect_until(&engine, Duration::from_secs(5), |e| {
        matches!(e, EngineEvent::RevealFinished { .. })
    })
    .await;
    let texts: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::Revealed { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(texts.last(), Some(&"Retrieval first."));
    assert_eq!(texts.first(), Some(&"Ret"));
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_reveal_stops_emitting() {
    let server = MockServer::start().await;
    let engine = engine_for(
        &server,
        AskMode::Buffered,
        RevealSettings {
            chunk_chars: 1,
            chunk_delay: Duration::from_millis(20),
        },
    );
    let text = "x".repeat(200);
    engine.reveal(5, text.clone());

    let first = collect_until(&engine, Duration::from_secs(5), |e| {
        matches!(e, EngineEvent::Revealed { .. })
    })
    .await;
    assert_eq!(first.len(), 1);
    engine.cancel(5);

    // At most one step can race the cancel; after that the stream is silent.
    let settled = collect_until(&engine, Duration::from_millis(200), |_| false).await;
    assert!(settled.len() <= 1);
    assert!(!settled
        .iter()
        .any(|e| matches!(e, EngineEvent::RevealFinished { .. })));
    let quiet = collect_until(&engine, Duration::from_millis(100), |_| false).await;
    assert!(quiet.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn streaming_ask_reveals_as_it_arrives() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ask_stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("Streamed answer", "text/plain"))
        .mount(&server)
        .await;

    let engine = engine_for(&server, AskMode::Streaming, RevealSettings::default());
    engine.ask(2, "q");
    let events = collect_until(&engine, Duration::from_secs(5), |e| {
        matches!(e, EngineEvent::RevealFinished { .. })
    })
    .await;

    assert_eq!(
        events.last(),
        Some(&EngineEvent::RevealFinished { request_id: 2 })
    );
    assert!(events.contains(&EngineEvent::Revealed {
        request_id: 2,
        text: "Streamed answer".to_string()
    }));
}

#[tokio::test(flavor = "multi_thread")]
async fn success_clear_fires_after_the_delay() {
    let server = MockServer::start().await;
    let engine = engine_for(&server, AskMode::Buffered, RevealSettings::default());

    let started = Instant::now();
    engine.schedule_success_clear(Duration::from_millis(50));
    let events = collect_until(&engine, Duration::from_secs(5), |e| {
        matches!(e, EngineEvent::SuccessClearDue)
    })
    .await;

    assert_eq!(events, vec![EngineEvent::SuccessClearDue]);
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_ask_drops_the_late_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ask"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "answer": "too late" }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let engine = engine_for(&server, AskMode::Buffered, RevealSettings::default());
    engine.ask(9, "q");
    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.cancel(9);

    let events = collect_until(&engine, Duration::from_millis(700), |_| false).await;
    assert!(events.is_empty(), "unexpected events: {events:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_streaming_ask_emits_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ask_stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("too late", "text/plain")
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let engine = engine_for(&server, AskMode::Streaming, RevealSettings::default());
    engine.ask(10, "q");
    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.cancel(10);

    let events = collect_until(&engine, Duration::from_millis(700), |_| false).await;
    assert!(events.is_empty(), "unexpected events: {events:?}");
}
