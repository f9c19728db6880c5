use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result};
use ragchat_core::{update, AppState, ChatPhase, Msg};
use ragchat_engine::{fetch_backend_info, EngineHandle};
use ragchat_logging::{rag_info, rag_warn};

use super::config::AppConfig;
use super::effects::EffectRunner;
use super::persistence;
use super::ui;

const BUSY_NOTICE: &str = "Still answering; type /stop to interrupt.\n";

/// Everything the dispatch loop reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Core(Msg),
    ListFiles,
    Help,
    Unknown(String),
    Quit,
}

pub fn run_app(config: AppConfig) -> Result<()> {
    let engine = EngineHandle::new(config.engine_settings())
        .with_context(|| format!("Invalid backend url: {}", config.backend.base_url))?;
    rag_info!(
        "ragchat started: backend={} state_dir={}",
        config.backend.base_url,
        config.state_dir.display()
    );

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>();
    let runner = EffectRunner::new(engine, config.state_dir.clone(), event_tx.clone());

    let session = persistence::load_session(&config.state_dir);
    let _ = event_tx.send(AppEvent::Core(Msg::RestoreSession {
        uploaded_files: session.uploaded_files,
        reset_chat_pending: session.reset_chat_pending,
    }));
    spawn_stdin_reader(event_tx);

    let mut stdout = io::stdout().lock();
    writeln!(
        stdout,
        "ragchat connected to {}. Type /help for commands.",
        config.backend.base_url
    )?;
    stdout.flush()?;

    let mut state = AppState::with_success_display(config.success_display());
    let mut renderer = ui::render::TerminalRenderer::new(config.ui.render_markdown);

    while let Ok(event) = event_rx.recv() {
        let output = match event {
            AppEvent::Core(Msg::SendClicked) if state.chat_phase() != ChatPhase::Idle => {
                renderer.interrupt() + BUSY_NOTICE
            }
            AppEvent::Core(msg) => {
                let (next, effects) = update(std::mem::take(&mut state), msg);
                state = next;
                runner.enqueue(effects);
                if state.consume_dirty() {
                    renderer.render(&state.view())
                } else {
                    continue;
                }
            }
            AppEvent::ListFiles => {
                renderer.interrupt() + &ui::render::render_files(&state.view())
            }
            AppEvent::Help => renderer.interrupt() + ui::constants::HELP_TEXT,
            AppEvent::Unknown(command) => {
                rag_warn!("Unknown command {}", command);
                renderer.interrupt() + &format!("Unknown command {command}. Type /help.\n")
            }
            AppEvent::Quit => break,
        };
        stdout.write_all(output.as_bytes())?;
        stdout.flush()?;
    }

    rag_info!("ragchat exiting");
    Ok(())
}

fn spawn_stdin_reader(event_tx: mpsc::Sender<AppEvent>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    rag_warn!("Failed to read stdin: {}", err);
                    break;
                }
            };
            for event in ui::input::parse_line(&line) {
                if event_tx.send(event).is_err() {
                    return;
                }
            }
        }
        let _ = event_tx.send(AppEvent::Quit);
    });
}

/// Prints what `GET /` reports about the backend.
pub fn check_backend(config: &AppConfig) -> Result<()> {
    let info = fetch_backend_info(&config.engine_settings().backend)
        .with_context(|| format!("Backend at {} is not reachable", config.backend.base_url))?;
    println!("{} {} ({})", info.service, info.version, info.status);
    for endpoint in &info.endpoints {
        println!("  {endpoint}");
    }
    Ok(())
}
