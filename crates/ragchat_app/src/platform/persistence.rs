use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use ragchat_engine::{ensure_state_dir, AtomicFileWriter};
use ragchat_logging::{rag_error, rag_info, rag_warn};
use serde::{Deserialize, Serialize};

const STATE_FILENAME: &str = ".ragchat_state.ron";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedState {
    #[serde(default)]
    uploaded_files: Vec<String>,
    #[serde(default)]
    reset_chat_pending: bool,
    #[serde(default)]
    saved_utc: Option<String>,
}

/// What a previous run left behind for the uploader.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct PersistedSession {
    pub uploaded_files: Vec<String>,
    pub reset_chat_pending: bool,
}

pub(crate) fn load_session(state_dir: &Path) -> PersistedSession {
    let path = state_dir.join(STATE_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return PersistedSession::default();
        }
        Err(err) => {
            rag_warn!("Failed to read persisted state from {:?}: {}", path, err);
            return PersistedSession::default();
        }
    };

    let state: PersistedState = match ron::from_str(&content) {
        Ok(state) => state,
        Err(err) => {
            rag_warn!("Failed to parse persisted state from {:?}: {}", path, err);
            return PersistedSession::default();
        }
    };

    rag_info!(
        "Loaded {} uploaded file name(s) from {:?} (saved {})",
        state.uploaded_files.len(),
        path,
        state.saved_utc.as_deref().unwrap_or("unknown")
    );
    PersistedSession {
        uploaded_files: state.uploaded_files,
        reset_chat_pending: state.reset_chat_pending,
    }
}

pub(crate) fn save_session(state_dir: &Path, uploaded_files: &[String], reset_chat_pending: bool) {
    if let Err(err) = ensure_state_dir(state_dir) {
        rag_error!("Failed to ensure state dir {:?}: {}", state_dir, err);
        return;
    }

    let state = PersistedState {
        uploaded_files: uploaded_files.to_vec(),
        reset_chat_pending,
        saved_utc: Some(Utc::now().to_rfc3339()),
    };

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(&state, pretty) {
        Ok(text) => text,
        Err(err) => {
            rag_error!("Failed to serialize persisted state: {}", err);
            return;
        }
    };

    let writer = AtomicFileWriter::new(PathBuf::from(state_dir));
    if let Err(err) = writer.write(STATE_FILENAME, &content) {
        rag_error!("Failed to write persisted state to {:?}: {}", state_dir, err);
    }
}
