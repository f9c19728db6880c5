use std::path::PathBuf;

use ragchat_core::Msg;

use super::constants::*;
use crate::platform::app::AppEvent;

/// Turns one line from stdin into the events it stands for.
pub fn parse_line(line: &str) -> Vec<AppEvent> {
    let trimmed = line.trim();
    let (command, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (trimmed, ""),
    };

    match command {
        CMD_UPLOAD => vec![AppEvent::Core(select_file(rest))],
        CMD_PROCESS => vec![AppEvent::Core(Msg::ProcessClicked)],
        CMD_STOP => vec![AppEvent::Core(Msg::StopClicked)],
        CMD_RESET => vec![AppEvent::Core(Msg::ResetChat)],
        CMD_FILES => vec![AppEvent::ListFiles],
        CMD_HELP => vec![AppEvent::Help],
        CMD_QUIT | CMD_EXIT => vec![AppEvent::Quit],
        _ if command.len() > 1 && command.starts_with('/') => {
            vec![AppEvent::Unknown(command.to_string())]
        }
        _ => vec![
            AppEvent::Core(Msg::InputChanged(
                line.trim_end_matches(['\r', '\n']).to_string(),
            )),
            AppEvent::Core(Msg::SendClicked),
        ],
    }
}

fn select_file(raw: &str) -> Msg {
    let unquoted = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);
    if unquoted.is_empty() {
        return Msg::NoFileSelected;
    }
    let path = PathBuf::from(unquoted);
    match path.file_name() {
        Some(name) => Msg::FileSelected {
            name: name.to_string_lossy().into_owned(),
            path,
        },
        None => Msg::NoFileSelected,
    }
}
