//! User-facing surface of the launcher.
//!
//! Resolvers and the update checker report problems and ask questions
//! through [`Host`]. The binary picks the implementation: [`TerminalHost`]
//! for interactive subcommands, [`LogHost`] when stdin/stdout carry the LSP
//! stream and nothing may be written to them.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::config::SettingKey;

const LOG_TARGET: &str = "pkl_lsp_launcher::host";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// What the user can do about a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectiveAction {
    /// Edit the given setting.
    OpenSetting(SettingKey),
}

/// A message for the user, with at most one corrective action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub action: Option<CorrectiveAction>,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
            action: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
            action: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
            action: None,
        }
    }

    /// Attach an "open setting" action.
    pub fn with_setting(mut self, key: SettingKey) -> Self {
        self.action = Some(CorrectiveAction::OpenSetting(key));
        self
    }
}

/// The user-interaction capabilities the launcher needs.
pub trait Host: Send + Sync {
    /// Show a notice.
    fn notify(&self, notice: Notice);

    /// Ask a yes/no question. `accept_label` names the affirmative choice.
    fn prompt(&self, message: &str, accept_label: &str) -> bool;

    /// Tell the user the language server must be restarted to pick up a change.
    fn request_restart(&self, reason: &str);
}

/// Interactive host for CLI subcommands: stderr for output, stdin for answers.
#[derive(Debug, Clone, Default)]
pub struct TerminalHost {
    assume_yes: bool,
    config_path: Option<PathBuf>,
}

impl TerminalHost {
    pub fn new(assume_yes: bool, config_path: Option<PathBuf>) -> Self {
        Self {
            assume_yes,
            config_path,
        }
    }

    fn action_hint(&self, action: CorrectiveAction) -> String {
        match action {
            CorrectiveAction::OpenSetting(key) => match &self.config_path {
                Some(path) => format!(
                    "Set `{}` ({}) in {}",
                    key.toml_path(),
                    key,
                    path.display()
                ),
                None => format!("Set `{}` ({}) in the launcher config", key.toml_path(), key),
            },
        }
    }
}

impl Host for TerminalHost {
    fn notify(&self, notice: Notice) {
        let label = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{}: {}", label, notice.message);
        if let Some(action) = notice.action {
            let _ = writeln!(stderr, "  hint: {}", self.action_hint(action));
        }
    }

    fn prompt(&self, message: &str, accept_label: &str) -> bool {
        if self.assume_yes {
            eprintln!("{} [{}: yes]", message, accept_label);
            return true;
        }

        eprint!("{} {}? [y/N] ", message, accept_label);
        let _ = std::io::stderr().flush();

        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }

    fn request_restart(&self, reason: &str) {
        eprintln!("{}. Restart the Pkl language server to use it.", reason);
    }
}

/// Non-interactive host used while serving LSP over stdio.
#[derive(Debug, Clone, Default)]
pub struct LogHost {
    assume_yes: bool,
}

impl LogHost {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Host for LogHost {
    fn notify(&self, notice: Notice) {
        let hint = match notice.action {
            Some(CorrectiveAction::OpenSetting(key)) => format!(" (check `{}`)", key),
            None => String::new(),
        };
        match notice.level {
            NoticeLevel::Info => log::info!(target: LOG_TARGET, "{}{}", notice.message, hint),
            NoticeLevel::Warning => log::warn!(target: LOG_TARGET, "{}{}", notice.message, hint),
            NoticeLevel::Error => log::error!(target: LOG_TARGET, "{}{}", notice.message, hint),
        }
    }

    fn prompt(&self, message: &str, accept_label: &str) -> bool {
        log::info!(
            target: LOG_TARGET,
            "{} [{}: {}]",
            message,
            accept_label,
            if self.assume_yes { "yes" } else { "declined, not interactive" }
        );
        self.assume_yes
    }

    fn request_restart(&self, reason: &str) {
        log::warn!(
            target: LOG_TARGET,
            "{}. Restart the Pkl language server to use it.",
            reason
        );
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Host that records everything and answers prompts with a fixed reply.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingHost {
        pub(crate) answer: bool,
        pub(crate) notices: Mutex<Vec<Notice>>,
        pub(crate) prompts: Mutex<Vec<String>>,
        pub(crate) restarts: Mutex<Vec<String>>,
    }

    impl RecordingHost {
        pub(crate) fn answering(answer: bool) -> Self {
            Self {
                answer,
                ..Self::default()
            }
        }

        pub(crate) fn notices(&self) -> Vec<Notice> {
            self.notices.lock().unwrap().clone()
        }
    }

    impl Host for RecordingHost {
        fn notify(&self, notice: Notice) {
            self.notices.lock().unwrap().push(notice);
        }

        fn prompt(&self, message: &str, _accept_label: &str) -> bool {
            self.prompts.lock().unwrap().push(message.to_string());
            self.answer
        }

        fn request_restart(&self, reason: &str) {
            self.restarts.lock().unwrap().push(reason.to_string());
        }
    }
}
