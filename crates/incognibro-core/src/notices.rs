//! User-facing notices.
//!
//! Mutations never return errors to the caller. Their outcome is recorded
//! here as a notice for the presentation layer to show.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Number of notices retained by a [`NoticeBoard`].
const NOTICE_HISTORY: usize = 32;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// The operation was applied.
    Success,
    /// The operation completed without changing anything.
    Info,
    /// The operation failed and was rolled back.
    Error,
}

impl NoticeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// Shared, bounded history of notices. Clones share the same history.
#[derive(Debug, Clone, Default)]
pub struct NoticeBoard {
    notices: Arc<Mutex<VecDeque<Notice>>>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a notice, dropping the oldest beyond the history limit.
    pub fn push(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => tracing::warn!(message = %notice.message, "Notice"),
            _ => tracing::info!(message = %notice.message, "Notice"),
        }

        let mut notices = self.notices.lock();
        if notices.len() == NOTICE_HISTORY {
            notices.pop_front();
        }
        notices.push_back(notice);
    }

    /// Most recent notice.
    pub fn latest(&self) -> Option<Notice> {
        self.notices.lock().back().cloned()
    }

    /// All retained notices, oldest first.
    pub fn all(&self) -> Vec<Notice> {
        self.notices.lock().iter().cloned().collect()
    }

    /// Removes and returns all retained notices, oldest first.
    pub fn drain(&self) -> Vec<Notice> {
        self.notices.lock().drain(..).collect()
    }
}
