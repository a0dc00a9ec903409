//! User-facing notices
//!
//! Components report outcomes the user should see (connected, wrong network,
//! submission accepted...) through a [`NoticeSink`]. Rendering is up to the host.

use std::sync::Mutex;
use tracing::{error, info};

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A single user-facing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Receiver of user-facing notices
pub trait NoticeSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Sink that forwards notices to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotices;

impl NoticeSink for LogNotices {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => error!(target: "notice", "{}", notice.message),
            _ => info!(target: "notice", "{}", notice.message),
        }
    }
}

/// Sink that keeps every notice in memory, in emission order
#[derive(Debug, Default)]
pub struct RecordingNotices {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotices {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notices emitted so far
    pub fn all(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    /// Notices of one level
    pub fn with_level(&self, level: NoticeLevel) -> Vec<Notice> {
        self.all().into_iter().filter(|n| n.level == level).collect()
    }

    /// Most recent notice, if any
    pub fn last(&self) -> Option<Notice> {
        self.all().pop()
    }

    pub fn clear(&self) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.clear();
        }
    }
}

impl NoticeSink for RecordingNotices {
    fn notify(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_preserves_order() {
        let sink = RecordingNotices::new();
        sink.notify(Notice::info("first"));
        sink.notify(Notice::error("second"));
        sink.notify(Notice::success("third"));

        let all = sink.all();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].message, "first");
        assert_eq!(sink.last(), Some(Notice::success("third")));
        assert_eq!(sink.with_level(NoticeLevel::Error).len(), 1);

        sink.clear();
        assert!(sink.all().is_empty());
    }
}
