use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

/// A transient user-facing message (a toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub title: &'static str,
    pub message: String,
}

/// Sending half of the notice channel. Every notice is also logged, so a
/// handle without a receiver still leaves a trace.
#[derive(Debug, Clone, Default)]
pub struct Notices {
    tx: Option<mpsc::UnboundedSender<Notice>>,
}

impl Notices {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Log notices without delivering them anywhere.
    pub fn log_only() -> Self {
        Self::default()
    }

    pub fn success(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.send(Notice {
            level: Level::Success,
            title: "Success",
            message,
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.send(Notice {
            level: Level::Error,
            title: "Error",
            message,
        });
    }

    fn send(&self, notice: Notice) {
        if let Some(tx) = &self.tx {
            // Receiver gone means nobody is showing toasts any more
            let _ = tx.send(notice);
        }
    }
}
