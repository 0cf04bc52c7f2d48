use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Severity of an advisory notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Informational notice
    Info,
    /// Error notice (rendered as destructive by UI layers)
    Error,
}

/// A transient advisory shown to the user
///
/// Fire-and-forget: no acknowledgment is expected and delivery is not
/// retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    /// Short title (e.g. "Speech Recognition Error")
    pub title: String,
    /// Human-readable body text
    pub body: String,
    /// Notice severity
    pub severity: Severity,
}

impl Notice {
    /// Create an error-severity notice
    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            severity: Severity::Error,
        }
    }

    /// Create an info-severity notice
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            severity: Severity::Info,
        }
    }
}

/// Sink for advisory notices
///
/// Implementations deliver the notice to whatever transient surface the
/// host application provides (toast, status line, log).
pub trait Notifier: Send + Sync {
    /// Deliver a notice
    fn notify(&self, notice: Notice);
}

/// Notifier that writes notices to the tracing log
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.severity {
            Severity::Info => info!("{}: {}", notice.title, notice.body),
            Severity::Error => error!("{}: {}", notice.title, notice.body),
        }
    }
}
