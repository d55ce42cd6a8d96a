//! # Notification Sink
//!
//! Every mutating operation reports its outcome as a `(message, severity)`
//! event. Rendering (toasts, status bar, logs) belongs to whoever implements
//! [`NotificationSink`].
//!
//! ```text
//!   SaleProcessor ──┐
//!   CreditLedger  ──┼──► dyn NotificationSink ──► TracingSink  (logs)
//!   ImportRecon.. ──┤                         ──► ChannelSink  (UI / tests)
//!   SyncController ─┘                         ──► NoOpSink
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Success => write!(f, "success"),
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

/// Receives outcome events from the engine.
///
/// Implementations must not block: `notify` is called from inside async
/// operations.
pub trait NotificationSink: Send + Sync + fmt::Debug {
    fn notify(&self, notification: Notification);

    fn success(&self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.notify(Notification::new(message, Severity::Success));
    }

    fn warning(&self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.notify(Notification::new(message, Severity::Warning));
    }

    fn error(&self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.notify(Notification::new(message, Severity::Error));
    }
}

/// Convenience for `dyn NotificationSink` handles.
pub fn emit(sink: &dyn NotificationSink, severity: Severity, message: impl Into<String>) {
    sink.notify(Notification::new(message, severity));
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpSink;

impl NotificationSink for NoOpSink {
    fn notify(&self, _notification: Notification) {}
}

/// Forwards notifications to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, n: Notification) {
        match n.severity {
            Severity::Success | Severity::Info => info!(target: "mercado::notify", "{}", n.message),
            Severity::Warning => warn!(target: "mercado::notify", "{}", n.message),
            Severity::Error => error!(target: "mercado::notify", "{}", n.message),
        }
    }
}

/// Pushes notifications into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, notification: Notification) {
        // Receiver gone means nobody is listening any more.
        let _ = self.tx.send(notification);
    }
}
