//! Notification sinks
//!
//! Notifications are advisory: a sink cannot fail the test case it reports
//! on, so `notify` returns nothing.

use std::sync::Arc;

/// Target used by [`LogNotifier`]
pub const NOTIFY_TARGET: &str = "dq::notify";

/// A fire-and-forget message sink
pub trait Notifier: Send + Sync {
    /// Deliver one message
    fn notify(&self, message: &str);
}

/// Routes messages to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        log::info!(target: NOTIFY_TARGET, "{}", message);
    }
}

/// Prints messages to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        eprintln!("[dq] {}", message);
    }
}

/// Fan-out over any number of sinks; every sink sees every message
#[derive(Clone, Default)]
pub struct Notifiers {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl Notifiers {
    /// Create an empty fan-out
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink
    pub fn push(&mut self, sink: Arc<dyn Notifier>) {
        self.sinks.push(sink);
    }

    /// Builder form of [`Notifiers::push`]
    pub fn with(mut self, sink: Arc<dyn Notifier>) -> Self {
        self.push(sink);
        self
    }

    /// Number of sinks
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether there are no sinks
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Send a message to every sink
    pub fn notify(&self, message: &str) {
        for sink in &self.sinks {
            sink.notify(message);
        }
    }
}

impl std::fmt::Debug for Notifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifiers")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}
