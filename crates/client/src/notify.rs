//! User-facing notifications (toast-style, fire-and-forget).

use std::sync::Mutex;

/// Shown when the stock source cannot cover the requested quantity.
pub const MSG_OUT_OF_STOCK: &str = "Requested quantity is out of stock";
pub const MSG_ADD_FAILED: &str = "Error adding product";
pub const MSG_REMOVE_FAILED: &str = "Error removing product";
pub const MSG_UPDATE_FAILED: &str = "Error updating product quantity";

/// Displays a transient error message to the user.
///
/// Return values are never consulted; implementations must not block.
pub trait Notifier: Send + Sync {
    fn error(&self, message: &str);
}

/// Notifier that emits messages as tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn error(&self, message: &str) {
        tracing::warn!(target: "storefront::notify", "{message}");
    }
}

/// Notifier for terminal front-ends: prints to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

/// Notifier that keeps every message it was given.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().map(|m| m.len()).unwrap_or(0)
    }
}

impl Notifier for RecordingNotifier {
    fn error(&self, message: &str) {
        if let Ok(mut m) = self.messages.lock() {
            m.push(message.to_string());
        }
    }
}

impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    fn error(&self, message: &str) {
        (**self).error(message)
    }
}
