//! Recording handlers.
//!
//! Handlers handed to the bus must be `Send + Sync + 'static`, so these
//! helpers share their storage through `Arc<Mutex<_>>` and hand out closures
//! that push into it.

use std::sync::{Arc, Mutex};

/// Captures every value delivered to its handlers, in delivery order.
#[derive(Debug)]
pub struct Recorder<E> {
    values: Arc<Mutex<Vec<E>>>,
}

impl<E> Clone for Recorder<E> {
    fn clone(&self) -> Self {
        Self {
            values: Arc::clone(&self.values),
        }
    }
}

impl<E> Default for Recorder<E> {
    fn default() -> Self {
        Self {
            values: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<E: Clone + Send + 'static> Recorder<E> {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler that appends a clone of each delivered event.
    pub fn handler(&self) -> impl Fn(&E) + Send + Sync + 'static {
        let values = Arc::clone(&self.values);
        move |event: &E| {
            if let Ok(mut guard) = values.lock() {
                guard.push(event.clone());
            }
        }
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn values(&self) -> Vec<E> {
        self.values
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Number of values recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.values.lock() {
            guard.clear();
        }
    }
}

/// Ordered log of labelled calls shared across many handlers.
///
/// Useful for asserting the interleaving of different handlers, e.g.
/// `["a:1", "b:1", "a:2"]`.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler that logs `"{label}"` on every call, ignoring the event.
    pub fn handler<E: 'static>(
        &self,
        label: impl Into<String>,
    ) -> impl Fn(&E) + Send + Sync + 'static {
        let entries = Arc::clone(&self.entries);
        let label = label.into();
        move |_: &E| {
            if let Ok(mut guard) = entries.lock() {
                guard.push(label.clone());
            }
        }
    }

    /// A handler that logs `"{label}:{event:?}"` on every call.
    pub fn handler_debug<E: std::fmt::Debug + 'static>(
        &self,
        label: impl Into<String>,
    ) -> impl Fn(&E) + Send + Sync + 'static {
        let entries = Arc::clone(&self.entries);
        let label = label.into();
        move |event: &E| {
            if let Ok(mut guard) = entries.lock() {
                guard.push(format!("{label}:{event:?}"));
            }
        }
    }

    /// Append an entry directly.
    pub fn push(&self, entry: impl Into<String>) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.push(entry.into());
        }
    }

    /// Snapshot of every entry, in call order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Forget every entry.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.clear();
        }
    }
}
