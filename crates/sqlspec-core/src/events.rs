//! Statement lifecycle events
//!
//! A dispatcher with a fast no-listener path: when nothing is subscribed,
//! emitting costs one atomic load and the event is never constructed.
//! Payloads carry the SQL fingerprint rather than raw SQL unless raw
//! capture is explicitly enabled.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::statement::OperationKind;

/// The closed set of emitted event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    CompileHit,
    CompileMiss,
    CompileDuration,
    ExecuteStart,
    ExecuteComplete,
    ExecuteError,
    ExecuteDuration,
    ConnectionOpen,
    ConnectionClose,
    SessionStart,
    SessionEnd,
    PoolAcquire,
    PoolRelease,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompileHit => "statement.compile.hit",
            Self::CompileMiss => "statement.compile.miss",
            Self::CompileDuration => "statement.compile.duration",
            Self::ExecuteStart => "statement.execute.start",
            Self::ExecuteComplete => "statement.execute.complete",
            Self::ExecuteError => "statement.execute.error",
            Self::ExecuteDuration => "statement.execute.duration",
            Self::ConnectionOpen => "connection.open",
            Self::ConnectionClose => "connection.close",
            Self::SessionStart => "session.start",
            Self::SessionEnd => "session.end",
            Self::PoolAcquire => "pool.acquire",
            Self::PoolRelease => "pool.release",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One emitted event.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub correlation_id: Uuid,
    pub driver: Option<String>,
    pub operation: Option<OperationKind>,
    pub sql_fingerprint: u64,
    /// Raw SQL, present only when non-redaction is configured
    pub sql: Option<String>,
    pub parameter_count: usize,
    pub duration: Option<Duration>,
    pub error: Option<String>,
}

impl Event {
    pub fn new(kind: EventKind, sql_fingerprint: u64) -> Self {
        Self {
            kind,
            correlation_id: Uuid::new_v4(),
            driver: None,
            operation: None,
            sql_fingerprint,
            sql: None,
            parameter_count: 0,
            duration: None,
            error: None,
        }
    }

    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = id;
        self
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self
    }

    pub fn with_operation(mut self, operation: OperationKind) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn with_parameter_count(mut self, count: usize) -> Self {
        self.parameter_count = count;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }
}

/// Receiver of emitted events.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &Event);
}

/// Event dispatcher.
pub struct EventHub {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
    enabled: AtomicBool,
    include_raw_sql: AtomicBool,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            enabled: AtomicBool::new(false),
            include_raw_sql: AtomicBool::new(false),
        }
    }

    /// Whether any listener is subscribed. The only cost on the disabled
    /// path.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Whether emitters should attach raw SQL to payloads.
    #[inline]
    pub fn include_raw_sql(&self) -> bool {
        self.include_raw_sql.load(Ordering::Relaxed)
    }

    /// Opt in to raw SQL / parameter capture in event payloads.
    pub fn set_include_raw_sql(&self, include: bool) {
        self.include_raw_sql.store(include, Ordering::Relaxed);
    }

    pub fn subscribe(&self, listener: Arc<dyn EventListener>) {
        let mut listeners = self.listeners.write();
        listeners.push(listener);
        self.enabled.store(true, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        let mut listeners = self.listeners.write();
        listeners.clear();
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Emit an event, constructing it only if someone is listening.
    pub fn emit_with(&self, build: impl FnOnce() -> Event) {
        if !self.is_enabled() {
            return;
        }
        let event = build();
        for listener in self.listeners.read().iter() {
            listener.on_event(&event);
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("listener_count", &self.listeners.read().len())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

static GLOBAL_HUB: Lazy<EventHub> = Lazy::new(EventHub::new);

/// The process-wide event hub.
pub fn hub() -> &'static EventHub {
    &GLOBAL_HUB
}

/// A listener that buffers events into a bounded queue.
///
/// When the queue is full new events are counted and dropped, so a slow
/// consumer never applies back-pressure to query execution.
pub struct BufferedListener {
    queue: Mutex<VecDeque<Event>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl BufferedListener {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
            dropped: AtomicU64::new(0),
        }
    }

    /// Drain all buffered events.
    pub fn drain(&self) -> Vec<Event> {
        self.queue.lock().drain(..).collect()
    }

    /// Events discarded because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl EventListener for BufferedListener {
    fn on_event(&self, event: &Event) {
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        queue.push_back(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_hub_skips_construction() {
        let hub = EventHub::new();
        let mut built = false;
        hub.emit_with(|| {
            built = true;
            Event::new(EventKind::CompileMiss, 1)
        });
        assert!(!built);
    }

    #[test]
    fn test_subscribed_listener_receives_events() {
        let hub = EventHub::new();
        let listener = Arc::new(BufferedListener::new(16));
        hub.subscribe(listener.clone());
        hub.emit_with(|| Event::new(EventKind::CompileMiss, 42).with_parameter_count(3));
        let events = listener.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::CompileMiss);
        assert_eq!(events[0].sql_fingerprint, 42);
        assert_eq!(events[0].parameter_count, 3);
    }

    #[test]
    fn test_bounded_buffer_drops_overflow() {
        let listener = BufferedListener::new(2);
        for i in 0..5 {
            listener.on_event(&Event::new(EventKind::ExecuteStart, i));
        }
        assert_eq!(listener.drain().len(), 2);
        assert_eq!(listener.dropped(), 3);
    }

    #[test]
    fn test_redaction_default() {
        let hub = EventHub::new();
        assert!(!hub.include_raw_sql());
        hub.set_include_raw_sql(true);
        assert!(hub.include_raw_sql());
    }

    #[test]
    fn test_event_names() {
        assert_eq!(EventKind::CompileHit.as_str(), "statement.compile.hit");
        assert_eq!(EventKind::ExecuteError.as_str(), "statement.execute.error");
        assert_eq!(EventKind::PoolAcquire.as_str(), "pool.acquire");
    }
}
