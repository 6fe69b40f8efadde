//! Payment event dispatch
//!
//! Every normalized webhook produces one [`PaymentEventKind::Received`]
//! notification, then one notification for its outcome when the status is
//! successful, failed or pending. Listener failures are logged and
//! reported, never propagated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use jinah_payments::webhook::{PaymentOutcome, WebhookPayload};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Kind of notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentEventKind {
    Received,
    Successful,
    Failed,
    Pending,
}

impl PaymentEventKind {
    pub const ALL: [PaymentEventKind; 4] = [
        Self::Received,
        Self::Successful,
        Self::Failed,
        Self::Pending,
    ];

    /// Notification kind for an outcome, if it has one
    pub fn for_outcome(outcome: PaymentOutcome) -> Option<Self> {
        match outcome {
            PaymentOutcome::Successful => Some(Self::Successful),
            PaymentOutcome::Failed => Some(Self::Failed),
            PaymentOutcome::Pending => Some(Self::Pending),
            PaymentOutcome::Unclassified => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Received => "payment.webhook_received",
            Self::Successful => "payment.successful",
            Self::Failed => "payment.failed",
            Self::Pending => "payment.pending",
        }
    }
}

impl fmt::Display for PaymentEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A notification delivered to listeners
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub kind: PaymentEventKind,
    pub payload: Arc<WebhookPayload>,
    pub dispatched_at: DateTime<Utc>,
}

/// Listener error
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("Listener failed: {0}")]
    Failed(String),

    #[error("Listener panicked: {0}")]
    Panicked(String),
}

/// Consumer of payment events
///
/// Providers may redeliver webhooks, so listeners should be idempotent.
#[async_trait]
pub trait PaymentEventListener: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn on_event(&self, event: &PaymentEvent) -> Result<(), ListenerError>;
}

/// A failed notification
#[derive(Debug)]
pub struct ListenerFailure {
    pub listener: String,
    pub kind: PaymentEventKind,
    pub error: ListenerError,
}

/// Summary of one dispatch
#[derive(Debug)]
pub struct DispatchReport {
    pub outcome: PaymentOutcome,
    /// Listener invocations, successful or not
    pub notifications: usize,
    pub failures: Vec<ListenerFailure>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Routes payment events to subscribed listeners
#[derive(Clone, Default)]
pub struct EventDispatcher {
    listeners: Arc<DashMap<PaymentEventKind, Vec<Arc<dyn PaymentEventListener>>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a listener to one kind
    pub fn subscribe<L: PaymentEventListener + 'static>(&self, kind: PaymentEventKind, listener: L) {
        self.subscribe_arc(kind, Arc::new(listener));
    }

    pub fn subscribe_arc(&self, kind: PaymentEventKind, listener: Arc<dyn PaymentEventListener>) {
        debug!(kind = %kind, listener = listener.name(), "Subscribed listener");
        self.listeners.entry(kind).or_default().push(listener);
    }

    /// Subscribe a listener to every kind
    pub fn subscribe_all<L: PaymentEventListener + 'static>(&self, listener: L) {
        let listener: Arc<dyn PaymentEventListener> = Arc::new(listener);
        for kind in PaymentEventKind::ALL {
            self.subscribe_arc(kind, listener.clone());
        }
    }

    pub fn listener_count(&self, kind: PaymentEventKind) -> usize {
        self.listeners.get(&kind).map(|l| l.len()).unwrap_or(0)
    }

    /// Notify listeners about a normalized webhook
    pub async fn dispatch(&self, payload: WebhookPayload) -> DispatchReport {
        let outcome = payload.outcome();
        let payload = Arc::new(payload);
        let mut report = DispatchReport {
            outcome,
            notifications: 0,
            failures: Vec::new(),
        };

        let kinds = std::iter::once(PaymentEventKind::Received)
            .chain(PaymentEventKind::for_outcome(outcome));
        for kind in kinds {
            self.notify(kind, &payload, &mut report).await;
        }

        info!(
            service = %payload.service,
            event_type = %payload.event_type,
            transaction_id = payload.transaction_id.as_deref(),
            outcome = ?outcome,
            notifications = report.notifications,
            failures = report.failures.len(),
            "Payment events dispatched"
        );
        report
    }

    async fn notify(&self, kind: PaymentEventKind, payload: &Arc<WebhookPayload>, report: &mut DispatchReport) {
        let listeners = match self.listeners.get(&kind) {
            Some(listeners) => listeners.clone(),
            None => return,
        };

        let event = Arc::new(PaymentEvent {
            kind,
            payload: payload.clone(),
            dispatched_at: Utc::now(),
        });

        for listener in listeners {
            report.notifications += 1;
            let name = listener.name().to_string();
            let task_event = event.clone();
            let task = tokio::spawn(async move { listener.on_event(&task_event).await });

            let error = match task.await {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(e) => ListenerError::Panicked(e.to_string()),
            };
            error!(listener = %name, kind = %kind, error = %error, "Payment event listener failed");
            report.failures.push(ListenerFailure {
                listener: name,
                kind,
                error,
            });
        }
    }
}

/// Logs every event it receives
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingListener;

#[async_trait]
impl PaymentEventListener for LoggingListener {
    fn name(&self) -> &str {
        "logging"
    }

    async fn on_event(&self, event: &PaymentEvent) -> Result<(), ListenerError> {
        let payload = &event.payload;
        info!(
            kind = %event.kind,
            service = %payload.service,
            merchant_order_id = payload.merchant_order_id.as_deref(),
            transaction_id = payload.transaction_id.as_deref(),
            status = payload.status.as_ref().map(|s| s.as_str()),
            amount = ?payload.amount,
            "Payment event"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jinah_payments::normalize::{NormalizeContext, from_finpay};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<PaymentEventKind>>,
    }

    #[async_trait]
    impl PaymentEventListener for Arc<Recorder> {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn on_event(&self, event: &PaymentEvent) -> Result<(), ListenerError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(event.kind);
            }
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl PaymentEventListener for Failing {
        async fn on_event(&self, _event: &PaymentEvent) -> Result<(), ListenerError> {
            Err(ListenerError::Failed("database unavailable".into()))
        }
    }

    struct Panicking;

    #[async_trait]
    impl PaymentEventListener for Panicking {
        async fn on_event(&self, _event: &PaymentEvent) -> Result<(), ListenerError> {
            panic!("listener bug");
        }
    }

    fn payload(status: &str) -> WebhookPayload {
        from_finpay(
            &json!({"order": {"id": "ORD-1"}, "result": {"payment": {"status": status}}}),
            &NormalizeContext::default(),
        )
    }

    #[tokio::test]
    async fn test_received_then_outcome() {
        let dispatcher = EventDispatcher::new();
        let recorder = Arc::new(Recorder::default());
        dispatcher.subscribe_all(recorder.clone());

        let report = dispatcher.dispatch(payload("PAID")).await;
        assert_eq!(report.outcome, PaymentOutcome::Successful);
        assert_eq!(report.notifications, 2);
        assert!(report.is_clean());
        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec![PaymentEventKind::Received, PaymentEventKind::Successful]
        );
    }

    #[tokio::test]
    async fn test_unclassified_only_received() {
        let dispatcher = EventDispatcher::new();
        let recorder = Arc::new(Recorder::default());
        dispatcher.subscribe_all(recorder.clone());

        let report = dispatcher.dispatch(payload("ON_HOLD")).await;
        assert_eq!(report.outcome, PaymentOutcome::Unclassified);
        assert_eq!(*recorder.seen.lock().unwrap(), vec![PaymentEventKind::Received]);
    }

    #[tokio::test]
    async fn test_kind_subscription() {
        let dispatcher = EventDispatcher::new();
        let recorder = Arc::new(Recorder::default());
        dispatcher.subscribe(PaymentEventKind::Failed, recorder.clone());

        dispatcher.dispatch(payload("PAID")).await;
        dispatcher.dispatch(payload("EXPIRED")).await;
        assert_eq!(*recorder.seen.lock().unwrap(), vec![PaymentEventKind::Failed]);
        assert_eq!(dispatcher.listener_count(PaymentEventKind::Failed), 1);
        assert_eq!(dispatcher.listener_count(PaymentEventKind::Pending), 0);
    }

    #[tokio::test]
    async fn test_failures_are_contained() {
        let dispatcher = EventDispatcher::new();
        let recorder = Arc::new(Recorder::default());
        dispatcher.subscribe(PaymentEventKind::Pending, Failing);
        dispatcher.subscribe(PaymentEventKind::Pending, Panicking);
        dispatcher.subscribe(PaymentEventKind::Pending, recorder.clone());

        let report = dispatcher.dispatch(payload("PENDING")).await;
        assert_eq!(report.notifications, 3);
        assert_eq!(report.failures.len(), 2);
        assert!(matches!(report.failures[0].error, ListenerError::Failed(_)));
        assert!(matches!(report.failures[1].error, ListenerError::Panicked(_)));
        assert_eq!(*recorder.seen.lock().unwrap(), vec![PaymentEventKind::Pending]);
    }

    #[tokio::test]
    async fn test_logging_listener() {
        let dispatcher = EventDispatcher::new();
        dispatcher.subscribe_all(LoggingListener);
        let report = dispatcher.dispatch(payload("PENDING")).await;
        assert_eq!(report.notifications, 2);
        assert!(report.is_clean());
    }
}
