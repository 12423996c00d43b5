//! Notification senders. Fire-and-forget from the engine's perspective:
//! a failed send is logged and counted, never propagated; the event is
//! already persisted by the time delivery is attempted.

pub mod email;
pub mod sms;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;

use crate::event::Category;
use crate::routing::{Channel, NotificationPlan};

/// Rendered alert content handed to the senders.
#[derive(Debug, Clone)]
pub struct AlertMessage {
    pub title: String,
    pub body: String,
    pub category: Category,
    pub source_tag: String,
    pub ts: DateTime<Utc>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, msg: &AlertMessage) -> Result<()>;
    fn channel(&self) -> Channel;
    fn name(&self) -> &'static str;
}

/// Per-send timeout so a slow gateway cannot stall a pipeline worker.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Fan-out over the configured senders, filtered by the plan's channels.
#[derive(Clone, Default)]
pub struct NotifierMux {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Build from environment: email and SMS senders are each optional
    /// and silently absent when unconfigured.
    pub fn from_env() -> Self {
        let mut mux = Self::new();
        if let Some(email) = email::EmailSender::from_env() {
            mux.notifiers.push(Arc::new(email));
        }
        if let Some(sms) = sms::SmsSender::from_env() {
            mux.notifiers.push(Arc::new(sms));
        }
        mux
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Send `msg` on every channel the plan selects. Returns the number
    /// of successful sends; failures are logged and counted only.
    pub async fn dispatch(&self, plan: &NotificationPlan, msg: &AlertMessage) -> usize {
        let mut sent = 0usize;
        for notifier in &self.notifiers {
            if !plan.channels.contains(&notifier.channel()) {
                continue;
            }
            match tokio::time::timeout(SEND_TIMEOUT, notifier.send(msg)).await {
                Ok(Ok(())) => {
                    counter!("notify_sent_total").increment(1);
                    sent += 1;
                }
                Ok(Err(e)) => {
                    counter!("notify_failed_total").increment(1);
                    tracing::warn!(error = ?e, notifier = notifier.name(), "notification send failed");
                }
                Err(_) => {
                    counter!("notify_failed_total").increment(1);
                    tracing::warn!(notifier = notifier.name(), "notification send timed out");
                }
            }
        }
        sent
    }
}
