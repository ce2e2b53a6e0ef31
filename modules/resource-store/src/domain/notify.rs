//! Post-commit notification dispatch.
//!
//! The dispatcher owns a bounded queue and a single worker task; the request
//! path only ever enqueues, strictly after its transaction committed.
//! Delivery runs through the external [`PushDelivery`] port; every failure
//! mode (full queue, delivery error) is logged and swallowed.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::domain::definition::NotificationHookDef;
use crate::domain::model::Resource;

/// A fully formed push message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub endpoint: String,
    pub title: String,
    pub body: String,
}

/// External push transport.
#[async_trait]
pub trait PushDelivery: Send + Sync + 'static {
    async fn deliver(&self, notification: Notification) -> anyhow::Result<()>;
}

/// Handle to the dispatch queue. Cheap to clone.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<Notification>,
}

impl NotificationDispatcher {
    /// Spawn the worker task draining the queue into `delivery`.
    #[must_use]
    pub fn spawn(delivery: Arc<dyn PushDelivery>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<Notification>(capacity);
        tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                let endpoint = notification.endpoint.clone();
                if let Err(error) = delivery.deliver(notification).await {
                    tracing::warn!(%error, endpoint, "Push delivery failed");
                }
            }
        });
        Self { tx }
    }

    /// Enqueue without waiting; a full queue drops the message with a log
    /// line, never an error.
    pub fn enqueue(&self, notification: Notification) {
        if let Err(error) = self.tx.try_send(notification) {
            tracing::warn!(%error, "Notification queue full, dropping message");
        }
    }
}

/// Render the hook's messages for a set of endpoints.
///
/// The title defaults to the resource type name; templates interpolate
/// `{field}` placeholders from the resource payload plus `{id}`.
#[must_use]
pub fn render_messages(
    type_name: &str,
    hook: &NotificationHookDef,
    resource: &Resource,
    endpoints: &[String],
) -> Vec<Notification> {
    let title = hook
        .title
        .as_deref()
        .map_or_else(|| type_name.to_owned(), |t| render_template(t, resource));
    let body = hook
        .content
        .as_deref()
        .map_or_else(String::new, |t| render_template(t, resource));

    endpoints
        .iter()
        .map(|endpoint| Notification {
            endpoint: endpoint.clone(),
            title: title.clone(),
            body: body.clone(),
        })
        .collect()
}

fn render_template(template: &str, resource: &Resource) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let field = &after[..close];
        out.push_str(&resolve_field(field, resource));
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

fn resolve_field(field: &str, resource: &Resource) -> String {
    if field == "id" {
        return resource.id.to_string();
    }
    match resource.data.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
