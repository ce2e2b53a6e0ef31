use serde::{Deserialize, Serialize};

/// Configuration for the resource store engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceStoreConfig {
    /// Capacity of the notification dispatch queue; messages beyond it are
    /// dropped with a warning.
    #[serde(default = "default_notification_queue_capacity")]
    pub notification_queue_capacity: usize,
}

impl Default for ResourceStoreConfig {
    fn default() -> Self {
        Self {
            notification_queue_capacity: default_notification_queue_capacity(),
        }
    }
}

fn default_notification_queue_capacity() -> usize {
    64
}
