use crate::client::ConnectionManager;
use crate::types::{HEARTBEAT_INTERVAL, message_types};
use std::sync::Weak;
use std::time::Duration;
use tokio::time::{self, Instant};

const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(HEARTBEAT_INTERVAL);

/// Periodic keepalive for an open connection.
pub struct HeartbeatManager {
    interval: Duration,
    connection: Weak<ConnectionManager>,
}

impl HeartbeatManager {
    pub fn new(connection: Weak<ConnectionManager>) -> Self {
        Self {
            interval: DEFAULT_HEARTBEAT_INTERVAL,
            connection,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Heartbeat loop. The first beat goes out one full interval after start.
    pub async fn run(self) {
        let mut interval_timer = time::interval_at(Instant::now() + self.interval, self.interval);
        interval_timer.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
        let heartbeat_msg = serde_json::json!({ "type": message_types::PING }).to_string();

        loop {
            interval_timer.tick().await;

            let Some(connection) = self.connection.upgrade() else {
                // Client dropped, exit heartbeat task
                break;
            };

            if connection.send_direct(heartbeat_msg.clone()) {
                tracing::debug!("Sent heartbeat");
            } else {
                tracing::debug!("Skipped heartbeat, connection not open");
            }
        }
    }
}
