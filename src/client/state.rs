use crate::infrastructure::TaskManager;

/// Consolidated mutable state for ChannelClient.
///
/// Lock order: this state is always locked before the connection manager's
/// own lock, never the other way round.
pub struct ClientState {
    /// Reconnect attempts since the last successful open
    pub reconnect_attempts: u32,

    /// Background task manager
    pub task_manager: TaskManager,

    /// Whether the disconnect was manual (prevents auto-reconnect)
    pub was_manual_disconnect: bool,
}

impl ClientState {
    pub fn new() -> Self {
        Self {
            reconnect_attempts: 0,
            task_manager: TaskManager::new(),
            was_manual_disconnect: false,
        }
    }
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new()
    }
}
