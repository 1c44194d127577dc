use camlink_frame::FrameConfig;

/// Default worker thread name; also the session id when none is assigned.
pub const DEFAULT_SESSION_NAME: &str = "camlink-rx";

/// Default capacity for channel-backed sessions.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 8;

/// Receive session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Framing limits and timeouts for the underlying receiver.
    pub frame: FrameConfig,
    /// Session id and worker thread name.
    pub name: String,
    /// Capacity of the channel created by [`Session::start_channel`](crate::Session::start_channel).
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            name: DEFAULT_SESSION_NAME.to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Same config under a different session name.
    pub fn named(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}
