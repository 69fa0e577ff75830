use std::fmt::Display;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Prefix for every log line the session writes
    pub name: String,

    /// Emit `StreamSizeChanged` when the coded size changes
    pub notify_stream_size: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "httpflv".to_string(),
            notify_stream_size: true,
        }
    }
}

impl Display for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SessionConfig {{ name: {}, notify_stream_size: {} }}",
            self.name, self.notify_stream_size
        )
    }
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn notify_stream_size(mut self, notify_stream_size: bool) -> Self {
        self.config.notify_stream_size = notify_stream_size;
        self
    }

    pub fn build(self) -> SessionConfig {
        self.config
    }
}
