//! Gateway configuration.

/// Message returned when a delete is refused.
pub const IN_USE_MESSAGE: &str =
    "Sorry, you are not allowed to delete this data. It is already used in transactions.";

/// Default cap on buffered batch-delete bodies (2 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Delete guard middleware configuration.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Largest batch-delete body buffered for inspection.
    pub max_body_bytes: usize,
    /// Message returned when a delete is refused.
    pub in_use_message: String,
}

impl GuardConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the body buffering limit.
    pub fn with_max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    /// Set the refusal message.
    pub fn with_in_use_message(mut self, message: impl Into<String>) -> Self {
        self.in_use_message = message.into();
        self
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            in_use_message: IN_USE_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = GuardConfig::new()
            .with_max_body_bytes(1024)
            .with_in_use_message("busy");

        assert_eq!(config.max_body_bytes, 1024);
        assert_eq!(config.in_use_message, "busy");
        assert_eq!(GuardConfig::default().in_use_message, IN_USE_MESSAGE);
    }
}
