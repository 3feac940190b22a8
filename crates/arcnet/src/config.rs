//! Model-wide configuration.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// NetConfig
// ---------------------------------------------------------------------------

/// Defaults every declaration in a model starts from.
///
/// Builders may override each setting per remote; whatever they leave
/// unset falls back to this record when `on_server` / `on_client` resolve
/// the declaration's [`Flags`](crate::Flags).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Log argument values on every send and receive.
    pub debugging: bool,

    /// Log one line per send and receive.
    pub logging: bool,

    /// Pack argument lists with the binary codecs instead of sending them
    /// as plain values.
    pub use_buffers: bool,

    /// Reject calls carrying more arguments than declared. When off, the
    /// extra arguments are dropped instead.
    pub enforce_argument_count: bool,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            debugging: false,
            logging: false,
            use_buffers: false,
            enforce_argument_count: true,
        }
    }
}

impl NetConfig {
    pub fn with_debugging(mut self, on: bool) -> Self {
        self.debugging = on;
        self
    }

    pub fn with_logging(mut self, on: bool) -> Self {
        self.logging = on;
        self
    }

    pub fn with_buffers(mut self, on: bool) -> Self {
        self.use_buffers = on;
        self
    }

    pub fn with_enforce_argument_count(mut self, on: bool) -> Self {
        self.enforce_argument_count = on;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NetConfig::default();
        assert!(!config.debugging);
        assert!(!config.logging);
        assert!(!config.use_buffers);
        assert!(config.enforce_argument_count);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: NetConfig = serde_json::from_str(r#"{"use_buffers": true}"#).unwrap();
        assert!(config.use_buffers);
        assert!(config.enforce_argument_count);
    }
}
