//! Per-declaration feature flags.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// The resolved feature set of one declaration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Flags: u8 {
        /// Argument lists travel as one binary buffer.
        const USE_BUFFER_SERIALIZATION = 1 << 0;
        /// Calls with more arguments than declared are rejected.
        const ENFORCE_ARGUMENT_COUNT = 1 << 1;
        /// Argument values are logged at `debug`.
        const DEBUGGING = 1 << 2;
        /// Sends and receives are logged at `info`.
        const LOGGING = 1 << 3;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove_contains() {
        let mut flags = Flags::empty();
        flags.insert(Flags::LOGGING);
        flags.set(Flags::DEBUGGING, true);
        assert!(flags.contains(Flags::LOGGING | Flags::DEBUGGING));
        flags.remove(Flags::LOGGING);
        assert!(!flags.contains(Flags::LOGGING));
        assert!(flags.contains(Flags::DEBUGGING));
    }

    #[test]
    fn test_debug_lists_names() {
        let flags = Flags::USE_BUFFER_SERIALIZATION | Flags::LOGGING;
        assert_eq!(
            format!("{flags:?}"),
            "Flags(USE_BUFFER_SERIALIZATION | LOGGING)"
        );
    }

    #[test]
    fn test_serde_uses_flag_names() {
        let flags = Flags::DEBUGGING | Flags::ENFORCE_ARGUMENT_COUNT;
        let json = serde_json::to_string(&flags).unwrap();
        assert_eq!(json, r#""ENFORCE_ARGUMENT_COUNT | DEBUGGING""#);
        assert_eq!(serde_json::from_str::<Flags>(&json).unwrap(), flags);
    }
}
