//! Core identifier types shared across all brook crates.

use serde::{Deserialize, Serialize};

/// Identifier for a media or data channel within one transport.
///
/// Channel ids are allocated by the session layer; this core only routes by
/// them and never interprets the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChannelId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_id_display_is_bare_number() {
        assert_eq!(ChannelId(7).to_string(), "7");
        assert_eq!(ChannelId(0).to_string(), "0");
    }

    #[test]
    fn channel_id_from_u64() {
        let id: ChannelId = 42u64.into();
        assert_eq!(id, ChannelId(42));
    }
}
