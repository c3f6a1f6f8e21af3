//! Data-channel message parameters.

use serde::{Deserialize, Serialize};

use crate::audio::CodecError;

/// Kind of payload carried by a data-channel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataMessageType {
    Text,
    Binary,
    Control,
}

/// Per-message send parameters for a data channel.
///
/// `max_rtx_count` and `max_rtx_ms` are alternative partial-reliability
/// knobs for `reliable == false`; at most one should be set. This layer
/// stores the request — enforcement belongs to the concrete transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendDataParams {
    pub message_type: DataMessageType,
    /// Deliver messages in send order.
    pub ordered: bool,
    /// Retransmit until delivered.
    pub reliable: bool,
    /// If unreliable, retransmit at most this many times.
    pub max_rtx_count: Option<u32>,
    /// If unreliable, retransmit for at most this many milliseconds.
    pub max_rtx_ms: Option<u32>,
}

impl Default for SendDataParams {
    fn default() -> Self {
        Self {
            message_type: DataMessageType::Binary,
            ordered: true,
            reliable: true,
            max_rtx_count: None,
            max_rtx_ms: None,
        }
    }
}

/// Serialize `SendDataParams` to compact binary via postcard.
pub fn encode_send_data_params(params: &SendDataParams) -> Result<Vec<u8>, CodecError> {
    postcard::to_allocvec(params).map_err(CodecError::Serialize)
}

/// Deserialize `SendDataParams` from postcard bytes.
pub fn decode_send_data_params(data: &[u8]) -> Result<SendDataParams, CodecError> {
    postcard::from_bytes(data).map_err(CodecError::Deserialize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_ordered_reliable_binary() {
        let params = SendDataParams::default();
        assert_eq!(params.message_type, DataMessageType::Binary);
        assert!(params.ordered);
        assert!(params.reliable);
        assert!(params.max_rtx_count.is_none());
        assert!(params.max_rtx_ms.is_none());
    }

    #[test]
    fn params_roundtrip() {
        let params = SendDataParams {
            message_type: DataMessageType::Text,
            ordered: false,
            reliable: false,
            max_rtx_count: Some(3),
            max_rtx_ms: None,
        };
        let encoded = encode_send_data_params(&params).unwrap();
        let decoded = decode_send_data_params(&encoded).unwrap();
        assert_eq!(params, decoded);
    }

    #[test]
    fn malformed_bytes_fail_to_decode() {
        assert!(decode_send_data_params(&[]).is_err());
    }
}
