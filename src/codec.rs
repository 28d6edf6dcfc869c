//! Wire codec (spec §4.1): `{ type: cstring, data: bytes }`, framed as
//! `u32 type_len ‖ u32 data_len ‖ type_bytes ‖ data_bytes`, big-endian
//! throughout. `type_len` counts the terminating NUL.

use crate::error::{ProtocolError, Result};

const LEN_PREFIX_BYTES: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub msg_type: String,
    pub data: Vec<u8>,
}

impl Message {
    pub fn new(msg_type: impl Into<String>, data: Vec<u8>) -> Message {
        Message {
            msg_type: msg_type.into(),
            data,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut type_bytes = self.msg_type.clone().into_bytes();
        type_bytes.push(0); // NUL terminator, counted in type_len
        let type_len = type_bytes.len() as u32;
        let data_len = self.data.len() as u32;

        let mut out = Vec::with_capacity(2 * LEN_PREFIX_BYTES + type_bytes.len() + self.data.len());
        out.extend_from_slice(&type_len.to_be_bytes());
        out.extend_from_slice(&data_len.to_be_bytes());
        out.extend_from_slice(&type_bytes);
        out.extend_from_slice(&self.data);
        out
    }

    pub fn deserialize(frame: &[u8]) -> Result<Message> {
        if frame.len() < 2 * LEN_PREFIX_BYTES {
            return Err(ProtocolError::InvalidMessage("frame too short".into()));
        }

        let type_len = u32::from_be_bytes(frame[0..4].try_into().unwrap()) as usize;
        let data_len = u32::from_be_bytes(frame[4..8].try_into().unwrap()) as usize;

        if type_len == 0 {
            return Err(ProtocolError::InvalidMessage(
                "type_len must include a terminating NUL".into(),
            ));
        }

        let header_len = 2 * LEN_PREFIX_BYTES;
        let expected_len = header_len
            .checked_add(type_len)
            .and_then(|v| v.checked_add(data_len))
            .ok_or_else(|| ProtocolError::InvalidMessage("declared lengths overflow".into()))?;
        if expected_len != frame.len() {
            return Err(ProtocolError::InvalidMessage(
                "declared lengths do not match frame size".into(),
            ));
        }

        let type_bytes = &frame[header_len..header_len + type_len];
        if type_bytes[type_len - 1] != 0 {
            return Err(ProtocolError::InvalidMessage(
                "type field is not NUL-terminated".into(),
            ));
        }
        let msg_type = std::str::from_utf8(&type_bytes[..type_len - 1])
            .map_err(|_| ProtocolError::InvalidMessage("type is not valid UTF-8".into()))?
            .to_string();

        let data = frame[header_len + type_len..].to_vec();

        Ok(Message { msg_type, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_with_data() {
        let msg = Message::new("promise_sign", vec![1, 2, 3, 4, 5]);
        let bytes = msg.serialize();
        assert_eq!(Message::deserialize(&bytes).unwrap(), msg);
    }

    #[test]
    fn round_trip_empty_body() {
        let msg = Message::new("promise_init", vec![]);
        let bytes = msg.serialize();
        assert_eq!(Message::deserialize(&bytes).unwrap(), msg);
    }

    #[test]
    fn declared_length_exceeding_frame_is_rejected() {
        let msg = Message::new("promise_init", vec![1, 2, 3]);
        let mut bytes = msg.serialize();
        // Inflate the declared data_len beyond what's actually present.
        let inflated = (bytes.len() as u32) + 100;
        bytes[4..8].copy_from_slice(&inflated.to_be_bytes());
        assert!(Message::deserialize(&bytes).is_err());
    }

    #[test]
    fn truncated_frame_is_rejected() {
        let msg = Message::new("promise_init_done", vec![9; 20]);
        let bytes = msg.serialize();
        assert!(Message::deserialize(&bytes[..bytes.len() - 5]).is_err());
    }

    #[test]
    fn missing_nul_terminator_is_rejected() {
        let mut bytes = Message::new("promise_init", vec![]).serialize();
        // Header says type_len=13 ("promise_init\0"); corrupt the NUL.
        let last_type_byte_idx = 8 + 13 - 1;
        bytes[last_type_byte_idx] = b'x';
        assert!(Message::deserialize(&bytes).is_err());
    }

    #[test]
    fn proptest_like_fuzz_of_ill_formed_frames() {
        // E6: a batch of frames whose declared lengths exceed the payload
        // must all be rejected as InvalidMessage, never panic.
        for seed in 0u32..200 {
            let type_len = (seed % 7) + 1;
            let data_len = seed % 11;
            let mut frame = Vec::new();
            frame.extend_from_slice(&type_len.to_be_bytes());
            frame.extend_from_slice(&(data_len + 50).to_be_bytes()); // inflate
            frame.extend_from_slice(&vec![b'a'; type_len as usize]);
            frame.extend_from_slice(&vec![0u8; data_len as usize]);
            assert!(Message::deserialize(&frame).is_err());
        }
    }
}
