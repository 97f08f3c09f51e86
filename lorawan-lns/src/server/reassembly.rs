//! Reassembly of transport fragments into whole station messages.

use bytes::BytesMut;
use lorawan_protocol::ProtocolError;

/// Reassembly state. `Complete` is the resting state after a message was
/// yielded; the next fragment starts a fresh message from there, exactly as
/// from `Idle`. `Faulted` is terminal for the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    Idle,
    Receiving,
    Complete,
    Faulted,
}

/// Accumulates the fragments of one logical message at a time. The terminal
/// flag is authoritative for message boundaries; the buffer never spans two
/// logical messages.
pub struct MessageAssembler {
    buffer: BytesMut,
    state: AssemblerState,
    max_size: usize,
}

impl MessageAssembler {
    pub fn new(max_size: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            state: AssemblerState::Idle,
            max_size,
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// Feed one fragment. Returns the assembled message when `is_final` is
    /// set, `None` while more fragments are pending. Binary fragments,
    /// invalid UTF-8 and oversized messages fault the assembler; the
    /// connection owning it must be closed.
    pub fn push(
        &mut self,
        payload: &[u8],
        is_text: bool,
        is_final: bool,
    ) -> Result<Option<String>, ProtocolError> {
        if self.state == AssemblerState::Faulted {
            return Err(ProtocolError::MalformedMessage(
                "assembler is faulted".to_string(),
            ));
        }
        if !is_text {
            self.state = AssemblerState::Faulted;
            return Err(ProtocolError::BinaryFrameNotSupported);
        }
        if self.buffer.len() + payload.len() > self.max_size {
            self.state = AssemblerState::Faulted;
            return Err(ProtocolError::MessageTooLarge(
                self.buffer.len() + payload.len(),
                self.max_size,
            ));
        }

        self.buffer.extend_from_slice(payload);
        if !is_final {
            self.state = AssemblerState::Receiving;
            return Ok(None);
        }

        let assembled = self.buffer.split();
        match String::from_utf8(assembled.to_vec()) {
            Ok(message) => {
                self.state = AssemblerState::Complete;
                Ok(Some(message))
            }
            Err(_) => {
                self.state = AssemblerState::Faulted;
                Err(ProtocolError::InvalidEncoding)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_fragment_message() {
        let mut assembler = MessageAssembler::new(1024);
        let message = assembler.push(b"test", true, true).unwrap();
        assert_eq!(message.as_deref(), Some("test"));
        assert_eq!(assembler.state(), AssemblerState::Complete);
    }

    #[test]
    fn test_fragmented_message_reassembles() {
        let mut assembler = MessageAssembler::new(1024);
        assert_eq!(assembler.push(b"long", true, false).unwrap(), None);
        assert_eq!(assembler.state(), AssemblerState::Receiving);
        let message = assembler.push(b"test", true, true).unwrap();
        assert_eq!(message.as_deref(), Some("longtest"));
    }

    #[test]
    fn test_two_messages_on_one_connection() {
        let mut assembler = MessageAssembler::new(1024);
        let first = assembler.push(b"shortMessage1", true, true).unwrap();
        let second = assembler.push(b"shortMessage2", true, true).unwrap();
        assert_eq!(first.as_deref(), Some("shortMessage1"));
        assert_eq!(second.as_deref(), Some("shortMessage2"));
    }

    #[test]
    fn test_binary_fragment_faults() {
        let mut assembler = MessageAssembler::new(1024);
        let result = assembler.push(&[0x47, 0x00], false, true);
        assert!(matches!(result, Err(ProtocolError::BinaryFrameNotSupported)));
        assert_eq!(assembler.state(), AssemblerState::Faulted);
        // The fault is sticky.
        assert!(assembler.push(b"hello", true, true).is_err());
    }

    #[test]
    fn test_invalid_utf8_faults() {
        let mut assembler = MessageAssembler::new(1024);
        // A UTF-8 sequence split across fragments must still decode...
        assert_eq!(assembler.push(&[0xC3], true, false).unwrap(), None);
        assert_eq!(
            assembler.push(&[0xA9], true, true).unwrap().as_deref(),
            Some("é")
        );
        // ...but a broken sequence is a protocol fault.
        let result = assembler.push(&[0xFF, 0xFE], true, true);
        assert!(matches!(result, Err(ProtocolError::InvalidEncoding)));
        assert_eq!(assembler.state(), AssemblerState::Faulted);
    }

    #[test]
    fn test_oversized_message_faults() {
        let mut assembler = MessageAssembler::new(8);
        assert_eq!(assembler.push(b"12345", true, false).unwrap(), None);
        let result = assembler.push(b"67890", true, true);
        assert!(matches!(result, Err(ProtocolError::MessageTooLarge(10, 8))));
        assert_eq!(assembler.state(), AssemblerState::Faulted);
    }
}
